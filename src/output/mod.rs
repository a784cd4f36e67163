//! Output module for run statistics and the end-of-run summary
//!
//! Photos and crops are written by `images`; this module only reports what a
//! run did.

pub mod stats;

pub use stats::{print_summary, Counter, RunStats, RunSummary};
