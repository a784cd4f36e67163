//! License-plate recognition
//!
//! A single [`RecognitionClient`] is shared by every worker of a run. It owns
//! the process-wide [`RateLimiter`] and reads the [`ApiAvailability`] latch
//! that switches recognition off after a terminal refusal.

pub mod availability;
pub mod client;
pub mod rate_limiter;
pub mod types;

pub use availability::ApiAvailability;
pub use client::{classify_status, RecognitionClient, RecognitionSettings};
pub use rate_limiter::{RateLimiter, DEFAULT_MIN_INTERVAL};
pub use types::{BoundingBox, PlateDetection, RecognitionError};
