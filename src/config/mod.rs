//! Configuration module for Plate-Scout
//!
//! This module handles loading, parsing, and validating the TOML settings file.
//! Section and key names follow the historical `config.ini` layout
//! (`[API]`, `[URL]`, `[SETTINGS]`), with optional `[RECOGNITION]`,
//! `[OUTPUT]` and `[SITE]` sections.
//!
//! # Example
//!
//! ```no_run
//! use plate_scout::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! println!("Crawling with {} workers", config.settings.max_workers);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    ApiConfig, OutputConfig, RecognitionConfig, RunConfig, SettingsConfig, SiteConfig, UrlConfig,
    DEFAULT_ENGINE_CONFIG, DEFAULT_PLATE_PATTERN, PLACEHOLDER_API_KEY,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
