//! Plate-Scout: a vehicle-listing photo harvester
//!
//! This crate walks the listing pages of a car marketplace, downloads every
//! photo of every listing, submits each photo to a license-plate recognition
//! service and crops the plates it finds.

pub mod browser;
pub mod config;
pub mod crawler;
pub mod images;
pub mod output;
pub mod recognition;

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Main error type for Plate-Scout operations
#[derive(Debug, Error)]
pub enum ScoutError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Timed out after {timeout:?} waiting for '{selector}'")]
    NavigationTimeout { selector: String, timeout: Duration },

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("Failed to download {url} after {attempts} attempts")]
    Download { url: String, attempts: u32 },

    #[error("Recognition error: {0}")]
    Recognition(#[from] recognition::RecognitionError),

    #[error("Invalid crop box ({x1}, {y1}) -> ({x2}, {y2}) for plate '{plate}'")]
    CropGeometry {
        plate: String,
        x1: u32,
        y1: u32,
        x2: u32,
        y2: u32,
    },

    #[error("Image error for {path}: {source}")]
    Image {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid plate pattern: {0}")]
    InvalidPattern(String),
}

/// Result type alias for Plate-Scout operations
pub type Result<T> = std::result::Result<T, ScoutError>;

// Re-export commonly used types
pub use config::RunConfig;
pub use crawler::{CarTask, Coordinator};
pub use images::ImageRef;
pub use recognition::{ApiAvailability, PlateDetection, RecognitionClient};
