use serde::Deserialize;
use thiserror::Error;

/// Pixel box reported by the recognition service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct BoundingBox {
    pub xmin: i64,
    pub ymin: i64,
    pub xmax: i64,
    pub ymax: i64,
}

/// One plate found in an image
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlateDetection {
    /// Plate text as read by the service
    #[serde(rename = "plate")]
    pub text: String,

    /// Confidence in [0, 1]
    #[serde(rename = "score", default)]
    pub confidence: f64,

    #[serde(rename = "box")]
    pub bounding_box: BoundingBox,
}

/// Successful response body
#[derive(Debug, Deserialize)]
pub(crate) struct RecognitionResponse {
    #[serde(default)]
    pub results: Vec<PlateDetection>,
}

/// Why a recognition call produced no detections
#[derive(Debug, Error)]
pub enum RecognitionError {
    /// The service will keep refusing; recognition is disabled for the run
    #[error("HTTP {status}: {reason}")]
    Terminal { status: u16, reason: &'static str },

    /// This call failed; later calls may succeed
    #[error("{0}")]
    Transient(String),
}

impl RecognitionError {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminal { .. })
    }
}
