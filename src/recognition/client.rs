//! Plate Recognizer HTTP client
//!
//! Every call goes through three gates, in order: the availability latch,
//! the shared rate limiter, then the latch again (it may have closed while
//! this caller was queued). Failures never propagate to the caller; they
//! are logged and reported as "no detections".

use crate::config::RunConfig;
use crate::recognition::availability::ApiAvailability;
use crate::recognition::rate_limiter::RateLimiter;
use crate::recognition::types::{PlateDetection, RecognitionError, RecognitionResponse};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Request parameters, resolved once from the run configuration
#[derive(Debug, Clone)]
pub struct RecognitionSettings {
    pub api_url: String,
    pub api_key: Option<String>,
    pub regions: Vec<String>,
    pub mmc: bool,
    pub engine_config: String,
    /// Whether HTTP 403 closes the availability latch
    pub latch_on_forbidden: bool,
}

impl RecognitionSettings {
    pub fn from_config(config: &RunConfig) -> Self {
        Self {
            api_url: config.api.api_url.clone(),
            api_key: config.usable_api_key().map(str::to_string),
            regions: config.recognition.regions.clone(),
            mmc: config.recognition.mmc,
            engine_config: config.recognition.engine_config.clone(),
            latch_on_forbidden: config.api.skip_api_on_403,
        }
    }
}

/// Sends photos to the recognition service
pub struct RecognitionClient {
    http: Client,
    settings: RecognitionSettings,
    availability: ApiAvailability,
    limiter: Arc<RateLimiter>,
    calls_made: AtomicU64,
}

impl RecognitionClient {
    /// Creates a client
    ///
    /// The latch is closed immediately when the settings carry no usable key.
    pub fn new(
        http: Client,
        settings: RecognitionSettings,
        availability: ApiAvailability,
        limiter: Arc<RateLimiter>,
    ) -> Self {
        if settings.api_key.is_none() && availability.disable() {
            tracing::warn!("No Plate Recognizer API key configured, plate recognition disabled");
        }

        Self {
            http,
            settings,
            availability,
            limiter,
            calls_made: AtomicU64::new(0),
        }
    }

    /// Whether recognition has been turned off for the rest of the run
    pub fn is_disabled(&self) -> bool {
        self.availability.is_disabled()
    }

    /// Number of HTTP requests actually sent
    pub fn calls_made(&self) -> u64 {
        self.calls_made.load(Ordering::Relaxed)
    }

    /// Submits one image and returns the detected plates
    ///
    /// # Arguments
    ///
    /// * `image_path` - Local file to upload
    ///
    /// # Returns
    ///
    /// The detections in service order, or an empty list when the API is
    /// disabled or the call failed.
    pub async fn recognize(&self, image_path: &Path) -> Vec<PlateDetection> {
        if self.availability.is_disabled() {
            tracing::debug!("Recognition disabled, skipping {}", image_path.display());
            return Vec::new();
        }

        self.limiter.acquire().await;

        if self.availability.is_disabled() {
            tracing::debug!("Recognition disabled while waiting, skipping {}", image_path.display());
            return Vec::new();
        }

        match self.send(image_path).await {
            Ok(plates) => {
                tracing::debug!("{} plate(s) detected in {}", plates.len(), image_path.display());
                plates
            }
            Err(RecognitionError::Terminal { status, reason }) => {
                if self.availability.disable() {
                    tracing::warn!(
                        "Plate Recognizer API returned HTTP {} ({}), skipping API calls for the rest of the run",
                        status,
                        reason
                    );
                }
                Vec::new()
            }
            Err(RecognitionError::Transient(message)) => {
                tracing::error!(
                    "Plate recognition failed for {}: {}",
                    image_path.display(),
                    message
                );
                Vec::new()
            }
        }
    }

    async fn send(&self, image_path: &Path) -> Result<Vec<PlateDetection>, RecognitionError> {
        let api_key = self
            .settings
            .api_key
            .as_deref()
            .ok_or(RecognitionError::Terminal {
                status: 401,
                reason: "no API key",
            })?;

        let bytes = tokio::fs::read(image_path)
            .await
            .map_err(|e| RecognitionError::Transient(format!("cannot read image: {}", e)))?;
        let form = self.build_form(image_path, bytes);

        self.calls_made.fetch_add(1, Ordering::Relaxed);
        tracing::trace!("POST {} for {}", self.settings.api_url, image_path.display());

        let response = self
            .http
            .post(&self.settings.api_url)
            .header("Authorization", format!("Token {}", api_key))
            .multipart(form)
            .send()
            .await
            .map_err(|e| RecognitionError::Transient(e.to_string()))?;

        classify_status(response.status(), self.settings.latch_on_forbidden)?;

        let body: RecognitionResponse = response
            .json()
            .await
            .map_err(|e| RecognitionError::Transient(format!("invalid response body: {}", e)))?;
        Ok(body.results)
    }

    fn build_form(&self, image_path: &Path, bytes: Vec<u8>) -> Form {
        let file_name = image_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.jpg".to_string());

        let mut form = Form::new();
        for region in &self.settings.regions {
            form = form.text("regions", region.clone());
        }

        form.text("config", self.settings.engine_config.clone())
            .text("mmc", self.settings.mmc.to_string())
            .part("upload", Part::bytes(bytes).file_name(file_name))
    }
}

/// Maps a response status to success, a terminal refusal or a transient failure
///
/// | Status | Outcome |
/// |--------|---------|
/// | 200, 201 | success |
/// | 403 | terminal when `latch_on_forbidden`, transient otherwise |
/// | 413 | terminal (payload too large) |
/// | 429 | terminal (quota exceeded) |
/// | other | transient |
pub fn classify_status(status: StatusCode, latch_on_forbidden: bool) -> Result<(), RecognitionError> {
    match status {
        StatusCode::OK | StatusCode::CREATED => Ok(()),
        StatusCode::FORBIDDEN if latch_on_forbidden => Err(RecognitionError::Terminal {
            status: 403,
            reason: "forbidden",
        }),
        StatusCode::PAYLOAD_TOO_LARGE => Err(RecognitionError::Terminal {
            status: 413,
            reason: "payload too large",
        }),
        StatusCode::TOO_MANY_REQUESTS => Err(RecognitionError::Terminal {
            status: 429,
            reason: "too many requests",
        }),
        other => Err(RecognitionError::Transient(format!("HTTP {}", other.as_u16()))),
    }
}
