use crate::ConfigError;
use serde::Deserialize;
use std::ops::RangeInclusive;
use std::time::Duration;
use url::Url;

/// API key value shipped in the sample settings file
pub const PLACEHOLDER_API_KEY: &str = "your_api_key_here";

/// Recognition engine options sent verbatim as the `config` form field
pub const DEFAULT_ENGINE_CONFIG: &str =
    r#"{"region":"strict","threshold_d":0.1,"threshold_o":0.3,"mode":"redaction"}"#;

/// French plates, old (1234AB56) and new-ish (123ABC45) formats
pub const DEFAULT_PLATE_PATTERN: &str = r".*(\d{4}[a-zA-Z]{2}\d{2}|\d{3}[a-zA-Z]{3}\d{2}).*";

/// Main configuration structure for Plate-Scout
#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    #[serde(rename = "API")]
    pub api: ApiConfig,

    #[serde(rename = "URL")]
    pub url: UrlConfig,

    #[serde(rename = "SETTINGS")]
    pub settings: SettingsConfig,

    #[serde(rename = "RECOGNITION", default)]
    pub recognition: RecognitionConfig,

    #[serde(rename = "OUTPUT", default)]
    pub output: OutputConfig,

    #[serde(rename = "SITE", default)]
    pub site: SiteConfig,
}

impl RunConfig {
    /// Parsed `BASE_URL`
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.url.base_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid BASE_URL: {}", e)))
    }

    /// Builds the listing URL for a page number
    ///
    /// A `{page}` placeholder in `MAIN_URL` is replaced; otherwise the page is
    /// passed as the `PN` query parameter.
    pub fn listing_url(&self, page: u32) -> Result<Url, ConfigError> {
        let template = &self.url.main_url;
        if template.contains("{page}") {
            let raw = template.replace("{page}", &page.to_string());
            return Url::parse(&raw)
                .map_err(|e| ConfigError::InvalidUrl(format!("Invalid MAIN_URL: {}", e)));
        }

        let mut url = Url::parse(template)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid MAIN_URL: {}", e)))?;
        url.query_pairs_mut().append_pair("PN", &page.to_string());
        Ok(url)
    }

    /// Pages to crawl, inclusive
    pub fn page_range(&self) -> RangeInclusive<u32> {
        self.settings.start_page..=self.settings.end_page
    }

    /// Returns the API key if one was configured for real
    ///
    /// Absent, blank and placeholder keys count as no key.
    pub fn usable_api_key(&self) -> Option<&str> {
        self.api
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty() && *key != PLACEHOLDER_API_KEY)
    }

    /// How long to wait for listing and photo elements
    pub fn wait_timeout(&self) -> Duration {
        Duration::from_secs(self.site.wait_timeout_secs)
    }
}

/// Plate recognition service credentials
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Endpoint receiving the multipart upload
    #[serde(rename = "PLATE_RECOGNIZER_API_URL")]
    pub api_url: String,

    /// Token sent as `Authorization: Token <key>`
    #[serde(rename = "PLATE_RECOGNIZER_API_KEY", default)]
    pub api_key: Option<String>,

    /// Whether an HTTP 403 disables the API for the rest of the run
    #[serde(rename = "SKIP_API_ON_403", default = "default_true")]
    pub skip_api_on_403: bool,
}

/// Site addresses
#[derive(Debug, Clone, Deserialize)]
pub struct UrlConfig {
    /// Base used to resolve relative links and image sources
    #[serde(rename = "BASE_URL")]
    pub base_url: String,

    /// Listing page template; `{page}` is substituted, otherwise `PN=<page>` is appended
    #[serde(rename = "MAIN_URL")]
    pub main_url: String,
}

/// Page range and concurrency
#[derive(Debug, Clone, Deserialize)]
pub struct SettingsConfig {
    #[serde(rename = "START_PAGE", default = "default_one")]
    pub start_page: u32,

    #[serde(rename = "END_PAGE")]
    pub end_page: u32,

    /// Maximum number of cars processed concurrently on one page
    #[serde(rename = "MAX_WORKERS")]
    pub max_workers: usize,

    /// Car number given to the first car of the first page; earlier cars are skipped
    #[serde(rename = "START_CAR_NUMBER", default = "default_one")]
    pub start_car_number: u32,
}

/// Recognition request parameters and plate acceptance rules
#[derive(Debug, Clone, Deserialize)]
pub struct RecognitionConfig {
    /// Region hints, one `regions` form field each
    #[serde(rename = "REGIONS", default = "default_regions")]
    pub regions: Vec<String>,

    /// Make/model/color classification flag
    #[serde(rename = "MMC", default = "default_true")]
    pub mmc: bool,

    /// JSON blob sent as the `config` form field
    #[serde(rename = "ENGINE_CONFIG", default = "default_engine_config")]
    pub engine_config: String,

    #[serde(rename = "CONFIDENCE_THRESHOLD", default = "default_threshold")]
    pub confidence_threshold: f64,

    /// Must match the whole plate text
    #[serde(rename = "PLATE_PATTERN", default = "default_pattern")]
    pub plate_pattern: String,

    /// Pixels added around each detected box before cropping
    #[serde(rename = "CROP_MARGIN", default = "default_margin")]
    pub crop_margin: u32,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            regions: default_regions(),
            mmc: true,
            engine_config: default_engine_config(),
            confidence_threshold: default_threshold(),
            plate_pattern: default_pattern(),
            crop_margin: default_margin(),
        }
    }
}

/// Local folders
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(rename = "WEB_IMAGES_FOLDER", default = "default_web_images")]
    pub web_images_folder: String,

    #[serde(rename = "CROPPED_IMAGES_FOLDER", default = "default_cropped_images")]
    pub cropped_images_folder: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            web_images_folder: default_web_images(),
            cropped_images_folder: default_cropped_images(),
        }
    }
}

/// Site-specific element selection
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Anchors leading to detail pages on a listing page
    #[serde(rename = "LISTING_SELECTOR", default = "default_listing_selector")]
    pub listing_selector: String,

    /// Photo elements on a detail page
    #[serde(rename = "PHOTO_SELECTOR", default = "default_photo_selector")]
    pub photo_selector: String,

    /// Image sources ending with this are stock "no photo" images
    #[serde(rename = "PLACEHOLDER_SUFFIX", default = "default_placeholder_suffix")]
    pub placeholder_suffix: String,

    #[serde(rename = "WAIT_TIMEOUT_SECS", default = "default_wait_timeout")]
    pub wait_timeout_secs: u64,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            listing_selector: default_listing_selector(),
            photo_selector: default_photo_selector(),
            placeholder_suffix: default_placeholder_suffix(),
            wait_timeout_secs: default_wait_timeout(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_one() -> u32 {
    1
}

fn default_regions() -> Vec<String> {
    vec!["fr".to_string()]
}

fn default_engine_config() -> String {
    DEFAULT_ENGINE_CONFIG.to_string()
}

fn default_threshold() -> f64 {
    0.5
}

fn default_pattern() -> String {
    DEFAULT_PLATE_PATTERN.to_string()
}

fn default_margin() -> u32 {
    10
}

fn default_web_images() -> String {
    "web_images".to_string()
}

fn default_cropped_images() -> String {
    "cropped_images".to_string()
}

fn default_listing_selector() -> String {
    "div#dync > a".to_string()
}

fn default_photo_selector() -> String {
    "#photodiv > img".to_string()
}

fn default_placeholder_suffix() -> String {
    "p1.jpg".to_string()
}

fn default_wait_timeout() -> u64 {
    20
}
