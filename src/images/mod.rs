//! Image store: photo downloads and plate crops
//!
//! Downloaded photos are named `web1_{page}_{car}_{image}.{ext}`; crops add a
//! `_cropped` (or `_cropped_{n}`) qualifier before the extension.

pub mod crop;
pub mod download;

pub use crop::{clamp_box, crop_plates, CropBox, PlateFilter};
pub use download::{download_image, RetryPolicy};

use image::ImageFormat;
use std::path::PathBuf;
use url::Url;

/// Extension used when the URL path does not carry a usable one
pub const FALLBACK_EXTENSION: &str = "jpg";

/// A photo downloaded for one car
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRef {
    pub source_url: Url,
    pub local_path: PathBuf,
    pub page_number: u32,
    pub car_index: u32,
    /// 1-based, in discovery order
    pub image_index: u32,
}

impl ImageRef {
    /// Extension of the local file, lowercased
    pub fn extension(&self) -> String {
        self.local_path
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_else(|| FALLBACK_EXTENSION.to_string())
    }

    /// File name of a crop taken from this image
    ///
    /// `qualifier` is the 1-based plate number, present only when several
    /// plates were accepted for the image.
    pub fn cropped_filename(&self, qualifier: Option<usize>, extension: &str) -> String {
        let stem = format!(
            "web1_{}_{}_{}_cropped",
            self.page_number, self.car_index, self.image_index
        );
        match qualifier {
            Some(n) => format!("{}_{}.{}", stem, n, extension),
            None => format!("{}.{}", stem, extension),
        }
    }
}

/// Local file name of a downloaded photo
pub fn image_filename(page: u32, car: u32, image: u32, extension: &str) -> String {
    format!("web1_{}_{}_{}.{}", page, car, image, extension)
}

/// Derives a file extension from the last path segment of `url`
///
/// Query strings and fragments are ignored. Anything that is not a known
/// image extension (`ashx`, `php`, none at all) falls back to `jpg`.
pub fn extension_from_url(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .and_then(|segment| segment.rsplit_once('.'))
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty() && ext.len() <= 5)
        .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| ext.to_ascii_lowercase())
        .filter(|ext| ImageFormat::from_extension(ext).is_some())
        .unwrap_or_else(|| FALLBACK_EXTENSION.to_string())
}
