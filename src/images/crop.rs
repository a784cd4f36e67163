//! Plate filtering and cropping

use crate::images::ImageRef;
use crate::recognition::{BoundingBox, PlateDetection};
use crate::ScoutError;
use image::io::Reader as ImageReader;
use image::{DynamicImage, GenericImageView, ImageError, ImageFormat};
use regex::Regex;
use std::path::{Path, PathBuf};

/// Decides which detections are worth cropping
#[derive(Debug, Clone)]
pub struct PlateFilter {
    pattern: Regex,
    threshold: f64,
}

impl PlateFilter {
    /// Builds a filter whose pattern must match the whole plate text
    pub fn new(pattern: &str, threshold: f64) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(&format!("^(?:{})$", pattern))?,
            threshold,
        })
    }

    pub fn accepts(&self, detection: &PlateDetection) -> bool {
        detection.confidence >= self.threshold && self.pattern.is_match(&detection.text)
    }
}

/// Pixel rectangle inside an image, `x1 < x2` and `y1 < y2`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropBox {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl CropBox {
    pub fn width(&self) -> u32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> u32 {
        self.y2 - self.y1
    }
}

/// Grows `bounding_box` by `margin` and clamps it to the image
///
/// Returns `None` when nothing of positive area is left.
pub fn clamp_box(bounding_box: &BoundingBox, width: u32, height: u32, margin: u32) -> Option<CropBox> {
    let (x1, y1, x2, y2) = margin_bounds(bounding_box, width, height, margin);
    if x2 <= x1 || y2 <= y1 {
        return None;
    }

    Some(CropBox {
        x1: saturate(x1),
        y1: saturate(y1),
        x2: saturate(x2),
        y2: saturate(y2),
    })
}

fn margin_bounds(
    bounding_box: &BoundingBox,
    width: u32,
    height: u32,
    margin: u32,
) -> (i64, i64, i64, i64) {
    let margin = i64::from(margin);
    (
        bounding_box.xmin.saturating_sub(margin).max(0),
        bounding_box.ymin.saturating_sub(margin).max(0),
        bounding_box.xmax.saturating_add(margin).min(i64::from(width)),
        bounding_box.ymax.saturating_add(margin).min(i64::from(height)),
    )
}

fn saturate(value: i64) -> u32 {
    value.clamp(0, i64::from(u32::MAX)) as u32
}

/// Crops every accepted plate of `image` into `output_folder`
///
/// Detections are filtered first; the `_n` qualifier is only added when more
/// than one detection survives. Failures are logged and yield fewer paths.
///
/// This does blocking file and pixel work; async callers should run it on
/// the blocking pool.
pub fn crop_plates(
    image: &ImageRef,
    detections: &[PlateDetection],
    output_folder: &Path,
    filter: &PlateFilter,
    margin: u32,
) -> Vec<PathBuf> {
    let accepted: Vec<&PlateDetection> = detections
        .iter()
        .filter(|detection| {
            let keep = filter.accepts(detection);
            if !keep {
                tracing::info!(
                    "Plate '{}' ({:.2}) rejected for {}",
                    detection.text,
                    detection.confidence,
                    image.local_path.display()
                );
            }
            keep
        })
        .collect();

    if accepted.is_empty() {
        return Vec::new();
    }

    let (source, format) = match decode(&image.local_path) {
        Ok(decoded) => decoded,
        Err(e) => {
            let error = ScoutError::Image {
                path: image.local_path.clone(),
                source: e,
            };
            tracing::error!("{}", error);
            return Vec::new();
        }
    };

    if let Err(e) = std::fs::create_dir_all(output_folder) {
        tracing::error!("Cannot create folder {}: {}", output_folder.display(), e);
        return Vec::new();
    }

    let output_format = output_format(format);
    let extension = output_extension(&image.extension(), output_format);
    let numbered = accepted.len() > 1;
    let mut saved = Vec::new();

    for (position, detection) in accepted.into_iter().enumerate() {
        let qualifier = numbered.then_some(position + 1);
        let destination = output_folder.join(image.cropped_filename(qualifier, &extension));

        match crop_one(&source, detection, &destination, margin, output_format) {
            Ok(()) => {
                tracing::info!("Saved plate '{}' to {}", detection.text, destination.display());
                saved.push(destination);
            }
            Err(e) => tracing::error!("{}", e),
        }
    }

    saved
}

/// Decodes a photo from its content; the file extension is not trusted
fn decode(path: &Path) -> Result<(DynamicImage, Option<ImageFormat>), ImageError> {
    let reader = ImageReader::open(path)?.with_guessed_format()?;
    let format = reader.format();
    Ok((reader.decode()?, format))
}

/// PNG sources stay PNG, everything else is written as JPEG
fn output_format(source: Option<ImageFormat>) -> ImageFormat {
    match source {
        Some(ImageFormat::Png) => ImageFormat::Png,
        _ => ImageFormat::Jpeg,
    }
}

/// Keeps the photo's own extension when it names `format`
fn output_extension(source_extension: &str, format: ImageFormat) -> String {
    if ImageFormat::from_extension(source_extension) == Some(format) {
        source_extension.to_string()
    } else if format == ImageFormat::Png {
        "png".to_string()
    } else {
        "jpg".to_string()
    }
}

fn crop_one(
    source: &DynamicImage,
    detection: &PlateDetection,
    destination: &Path,
    margin: u32,
    format: ImageFormat,
) -> Result<(), ScoutError> {
    let (width, height) = source.dimensions();
    let crop = clamp_box(&detection.bounding_box, width, height, margin).ok_or_else(|| {
        let (x1, y1, x2, y2) = margin_bounds(&detection.bounding_box, width, height, margin);
        ScoutError::CropGeometry {
            plate: detection.text.clone(),
            x1: saturate(x1),
            y1: saturate(y1),
            x2: saturate(x2),
            y2: saturate(y2),
        }
    })?;

    let region = source.crop_imm(crop.x1, crop.y1, crop.width(), crop.height());
    let region = match format {
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(region.to_rgb8()),
        _ => region,
    };

    region
        .save_with_format(destination, format)
        .map_err(|e| ScoutError::Image {
            path: destination.to_path_buf(),
            source: e,
        })
}
