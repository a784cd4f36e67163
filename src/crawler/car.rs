//! Per-car pipeline: detail page -> photos -> plates -> crops

use crate::browser::{BrowserLauncher, BrowserSession};
use crate::config::SiteConfig;
use crate::crawler::listing::list_image_urls;
use crate::images::{
    crop_plates, download_image, extension_from_url, image_filename, ImageRef, PlateFilter,
    RetryPolicy,
};
use crate::output::{Counter, RunStats};
use crate::recognition::{PlateDetection, RecognitionClient};
use crate::ScoutError;
use reqwest::Client;
use std::path::PathBuf;
use std::sync::Arc;
use url::Url;

/// One car to process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CarTask {
    pub page_number: u32,

    /// Run-wide car number
    pub car_index: u32,

    pub detail_page_url: Url,
}

/// Everything a car worker needs, shared by all workers of a run
pub struct CarContext {
    pub launcher: Arc<dyn BrowserLauncher>,
    pub http: Client,
    pub recognizer: Arc<RecognitionClient>,
    pub filter: Arc<PlateFilter>,
    pub site: SiteConfig,
    pub base_url: Url,
    pub web_images: PathBuf,
    pub cropped_images: PathBuf,
    pub crop_margin: u32,
    pub retry: RetryPolicy,
    pub stats: Arc<RunStats>,
}

/// Processes one car end-to-end
///
/// Opens its own browser session, downloads every photo, and recognizes and
/// crops plates while the recognition API is available. Errors are logged
/// with the car and page numbers and counted; they never reach the caller.
pub async fn process_car(task: &CarTask, ctx: &CarContext) {
    tracing::info!(
        "Processing car {} on page {}: {}",
        task.car_index,
        task.page_number,
        task.detail_page_url
    );

    match visit_car(task, ctx).await {
        Ok(()) => ctx.stats.incr(Counter::CarsProcessed),
        Err(e) => {
            ctx.stats.incr(Counter::CarsFailed);
            tracing::error!(
                "Error processing car {} on page {}: {}",
                task.car_index,
                task.page_number,
                e
            );
        }
    }
}

/// Runs the car inside a fresh session and always closes it
async fn visit_car(task: &CarTask, ctx: &CarContext) -> Result<(), ScoutError> {
    let mut session = ctx.launcher.open().await?;
    let result = harvest_images(session.as_mut(), task, ctx).await;

    if let Err(e) = session.close().await {
        tracing::warn!("Failed to close session for car {}: {}", task.car_index, e);
    }

    result
}

async fn harvest_images(
    session: &mut dyn BrowserSession,
    task: &CarTask,
    ctx: &CarContext,
) -> Result<(), ScoutError> {
    session.goto(&task.detail_page_url).await?;
    let image_urls = list_image_urls(session, &ctx.site, &ctx.base_url).await?;

    tracing::info!(
        "Car {} on page {}: {} photo(s)",
        task.car_index,
        task.page_number,
        image_urls.len()
    );
    ctx.stats.add(Counter::ImagesFound, image_urls.len() as u64);

    for (position, source_url) in image_urls.into_iter().enumerate() {
        let image_index = position as u32 + 1;
        let filename = image_filename(
            task.page_number,
            task.car_index,
            image_index,
            &extension_from_url(&source_url),
        );

        let Some(local_path) =
            download_image(&ctx.http, &source_url, &ctx.web_images, &filename, &ctx.retry).await
        else {
            ctx.stats.incr(Counter::DownloadsFailed);
            continue;
        };
        ctx.stats.incr(Counter::DownloadsSucceeded);

        if ctx.recognizer.is_disabled() {
            continue;
        }

        let image = ImageRef {
            source_url,
            local_path,
            page_number: task.page_number,
            car_index: task.car_index,
            image_index,
        };

        let detections = ctx.recognizer.recognize(&image.local_path).await;
        if detections.is_empty() {
            continue;
        }
        ctx.stats.add(Counter::PlatesDetected, detections.len() as u64);

        let image_path = image.local_path.clone();
        match crop_in_background(image, detections, ctx).await {
            Ok(saved) => ctx.stats.add(Counter::CropsSaved, saved.len() as u64),
            Err(e) => tracing::error!(
                "Cropping failed for car {} on page {} ({}): {}",
                task.car_index,
                task.page_number,
                image_path.display(),
                e
            ),
        }
    }

    Ok(())
}

/// Runs the decode/crop/encode work on the blocking pool
async fn crop_in_background(
    image: ImageRef,
    detections: Vec<PlateDetection>,
    ctx: &CarContext,
) -> Result<Vec<PathBuf>, ScoutError> {
    let filter = ctx.filter.clone();
    let folder = ctx.cropped_images.clone();
    let margin = ctx.crop_margin;

    let saved = tokio::task::spawn_blocking(move || {
        crop_plates(&image, &detections, &folder, &filter, margin)
    })
    .await?;

    Ok(saved)
}
