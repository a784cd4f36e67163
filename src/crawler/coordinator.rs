//! Crawler coordinator - pagination and the per-page worker pool
//!
//! Pages are visited strictly in order. For each page the coordinator:
//! - Opens a listing session, navigates and collects car links
//! - Numbers the cars from the run-wide counter
//! - Runs them through a pool of at most `MAX_WORKERS` concurrent tasks
//! - Waits for the pool to drain before moving to the next page

use crate::browser::BrowserLauncher;
use crate::config::RunConfig;
use crate::crawler::build_http_client;
use crate::crawler::car::{process_car, CarContext, CarTask};
use crate::crawler::listing::list_car_links;
use crate::images::{PlateFilter, RetryPolicy};
use crate::output::{Counter, RunStats, RunSummary};
use crate::recognition::{
    ApiAvailability, RateLimiter, RecognitionClient, RecognitionSettings, DEFAULT_MIN_INTERVAL,
};
use crate::{ConfigError, ScoutError};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use url::Url;

/// Tunables that are fixed in production but shortened by tests
#[derive(Debug, Clone, Copy)]
pub struct CoordinatorOptions {
    pub retry: RetryPolicy,

    /// Minimum interval between two recognition calls
    pub api_min_interval: Duration,
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            api_min_interval: DEFAULT_MIN_INTERVAL,
        }
    }
}

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Arc<RunConfig>,
    context: Arc<CarContext>,
    next_car_index: u32,
}

impl Coordinator {
    /// Creates a coordinator with production timings
    ///
    /// # Arguments
    ///
    /// * `config` - Validated run configuration
    /// * `launcher` - Browser engine used for listing and car sessions
    pub fn new(config: RunConfig, launcher: Arc<dyn BrowserLauncher>) -> Result<Self, ScoutError> {
        Self::with_options(config, launcher, CoordinatorOptions::default())
    }

    /// Creates a coordinator with explicit retry and rate-limit timings
    pub fn with_options(
        config: RunConfig,
        launcher: Arc<dyn BrowserLauncher>,
        options: CoordinatorOptions,
    ) -> Result<Self, ScoutError> {
        let http = build_http_client()?;
        let base_url = config.base_url()?;
        let filter = PlateFilter::new(
            &config.recognition.plate_pattern,
            config.recognition.confidence_threshold,
        )
        .map_err(|e| ConfigError::InvalidPattern(e.to_string()))?;

        let availability = ApiAvailability::for_key(config.usable_api_key());
        let recognizer = RecognitionClient::new(
            http.clone(),
            RecognitionSettings::from_config(&config),
            availability,
            Arc::new(RateLimiter::new(options.api_min_interval)),
        );

        let context = CarContext {
            launcher,
            http,
            recognizer: Arc::new(recognizer),
            filter: Arc::new(filter),
            site: config.site.clone(),
            base_url,
            web_images: PathBuf::from(&config.output.web_images_folder),
            cropped_images: PathBuf::from(&config.output.cropped_images_folder),
            crop_margin: config.recognition.crop_margin,
            retry: options.retry,
            stats: Arc::new(RunStats::new()),
        };

        Ok(Self {
            next_car_index: config.settings.start_car_number,
            config: Arc::new(config),
            context: Arc::new(context),
        })
    }

    /// Car number the next dispatched car will receive
    pub fn next_car_index(&self) -> u32 {
        self.next_car_index
    }

    /// Runs the whole page range
    ///
    /// A page whose listing cannot be loaded is logged and skipped; nothing
    /// below the page level stops the run.
    pub async fn run(&mut self) -> Result<RunSummary, ScoutError> {
        let pages = self.config.page_range();
        tracing::info!(
            "Starting run: pages {} to {}, {} worker(s), first car number {}",
            pages.start(),
            pages.end(),
            self.config.settings.max_workers,
            self.next_car_index
        );
        if self.context.recognizer.is_disabled() {
            tracing::info!("Plate recognition disabled, photos will only be downloaded");
        }

        for page in pages {
            if let Err(e) = self.process_page(page).await {
                self.context.stats.incr(Counter::PagesFailed);
                tracing::error!("Skipping page {}: {}", page, e);
            }
        }

        let summary = self.context.stats.snapshot(
            self.context.recognizer.calls_made(),
            self.context.recognizer.is_disabled(),
        );
        tracing::info!(
            "Run completed: {} car(s) processed, {} failed, {} crop(s) saved in {}s",
            summary.cars_processed,
            summary.cars_failed,
            summary.crops_saved,
            summary.duration_seconds()
        );

        Ok(summary)
    }

    /// Lists, numbers and processes the cars of one page
    async fn process_page(&mut self, page: u32) -> Result<(), ScoutError> {
        let listing_url = self.config.listing_url(page)?;
        tracing::info!("Page {}: loading {}", page, listing_url);

        let links = self.fetch_car_links(&listing_url).await?;
        self.context.stats.incr(Counter::PagesVisited);

        let skip = if page == self.config.settings.start_page {
            self.config.settings.start_car_number.saturating_sub(1) as usize
        } else {
            0
        };
        if skip > 0 {
            tracing::info!("Page {}: skipping the first {} car(s)", page, skip);
        }

        let tasks = assign_car_tasks(page, links, skip, &mut self.next_car_index);
        tracing::info!("Page {}: {} car(s) to process", page, tasks.len());

        self.run_car_pool(tasks).await;
        tracing::info!("Page {}: done", page);
        Ok(())
    }

    /// Collects the car links of one listing page, always closing the session
    async fn fetch_car_links(&self, listing_url: &Url) -> Result<Vec<Url>, ScoutError> {
        let mut session = self.context.launcher.open().await?;

        let links = match session.goto(listing_url).await {
            Ok(()) => {
                list_car_links(session.as_mut(), &self.config.site, &self.context.base_url).await
            }
            Err(e) => Err(e),
        };

        if let Err(e) = session.close().await {
            tracing::warn!("Failed to close listing session: {}", e);
        }

        links
    }

    /// Runs the cars of one page with bounded concurrency and waits for all
    async fn run_car_pool(&self, tasks: Vec<CarTask>) {
        let permits = Arc::new(Semaphore::new(self.config.settings.max_workers));
        let mut workers = JoinSet::new();

        for task in tasks {
            let permits = permits.clone();
            let context = self.context.clone();
            workers.spawn(async move {
                let Ok(_permit) = permits.acquire_owned().await else {
                    return;
                };
                process_car(&task, &context).await;
            });
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                self.context.stats.incr(Counter::CarsFailed);
                tracing::error!("{}", ScoutError::Join(e));
            }
        }
    }
}

/// Turns one page's links into numbered tasks
///
/// Drops the first `skip` links, then numbers the rest from `next_index`,
/// which is advanced past the last number handed out.
pub fn assign_car_tasks(
    page_number: u32,
    links: Vec<Url>,
    skip: usize,
    next_index: &mut u32,
) -> Vec<CarTask> {
    links
        .into_iter()
        .skip(skip)
        .map(|detail_page_url| {
            let task = CarTask {
                page_number,
                car_index: *next_index,
                detail_page_url,
            };
            *next_index += 1;
            task
        })
        .collect()
}

/// Runs a complete crawl with production timings
///
/// # Example
///
/// ```no_run
/// use plate_scout::browser::StaticHtmlLauncher;
/// use plate_scout::config::load_config;
/// use plate_scout::crawler::{build_http_client, crawl};
/// use std::path::Path;
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("config.toml"))?;
/// let launcher = Arc::new(StaticHtmlLauncher::new(build_http_client()?));
/// let summary = crawl(config, launcher).await?;
/// println!("{} crops saved", summary.crops_saved);
/// # Ok(())
/// # }
/// ```
pub async fn crawl(
    config: RunConfig,
    launcher: Arc<dyn BrowserLauncher>,
) -> Result<RunSummary, ScoutError> {
    let mut coordinator = Coordinator::new(config, launcher)?;
    coordinator.run().await
}
