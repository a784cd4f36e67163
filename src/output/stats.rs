//! Run statistics
//!
//! Counters are updated by every worker without locking and read once at the
//! end of a run as a [`RunSummary`] snapshot.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters shared by all workers
#[derive(Debug)]
pub struct RunStats {
    started_at: DateTime<Utc>,
    pages_visited: AtomicU64,
    pages_failed: AtomicU64,
    cars_processed: AtomicU64,
    cars_failed: AtomicU64,
    images_found: AtomicU64,
    downloads_succeeded: AtomicU64,
    downloads_failed: AtomicU64,
    plates_detected: AtomicU64,
    crops_saved: AtomicU64,
}

/// Counter being incremented
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    PagesVisited,
    PagesFailed,
    CarsProcessed,
    CarsFailed,
    ImagesFound,
    DownloadsSucceeded,
    DownloadsFailed,
    PlatesDetected,
    CropsSaved,
}

impl RunStats {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            pages_visited: AtomicU64::new(0),
            pages_failed: AtomicU64::new(0),
            cars_processed: AtomicU64::new(0),
            cars_failed: AtomicU64::new(0),
            images_found: AtomicU64::new(0),
            downloads_succeeded: AtomicU64::new(0),
            downloads_failed: AtomicU64::new(0),
            plates_detected: AtomicU64::new(0),
            crops_saved: AtomicU64::new(0),
        }
    }

    fn counter(&self, counter: Counter) -> &AtomicU64 {
        match counter {
            Counter::PagesVisited => &self.pages_visited,
            Counter::PagesFailed => &self.pages_failed,
            Counter::CarsProcessed => &self.cars_processed,
            Counter::CarsFailed => &self.cars_failed,
            Counter::ImagesFound => &self.images_found,
            Counter::DownloadsSucceeded => &self.downloads_succeeded,
            Counter::DownloadsFailed => &self.downloads_failed,
            Counter::PlatesDetected => &self.plates_detected,
            Counter::CropsSaved => &self.crops_saved,
        }
    }

    pub fn add(&self, counter: Counter, amount: u64) {
        self.counter(counter).fetch_add(amount, Ordering::Relaxed);
    }

    pub fn incr(&self, counter: Counter) {
        self.add(counter, 1);
    }

    pub fn get(&self, counter: Counter) -> u64 {
        self.counter(counter).load(Ordering::Relaxed)
    }

    /// Freezes the counters into a summary
    ///
    /// # Arguments
    ///
    /// * `recognition_calls` - Requests sent to the recognition API
    /// * `recognition_disabled` - Whether the API latch closed during the run
    pub fn snapshot(&self, recognition_calls: u64, recognition_disabled: bool) -> RunSummary {
        let finished_at = Utc::now();
        RunSummary {
            started_at: self.started_at,
            finished_at,
            pages_visited: self.get(Counter::PagesVisited),
            pages_failed: self.get(Counter::PagesFailed),
            cars_processed: self.get(Counter::CarsProcessed),
            cars_failed: self.get(Counter::CarsFailed),
            images_found: self.get(Counter::ImagesFound),
            downloads_succeeded: self.get(Counter::DownloadsSucceeded),
            downloads_failed: self.get(Counter::DownloadsFailed),
            recognition_calls,
            recognition_disabled,
            plates_detected: self.get(Counter::PlatesDetected),
            crops_saved: self.get(Counter::CropsSaved),
        }
    }
}

impl Default for RunStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Final statistics of a run
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub pages_visited: u64,
    pub pages_failed: u64,
    pub cars_processed: u64,
    pub cars_failed: u64,
    pub images_found: u64,
    pub downloads_succeeded: u64,
    pub downloads_failed: u64,
    pub recognition_calls: u64,
    pub recognition_disabled: bool,
    pub plates_detected: u64,
    pub crops_saved: u64,
}

impl RunSummary {
    pub fn duration_seconds(&self) -> i64 {
        (self.finished_at - self.started_at).num_seconds()
    }

    /// Percentage of photos downloaded successfully
    pub fn download_success_rate(&self) -> f64 {
        let attempted = self.downloads_succeeded + self.downloads_failed;
        if attempted == 0 {
            0.0
        } else {
            (self.downloads_succeeded as f64 / attempted as f64) * 100.0
        }
    }
}

/// Prints a run summary to stdout
pub fn print_summary(summary: &RunSummary) {
    println!("=== Run Summary ===\n");

    println!("Timing:");
    println!("  Started:  {}", summary.started_at.to_rfc3339());
    println!("  Finished: {}", summary.finished_at.to_rfc3339());
    println!("  Duration: {}s", summary.duration_seconds());
    println!();

    println!("Crawl:");
    println!(
        "  Pages visited: {} ({} failed)",
        summary.pages_visited, summary.pages_failed
    );
    println!(
        "  Cars processed: {} ({} failed)",
        summary.cars_processed, summary.cars_failed
    );
    println!();

    println!("Images:");
    println!("  Photos found: {}", summary.images_found);
    println!(
        "  Downloaded: {} ({} failed, {:.1}% success)",
        summary.downloads_succeeded,
        summary.downloads_failed,
        summary.download_success_rate()
    );
    println!();

    println!("Recognition:");
    println!("  API calls: {}", summary.recognition_calls);
    if summary.recognition_disabled {
        println!("  API disabled during run");
    }
    println!("  Plates detected: {}", summary.plates_detected);
    println!("  Crops saved: {}", summary.crops_saved);
}
