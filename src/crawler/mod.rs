//! Crawler module: listing pages, car pages and their coordination
//!
//! This module contains the core crawling logic, including:
//! - HTTP client construction and HTML page fetching
//! - Car link and photo extraction from browser sessions
//! - The per-car download/recognize/crop pipeline
//! - Pagination with a bounded worker pool per page

mod car;
mod coordinator;
mod fetcher;
mod listing;

pub use car::{process_car, CarContext, CarTask};
pub use coordinator::{assign_car_tasks, crawl, Coordinator, CoordinatorOptions};
pub use fetcher::{build_http_client, fetch_page, USER_AGENT};
pub use listing::{list_car_links, list_image_urls};

pub(crate) use fetcher::classify_transport_error;
