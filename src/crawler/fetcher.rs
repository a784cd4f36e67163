//! HTTP fetcher implementation
//!
//! This module builds the shared HTTP client and fetches HTML documents for
//! the static browser engine. Image downloads live in `images::download`.

use crate::ScoutError;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use url::Url;

/// User agent sent with every request
pub const USER_AGENT: &str = concat!(
    "Mozilla/5.0 (X11; Linux x86_64) plate-scout/",
    env!("CARGO_PKG_VERSION")
);

/// Builds the HTTP client shared by downloads, page fetches and API calls
///
/// Per-request timeouts (downloads use 10 seconds) override the client-wide
/// default.
///
/// # Example
///
/// ```no_run
/// use plate_scout::crawler::build_http_client;
///
/// let client = build_http_client().unwrap();
/// ```
pub fn build_http_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches an HTML document
///
/// | Condition | Result |
/// |-----------|--------|
/// | 2xx | body text |
/// | 404 | `Navigation` error "page not found" |
/// | other status | `Navigation` error with the status |
/// | transport failure | `Navigation` error with the cause |
pub async fn fetch_page(client: &Client, url: &Url) -> Result<String, ScoutError> {
    let navigation_error = |message: String| ScoutError::Navigation {
        url: url.to_string(),
        message,
    };

    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| navigation_error(classify_transport_error(&e)))?;

    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(navigation_error("page not found (HTTP 404)".to_string()));
    }
    if !status.is_success() {
        return Err(navigation_error(format!("HTTP {}", status.as_u16())));
    }

    response
        .text()
        .await
        .map_err(|e| navigation_error(e.to_string()))
}

/// Short description of a transport-level failure
pub(crate) fn classify_transport_error(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        "request timeout".to_string()
    } else if error.is_connect() {
        "connection refused".to_string()
    } else {
        error.to_string()
    }
}
