//! Link and photo extraction from browser sessions
//!
//! Both extractors wait for their selector, read one attribute per matched
//! element and resolve it against the site's base URL. A page that never
//! shows the expected elements yields an empty list, not an error.

use crate::browser::{BrowserSession, ElementInfo};
use crate::config::SiteConfig;
use crate::ScoutError;
use std::time::Duration;
use url::Url;

/// Lists the detail-page links of the listing page currently loaded
///
/// # Arguments
///
/// * `session` - Session already navigated to a listing page
/// * `site` - Selectors and wait timeout
/// * `base_url` - Base for relative `href` values
///
/// # Returns
///
/// Absolute http(s) URLs in document order.
pub async fn list_car_links(
    session: &mut dyn BrowserSession,
    site: &SiteConfig,
    base_url: &Url,
) -> Result<Vec<Url>, ScoutError> {
    let timeout = Duration::from_secs(site.wait_timeout_secs);
    let Some(elements) = wait_or_empty(session, &site.listing_selector, timeout).await? else {
        tracing::warn!("No car links found (selector '{}')", site.listing_selector);
        return Ok(Vec::new());
    };

    Ok(elements
        .iter()
        .filter_map(|element| element.attr("href"))
        .filter_map(|href| resolve_link(href, base_url))
        .collect())
}

/// Lists the photo URLs of the car detail page currently loaded
///
/// Hidden elements, empty sources and placeholder images are skipped.
pub async fn list_image_urls(
    session: &mut dyn BrowserSession,
    site: &SiteConfig,
    base_url: &Url,
) -> Result<Vec<Url>, ScoutError> {
    let timeout = Duration::from_secs(site.wait_timeout_secs);
    let Some(elements) = wait_or_empty(session, &site.photo_selector, timeout).await? else {
        tracing::warn!("No photos found (selector '{}')", site.photo_selector);
        return Ok(Vec::new());
    };

    Ok(elements
        .iter()
        .filter(|element| element.displayed)
        .filter_map(|element| element.attr("src"))
        .filter(|src| !is_placeholder(src, &site.placeholder_suffix))
        .filter_map(|src| resolve_link(src, base_url))
        .collect())
}

/// Maps a selector timeout to `None`; other session errors propagate
async fn wait_or_empty(
    session: &mut dyn BrowserSession,
    selector: &str,
    timeout: Duration,
) -> Result<Option<Vec<ElementInfo>>, ScoutError> {
    match session.wait_for_elements(selector, timeout).await {
        Ok(elements) => Ok(Some(elements)),
        Err(ScoutError::NavigationTimeout { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

fn is_placeholder(src: &str, suffix: &str) -> bool {
    !suffix.is_empty() && src.trim().ends_with(suffix)
}

/// Resolves a possibly relative link to an absolute http(s) URL
///
/// Returns None for empty values, fragment-only links, special schemes
/// (`javascript:`, `mailto:`, `tel:`, `data:`) and anything unparseable.
pub(crate) fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute) if absolute.scheme() == "http" || absolute.scheme() == "https" => {
            Some(absolute)
        }
        Ok(absolute) => {
            tracing::debug!("Skipping non-http link {}", absolute);
            None
        }
        Err(e) => {
            tracing::debug!("Skipping unparseable link '{}': {}", href, e);
            None
        }
    }
}
