//! Browser automation boundary
//!
//! The crawler only needs a small capability from a browser: open an
//! isolated session, navigate to a URL, wait for elements matching a CSS
//! selector, and read their attributes. This module defines that capability
//! as traits and ships two engines:
//! - [`ChromeLauncher`]: headless Chrome driven over the DevTools protocol
//! - [`StaticHtmlLauncher`]: plain HTTP fetch + HTML parsing, for sites that
//!   render listings server-side (and for tests)

mod chrome;
mod static_html;

pub use chrome::ChromeLauncher;
pub use static_html::StaticHtmlLauncher;

use crate::ScoutError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

/// Snapshot of a DOM element taken by a session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementInfo {
    /// Raw attribute values as written in the markup
    pub attributes: HashMap<String, String>,

    /// Whether the element is rendered (not hidden by style or attribute)
    pub displayed: bool,
}

impl ElementInfo {
    /// Returns an attribute value, if present
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// One isolated browser session
///
/// A session is owned by exactly one unit of work. Callers must call
/// [`BrowserSession::close`] on every exit path; implementations make it
/// idempotent.
#[async_trait]
pub trait BrowserSession: Send {
    /// Navigates to a URL and waits for the document to load
    async fn goto(&mut self, url: &Url) -> Result<(), ScoutError>;

    /// Waits until at least one element matches `selector`
    ///
    /// Returns `ScoutError::NavigationTimeout` if nothing matched in time.
    async fn wait_for_elements(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> Result<Vec<ElementInfo>, ScoutError>;

    /// Releases the session's resources
    async fn close(&mut self) -> Result<(), ScoutError>;
}

/// Factory for browser sessions, shared by all workers
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    /// Opens a fresh session that shares no state with other sessions
    async fn open(&self) -> Result<Box<dyn BrowserSession>, ScoutError>;
}
