//! Headless Chrome engine
//!
//! Every session launches its own browser process with its own profile
//! directory, so concurrent workers never share cookies, tabs or navigation
//! state.

use crate::browser::{BrowserLauncher, BrowserSession, ElementInfo};
use crate::ScoutError;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use url::Url;

/// Interval between selector polls
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Upper bound on a single DevTools request
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Distinguishes profile directories of sessions opened by this process
static SESSION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Launches one Chrome process per session
#[derive(Debug, Clone)]
pub struct ChromeLauncher {
    headless: bool,
    request_timeout: Duration,
}

impl ChromeLauncher {
    pub fn new(headless: bool) -> Self {
        Self {
            headless,
            request_timeout: REQUEST_TIMEOUT,
        }
    }

    fn build_config(&self, user_data_dir: &Path) -> Result<BrowserConfig, ScoutError> {
        let mut builder = BrowserConfig::builder()
            .user_data_dir(user_data_dir)
            .no_sandbox()
            .window_size(1920, 1080)
            .request_timeout(self.request_timeout)
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu")
            .arg("--disable-extensions")
            .arg("--disable-infobars")
            .arg("--proxy-server=direct://")
            .arg("--proxy-bypass-list=*");

        if let Ok(path) = std::env::var("CHROME_PATH") {
            builder = builder.chrome_executable(path);
        }

        if !self.headless {
            builder = builder.with_head();
        }

        builder
            .build()
            .map_err(|e| ScoutError::Browser(format!("Invalid browser config: {}", e)))
    }
}

impl Default for ChromeLauncher {
    fn default() -> Self {
        Self::new(true)
    }
}

#[async_trait]
impl BrowserLauncher for ChromeLauncher {
    async fn open(&self) -> Result<Box<dyn BrowserSession>, ScoutError> {
        let user_data_dir = std::env::temp_dir().join(format!(
            "plate-scout-{}-{}",
            std::process::id(),
            SESSION_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));

        let config = self.build_config(&user_data_dir)?;
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| ScoutError::Browser(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                tracing::debug!("Browser event: {:?}", event);
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                handler_task.abort();
                return Err(ScoutError::Browser(e.to_string()));
            }
        };

        tracing::debug!("Opened browser session in {}", user_data_dir.display());

        Ok(Box::new(ChromeSession {
            browser: Some(browser),
            page,
            handler_task,
            user_data_dir,
        }))
    }
}

/// A live Chrome process with a single tab
struct ChromeSession {
    browser: Option<Browser>,
    page: Page,
    handler_task: JoinHandle<()>,
    user_data_dir: PathBuf,
}

/// Element snapshot as serialized by [`snapshot_script`]
#[derive(Debug, Deserialize)]
struct RawElement {
    attributes: HashMap<String, String>,
    displayed: bool,
}

/// Builds a script returning a JSON array describing every match of `selector`
fn snapshot_script(selector: &str) -> String {
    // serde_json quoting yields a valid JS string literal
    let quoted = serde_json::to_string(selector).unwrap_or_else(|_| "\"\"".to_string());
    format!(
        r#"JSON.stringify(Array.from(document.querySelectorAll({})).map(el => {{
            const attributes = {{}};
            for (const attr of el.attributes) {{ attributes[attr.name] = attr.value; }}
            const style = window.getComputedStyle(el);
            const displayed = style.display !== 'none'
                && style.visibility !== 'hidden'
                && el.getClientRects().length > 0;
            return {{ attributes, displayed }};
        }}))"#,
        quoted
    )
}

#[async_trait]
impl BrowserSession for ChromeSession {
    async fn goto(&mut self, url: &Url) -> Result<(), ScoutError> {
        self.page
            .goto(url.as_str())
            .await
            .map_err(|e| ScoutError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        Ok(())
    }

    async fn wait_for_elements(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> Result<Vec<ElementInfo>, ScoutError> {
        let script = snapshot_script(selector);
        let start = Instant::now();

        loop {
            match self.page.evaluate(script.as_str()).await {
                Ok(result) => {
                    let json = result.into_value::<String>().unwrap_or_default();
                    let raw: Vec<RawElement> = serde_json::from_str(&json).unwrap_or_default();
                    if !raw.is_empty() {
                        return Ok(raw
                            .into_iter()
                            .map(|el| ElementInfo {
                                attributes: el.attributes,
                                displayed: el.displayed,
                            })
                            .collect());
                    }
                }
                // The document may be mid-navigation; keep polling
                Err(e) => tracing::trace!("Selector poll for '{}' failed: {}", selector, e),
            }

            if start.elapsed() >= timeout {
                return Err(ScoutError::NavigationTimeout {
                    selector: selector.to_string(),
                    timeout,
                });
            }

            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn close(&mut self) -> Result<(), ScoutError> {
        let Some(mut browser) = self.browser.take() else {
            return Ok(());
        };

        let closed = browser.close().await;
        let _ = browser.wait().await;
        self.handler_task.abort();

        if let Err(e) = std::fs::remove_dir_all(&self.user_data_dir) {
            tracing::debug!(
                "Could not remove profile dir {}: {}",
                self.user_data_dir.display(),
                e
            );
        }

        closed
            .map(|_| ())
            .map_err(|e| ScoutError::Browser(format!("Failed to close browser: {}", e)))
    }
}
