//! Static HTML engine
//!
//! Fetches documents over plain HTTP and answers selector queries from the
//! parsed markup. No script runs, so "waiting" for an element is a single
//! lookup: a selector that does not match now never will.

use crate::browser::{BrowserLauncher, BrowserSession, ElementInfo};
use crate::crawler::fetch_page;
use crate::ScoutError;
use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use std::time::Duration;
use url::Url;

/// Opens HTTP-backed sessions sharing one connection pool
#[derive(Debug, Clone)]
pub struct StaticHtmlLauncher {
    client: Client,
}

impl StaticHtmlLauncher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BrowserLauncher for StaticHtmlLauncher {
    async fn open(&self) -> Result<Box<dyn BrowserSession>, ScoutError> {
        Ok(Box::new(StaticHtmlSession {
            client: self.client.clone(),
            document: None,
        }))
    }
}

/// Holds the body of the last navigated document
struct StaticHtmlSession {
    client: Client,
    document: Option<String>,
}

#[async_trait]
impl BrowserSession for StaticHtmlSession {
    async fn goto(&mut self, url: &Url) -> Result<(), ScoutError> {
        self.document = None;
        let body = fetch_page(&self.client, url).await?;
        self.document = Some(body);
        Ok(())
    }

    async fn wait_for_elements(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> Result<Vec<ElementInfo>, ScoutError> {
        let document = self.document.as_deref().ok_or_else(|| {
            ScoutError::Browser("No document loaded; call goto first".to_string())
        })?;

        let elements = select_elements(document, selector)?;
        if elements.is_empty() {
            return Err(ScoutError::NavigationTimeout {
                selector: selector.to_string(),
                timeout,
            });
        }
        Ok(elements)
    }

    async fn close(&mut self) -> Result<(), ScoutError> {
        self.document = None;
        Ok(())
    }
}

/// Snapshots every element of `html` matching `selector`
fn select_elements(html: &str, selector: &str) -> Result<Vec<ElementInfo>, ScoutError> {
    let selector = Selector::parse(selector)
        .map_err(|e| ScoutError::Browser(format!("Invalid selector '{}': {:?}", selector, e)))?;
    let document = Html::parse_document(html);

    Ok(document
        .select(&selector)
        .map(|element| {
            let attributes = element
                .value()
                .attrs()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect();
            let displayed =
                is_displayed(element.value().attr("hidden"), element.value().attr("style"));
            ElementInfo {
                attributes,
                displayed,
            }
        })
        .collect())
}

/// Approximates visibility from markup alone
fn is_displayed(hidden: Option<&str>, style: Option<&str>) -> bool {
    if hidden.is_some() {
        return false;
    }

    let style = style
        .unwrap_or("")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();

    !style.contains("display:none") && !style.contains("visibility:hidden")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_elements_reads_attributes() {
        let html = r#"<html><body><div id="dync">
            <a href="/car/1">One</a>
            <a href="/car/2" class="promo">Two</a>
        </div></body></html>"#;

        let elements = select_elements(html, "div#dync > a").unwrap();
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0].attr("href"), Some("/car/1"));
        assert_eq!(elements[1].attr("class"), Some("promo"));
        assert!(elements.iter().all(|e| e.displayed));
    }

    #[test]
    fn test_select_elements_direct_children_only() {
        let html = r#"<div id="photodiv"><img src="a.jpg"><span><img src="b.jpg"></span></div>"#;
        let elements = select_elements(html, "#photodiv > img").unwrap();
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].attr("src"), Some("a.jpg"));
    }

    #[test]
    fn test_hidden_elements_are_not_displayed() {
        let html = r#"<div id="photodiv">
            <img src="a.jpg">
            <img src="b.jpg" style="display: none">
            <img src="c.jpg" hidden>
            <img src="d.jpg" style="VISIBILITY:hidden">
        </div>"#;

        let elements = select_elements(html, "#photodiv > img").unwrap();
        let displayed: Vec<_> = elements.iter().map(|e| e.displayed).collect();
        assert_eq!(displayed, vec![true, false, false, false]);
    }

    #[test]
    fn test_invalid_selector() {
        let result = select_elements("<html></html>", "div[[");
        assert!(matches!(result, Err(ScoutError::Browser(_))));
    }

    #[tokio::test]
    async fn test_wait_without_document() {
        let launcher = StaticHtmlLauncher::new(Client::new());
        let mut session = launcher.open().await.unwrap();
        let result = session
            .wait_for_elements("a", Duration::from_secs(1))
            .await;
        assert!(matches!(result, Err(ScoutError::Browser(_))));
    }
}
