//! Bounded-retry photo downloads

use crate::crawler::classify_transport_error;
use crate::ScoutError;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Fixed-count retry schedule for downloads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub attempts: u32,

    /// Pause between two attempts
    pub pause: Duration,

    /// Timeout of each individual request
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            pause: Duration::from_secs(2),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Downloads `url` into `folder/filename`
///
/// The folder is created when missing and an existing file is overwritten.
/// Nothing is written until the whole body has arrived.
///
/// # Returns
///
/// The local path, or `None` once every attempt has failed.
pub async fn download_image(
    client: &Client,
    url: &Url,
    folder: &Path,
    filename: &str,
    policy: &RetryPolicy,
) -> Option<PathBuf> {
    if let Err(e) = tokio::fs::create_dir_all(folder).await {
        tracing::error!("Cannot create folder {}: {}", folder.display(), e);
        return None;
    }

    let destination = folder.join(filename);
    let attempts = policy.attempts.max(1);

    for attempt in 1..=attempts {
        match fetch_bytes(client, url, policy.timeout).await {
            Ok(bytes) => match write_file(&destination, &bytes).await {
                Ok(()) => {
                    tracing::debug!("Downloaded {} to {}", url, destination.display());
                    return Some(destination);
                }
                Err(e) => {
                    tracing::error!("Cannot write {}: {}", destination.display(), e);
                    return None;
                }
            },
            Err(message) => {
                tracing::warn!(
                    "Download attempt {}/{} for {} failed: {}",
                    attempt,
                    attempts,
                    url,
                    message
                );
            }
        }

        if attempt < attempts {
            tokio::time::sleep(policy.pause).await;
        }
    }

    let error = ScoutError::Download {
        url: url.to_string(),
        attempts,
    };
    tracing::error!("{}", error);
    None
}

async fn fetch_bytes(client: &Client, url: &Url, timeout: Duration) -> Result<Vec<u8>, String> {
    let response = client
        .get(url.clone())
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| classify_transport_error(&e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(format!("HTTP {}", status.as_u16()));
    }

    response
        .bytes()
        .await
        .map(|bytes| bytes.to_vec())
        .map_err(|e| classify_transport_error(&e))
}

async fn write_file(destination: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Err(e) = tokio::fs::write(destination, bytes).await {
        let _ = tokio::fs::remove_file(destination).await;
        return Err(e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            attempts: 3,
            pause: Duration::from_millis(10),
            timeout: Duration::from_secs(5),
        }
    }

    fn url(server: &MockServer, p: &str) -> Url {
        Url::parse(&format!("{}{}", server.uri(), p)).unwrap()
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.attempts, 3);
        assert_eq!(policy.pause, Duration::from_secs(2));
        assert_eq!(policy.timeout, Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_download_creates_folder_and_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/photos/1.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jpegdata".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let folder = dir.path().join("web_images");
        let client = Client::new();

        let saved = download_image(
            &client,
            &url(&server, "/photos/1.jpg"),
            &folder,
            "web1_1_1_1.jpg",
            &fast_policy(),
        )
        .await
        .unwrap();

        assert_eq!(saved, folder.join("web1_1_1_1.jpg"));
        assert_eq!(std::fs::read(&saved).unwrap(), b"jpegdata");
    }

    #[tokio::test]
    async fn test_download_overwrites_existing_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"new".to_vec()))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.jpg"), b"old contents").unwrap();

        let saved = download_image(
            &Client::new(),
            &url(&server, "/a.jpg"),
            dir.path(),
            "a.jpg",
            &fast_policy(),
        )
        .await
        .unwrap();

        assert_eq!(std::fs::read(saved).unwrap(), b"new");
    }

    #[tokio::test]
    async fn test_always_failing_download_leaves_no_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(3)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let result = download_image(
            &Client::new(),
            &url(&server, "/broken.jpg"),
            dir.path(),
            "broken.jpg",
            &fast_policy(),
        )
        .await;

        assert!(result.is_none());
        assert!(!dir.path().join("broken.jpg").exists());
    }

    #[tokio::test]
    async fn test_download_recovers_after_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ok".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let result = download_image(
            &Client::new(),
            &url(&server, "/flaky.jpg"),
            dir.path(),
            "flaky.jpg",
            &fast_policy(),
        )
        .await;

        assert!(result.is_some());
    }

    #[tokio::test]
    async fn test_unreachable_host_returns_none() {
        let dir = TempDir::new().unwrap();
        let policy = RetryPolicy {
            attempts: 2,
            pause: Duration::from_millis(1),
            timeout: Duration::from_secs(1),
        };
        let result = download_image(
            &Client::new(),
            &Url::parse("http://127.0.0.1:9/x.jpg").unwrap(),
            dir.path(),
            "x.jpg",
            &policy,
        )
        .await;

        assert!(result.is_none());
        assert!(!dir.path().join("x.jpg").exists());
    }
}
