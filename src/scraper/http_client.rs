use super::browser::BrowserSession;
use super::error::FetchError;
use crate::config::ScraperConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use tokio_retry::RetryIf;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{debug, warn};

/// Plain-HTTP session: each navigation is one GET of server-rendered HTML.
pub struct HttpSession {
    inner: Option<reqwest::Client>,
    config: ScraperConfig,
    current: Option<String>,
}

impl HttpSession {
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        let inner = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .gzip(true)
            // Accept cookies so session-based pages work
            .cookie_store(true)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            inner: Some(inner),
            config: config.clone(),
            current: None,
        })
    }

    async fn get_text(client: &reqwest::Client, url: &str) -> Result<String, FetchError> {
        let resp = client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        resp.text().await.map_err(|e| FetchError::Navigation {
            url: url.to_string(),
            message: format!("failed to read response body: {e}"),
        })
    }
}

#[async_trait]
impl BrowserSession for HttpSession {
    async fn navigate(&mut self, url: &str) -> Result<(), FetchError> {
        let client = self.inner.as_ref().ok_or(FetchError::Closed)?;
        self.current = None;

        let strategy = ExponentialBackoff::from_millis(2)
            .factor(self.config.backoff_delay_ms.max(1) / 4)
            .max_delay(self.config.backoff_delay())
            .map(jitter)
            .take(self.config.max_retries as usize);

        let mut attempt = 0u32;
        let html = RetryIf::start(
            strategy,
            || {
                attempt += 1;
                debug!("GET {} (attempt {})", url, attempt);
                Self::get_text(client, url)
            },
            |e: &FetchError| {
                let retry = e.is_transient();
                if retry {
                    warn!("Transient failure for {}: {}", url, e);
                }
                retry
            },
        )
        .await?;

        self.current = Some(html);
        Ok(())
    }

    async fn page_source(&mut self) -> Result<String, FetchError> {
        self.current.clone().ok_or(FetchError::NoDocument)
    }

    async fn close(&mut self) -> Result<(), FetchError> {
        match self.inner.take() {
            Some(client) => {
                self.current = None;
                drop(client);
                Ok(())
            }
            None => Err(FetchError::Closed),
        }
    }

    fn renders_client_side(&self) -> bool {
        false
    }
}
