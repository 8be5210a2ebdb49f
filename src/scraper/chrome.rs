//! Headless Chrome session for listings that fill in client-side.

use super::browser::BrowserSession;
use super::error::FetchError;
use crate::config::ScraperConfig;
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::ffi::OsStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub struct ChromeSession {
    browser: Option<Browser>,
    tab: Option<Arc<Tab>>,
    current: Option<String>,
}

impl ChromeSession {
    pub fn launch(config: &ScraperConfig) -> Result<Self> {
        let options = LaunchOptions::default_builder()
            .headless(config.headless)
            .sandbox(false)
            .idle_browser_timeout(Duration::from_secs(config.timeout_secs.max(60)))
            .args(vec![
                OsStr::new("--disable-blink-features=AutomationControlled"),
                OsStr::new("--window-size=1920,1080"),
                OsStr::new("--no-first-run"),
                OsStr::new("--mute-audio"),
            ])
            .build()
            .map_err(|e| anyhow!("Invalid Chrome launch options: {e}"))?;

        let browser = Browser::new(options).context("Failed to launch Chrome")?;
        let tab = browser.new_tab().context("Failed to open a Chrome tab")?;
        tab.set_default_timeout(Duration::from_secs(config.timeout_secs));
        tab.set_user_agent(&config.user_agent, None, None)
            .context("Failed to set user agent")?;

        Ok(Self {
            browser: Some(browser),
            tab: Some(tab),
            current: None,
        })
    }
}

/// Run a blocking DevTools call off the async runtime.
async fn on_tab<T, F>(tab: Arc<Tab>, url: String, op: F) -> Result<T, FetchError>
where
    F: FnOnce(&Tab) -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let outcome = tokio::task::spawn_blocking(move || op(&tab)).await;
    match outcome {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(FetchError::Navigation { url, message: format!("{e:#}") }),
        Err(e) => Err(FetchError::Navigation { url, message: e.to_string() }),
    }
}

#[async_trait]
impl BrowserSession for ChromeSession {
    async fn navigate(&mut self, url: &str) -> Result<(), FetchError> {
        let tab = self.tab.clone().ok_or(FetchError::Closed)?;
        self.current = None;

        debug!("Chrome navigating to {}", url);
        let target = url.to_string();
        on_tab(tab, url.to_string(), move |tab| {
            tab.navigate_to(&target)?.wait_until_navigated()?;
            Ok(())
        })
        .await?;

        self.current = Some(url.to_string());
        Ok(())
    }

    async fn page_source(&mut self) -> Result<String, FetchError> {
        let tab = self.tab.clone().ok_or(FetchError::Closed)?;
        let url = self.current.clone().ok_or(FetchError::NoDocument)?;
        on_tab(tab, url, |tab| tab.get_content()).await
    }

    async fn close(&mut self) -> Result<(), FetchError> {
        self.current = None;
        // Dropping the browser terminates the Chrome process.
        match (self.tab.take(), self.browser.take()) {
            (None, None) => Err(FetchError::Closed),
            _ => Ok(()),
        }
    }
}
