//! Browser session seam.
//!
//! The fetcher only ever talks to a `BrowserSession`, handed to it by the
//! orchestrator. `open_session` picks the implementation from config.

use super::error::FetchError;
use super::http_client::HttpSession;
use crate::config::{ScraperConfig, SessionEngine};
use async_trait::async_trait;
use tracing::info;

#[async_trait]
pub trait BrowserSession: Send {
    /// Load `url`, replacing the current document.
    async fn navigate(&mut self, url: &str) -> Result<(), FetchError>;

    /// Serialized DOM of the current document as it stands right now.
    async fn page_source(&mut self) -> Result<String, FetchError>;

    /// Release the session. Called exactly once, at teardown.
    async fn close(&mut self) -> Result<(), FetchError>;

    /// False when the document cannot change after `navigate` returns,
    /// so waiting for hydration is pointless.
    fn renders_client_side(&self) -> bool {
        true
    }
}

/// Start the session selected by `engine` in the scraper config.
pub fn open_session(config: &ScraperConfig) -> anyhow::Result<Box<dyn BrowserSession>> {
    info!("Starting {:?} browser session", config.engine);
    match config.engine {
        SessionEngine::Http => Ok(Box::new(HttpSession::new(config)?)),
        #[cfg(feature = "headless")]
        SessionEngine::Chrome => Ok(Box::new(super::chrome::ChromeSession::launch(config)?)),
        #[cfg(not(feature = "headless"))]
        SessionEngine::Chrome => {
            anyhow::bail!("engine = \"chrome\" needs a build with `--features headless`")
        }
    }
}
