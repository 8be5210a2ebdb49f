use thiserror::Error;

/// Failures while driving a browser session.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("no page loaded")]
    NoDocument,

    #[error("session already closed")]
    Closed,
}

impl FetchError {
    /// Whether retrying the same navigation might succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Navigation { .. } => true,
            FetchError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

#[derive(Error, Debug)]
pub enum SelectorError {
    #[error("invalid {field} selector {selector:?}: {message}")]
    Invalid {
        field: &'static str,
        selector: String,
        message: String,
    },

    #[error("no selectors configured for {0}")]
    Empty(&'static str),
}
