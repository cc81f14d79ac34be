//! Error taxonomy for a scraping run.
//!
//! Every variant is fatal for the run: nothing here is retried. Errors bubble up
//! to the lifecycle controller, which cleans up and re-raises the original.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScrapeError {
    /// The ledger server could not be reached when the session was opened.
    #[error("cannot reach ledger server at {url}: {message}")]
    Connectivity { url: String, message: String },

    /// Non-200 status or malformed body from the ledger server.
    #[error("server request failed: {status}{}", body_suffix(.body))]
    ServerRequest { status: u16, body: Option<String> },

    /// The site rejected the credentials or the post-login landmark is missing.
    #[error("login failed: {0}")]
    LoginFailure(String),

    /// The page no longer matches what the driver expects.
    #[error("unexpected page structure: {0}")]
    PageStructure(String),

    /// WebDriver transport or protocol failure.
    #[error("browser error: {0}")]
    Browser(String),

    #[error("no site driver registered for institution {0:?}")]
    UnknownInstitution(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    /// The run failed and tearing it down failed as well.
    #[error("{cause} (cleanup also failed: {})", join_errors(.cleanup))]
    Lifecycle {
        cause: Box<ScrapeError>,
        cleanup: Vec<ScrapeError>,
    },
}

impl ScrapeError {
    pub fn page(message: impl Into<String>) -> Self {
        ScrapeError::PageStructure(message.into())
    }

    pub fn login(message: impl Into<String>) -> Self {
        ScrapeError::LoginFailure(message.into())
    }

    /// Attach cleanup failures to `cause` without masking it.
    pub fn with_cleanup(cause: ScrapeError, cleanup: Vec<ScrapeError>) -> Self {
        if cleanup.is_empty() {
            cause
        } else {
            ScrapeError::Lifecycle {
                cause: Box::new(cause),
                cleanup,
            }
        }
    }

}

fn body_suffix(body: &Option<String>) -> String {
    match body {
        Some(b) if !b.trim().is_empty() => format!(": {}", b.trim()),
        _ => String::new(),
    }
}

fn join_errors(errors: &[ScrapeError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, ScrapeError>;
