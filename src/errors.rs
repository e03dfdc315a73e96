//! Error taxonomy for the crawler.
//!
//! Per-URL failures ([`CrawlError::Http`], [`CrawlError::Status`]) are caught
//! by the orchestrator, logged and skipped. [`CrawlError::Rules`] can only
//! happen at startup when a rules file is loaded.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },

    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("feed could not be read: {0}")]
    Feed(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("publish failed: {0}")]
    Publish(String),

    #[error("invalid extraction rules: {0}")]
    Rules(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CrawlError>;
