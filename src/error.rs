//! Error taxonomy for the scrape pipeline.
//!
//! Every stage of an account run returns [`ScrapeError`]. The orchestration layer
//! wraps it in an [`AccountError`] so an operator can tell which account and which
//! stage failed without reading logs for unrelated accounts.

use std::fmt;

#[derive(thiserror::Error, Debug)]
pub enum ScrapeError {
    /// Login was rejected or the positive marker was absent.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Network failure or a non-success HTTP status.
    #[error("transport error: {0}")]
    Transport(String),

    /// A tab or sub-resource could not be selected.
    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    /// A selector or pattern yielded no usable value.
    #[error("parse error: {0}")]
    Parse(String),

    /// A required field could not be populated from any fragment.
    #[error("assembly error: {0}")]
    Assembly(String),

    #[error("account run exceeded deadline of {0} seconds")]
    Deadline(u64),

    #[error("publish failed: {0}")]
    Publish(String),
}

impl ScrapeError {
    /// Short label used as the failure subtype in metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ScrapeError::Authentication(_) => "authentication",
            ScrapeError::Transport(_) => "transport",
            ScrapeError::ResourceNotFound(_) => "resource_not_found",
            ScrapeError::Parse(_) => "parse",
            ScrapeError::Assembly(_) => "assembly",
            ScrapeError::Deadline(_) => "deadline",
            ScrapeError::Publish(_) => "publish",
        }
    }
}

impl From<reqwest::Error> for ScrapeError {
    fn from(e: reqwest::Error) -> Self {
        ScrapeError::Transport(e.to_string())
    }
}

/// Pipeline stage an error was raised in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Login,
    Fetch,
    Parse,
    Assemble,
    Publish,
    Deadline,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Login => "login",
            Stage::Fetch => "fetch",
            Stage::Parse => "parse",
            Stage::Assemble => "assemble",
            Stage::Publish => "publish",
            Stage::Deadline => "deadline",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed account run with enough context to diagnose selector drift.
#[derive(thiserror::Error, Debug)]
#[error("[{domain}/{account}] {stage} failed: {source}")]
pub struct AccountError {
    pub domain: &'static str,
    pub account: String,
    pub stage: Stage,
    #[source]
    pub source: ScrapeError,
}

pub type ScrapeResult<T> = Result<T, ScrapeError>;
