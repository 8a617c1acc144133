//! Agents: one per domain, each running the scrape pipeline for a single account.
//!
//! An agent establishes a session, fetches its resources, extracts fragments and
//! assembles the domain entity. It returns the messages to publish and the gauges to
//! record; publishing is left to [`crate::synchronise`].
//!
//! Every stage result passes through [`RunContext::check`], which counts the outcome
//! and tags a failure with the stage it happened in.

pub mod grocery;
pub mod library;
pub mod transit;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::AccountConfig;
use crate::contract::{Metrics, Outcome, Transport};
use crate::error::{AccountError, ScrapeError, ScrapeResult, Stage};

pub use grocery::GroceryAgent;
pub use library::LibraryAgent;
pub use transit::TransitAgent;

/// A document to hand to the publisher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub topic: String,
    pub payload: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentOutput {
    pub messages: Vec<Message>,
    /// `(gauge name, value)` recorded under the account topic once published.
    pub gauges: Vec<(&'static str, f64)>,
}

impl AgentOutput {
    pub fn push_json<T: Serialize>(&mut self, topic: impl Into<String>, entity: &T) -> ScrapeResult<()> {
        let payload = serde_json::to_string(entity)
            .map_err(|e| ScrapeError::Assembly(format!("cannot serialize entity: {e}")))?;
        self.messages.push(Message {
            topic: topic.into(),
            payload,
        });
        Ok(())
    }

    pub fn push_raw(&mut self, topic: impl Into<String>, payload: impl Into<String>) {
        self.messages.push(Message {
            topic: topic.into(),
            payload: payload.into(),
        });
    }

    pub fn gauge(&mut self, name: &'static str, value: f64) {
        self.gauges.push((name, value));
    }
}

/// Per-run context: who is being scraped and where outcomes are counted.
pub struct RunContext<'a> {
    pub domain: &'static str,
    pub account: &'a AccountConfig,
    pub topic: String,
    pub metrics: &'a dyn Metrics,
}

impl<'a> RunContext<'a> {
    pub fn new(domain: &'static str, account: &'a AccountConfig, topic: String, metrics: &'a dyn Metrics) -> Self {
        Self {
            domain,
            account,
            topic,
            metrics,
        }
    }

    /// Counts the outcome of `stage` and wraps a failure in an [`AccountError`].
    pub fn check<T>(&self, stage: Stage, result: ScrapeResult<T>) -> Result<T, AccountError> {
        match result {
            Ok(value) => {
                debug!(domain = self.domain, topic = %self.topic, stage = %stage, "Stage succeeded");
                self.metrics.record(self.domain, &self.topic, stage, Outcome::Success);
                Ok(value)
            }
            Err(source) => Err(self.fail(stage, source)),
        }
    }

    /// Counts a failure of `stage` and builds the matching [`AccountError`].
    pub fn fail(&self, stage: Stage, source: ScrapeError) -> AccountError {
        warn!(
            domain = self.domain,
            account = %self.account.name,
            topic = %self.topic,
            stage = %stage,
            error = %source,
            "Stage failed"
        );
        self.metrics
            .record(self.domain, &self.topic, stage, Outcome::Failure(source.kind()));
        AccountError {
            domain: self.domain,
            account: self.account.name.clone(),
            stage,
            source,
        }
    }
}

/// The scrape pipeline of one domain.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Domain label used in metrics and error context.
    fn domain(&self) -> &'static str;

    /// Topic the account's entity is published under.
    fn topic(&self, account: &AccountConfig) -> String;

    /// Runs the whole pipeline for one account over a fresh transport.
    async fn run(&self, transport: &dyn Transport, ctx: &RunContext<'_>) -> Result<AgentOutput, AccountError>;
}

/// Seconds since the epoch, as recorded in timestamp gauges.
pub(crate) fn epoch_seconds(t: &chrono::DateTime<chrono::Local>) -> f64 {
    t.timestamp() as f64
}
