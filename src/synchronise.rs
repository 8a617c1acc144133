//! Coordinating module for one poll cycle over every configured account.
//!
//! Accounts run concurrently up to `workers`, each over its own transport and each
//! under its own deadline. A failing account is reported and never stops the others;
//! only accounts whose pipeline succeeded publish anything.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tracing::{error, info, warn};

use crate::agents::{Agent, AgentOutput, GroceryAgent, LibraryAgent, RunContext, TransitAgent};
use crate::config::{AccountConfig, AgentConfig};
use crate::contract::{Metrics, Publisher, TransportFactory};
use crate::error::{AccountError, ScrapeError, Stage};

/// One account to scrape with the agent for its domain.
#[derive(Clone)]
pub struct Job {
    pub agent: Arc<dyn Agent>,
    pub account: AccountConfig,
}

impl Job {
    pub fn topic(&self) -> String {
        self.agent.topic(&self.account)
    }
}

/// Builds the job list for every configured account, in config order.
pub fn jobs(config: &AgentConfig) -> Vec<Job> {
    let library: Arc<dyn Agent> = Arc::new(LibraryAgent::default());
    let transit: Arc<dyn Agent> = Arc::new(TransitAgent::default());
    let grocery: Arc<dyn Agent> = Arc::new(GroceryAgent::default());

    let domains = [
        (&library, &config.library),
        (&transit, &config.transit),
        (&grocery, &config.grocery),
    ];
    domains
        .into_iter()
        .flat_map(|(agent, accounts)| {
            accounts.iter().map(move |account| Job {
                agent: Arc::clone(agent),
                account: account.clone(),
            })
        })
        .collect()
}

/// Concurrency and time limits of a cycle.
#[derive(Debug, Clone, Copy)]
pub struct CycleSettings {
    pub workers: usize,
    pub account_deadline: Duration,
}

impl From<&AgentConfig> for CycleSettings {
    fn from(config: &AgentConfig) -> Self {
        Self {
            workers: config.workers,
            account_deadline: config.account_deadline,
        }
    }
}

/// External collaborators of a cycle.
pub struct Collaborators<'a> {
    pub transports: &'a dyn TransportFactory,
    pub publisher: &'a dyn Publisher,
    pub metrics: &'a dyn Metrics,
}

#[derive(Debug, Default)]
pub struct CycleReport {
    /// Topics published, in completion order.
    pub published: Vec<String>,
    pub failures: Vec<AccountError>,
}

impl CycleReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Runs one account end to end: pipeline under the deadline, then publish and gauges.
pub async fn run_account(
    job: &Job,
    settings: CycleSettings,
    deps: &Collaborators<'_>,
) -> Result<Vec<String>, AccountError> {
    let domain = job.agent.domain();
    let topic = job.topic();
    let ctx = RunContext::new(domain, &job.account, topic.clone(), deps.metrics);
    info!(domain, account = %job.account.name, topic = %topic, "Starting account run");

    let transport = ctx.check(Stage::Login, deps.transports.open())?;
    let output: AgentOutput =
        match tokio::time::timeout(settings.account_deadline, job.agent.run(transport.as_ref(), &ctx)).await {
            Ok(result) => result?,
            Err(_) => {
                let secs = settings.account_deadline.as_secs();
                error!(domain, topic = %topic, deadline_secs = secs, "Account run exceeded deadline");
                return Err(ctx.fail(Stage::Deadline, ScrapeError::Deadline(secs)));
            }
        };

    let mut published = Vec::with_capacity(output.messages.len());
    for message in &output.messages {
        ctx.check(
            Stage::Publish,
            deps.publisher.publish(&message.topic, &message.payload).await,
        )?;
        published.push(message.topic.clone());
    }
    for (name, value) in &output.gauges {
        deps.metrics.gauge(name, &topic, *value);
    }
    info!(domain, topic = %topic, messages = published.len(), "Account run complete");
    Ok(published)
}

/// Runs every job once with at most `settings.workers` accounts in flight.
pub async fn run_cycle(jobs: &[Job], settings: CycleSettings, deps: &Collaborators<'_>) -> CycleReport {
    info!(accounts = jobs.len(), workers = settings.workers, "Starting cycle");
    let results: Vec<Result<Vec<String>, AccountError>> = stream::iter(jobs)
        .map(|job| run_account(job, settings, deps))
        .buffer_unordered(settings.workers.max(1))
        .collect()
        .await;

    let mut report = CycleReport::default();
    for result in results {
        match result {
            Ok(topics) => report.published.extend(topics),
            Err(e) => report.failures.push(e),
        }
    }
    if report.is_clean() {
        info!(published = report.published.len(), "Cycle complete");
    } else {
        warn!(
            published = report.published.len(),
            failed = report.failures.len(),
            "Cycle complete with failures"
        );
        for failure in &report.failures {
            warn!(error = %failure, "Account failed");
        }
    }
    report
}

/// Runs cycles every `interval` until `shutdown` resolves.
///
/// A cycle in flight when `shutdown` resolves is abandoned. Returns the number of
/// completed cycles.
pub async fn poll<F>(
    jobs: &[Job],
    settings: CycleSettings,
    interval: Duration,
    deps: &Collaborators<'_>,
    shutdown: F,
) -> usize
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut cycles = 0usize;
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = run_cycle(jobs, settings, deps) => cycles += 1,
        }
        info!(cycles, next_in_secs = interval.as_secs(), "Waiting for next cycle");
        tokio::select! {
            _ = &mut shutdown => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }
    info!(cycles, "Poll loop stopped");
    cycles
}
