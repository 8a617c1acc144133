// homescrape/src/config.rs

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, info};

use crate::session::Credentials;

pub const DEFAULT_INTERVAL_MINUTES: u64 = 30;
pub const DEFAULT_WORKERS: usize = 2;
pub const DEFAULT_ACCOUNT_DEADLINE_SECS: u64 = 120;

/// Fully resolved runtime configuration, secrets included.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub interval: Duration,
    pub workers: usize,
    pub account_deadline: Duration,
    /// Where the directory publisher writes retained documents.
    pub output_dir: Option<PathBuf>,
    pub library: Vec<AccountConfig>,
    pub transit: Vec<AccountConfig>,
    pub grocery: Vec<AccountConfig>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_INTERVAL_MINUTES * 60),
            workers: DEFAULT_WORKERS,
            account_deadline: Duration::from_secs(DEFAULT_ACCOUNT_DEADLINE_SECS),
            output_dir: None,
            library: Vec::new(),
            transit: Vec::new(),
            grocery: Vec::new(),
        }
    }
}

impl AgentConfig {
    pub fn account_count(&self) -> usize {
        self.library.len() + self.transit.len() + self.grocery.len()
    }

    pub fn trace_loaded(&self) {
        info!(
            interval_secs = self.interval.as_secs(),
            workers = self.workers,
            account_deadline_secs = self.account_deadline.as_secs(),
            output_dir = ?self.output_dir,
            library_accounts = self.library.len(),
            transit_accounts = self.transit.len(),
            grocery_accounts = self.grocery.len(),
            "Loaded AgentConfig"
        );
        for account in self.library.iter().chain(&self.transit).chain(&self.grocery) {
            account.trace_loaded();
        }
    }
}

/// One set of credentials against one site.
#[derive(Clone, PartialEq, Eq)]
pub struct AccountConfig {
    pub name: String,
    pub username: String,
    pub password: String,
    /// Replaces the name in the published topic.
    pub topic: Option<String>,
    /// Transit only: label of the card tab to read.
    pub tab: Option<String>,
}

impl AccountConfig {
    pub fn new(name: impl Into<String>, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            username: username.into(),
            password: password.into(),
            topic: None,
            tab: None,
        }
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(&self.username, &self.password)
    }

    /// `<prefix>/<topic override, tab label or name>`, lower-cased.
    pub fn topic(&self, prefix: &str) -> String {
        let segment = self
            .topic
            .as_deref()
            .or(self.tab.as_deref())
            .unwrap_or(&self.name);
        format!("{prefix}/{}", segment.trim().to_lowercase())
    }

    pub fn trace_loaded(&self) {
        info!(
            name = %self.name,
            topic = self.topic.as_deref().unwrap_or("-"),
            tab = self.tab.as_deref().unwrap_or("-"),
            "Loaded account"
        );
        debug!(?self, "Account loaded (full debug)");
    }
}

impl fmt::Debug for AccountConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountConfig")
            .field("name", &self.name)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("topic", &self.topic)
            .field("tab", &self.tab)
            .finish()
    }
}
