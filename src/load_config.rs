use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::config::{
    AccountConfig, AgentConfig, DEFAULT_ACCOUNT_DEADLINE_SECS, DEFAULT_INTERVAL_MINUTES,
    DEFAULT_WORKERS,
};

fn default_interval_minutes() -> u64 {
    DEFAULT_INTERVAL_MINUTES
}

fn default_workers() -> usize {
    DEFAULT_WORKERS
}

fn default_account_deadline_secs() -> u64 {
    DEFAULT_ACCOUNT_DEADLINE_SECS
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct StaticConfig {
    #[serde(default = "default_interval_minutes")]
    interval_minutes: u64,
    #[serde(default = "default_workers")]
    workers: usize,
    #[serde(default = "default_account_deadline_secs")]
    account_deadline_secs: u64,
    #[serde(default)]
    output_dir: Option<PathBuf>,
    #[serde(default)]
    library: Vec<AccountYaml>,
    #[serde(default)]
    transit: Vec<AccountYaml>,
    #[serde(default)]
    grocery: Vec<AccountYaml>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct AccountYaml {
    name: String,
    username: String,
    #[serde(default)]
    password: Option<String>,
    /// Environment variable holding the password; keeps secrets out of the file.
    #[serde(default)]
    password_env: Option<String>,
    #[serde(default)]
    topic: Option<String>,
    #[serde(default)]
    tab: Option<String>,
}

/// Loads a YAML config file and injects passwords from the environment.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AgentConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let content = fs::read_to_string(path_ref).map_err(|e| {
        error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
        anyhow::anyhow!("Failed to read config file {:?}: {}", path_ref, e)
    })?;
    let config = parse_config(&content)?;
    config.trace_loaded();
    Ok(config)
}

/// Parses and validates config text.
pub fn parse_config(content: &str) -> Result<AgentConfig> {
    let static_conf: StaticConfig = serde_yaml::from_str(content).map_err(|e| {
        error!(error = ?e, "Failed to parse config YAML");
        anyhow::anyhow!("Failed to parse config YAML: {e}")
    })?;

    if static_conf.workers == 0 {
        bail!("workers must be at least 1");
    }
    if static_conf.interval_minutes == 0 {
        bail!("interval_minutes must be at least 1");
    }
    if static_conf.account_deadline_secs == 0 {
        bail!("account_deadline_secs must be at least 1");
    }

    let library = resolve_accounts("library", static_conf.library)?;
    let transit = resolve_accounts("transit", static_conf.transit)?;
    let grocery = resolve_accounts("grocery", static_conf.grocery)?;

    Ok(AgentConfig {
        interval: Duration::from_secs(static_conf.interval_minutes * 60),
        workers: static_conf.workers,
        account_deadline: Duration::from_secs(static_conf.account_deadline_secs),
        output_dir: static_conf.output_dir,
        library,
        transit,
        grocery,
    })
}

fn resolve_accounts(section: &str, accounts: Vec<AccountYaml>) -> Result<Vec<AccountConfig>> {
    let mut topics = HashSet::new();
    let mut resolved = Vec::with_capacity(accounts.len());
    for yaml in accounts {
        let mut account = resolve_account(section, yaml)?;
        if section != "transit" && account.tab.take().is_some() {
            warn!(section, account = %account.name, "tab is only used by transit accounts, ignoring");
        }
        if !topics.insert(account.topic(section)) {
            error!(section, account = %account.name, "Duplicate topic in config");
            bail!(
                "{section}: account {:?} publishes to the same topic as another account",
                account.name
            );
        }
        resolved.push(account);
    }
    Ok(resolved)
}

fn resolve_account(section: &str, yaml: AccountYaml) -> Result<AccountConfig> {
    if yaml.name.trim().is_empty() {
        bail!("{section}: account name must not be empty");
    }
    if yaml.username.trim().is_empty() {
        bail!("{section}/{}: username must not be empty", yaml.name);
    }

    let password = match (yaml.password, yaml.password_env) {
        (Some(password), None) => password,
        (None, Some(var)) => {
            let password = std::env::var(&var).with_context(|| {
                format!("{section}/{}: environment variable {var} not set", yaml.name)
            })?;
            info!(section, account = %yaml.name, var = %var, "Password injected from env");
            password
        }
        (Some(_), Some(_)) => {
            bail!("{section}/{}: set either password or password_env, not both", yaml.name)
        }
        (None, None) => bail!("{section}/{}: password or password_env is required", yaml.name),
    };

    Ok(AccountConfig {
        name: yaml.name,
        username: yaml.username,
        password,
        topic: yaml.topic.filter(|t| !t.trim().is_empty()),
        tab: yaml.tab.filter(|t| !t.trim().is_empty()),
    })
}
