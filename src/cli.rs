use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use crate::config::AgentConfig;
use crate::contract::Publisher;
use crate::load_config::load_config;
use crate::metrics::InMemoryMetrics;
use crate::publish::{DirectoryPublisher, StdoutPublisher};
use crate::synchronise::{jobs, poll, run_cycle, Collaborators, CycleSettings};
use crate::transport::ReqwestTransportFactory;

/// CLI for homescrape: scrape loyalty, library and transit accounts and publish readings.
#[derive(Parser)]
#[clap(
    name = "homescrape",
    version,
    about = "Scrape grocery, library and transit accounts and publish normalized readings"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Args, Clone)]
pub struct RunArgs {
    /// Path to the YAML config file
    #[clap(long)]
    pub config: PathBuf,

    /// Print messages to stdout instead of writing them under output_dir
    #[clap(long)]
    pub stdout: bool,

    /// Print the collected metrics after the run
    #[clap(long)]
    pub metrics: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a single cycle over every configured account
    Once(RunArgs),
    /// Run cycles every interval_minutes until interrupted
    Poll(RunArgs),
    /// Load and validate the config file without contacting any site
    Validate {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
    },
}

fn publisher(config: &AgentConfig, stdout: bool) -> Result<Box<dyn Publisher>> {
    if stdout {
        return Ok(Box::new(StdoutPublisher));
    }
    let dir = config
        .output_dir
        .clone()
        .context("output_dir is not configured; set it or pass --stdout")?;
    Ok(Box::new(DirectoryPublisher::new(dir)))
}

/// Async CLI entrypoint shared by `main` and the integration tests.
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Validate { config } => {
            let config = load_config(config)?;
            println!(
                "Config valid: {} account(s) ({} library, {} transit, {} grocery).",
                config.account_count(),
                config.library.len(),
                config.transit.len(),
                config.grocery.len()
            );
            Ok(())
        }
        Commands::Once(args) => {
            let config = load_config(&args.config)?;
            let publisher = publisher(&config, args.stdout)?;
            let metrics = InMemoryMetrics::new();
            let transports = ReqwestTransportFactory::default();
            let deps = Collaborators {
                transports: &transports,
                publisher: publisher.as_ref(),
                metrics: &metrics,
            };

            let report = run_cycle(&jobs(&config), CycleSettings::from(&config), &deps).await;
            if args.metrics {
                eprint!("{}", metrics.render());
            }
            eprintln!(
                "Cycle complete: {} published, {} failed.",
                report.published.len(),
                report.failures.len()
            );
            for failure in &report.failures {
                eprintln!("[ERROR] {failure}");
            }
            if report.is_clean() {
                Ok(())
            } else {
                anyhow::bail!("{} account(s) failed", report.failures.len())
            }
        }
        Commands::Poll(args) => {
            let config = load_config(&args.config)?;
            let publisher = publisher(&config, args.stdout)?;
            let metrics = InMemoryMetrics::new();
            let transports = ReqwestTransportFactory::default();
            let deps = Collaborators {
                transports: &transports,
                publisher: publisher.as_ref(),
                metrics: &metrics,
            };

            let shutdown = async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!(error = %e, "Cannot listen for Ctrl-C");
                    std::future::pending::<()>().await;
                }
                tracing::info!("Ctrl-C received, stopping");
            };
            let cycles = poll(
                &jobs(&config),
                CycleSettings::from(&config),
                config.interval,
                &deps,
                shutdown,
            )
            .await;
            if args.metrics {
                eprint!("{}", metrics.render());
            }
            eprintln!("Stopped after {cycles} cycle(s).");
            Ok(())
        }
    }
}
