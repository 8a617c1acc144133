pub mod agents;
pub mod cli;
pub mod config;
pub mod contract;
pub mod domain;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod load_config;
pub mod metrics;
pub mod publish;
pub mod session;
pub mod sites;
pub mod synchronise;
pub mod transport;

pub use cli::{run, Cli, Commands};
pub use error::{AccountError, ScrapeError, ScrapeResult, Stage};
