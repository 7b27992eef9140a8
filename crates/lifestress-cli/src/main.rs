//! # lifestress
//!
//! Concurrency stress harness for container lifecycles.
//! Creates, starts, stops, and destroys `count` containers in parallel,
//! phase by phase, `iteration` times.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

mod cli;
mod output;
mod run;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, LogFormat};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.resolve()?;
    init_tracing(config.debug, cli.log_format);
    run::execute(config)
}

/// Installs the global subscriber. `RUST_LOG` wins over `--debug`.
fn init_tracing(debug: bool, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if debug { "debug" } else { "info" }));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}
