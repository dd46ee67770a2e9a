//! storypoint - Agile story point estimation CLI
//!
//! Estimates user stories with a locally trained model and keeps a
//! prediction history plus a feedback log for retraining.

mod cli;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    // RUST_LOG wins, then --log-level / LOG_LEVEL
    let level = cli.log_level.as_deref().unwrap_or("info").to_lowercase();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    cli::run(cli)
}
