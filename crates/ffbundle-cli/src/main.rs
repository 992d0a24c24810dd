//! ffbundle command-line entry point.
//!
//! Parses arguments, sets up logging on stderr and hands off to
//! [`ffbundle_cli::run`]. Stdout carries command output only, so `cat` can be
//! piped.

use anyhow::Result;
use clap::Parser;
use ffbundle_cli::Cli;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    ffbundle_cli::run(cli, &mut out)
}
