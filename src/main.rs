#![warn(clippy::all, clippy::pedantic)]

use anyhow::Result;
use clap::Parser;
use hostwarden::Config;
use hostwarden::cli::Cli;
use std::str::FromStr;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load_or_init()?;

    // Logs go to stderr so chat output on stdout stays clean.
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::from_str(&config.log_level).unwrap_or(Level::INFO)
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(error) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Warning: failed to install log subscriber: {error}");
    }

    hostwarden::app::dispatch(cli, config).await
}
