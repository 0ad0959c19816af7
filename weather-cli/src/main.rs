//! Binary crate for the `panel-weather` terminal host.
//!
//! This crate focuses on:
//! - Parsing CLI arguments
//! - Editing the settings file (cities, units)
//! - Printing what a desktop panel would show

use clap::Parser;
use panel_weather_core::SettingsStore;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod terminal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cmd = cli::Cli::parse();
    let store = cmd.open_settings()?;

    init_tracing(store.get().debug);

    cmd.run(store).await
}

/// `RUST_LOG` wins; otherwise the settings `debug` flag picks the level.
fn init_tracing(debug: bool) {
    let fallback = if debug { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
