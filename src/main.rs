mod annotate;
mod cli;
mod config;
mod generate;
mod identity;
mod ledger;
mod model;
mod score;
mod storage;
mod synthesize;

use std::process;

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use config::Config;
use storage::Storage;

fn main() {
    // Logs go to stderr so stdout stays clean JSON.
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = cli::Cli::parse();

    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        process::exit(1);
    });

    let path = config.database_path().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        process::exit(1);
    });

    let storage = match Storage::open(&path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to open ledger at {}: {e}", path.display());
            process::exit(1);
        }
    };

    let annotator = config.annotator().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        process::exit(1);
    });

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to start async runtime: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(cli::run(cli, &config, &storage, &annotator)) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
