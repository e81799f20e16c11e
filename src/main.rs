mod cli;
mod dates;
mod error;
mod extractor;
mod filter;
mod fmt;
mod models;
mod normalizer;
mod plan;
mod reconciler;
mod settings;
mod store;
mod uploader;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("roomsync=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    let result = match cli.command {
        Commands::Init { url, table, timeout } => cli::init::run(&url, &table, timeout),
        Commands::Extract { run } => cli::extract::run(&run),
        Commands::Sync { run, dry_run } => cli::sync::run(&run, dry_run),
        Commands::Purge { from, to, yes } => cli::purge::run(&from, &to, yes),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
