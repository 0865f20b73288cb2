use std::io;
use std::process;

use clap::Parser;
use gse_cli::cli::{Cli, Commands};
use tracing::error;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

mod commands;

fn main() {
    let cli = Cli::parse();

    // RUST_LOG directives refine the --log-level default
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::from_level(cli.log_level).into())
                .from_env_lossy(),
        )
        .with_writer(io::stderr)
        .init();

    let result = match &cli.command {
        Commands::Estimate(args) => commands::estimate::handle(args),
        Commands::Validate { case } => commands::validate::handle(case),
    };

    if let Err(e) = result {
        error!("{e:#}");
        process::exit(1);
    }
}
