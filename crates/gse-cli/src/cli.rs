use clap::{Args, Parser, Subcommand, ValueEnum, ValueHint};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Weighted-least-squares state estimation for power networks", long_about = None)]
pub struct Cli {
    /// Set the logging level
    #[arg(long, default_value = "info")]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Estimate the network state from a case file
    Estimate(EstimateArgs),
    /// Check a case file for structural errors and observability
    Validate {
        /// Case file (TOML or JSON)
        #[arg(value_hint = ValueHint::FilePath)]
        case: PathBuf,
    },
}

#[derive(Args, Debug)]
pub struct EstimateArgs {
    /// Case file (TOML or JSON) holding the network, sensors and optional `[config]`
    #[arg(value_hint = ValueHint::FilePath)]
    pub case: PathBuf,

    /// Override the iteration cap from the case file
    #[arg(long)]
    pub max_iterations: Option<usize>,

    /// Override the convergence tolerance (largest state update, pu/rad)
    #[arg(long)]
    pub tolerance: Option<f64>,

    /// Override the system frequency (Hz)
    #[arg(long)]
    pub frequency: Option<f64>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Write the output to a file instead of stdout
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub out: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Aligned text tables
    Table,
    /// The full estimation output as pretty-printed JSON
    Json,
}
