//! ronda CLI binary.
//!
//! Lists the built-in factors and runs the full evaluation and combination
//! pipeline on a seeded synthetic universe.

mod cmd;
mod synthetic;

use std::path::PathBuf;
use std::process;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use ronda_traits::{CombinationMode, ModelKind};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ronda")]
#[command(about = "Cross-sectional factor evaluation and composite-signal engine", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available factors
    Factors {
        /// Filter by category
        #[arg(short, long)]
        category: Option<String>,

        /// Show detailed information
        #[arg(short, long)]
        verbose: bool,
    },

    /// Evaluate and combine factors on a synthetic universe
    Simulate(SimulateArgs),
}

/// Options of the `simulate` command.
#[derive(clap::Args, Debug)]
pub(crate) struct SimulateArgs {
    /// Factor names (e.g. momentum_20,rsi_14); defaults to the config's list
    #[arg(short, long, value_delimiter = ',')]
    pub(crate) factors: Vec<String>,

    /// JSON configuration file; absent fields keep their defaults
    #[arg(long)]
    pub(crate) config: Option<PathBuf>,

    /// Number of synthetic instruments
    #[arg(short = 'n', long, default_value = "60")]
    pub(crate) instruments: usize,

    /// Number of bars per instrument
    #[arg(short, long, default_value = "250")]
    pub(crate) days: usize,

    /// Seed of the synthetic universe
    #[arg(short, long, default_value = "7")]
    pub(crate) seed: u64,

    /// Precomputation worker threads
    #[arg(short, long, default_value = "4")]
    pub(crate) workers: usize,

    /// Forward-return horizon, overriding the config
    #[arg(short = 'H', long)]
    pub(crate) horizon: Option<usize>,

    /// Combination mode, overriding the config
    #[arg(long, value_enum)]
    pub(crate) combination: Option<CombinationArg>,

    /// Model for learned weights, overriding the config
    #[arg(long, value_enum)]
    pub(crate) model: Option<ModelArg>,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub(crate) format: OutputFormat,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub(crate) enum CombinationArg {
    RankSum,
    IcWeighted,
    Regression,
}

impl From<CombinationArg> for CombinationMode {
    fn from(arg: CombinationArg) -> Self {
        match arg {
            CombinationArg::RankSum => Self::RankSum,
            CombinationArg::IcWeighted => Self::IcWeighted,
            CombinationArg::Regression => Self::Regression,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub(crate) enum ModelArg {
    Linear,
    RandomForest,
    GradientBoosting,
    Mlp,
}

impl From<ModelArg> for ModelKind {
    fn from(arg: ModelArg) -> Self {
        match arg {
            ModelArg::Linear => Self::Linear,
            ModelArg::RandomForest => Self::RandomForest,
            ModelArg::GradientBoosting => Self::GradientBoosting,
            ModelArg::Mlp => Self::Mlp,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Factors { category, verbose } => cmd::factors::list_factors(category, verbose),
        Commands::Simulate(args) => cmd::simulate::run_simulation(&args),
    }
}
