use crate::core::PipelineConfig;
use crate::io::OutputFormat;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

/// Spend points across payers, oldest points first
#[derive(Parser, Debug)]
#[command(name = "points-ledger")]
#[command(about = "Spend points across payers, oldest points first", long_about = None)]
pub struct CliArgs {
    /// Number of points to spend
    #[arg(value_name = "SPEND", help = "Number of points to spend (non-negative integer)")]
    pub spend: u64,

    /// Input CSV file path containing transaction records
    #[arg(value_name = "INPUT", help = "Path to the input CSV file")]
    pub input_file: PathBuf,

    /// Ingestion strategy
    #[arg(
        long = "strategy",
        value_name = "STRATEGY",
        default_value = "async",
        help = "Ingestion strategy: 'sync' for sequential or 'async' for a worker pool"
    )]
    pub strategy: StrategyType,

    /// Number of ingestion workers (async mode only)
    #[arg(
        long = "workers",
        value_name = "COUNT",
        help = "Number of records parsed concurrently (default: CPU cores)"
    )]
    pub workers: Option<usize>,

    /// Ingestion timeout in seconds (async mode only)
    #[arg(
        long = "timeout-secs",
        value_name = "SECS",
        help = "Maximum time to wait for ingestion workers (default: 600)"
    )]
    pub timeout_secs: Option<u64>,

    /// Grace period after a timeout in seconds (async mode only)
    #[arg(
        long = "grace-secs",
        value_name = "SECS",
        help = "Time cancelled workers get to stop after a timeout (default: 60)"
    )]
    pub grace_secs: Option<u64>,

    /// Abort on the first malformed record
    #[arg(long = "strict", help = "Fail on the first malformed record instead of skipping it")]
    pub strict: bool,

    /// Output format for the final ledger
    #[arg(
        long = "format",
        value_name = "FORMAT",
        default_value = "csv",
        help = "Output format: 'csv' or 'json'"
    )]
    pub format: OutputFormat,
}

/// Available ingestion strategies
#[derive(Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum StrategyType {
    Sync,
    Async,
}

impl CliArgs {
    /// Create a PipelineConfig from CLI arguments
    ///
    /// Missing values fall back to [`PipelineConfig::default`]; zero values
    /// are replaced with defaults by [`PipelineConfig::new`].
    pub fn to_pipeline_config(&self) -> PipelineConfig {
        let default = PipelineConfig::default();
        PipelineConfig::new(
            self.workers.unwrap_or(default.workers),
            self.timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(default.timeout),
            self.grace_secs
                .map(Duration::from_secs)
                .unwrap_or(default.grace_period),
            self.strict,
        )
    }
}
