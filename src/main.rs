//! Points Ledger CLI
//!
//! Command-line interface for spending points from a CSV batch of payer
//! transactions.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- 5000 transactions.csv > balances.csv
//! cargo run -- --strategy sync 5000 transactions.csv
//! cargo run -- --workers 8 --timeout-secs 30 --format json 5000 transactions.csv
//! ```
//!
//! The final payer balances go to stdout. Logs go to stderr and are filtered
//! with `RUST_LOG` (default `warn`).
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (file not readable, missing column, no credits, etc.)

use points_ledger::cli;
use points_ledger::io::write_ledger;
use points_ledger::strategy;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = cli::parse_args();

    let strategy = strategy::create_strategy(args.strategy.clone(), Some(args.to_pipeline_config()));

    let result = strategy
        .process(&args.input_file, args.spend)
        .and_then(|settlement| {
            let mut output = std::io::stdout();
            write_ledger(&settlement.ledger, args.format, &mut output)
        });

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
