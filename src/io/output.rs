//! Ledger output
//!
//! Renders a settled ledger as CSV (`payer,points` rows) or as a JSON object.
//! Payers are always written in sorted order so output is deterministic.

use crate::types::{Ledger, LedgerError, Points};
use clap::ValueEnum;
use serde::Serialize;
use std::io::Write;

/// Available output formats
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// `payer,points` rows with a header
    #[default]
    Csv,
    /// A single JSON object mapping payer to points
    Json,
}

#[derive(Debug, Serialize)]
struct LedgerRow<'a> {
    payer: &'a str,
    points: Points,
}

/// Write a ledger in the requested format
pub fn write_ledger(
    ledger: &Ledger,
    format: OutputFormat,
    output: &mut dyn Write,
) -> Result<(), LedgerError> {
    match format {
        OutputFormat::Csv => write_ledger_csv(ledger, output),
        OutputFormat::Json => write_ledger_json(ledger, output),
    }
}

/// Write a ledger as CSV
///
/// Writes a `payer,points` header followed by one row per payer.
pub fn write_ledger_csv(ledger: &Ledger, output: &mut dyn Write) -> Result<(), LedgerError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(output);

    writer.write_record(["payer", "points"])?;
    for (payer, points) in ledger.sorted() {
        writer.serialize(LedgerRow { payer, points })?;
    }
    writer.flush()?;

    Ok(())
}

/// Write a ledger as a pretty-printed JSON object
pub fn write_ledger_json(ledger: &Ledger, output: &mut dyn Write) -> Result<(), LedgerError> {
    serde_json::to_writer_pretty(&mut *output, &ledger.sorted()).map_err(|e| LedgerError::Io {
        message: format!("Failed to write JSON output: {}", e),
    })?;
    writeln!(output)?;
    Ok(())
}
