//! I/O module
//!
//! Handles reading sources and writing ledgers.
//!
//! # Components
//!
//! - `source` - Splitting a source file into header and raw rows (sync and tokio)
//! - `output` - Rendering the settled ledger as CSV or JSON

pub mod output;
pub mod source;

pub use output::{write_ledger, write_ledger_csv, write_ledger_json, OutputFormat};
pub use source::{read_source, read_source_async, SourceBatch};
