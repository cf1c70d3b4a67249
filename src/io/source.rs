//! Source reading
//!
//! Splits a source file into its header row and raw data rows. No field
//! parsing happens here; rows are handed to the ingestion pipeline untouched.
//!
//! # Design
//!
//! - The first line is always the header
//! - Blank lines are skipped
//! - Each row keeps its 1-based line number for error reporting
//!
//! Both a blocking reader ([`read_source`]) and a tokio reader
//! ([`read_source_async`]) are provided; they share [`SourceBatch::from_text`].

use crate::types::{LedgerError, RawRecord};
use std::fs;
use std::path::Path;

/// Header row plus raw data rows of one source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceBatch {
    /// The header row, unparsed
    pub header: String,
    /// Data rows in file order
    pub rows: Vec<RawRecord>,
}

impl SourceBatch {
    /// Split source text into header and rows
    ///
    /// # Errors
    ///
    /// `SourceFormat` if the text has no header line at all.
    pub fn from_text(text: &str) -> Result<Self, LedgerError> {
        let mut lines = text.lines().enumerate();

        let header = match lines.next() {
            Some((_, header)) => header.trim_start_matches('\u{feff}').to_string(),
            None => return Err(LedgerError::source_format(&["payer", "points", "timestamp"])),
        };

        let rows = lines
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(index, line)| RawRecord::new(index + 1, line))
            .collect();

        Ok(Self { header, rows })
    }
}

/// Read a source file on the calling thread
///
/// # Errors
///
/// `Io` if the file cannot be read, `SourceFormat` if it is empty.
pub fn read_source(path: &Path) -> Result<SourceBatch, LedgerError> {
    let text = fs::read_to_string(path).map_err(|e| LedgerError::Io {
        message: format!("Failed to open file '{}': {}", path.display(), e),
    })?;
    SourceBatch::from_text(&text)
}

/// Read a source file through tokio's file system API
///
/// # Errors
///
/// `Io` if the file cannot be read, `SourceFormat` if it is empty.
pub async fn read_source_async(path: &Path) -> Result<SourceBatch, LedgerError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| LedgerError::Io {
            message: format!("Failed to open file '{}': {}", path.display(), e),
        })?;
    SourceBatch::from_text(&text)
}
