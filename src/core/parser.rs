//! Record parsing
//!
//! Resolves the column layout from a header row and converts raw data rows into
//! typed [`Transaction`]s. Parsing is pure: no I/O and no shared state, so
//! workers call it outside any lock.
//!
//! # Row format
//!
//! - Fields are comma-delimited
//! - Double quotes are stripped from the whole row before splitting
//! - Timestamps are ISO-8601 local date-times, optionally followed by a single
//!   zone marker letter (e.g. `Z`) which is trimmed before parsing

use crate::types::{LedgerError, RawRecord, Transaction};
use chrono::NaiveDateTime;

const PAYER: &str = "payer";
const POINTS: &str = "points";
const TIMESTAMP: &str = "timestamp";

const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// Positions of the required fields within a row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMap {
    /// Index of the payer field
    pub payer: usize,
    /// Index of the points field
    pub points: usize,
    /// Index of the timestamp field
    pub timestamp: usize,
}

impl ColumnMap {
    /// Resolve column positions from a header row
    ///
    /// Header names are compared case-insensitively after trimming whitespace
    /// and surrounding double quotes. Extra columns are ignored.
    ///
    /// # Errors
    ///
    /// Returns `SourceFormat` naming every required column that is absent.
    pub fn from_header(header: &str) -> Result<Self, LedgerError> {
        let mut payer = None;
        let mut points = None;
        let mut timestamp = None;

        for (index, name) in header.split(',').enumerate() {
            let name = name.trim().trim_matches('"').trim();
            if name.eq_ignore_ascii_case(PAYER) {
                payer.get_or_insert(index);
            } else if name.eq_ignore_ascii_case(POINTS) {
                points.get_or_insert(index);
            } else if name.eq_ignore_ascii_case(TIMESTAMP) {
                timestamp.get_or_insert(index);
            }
        }

        match (payer, points, timestamp) {
            (Some(payer), Some(points), Some(timestamp)) => Ok(Self {
                payer,
                points,
                timestamp,
            }),
            _ => {
                let missing: Vec<&str> = [(PAYER, payer), (POINTS, points), (TIMESTAMP, timestamp)]
                    .into_iter()
                    .filter(|(_, index)| index.is_none())
                    .map(|(name, _)| name)
                    .collect();
                Err(LedgerError::source_format(&missing))
            }
        }
    }
}

/// Parse a raw row into a Transaction
///
/// # Errors
///
/// Returns `MalformedRecord` when a required field is missing or empty, the
/// points are not an integer, or the timestamp cannot be parsed.
pub fn parse_record(record: &RawRecord, columns: &ColumnMap) -> Result<Transaction, LedgerError> {
    let line = Some(record.line);
    let row = record.text.replace('"', "");
    let fields: Vec<&str> = row.split(',').map(str::trim).collect();

    let field = |index: usize, name: &str| -> Result<&str, LedgerError> {
        match fields.get(index) {
            Some(value) if !value.is_empty() => Ok(*value),
            _ => Err(LedgerError::malformed_record(
                line,
                format!("missing {} field (column {})", name, index + 1),
            )),
        }
    };

    let payer = field(columns.payer, PAYER)?;
    let points_str = field(columns.points, POINTS)?;
    let timestamp_str = field(columns.timestamp, TIMESTAMP)?;

    let points = points_str.parse::<i64>().map_err(|_| {
        LedgerError::malformed_record(line, format!("invalid points '{}'", points_str))
    })?;

    let timestamp = parse_timestamp(timestamp_str).ok_or_else(|| {
        LedgerError::malformed_record(line, format!("invalid timestamp '{}'", timestamp_str))
    })?;

    Ok(Transaction::new(payer, points, timestamp))
}

/// Parse an ISO-8601 local date-time, trimming one trailing zone marker letter
///
/// Only an ASCII letter (such as `Z`) is trimmed. Any other trailing zone
/// marker, e.g. `+02:00`, is kept and the value is rejected.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    let value = match value.chars().last() {
        Some(marker) if marker.is_ascii_alphabetic() => &value[..value.len() - 1],
        _ => value,
    };

    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
}
