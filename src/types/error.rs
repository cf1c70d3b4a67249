//! Error types for the points ledger
//!
//! This module defines all error types that can occur while ingesting and
//! settling a batch of transactions.
//!
//! # Error Categories
//!
//! - **Source errors**: header missing a required column, empty source (fatal, before ingestion)
//! - **Record errors**: a single row fails to parse (contained to that row)
//! - **Pipeline errors**: ingestion did not finish in time (soft, results may be partial)
//! - **Settlement errors**: invariant violations and overflow (bugs, never expected)
//! - **I/O errors**: reading the source or writing the ledger

use super::transaction::{Payer, Points};
use std::time::Duration;
use thiserror::Error;

/// Main error type for the points ledger
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    /// Source header does not name every required column
    ///
    /// Fatal: raised before any ingestion work starts.
    #[error("Source header is missing required column(s): {missing}")]
    SourceFormat {
        /// Comma-separated names of the missing columns
        missing: String,
    },

    /// A single record could not be parsed
    ///
    /// Recoverable: the record is skipped unless strict mode is enabled.
    #[error("Malformed record{}: {reason}", line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    MalformedRecord {
        /// Source line of the record (if known)
        line: Option<usize>,
        /// Why the record was rejected
        reason: String,
    },

    /// Ingestion did not finish within the allotted window
    ///
    /// Soft failure: whatever was ingested before the deadline is still usable.
    #[error("Ingestion timed out after {}s with {outstanding} record(s) outstanding", timeout.as_secs_f64())]
    PipelineTimeout {
        /// The timeout that elapsed
        timeout: Duration,
        /// Records that were not ingested
        outstanding: usize,
    },

    /// A credit lowered a payer's balance
    ///
    /// Internal: indicates a settlement bug, never a runtime condition.
    #[error("Invariant violated for payer '{payer}': balance went from {before} to {after}")]
    InvariantViolation {
        /// Payer whose balance misbehaved
        payer: Payer,
        /// Balance before the credit
        before: Points,
        /// Balance after the credit
        after: Points,
    },

    /// Balance arithmetic would overflow
    #[error("Arithmetic overflow while settling payer '{payer}'")]
    ArithmeticOverflow {
        /// Payer whose balance would overflow
        payer: Payer,
    },

    /// Nothing was routed into the credit sink
    #[error("No credit transactions were ingested")]
    EmptyCreditSink,

    /// I/O error while reading the source or writing output
    #[error("I/O error: {message}")]
    Io {
        /// Description of the I/O error
        message: String,
    },

    /// The worker runtime could not be started
    #[error("Runtime error: {message}")]
    Runtime {
        /// Description of the runtime failure
        message: String,
    },
}

impl From<std::io::Error> for LedgerError {
    fn from(error: std::io::Error) -> Self {
        LedgerError::Io {
            message: error.to_string(),
        }
    }
}

impl From<csv::Error> for LedgerError {
    fn from(error: csv::Error) -> Self {
        LedgerError::Io {
            message: error.to_string(),
        }
    }
}

// Helper functions for creating common errors

impl LedgerError {
    /// Create a SourceFormat error from the missing column names
    pub fn source_format(missing: &[&str]) -> Self {
        LedgerError::SourceFormat {
            missing: missing.join(", "),
        }
    }

    /// Create a MalformedRecord error
    pub fn malformed_record(line: Option<usize>, reason: impl Into<String>) -> Self {
        LedgerError::MalformedRecord {
            line,
            reason: reason.into(),
        }
    }

    /// Create a PipelineTimeout error
    pub fn pipeline_timeout(timeout: Duration, outstanding: usize) -> Self {
        LedgerError::PipelineTimeout {
            timeout,
            outstanding,
        }
    }

    /// Create an InvariantViolation error
    pub fn invariant_violation(payer: &str, before: Points, after: Points) -> Self {
        LedgerError::InvariantViolation {
            payer: payer.to_string(),
            before,
            after,
        }
    }

    /// Create an ArithmeticOverflow error
    pub fn arithmetic_overflow(payer: &str) -> Self {
        LedgerError::ArithmeticOverflow {
            payer: payer.to_string(),
        }
    }

    /// Whether this error is contained to a single record
    pub fn is_record_level(&self) -> bool {
        matches!(self, LedgerError::MalformedRecord { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::source_format(
        LedgerError::SourceFormat { missing: "points".to_string() },
        "Source header is missing required column(s): points"
    )]
    #[case::malformed_with_line(
        LedgerError::MalformedRecord { line: Some(4), reason: "invalid points 'abc'".to_string() },
        "Malformed record at line 4: invalid points 'abc'"
    )]
    #[case::malformed_without_line(
        LedgerError::MalformedRecord { line: None, reason: "missing payer".to_string() },
        "Malformed record: missing payer"
    )]
    #[case::pipeline_timeout(
        LedgerError::PipelineTimeout { timeout: Duration::from_secs(600), outstanding: 12 },
        "Ingestion timed out after 600s with 12 record(s) outstanding"
    )]
    #[case::invariant_violation(
        LedgerError::InvariantViolation { payer: "DANNON".to_string(), before: 0, after: -5 },
        "Invariant violated for payer 'DANNON': balance went from 0 to -5"
    )]
    #[case::arithmetic_overflow(
        LedgerError::ArithmeticOverflow { payer: "DANNON".to_string() },
        "Arithmetic overflow while settling payer 'DANNON'"
    )]
    #[case::empty_credit_sink(LedgerError::EmptyCreditSink, "No credit transactions were ingested")]
    #[case::io(
        LedgerError::Io { message: "Permission denied".to_string() },
        "I/O error: Permission denied"
    )]
    fn test_error_display(#[case] error: LedgerError, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }

    #[rstest]
    #[case::source_format_single(
        LedgerError::source_format(&["points"]),
        LedgerError::SourceFormat { missing: "points".to_string() }
    )]
    #[case::source_format_many(
        LedgerError::source_format(&["payer", "timestamp"]),
        LedgerError::SourceFormat { missing: "payer, timestamp".to_string() }
    )]
    #[case::malformed_record(
        LedgerError::malformed_record(Some(2), "bad"),
        LedgerError::MalformedRecord { line: Some(2), reason: "bad".to_string() }
    )]
    #[case::invariant_violation(
        LedgerError::invariant_violation("A", 3, 1),
        LedgerError::InvariantViolation { payer: "A".to_string(), before: 3, after: 1 }
    )]
    fn test_helper_functions(#[case] result: LedgerError, #[case] expected: LedgerError) {
        assert_eq!(result, expected);
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "Permission denied");
        let error: LedgerError = io_error.into();
        assert!(matches!(error, LedgerError::Io { .. }));
        assert_eq!(error.to_string(), "I/O error: Permission denied");
    }

    #[test]
    fn test_only_malformed_records_are_record_level() {
        assert!(LedgerError::malformed_record(None, "x").is_record_level());
        assert!(!LedgerError::EmptyCreditSink.is_record_level());
        assert!(!LedgerError::source_format(&["payer"]).is_record_level());
    }
}
