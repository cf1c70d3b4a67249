//! Transaction-related types for the points ledger
//!
//! This module defines the typed transaction produced by the record parser,
//! the raw record it is parsed from, and the chronological ordering used by
//! the credit sink.

use chrono::NaiveDateTime;
use std::cmp::Ordering;

/// Payer identifier
///
/// Any non-empty string taken verbatim (after quote stripping) from the source.
pub type Payer = String;

/// Signed point delta
///
/// Non-negative values are credits, negative values are debits.
pub type Points = i64;

/// Which sink a transaction is routed into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// `points >= 0`, routed into the chronological credit sink
    Credit,
    /// `points < 0`, routed into the unordered debit sink
    Debit,
}

/// A single raw data row as supplied by the I/O layer
///
/// `line` is the 1-based line number in the source (the header is line 1),
/// used only for error reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    /// Line number in the source file
    pub line: usize,
    /// The unparsed row text
    pub text: String,
}

impl RawRecord {
    /// Create a raw record from a line number and its text
    pub fn new(line: usize, text: impl Into<String>) -> Self {
        Self {
            line,
            text: text.into(),
        }
    }
}

/// A parsed, immutable ledger transaction
///
/// Transactions order by `timestamp` ascending (older first). Identical
/// timestamps fall back to payer then points so the ordering stays total and
/// consistent with `Eq`; callers must not rely on that tie-break.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Transaction {
    payer: Payer,
    points: Points,
    timestamp: NaiveDateTime,
}

impl Transaction {
    /// Create a new transaction
    pub fn new(payer: impl Into<Payer>, points: Points, timestamp: NaiveDateTime) -> Self {
        Self {
            payer: payer.into(),
            points,
            timestamp,
        }
    }

    /// The payer this transaction belongs to
    pub fn payer(&self) -> &str {
        &self.payer
    }

    /// Signed point delta
    pub fn points(&self) -> Points {
        self.points
    }

    /// When the transaction happened
    pub fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    /// Sink this transaction belongs in, decided by the sign of `points`
    pub fn route(&self) -> Route {
        if self.points >= 0 {
            Route::Credit
        } else {
            Route::Debit
        }
    }
}

impl Ord for Transaction {
    fn cmp(&self, other: &Self) -> Ordering {
        self.timestamp
            .cmp(&other.timestamp)
            .then_with(|| self.payer.cmp(&other.payer))
            .then_with(|| self.points.cmp(&other.points))
    }
}

impl PartialOrd for Transaction {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn at(s: &str) -> NaiveDateTime {
        s.parse().unwrap()
    }

    #[rstest]
    #[case::zero(0, Route::Credit)]
    #[case::positive(300, Route::Credit)]
    #[case::negative(-200, Route::Debit)]
    fn test_route_by_sign(#[case] points: Points, #[case] expected: Route) {
        let tx = Transaction::new("DANNON", points, at("2020-11-02T14:00:00"));
        assert_eq!(tx.route(), expected);
    }

    #[test]
    fn test_older_transaction_sorts_first() {
        let older = Transaction::new("B", 300, at("2020-10-31T10:00:00"));
        let newer = Transaction::new("A", 5000, at("2020-11-01T10:00:00"));

        assert!(older < newer);
        let mut txs = vec![newer.clone(), older.clone()];
        txs.sort();
        assert_eq!(txs, vec![older, newer]);
    }

    #[test]
    fn test_ordering_ignores_payer_for_distinct_timestamps() {
        let a = Transaction::new("ZZZ", 1, at("2020-01-01T00:00:00"));
        let b = Transaction::new("AAA", 1, at("2020-01-01T00:00:01"));
        assert_eq!(a.cmp(&b), Ordering::Less);
    }
}
