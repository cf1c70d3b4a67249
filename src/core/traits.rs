//! Core traits for the transaction sinks
//!
//! Ingestion workers only ever see `&self` access to a sink, so every
//! implementation must synchronise insertion internally. Settlement drains
//! sinks through `&mut self`, after all workers have been joined.

use crate::types::Transaction;

/// A collection that accepts transactions from many workers at once
pub trait TransactionSink: Send + Sync {
    /// Insert a transaction; safe to call concurrently
    fn push(&self, transaction: Transaction);

    /// Number of transactions currently held
    fn len(&self) -> usize;

    /// Whether the sink holds no transactions
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A sink that can be drained one transaction at a time
pub trait DrainSink: TransactionSink {
    /// Remove the next transaction in this sink's retrieval order
    fn pop(&mut self) -> Option<Transaction>;
}
