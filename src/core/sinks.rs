//! Concurrent transaction sinks
//!
//! Ingestion routes every parsed transaction into one of two sinks:
//!
//! - [`CreditSink`]: min-ordered by timestamp, so settlement sees the oldest
//!   credit first regardless of insertion order
//! - [`DebitSink`]: unordered (LIFO), since debits are all applied before any
//!   credit and their relative order does not matter
//!
//! Each sink owns its lock. Callers never synchronise around a sink; only the
//! insertion itself runs inside the critical section.

use crate::core::traits::{DrainSink, TransactionSink};
use crate::types::{Route, Transaction};
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::mem;
use std::sync::{Mutex, MutexGuard, PoisonError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panicking worker cannot leave a heap or vec half-inserted.
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Credit transactions, retrieved oldest first
#[derive(Debug, Default)]
pub struct CreditSink {
    heap: Mutex<BinaryHeap<Reverse<Transaction>>>,
}

impl CreditSink {
    /// Create an empty credit sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return the oldest credit
    pub fn pop_oldest(&mut self) -> Option<Transaction> {
        self.heap
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .pop()
            .map(|Reverse(tx)| tx)
    }

    /// Move the current contents out, leaving this sink empty
    fn take(&self) -> Self {
        Self {
            heap: Mutex::new(mem::take(&mut *lock(&self.heap))),
        }
    }
}

impl TransactionSink for CreditSink {
    fn push(&self, transaction: Transaction) {
        lock(&self.heap).push(Reverse(transaction));
    }

    fn len(&self) -> usize {
        lock(&self.heap).len()
    }
}

impl DrainSink for CreditSink {
    fn pop(&mut self) -> Option<Transaction> {
        self.pop_oldest()
    }
}

impl FromIterator<Transaction> for CreditSink {
    fn from_iter<I: IntoIterator<Item = Transaction>>(iter: I) -> Self {
        Self {
            heap: Mutex::new(iter.into_iter().map(Reverse).collect()),
        }
    }
}

/// Debit transactions, retrieved in no particular order
#[derive(Debug, Default)]
pub struct DebitSink {
    stack: Mutex<Vec<Transaction>>,
}

impl DebitSink {
    /// Create an empty debit sink
    pub fn new() -> Self {
        Self::default()
    }

    fn take(&self) -> Self {
        Self {
            stack: Mutex::new(mem::take(&mut *lock(&self.stack))),
        }
    }
}

impl TransactionSink for DebitSink {
    fn push(&self, transaction: Transaction) {
        lock(&self.stack).push(transaction);
    }

    fn len(&self) -> usize {
        lock(&self.stack).len()
    }
}

impl DrainSink for DebitSink {
    fn pop(&mut self) -> Option<Transaction> {
        self.stack
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .pop()
    }
}

impl FromIterator<Transaction> for DebitSink {
    fn from_iter<I: IntoIterator<Item = Transaction>>(iter: I) -> Self {
        Self {
            stack: Mutex::new(iter.into_iter().collect()),
        }
    }
}

/// The pair of sinks one ingestion run fills
#[derive(Debug, Default)]
pub struct Sinks {
    /// Non-negative transactions
    pub credits: CreditSink,
    /// Negative transactions
    pub debits: DebitSink,
}

impl Sinks {
    /// Create an empty pair of sinks
    pub fn new() -> Self {
        Self::default()
    }

    /// Route a transaction into the sink matching its sign
    pub fn route(&self, transaction: Transaction) -> Route {
        let route = transaction.route();
        match route {
            Route::Credit => self.credits.push(transaction),
            Route::Debit => self.debits.push(transaction),
        }
        route
    }

    /// Total number of transactions across both sinks
    pub fn len(&self) -> usize {
        self.credits.len() + self.debits.len()
    }

    /// Whether both sinks are empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Move everything ingested so far into a fresh pair of sinks
    ///
    /// Used when abandoned workers may still hold a handle to `self`; anything
    /// they insert afterwards is not part of the returned sinks.
    pub fn detach(&self) -> Self {
        Self {
            credits: self.credits.take(),
            debits: self.debits.take(),
        }
    }
}
