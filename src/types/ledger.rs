//! Ledger types for the points ledger
//!
//! The ledger is the sole output of settlement: a mapping from payer to its
//! final point balance. `Settlement` wraps it together with how much of the
//! spend request was actually satisfied.

use super::transaction::{Payer, Points};
use std::collections::{BTreeMap, HashMap};

/// Payer to balance mapping
///
/// Iteration order of [`Ledger::iter`] is unspecified. Use [`Ledger::sorted`]
/// when a deterministic order is needed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    balances: HashMap<Payer, Points>,
}

impl Ledger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Current balance for a payer, if the payer has been seen
    pub fn balance(&self, payer: &str) -> Option<Points> {
        self.balances.get(payer).copied()
    }

    /// Mutable balance for a payer, creating it with `initial` when unseen
    pub(crate) fn entry(&mut self, payer: &str, initial: Points) -> &mut Points {
        self.balances.entry(payer.to_owned()).or_insert(initial)
    }

    /// Number of payers in the ledger
    pub fn len(&self) -> usize {
        self.balances.len()
    }

    /// Whether no payer has been seen
    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }

    /// Iterate over `(payer, balance)` pairs in unspecified order
    pub fn iter(&self) -> impl Iterator<Item = (&str, Points)> + '_ {
        self.balances.iter().map(|(payer, points)| (payer.as_str(), *points))
    }

    /// Balances sorted by payer
    pub fn sorted(&self) -> BTreeMap<&str, Points> {
        self.iter().collect()
    }

    /// Sum of every payer's balance
    pub fn total(&self) -> Points {
        self.balances.values().sum()
    }
}

impl FromIterator<(Payer, Points)> for Ledger {
    fn from_iter<I: IntoIterator<Item = (Payer, Points)>>(iter: I) -> Self {
        Self {
            balances: iter.into_iter().collect(),
        }
    }
}

/// Result of settling a spend request against the ingested transactions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    /// Final payer balances
    pub ledger: Ledger,

    /// Points the caller asked to spend
    pub requested: u64,

    /// Points actually deducted from credits
    ///
    /// Always `min(requested, eligible credit points)`.
    pub spent: u64,

    /// Part of the request that could not be satisfied
    ///
    /// Non-zero only when the spend request exceeds the available credits.
    pub unspent: u64,
}

impl Settlement {
    /// Whether the full spend request was satisfied
    pub fn is_fully_spent(&self) -> bool {
        self.unspent == 0
    }
}
