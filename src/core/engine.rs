//! Ledger settlement engine
//!
//! Consumes the two sinks produced by ingestion and settles a spend request
//! against them:
//!
//! 1. **Debit phase**: every debit is applied to its payer's balance, so no
//!    payer enters the credit phase with an unapplied debit.
//! 2. **Credit phase**: credits are drained oldest first. A payer with a
//!    negative balance first has the gap closed to zero; any remaining points
//!    are consumed by the spend request; only the surplus accrues to balance.
//!
//! Settlement is single-threaded and touches nothing but its own working
//! state. Overspend is not an error: the shortfall is reported through
//! [`Settlement::unspent`].

use crate::core::traits::DrainSink;
use crate::types::{Ledger, LedgerError, Points, Settlement, Transaction};
use tracing::{debug, info};

/// Settles a spend request against drained sinks
///
/// Holds the running ledger and the remaining spend for one settlement. Use
/// [`SettlementEngine::settle`] for the whole two-phase run, or the
/// `apply_*` methods to drive the phases by hand.
#[derive(Debug)]
pub struct SettlementEngine {
    ledger: Ledger,
    requested: u64,
    remaining: u64,
}

impl SettlementEngine {
    /// Create an engine for a spend request
    pub fn new(spend: u64) -> Self {
        Self {
            ledger: Ledger::new(),
            requested: spend,
            remaining: spend,
        }
    }

    /// Run both phases to completion
    ///
    /// Drains `debits` completely, then `credits` in ascending timestamp order.
    ///
    /// # Errors
    ///
    /// `ArithmeticOverflow` if a balance leaves the `i64` range, and
    /// `InvariantViolation` if a credit would lower a balance (a bug).
    pub fn settle<C, D>(credits: &mut C, debits: &mut D, spend: u64) -> Result<Settlement, LedgerError>
    where
        C: DrainSink,
        D: DrainSink,
    {
        let mut engine = Self::new(spend);

        let mut debit_count = 0usize;
        while let Some(debit) = debits.pop() {
            engine.apply_debit(&debit)?;
            debit_count += 1;
        }
        info!(debits = debit_count, payers = engine.ledger.len(), "debit phase complete");

        let mut credit_count = 0usize;
        while let Some(credit) = credits.pop() {
            engine.apply_credit(&credit)?;
            credit_count += 1;
        }
        info!(
            credits = credit_count,
            remaining = engine.remaining,
            "credit phase complete"
        );

        Ok(engine.finish())
    }

    /// Points of the spend request not yet satisfied
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// The ledger as settled so far
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Apply a debit: add its points to the payer's balance
    ///
    /// An unseen payer starts at the debit's value.
    pub fn apply_debit(&mut self, debit: &Transaction) -> Result<(), LedgerError> {
        let payer = debit.payer();
        let balance = self.ledger.entry(payer, 0);
        *balance = balance
            .checked_add(debit.points())
            .ok_or_else(|| LedgerError::arithmetic_overflow(payer))?;

        debug!(payer, points = debit.points(), balance = *balance, "debit applied");
        Ok(())
    }

    /// Apply a credit against the payer's balance and the remaining spend
    pub fn apply_credit(&mut self, credit: &Transaction) -> Result<(), LedgerError> {
        let payer = credit.payer();
        let mut points = credit.points();
        let balance = self.ledger.entry(payer, 0);
        let before = *balance;

        // Close a negative balance before anything is spent.
        if *balance < 0 && points > 0 {
            // `unsigned_abs` covers a balance of exactly `i64::MIN`; the
            // result is bounded by `points`, so it fits back into `Points`.
            let closing = (points as u64).min(balance.unsigned_abs()) as Points;
            *balance += closing;
            points -= closing;
        }

        let used = if points > 0 {
            // `points` is positive here, so the cast is lossless.
            let used = self.remaining.min(points as u64);
            self.remaining -= used;
            used as Points
        } else {
            0
        };

        *balance = balance
            .checked_add(points - used)
            .ok_or_else(|| LedgerError::arithmetic_overflow(payer))?;

        if *balance < before {
            return Err(LedgerError::invariant_violation(payer, before, *balance));
        }

        debug!(
            payer,
            points = credit.points(),
            spent = used,
            balance = *balance,
            remaining = self.remaining,
            "credit applied"
        );
        Ok(())
    }

    /// Finish settlement and produce the summary
    pub fn finish(self) -> Settlement {
        Settlement {
            ledger: self.ledger,
            requested: self.requested,
            spent: self.requested - self.remaining,
            unspent: self.remaining,
        }
    }
}
