//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `transaction`: Transaction, raw record and routing types
//! - `ledger`: Final payer balances and settlement summary
//! - `error`: Error types for the points ledger

pub mod error;
pub mod ledger;
pub mod transaction;

pub use error::LedgerError;
pub use ledger::{Ledger, Settlement};
pub use transaction::{Payer, Points, RawRecord, Route, Transaction};
