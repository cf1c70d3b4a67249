//! Points Ledger Library
//! # Overview
//!
//! This library settles a spend request against a batch of timestamped point
//! transactions from multiple payers, spending the oldest points first and
//! never leaving a payer with a debit unaccounted for.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Core data types (Transaction, Ledger, Settlement, errors)
//! - [`cli`] - CLI arguments parsing
//! - [`core`] - Business logic components:
//!   - [`core::parser`] - Header resolution and record parsing
//!   - [`core::sinks`] - Concurrent credit (oldest-first) and debit sinks
//!   - [`core::pipeline`] - Sequential and worker-pool ingestion
//!   - [`core::engine`] - Two-phase settlement
//! - [`io`] - Source reading and ledger output
//! - [`strategy`] - Sync and async end-to-end processing strategies
//!
//! # Settlement
//!
//! - **Debit phase**: every negative transaction is applied first
//! - **Credit phase**: positive transactions are drained oldest first; a
//!   negative balance is closed before any points are spent, and only the
//!   unspent surplus accrues to the payer

// Module declarations
pub mod cli;
pub mod core;
pub mod io;
pub mod strategy;
pub mod types;

pub use core::{IngestionPipeline, PipelineConfig, SettlementEngine};
pub use io::{write_ledger, OutputFormat};
pub use types::{Ledger, LedgerError, Payer, Points, RawRecord, Settlement, Transaction};
