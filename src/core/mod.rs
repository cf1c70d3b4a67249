//! Core business logic module
//!
//! This module contains the core ledger components:
//! - `traits` - Sink abstractions shared by ingestion and settlement
//! - `parser` - Header resolution and raw record parsing
//! - `sinks` - Concurrent credit/debit sinks
//! - `pipeline` - Concurrent and sequential ingestion
//! - `engine` - Two-phase ledger settlement

pub mod engine;
pub mod parser;
pub mod pipeline;
pub mod sinks;
pub mod traits;

pub use engine::SettlementEngine;
pub use parser::{parse_record, ColumnMap};
pub use pipeline::{Ingestion, IngestionPipeline, IngestionReport, PipelineConfig};
pub use sinks::{CreditSink, DebitSink, Sinks};
pub use traits::{DrainSink, TransactionSink};
