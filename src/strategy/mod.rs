//! Processing strategy module
//!
//! This module defines the Strategy pattern for complete settlement pipelines,
//! covering source reading, ingestion and settlement. Ingestion can run
//! sequentially or on a tokio worker pool; both strategies settle the same
//! way and must produce identical ledgers for the same input.

use crate::cli::StrategyType;
use crate::core::{Ingestion, PipelineConfig, SettlementEngine};
use crate::types::{LedgerError, Settlement};
use std::path::Path;
use tracing::warn;

pub mod r#async;
pub mod sync;

pub use self::r#async::AsyncProcessingStrategy;
pub use sync::SyncProcessingStrategy;

/// Processing strategy trait for complete settlement pipelines
pub trait ProcessingStrategy: Send + Sync {
    /// Read `input_path`, ingest every row and settle `spend` points
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The input file cannot be read
    /// - The header lacks a required column
    /// - No credit transaction was ingested
    /// - Strict mode is on and a record is malformed
    ///
    /// Malformed records are otherwise logged and skipped. An ingestion
    /// timeout is logged and settlement proceeds with what was ingested.
    fn process(&self, input_path: &Path, spend: u64) -> Result<Settlement, LedgerError>;
}

/// Create a processing strategy based on the specified strategy type
///
/// `config` falls back to [`PipelineConfig::default`] when absent.
pub fn create_strategy(
    strategy_type: StrategyType,
    config: Option<PipelineConfig>,
) -> Box<dyn ProcessingStrategy> {
    let config = config.unwrap_or_default();
    match strategy_type {
        StrategyType::Sync => Box::new(SyncProcessingStrategy::new(config)),
        StrategyType::Async => Box::new(AsyncProcessingStrategy::new(config)),
    }
}

/// Settle a finished ingestion
///
/// Shared by both strategies: logs a soft timeout, refuses an empty credit
/// sink, then runs the settlement engine over the sinks.
pub(crate) fn settle_ingestion(
    mut ingestion: Ingestion,
    spend: u64,
) -> Result<Settlement, LedgerError> {
    if let Some(error) = ingestion.timeout_error() {
        warn!(%error, "settling a partially ingested batch");
    }
    ingestion.ensure_credits()?;

    let settlement = SettlementEngine::settle(
        &mut ingestion.sinks.credits,
        &mut ingestion.sinks.debits,
        spend,
    )?;

    if !settlement.is_fully_spent() {
        warn!(
            requested = settlement.requested,
            unspent = settlement.unspent,
            "spend request exceeds available points"
        );
    }
    Ok(settlement)
}
