//! Synchronous processing strategy
//!
//! Reads the source on the calling thread, ingests rows one at a time and
//! settles. No runtime and no worker threads are involved, which makes this
//! the reference behaviour the concurrent strategy is checked against.

use crate::core::{IngestionPipeline, PipelineConfig};
use crate::io::read_source;
use crate::strategy::{settle_ingestion, ProcessingStrategy};
use crate::types::{LedgerError, Settlement};
use std::path::Path;

/// Synchronous processing strategy
///
/// Only `strict` is taken from the configuration; worker count and timeouts
/// do not apply to sequential ingestion.
///
/// # Examples
///
/// ```no_run
/// use points_ledger::core::PipelineConfig;
/// use points_ledger::strategy::{ProcessingStrategy, SyncProcessingStrategy};
/// use std::path::Path;
///
/// let strategy = SyncProcessingStrategy::new(PipelineConfig::default());
/// let settlement = strategy
///     .process(Path::new("transactions.csv"), 5000)
///     .expect("Processing failed");
/// println!("{} payers", settlement.ledger.len());
/// ```
#[derive(Debug, Clone, Default)]
pub struct SyncProcessingStrategy {
    pipeline: IngestionPipeline,
}

impl SyncProcessingStrategy {
    /// Create a new SyncProcessingStrategy
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            pipeline: IngestionPipeline::new(config),
        }
    }
}

impl ProcessingStrategy for SyncProcessingStrategy {
    fn process(&self, input_path: &Path, spend: u64) -> Result<Settlement, LedgerError> {
        let source = read_source(input_path)?;
        let ingestion = self
            .pipeline
            .ingest_sequential(&source.header, source.rows)?;
        settle_ingestion(ingestion, spend)
    }
}
