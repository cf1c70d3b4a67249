//! Asynchronous worker-pool processing strategy
//!
//! # Architecture
//!
//! ```text
//! AsyncProcessingStrategy
//!     ├── PipelineConfig (workers, timeout, grace_period, strict)
//!     ├── tokio multi-thread runtime (`workers` threads)
//!     ├── read_source_async (tokio::fs)
//!     ├── IngestionPipeline::ingest (one task per row)
//!     └── SettlementEngine (single-threaded, after the join)
//! ```
//!
//! The runtime only lives for the ingestion; settlement runs on the calling
//! thread once every worker has been joined or cancelled.

use crate::core::{IngestionPipeline, PipelineConfig};
use crate::io::read_source_async;
use crate::strategy::{settle_ingestion, ProcessingStrategy};
use crate::types::{LedgerError, Settlement};
use std::path::Path;

/// Asynchronous worker-pool processing strategy
#[derive(Debug, Clone, Default)]
pub struct AsyncProcessingStrategy {
    pipeline: IngestionPipeline,
}

impl AsyncProcessingStrategy {
    /// Create a new AsyncProcessingStrategy with the specified configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            pipeline: IngestionPipeline::new(config),
        }
    }
}

impl ProcessingStrategy for AsyncProcessingStrategy {
    fn process(&self, input_path: &Path, spend: u64) -> Result<Settlement, LedgerError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.pipeline.config().workers.max(1))
            .enable_all()
            .build()
            .map_err(|e| LedgerError::Runtime {
                message: format!("Failed to create tokio runtime: {}", e),
            })?;

        let ingestion = runtime.block_on(async {
            let source = read_source_async(input_path).await?;
            self.pipeline.ingest(&source.header, source.rows).await
        })?;

        settle_ingestion(ingestion, spend)
    }
}
