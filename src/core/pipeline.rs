//! Ingestion pipeline
//!
//! Turns a header plus a batch of raw rows into a populated pair of [`Sinks`].
//!
//! # Concurrency
//!
//! ```text
//! rows ──► JoinSet (one task per row, at most `workers` running)
//!             │  parse_record (no lock held)
//!             ▼
//!          Sinks::route ──► CreditSink (min-heap)  │ lock per sink,
//!                      └──► DebitSink  (stack)     │ insertion only
//! ```
//!
//! The pipeline joins every task before returning. The join is bounded by
//! `timeout`; when it elapses, outstanding tasks are cancelled, a shorter
//! `grace_period` is awaited, and whatever was ingested is returned together
//! with a report flagging the timeout.

use crate::core::parser::{parse_record, ColumnMap};
use crate::core::sinks::Sinks;
use crate::core::traits::TransactionSink;
use crate::types::{LedgerError, RawRecord, Route, Transaction};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);
const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(60);

/// Configuration for the ingestion pipeline
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Maximum number of records parsed concurrently
    pub workers: usize,
    /// Upper bound on waiting for all workers
    pub timeout: Duration,
    /// How long cancelled workers get to stop after a timeout
    pub grace_period: Duration,
    /// Fail the whole batch on the first malformed record
    pub strict: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: num_cpus::get(),
            timeout: DEFAULT_TIMEOUT,
            grace_period: DEFAULT_GRACE_PERIOD,
            strict: false,
        }
    }
}

impl PipelineConfig {
    /// Create a new PipelineConfig, replacing invalid values with defaults
    pub fn new(workers: usize, timeout: Duration, grace_period: Duration, strict: bool) -> Self {
        let default = Self::default();

        let workers = if workers == 0 {
            warn!(
                workers,
                default = default.workers,
                "invalid worker count, using default"
            );
            default.workers
        } else {
            workers
        };

        let timeout = if timeout.is_zero() {
            warn!(
                default_secs = default.timeout.as_secs(),
                "invalid ingestion timeout, using default"
            );
            default.timeout
        } else {
            timeout
        };

        Self {
            workers,
            timeout,
            grace_period,
            strict,
        }
    }
}

/// Counters describing one ingestion run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestionReport {
    /// Rows handed to the pipeline
    pub records: usize,
    /// Rows routed into the credit sink
    pub credits: usize,
    /// Rows routed into the debit sink
    pub debits: usize,
    /// Rows skipped because they failed to parse
    pub malformed: usize,
    /// Rows never ingested because the pipeline timed out
    pub outstanding: usize,
    /// Whether the join deadline elapsed
    pub timed_out: bool,
}

impl IngestionReport {
    fn new(records: usize) -> Self {
        Self {
            records,
            ..Self::default()
        }
    }

    /// Rows that reached a final state (routed or rejected)
    pub fn processed(&self) -> usize {
        self.credits + self.debits + self.malformed
    }

    /// Account for one worker's result
    ///
    /// Malformed records are logged and counted. In strict mode the error is
    /// returned instead so the caller can abort the batch.
    fn record(&mut self, outcome: Result<Route, LedgerError>, strict: bool) -> Result<(), LedgerError> {
        match outcome {
            Ok(Route::Credit) => self.credits += 1,
            Ok(Route::Debit) => self.debits += 1,
            Err(error) => {
                self.malformed += 1;
                if strict {
                    return Err(error);
                }
                warn!(%error, "skipping malformed record");
            }
        }
        Ok(())
    }

    fn finish(&mut self) {
        self.outstanding = self.records.saturating_sub(self.processed());
    }
}

/// Output of an ingestion run
#[derive(Debug)]
pub struct Ingestion {
    /// The populated sinks
    pub sinks: Sinks,
    /// What happened while filling them
    pub report: IngestionReport,
    timeout: Duration,
}

impl Ingestion {
    /// The soft timeout failure, if the join deadline elapsed
    pub fn timeout_error(&self) -> Option<LedgerError> {
        self.report
            .timed_out
            .then(|| LedgerError::pipeline_timeout(self.timeout, self.report.outstanding))
    }

    /// Sanity check before settling: at least one credit must have been ingested
    pub fn ensure_credits(&self) -> Result<(), LedgerError> {
        if self.sinks.credits.is_empty() {
            return Err(LedgerError::EmptyCreditSink);
        }
        Ok(())
    }
}

type RecordParser = fn(&RawRecord, &ColumnMap) -> Result<Transaction, LedgerError>;

enum WorkerOutcome {
    Finished(Result<Route, LedgerError>),
    Cancelled,
}

/// Parses raw rows and routes them into sinks
#[derive(Debug, Clone, Default)]
pub struct IngestionPipeline {
    config: PipelineConfig,
}

impl IngestionPipeline {
    /// Create a pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// The configuration this pipeline runs with
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Ingest rows one at a time on the calling thread
    ///
    /// # Errors
    ///
    /// `SourceFormat` if the header lacks a required column; in strict mode,
    /// the first `MalformedRecord`.
    pub fn ingest_sequential(
        &self,
        header: &str,
        rows: Vec<RawRecord>,
    ) -> Result<Ingestion, LedgerError> {
        let columns = ColumnMap::from_header(header)?;
        let sinks = Sinks::new();
        let mut report = IngestionReport::new(rows.len());

        for record in &rows {
            let outcome = parse_record(record, &columns).map(|tx| sinks.route(tx));
            report.record(outcome, self.config.strict)?;
        }
        report.finish();

        info!(
            records = report.records,
            credits = report.credits,
            debits = report.debits,
            malformed = report.malformed,
            "sequential ingestion finished"
        );

        Ok(Ingestion {
            sinks,
            report,
            timeout: self.config.timeout,
        })
    }

    /// Ingest rows concurrently on the current tokio runtime
    ///
    /// One task is spawned per row; at most `workers` of them parse at once.
    /// Each task parses outside any lock and only holds a sink's lock while
    /// inserting.
    ///
    /// # Errors
    ///
    /// `SourceFormat` if the header lacks a required column (no task is
    /// spawned); in strict mode, the first `MalformedRecord`. A timeout is
    /// not an error here: it is reported through [`Ingestion::timeout_error`].
    pub async fn ingest(&self, header: &str, rows: Vec<RawRecord>) -> Result<Ingestion, LedgerError> {
        self.ingest_with(header, rows, parse_record).await
    }

    async fn ingest_with(
        &self,
        header: &str,
        rows: Vec<RawRecord>,
        parse: RecordParser,
    ) -> Result<Ingestion, LedgerError> {
        let columns = ColumnMap::from_header(header)?;
        let sinks = Arc::new(Sinks::new());
        let permits = Arc::new(Semaphore::new(self.config.workers));
        let cancel = CancellationToken::new();
        let mut report = IngestionReport::new(rows.len());
        let mut tasks = JoinSet::new();

        for record in rows {
            let sinks = Arc::clone(&sinks);
            let permits = Arc::clone(&permits);
            let cancel = cancel.clone();

            tasks.spawn(async move {
                // Closed on cancellation.
                let Ok(_permit) = permits.acquire_owned().await else {
                    return WorkerOutcome::Cancelled;
                };
                if cancel.is_cancelled() {
                    return WorkerOutcome::Cancelled;
                }
                let outcome = parse(&record, &columns).map(|tx| sinks.route(tx));
                WorkerOutcome::Finished(outcome)
            });
        }

        let joined = timeout(
            self.config.timeout,
            Self::join_workers(&mut tasks, &mut report, self.config.strict),
        )
        .await;

        match joined {
            Ok(Ok(())) => {}
            Ok(Err(error)) => {
                self.shutdown(&cancel, &permits, &mut tasks, &mut report).await;
                return Err(error);
            }
            Err(_) => {
                warn!(
                    timeout_secs = self.config.timeout.as_secs_f64(),
                    pending = tasks.len(),
                    "ingestion timed out, cancelling outstanding workers"
                );
                report.timed_out = true;
                self.shutdown(&cancel, &permits, &mut tasks, &mut report).await;
            }
        }
        report.finish();

        info!(
            records = report.records,
            credits = report.credits,
            debits = report.debits,
            malformed = report.malformed,
            outstanding = report.outstanding,
            workers = self.config.workers,
            "concurrent ingestion finished"
        );

        let sinks = Arc::try_unwrap(sinks).unwrap_or_else(|shared| shared.detach());
        Ok(Ingestion {
            sinks,
            report,
            timeout: self.config.timeout,
        })
    }

    async fn join_workers(
        tasks: &mut JoinSet<WorkerOutcome>,
        report: &mut IngestionReport,
        strict: bool,
    ) -> Result<(), LedgerError> {
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(WorkerOutcome::Finished(outcome)) => report.record(outcome, strict)?,
                Ok(WorkerOutcome::Cancelled) => {}
                Err(error) if error.is_cancelled() => {}
                Err(error) => warn!(%error, "ingestion worker panicked"),
            }
        }
        Ok(())
    }

    /// Cancel every outstanding worker and give them `grace_period` to stop
    async fn shutdown(
        &self,
        cancel: &CancellationToken,
        permits: &Semaphore,
        tasks: &mut JoinSet<WorkerOutcome>,
        report: &mut IngestionReport,
    ) {
        cancel.cancel();
        permits.close();
        tasks.abort_all();

        let drained = timeout(
            self.config.grace_period,
            Self::join_workers(tasks, report, false),
        )
        .await
        .is_ok();

        if !drained {
            warn!(
                abandoned = tasks.len(),
                "ingestion workers did not terminate, abandoning them"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::traits::DrainSink;
    use rstest::rstest;

    const HEADER: &str = r#""payer","points","timestamp""#;

    fn rows(lines: &[&str]) -> Vec<RawRecord> {
        lines
            .iter()
            .enumerate()
            .map(|(i, line)| RawRecord::new(i + 2, *line))
            .collect()
    }

    fn fetch_rows() -> Vec<RawRecord> {
        rows(&[
            r#""DANNON",1000,"2020-11-02T14:00:00Z""#,
            r#""UNILEVER",200,"2020-10-31T11:00:00Z""#,
            r#""DANNON",-200,"2020-10-31T15:00:00Z""#,
            r#""MILLER COORS",10000,"2020-11-01T14:00:00Z""#,
            r#""DANNON",300,"2020-10-31T10:00:00Z""#,
        ])
    }

    fn with_malformed() -> Vec<RawRecord> {
        rows(&[
            r#""DANNON",1000,"2020-11-02T14:00:00Z""#,
            r#""UNILEVER",abc,"2020-10-31T11:00:00Z""#,
            r#""DANNON",-200,"2020-10-31T15:00:00Z""#,
        ])
    }

    #[rstest]
    #[case::zero_workers(0, Duration::from_secs(5), num_cpus::get(), Duration::from_secs(5))]
    #[case::zero_timeout(4, Duration::ZERO, 4, DEFAULT_TIMEOUT)]
    #[case::valid(2, Duration::from_secs(1), 2, Duration::from_secs(1))]
    fn test_config_new_falls_back_to_defaults(
        #[case] workers: usize,
        #[case] timeout: Duration,
        #[case] expected_workers: usize,
        #[case] expected_timeout: Duration,
    ) {
        let config = PipelineConfig::new(workers, timeout, Duration::from_secs(1), false);
        assert_eq!(config.workers, expected_workers);
        assert_eq!(config.timeout, expected_timeout);
    }

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.workers, num_cpus::get());
        assert_eq!(config.timeout, Duration::from_secs(600));
        assert_eq!(config.grace_period, Duration::from_secs(60));
        assert!(!config.strict);
    }

    #[test]
    fn test_sequential_routes_by_sign() {
        let pipeline = IngestionPipeline::default();
        let ingestion = pipeline.ingest_sequential(HEADER, fetch_rows()).unwrap();

        assert_eq!(ingestion.report.credits, 4);
        assert_eq!(ingestion.report.debits, 1);
        assert_eq!(ingestion.sinks.credits.len(), 4);
        assert_eq!(ingestion.sinks.debits.len(), 1);
        assert!(ingestion.timeout_error().is_none());
        assert!(ingestion.ensure_credits().is_ok());
    }

    #[test]
    fn test_missing_column_fails_before_ingestion() {
        let pipeline = IngestionPipeline::default();
        let error = pipeline
            .ingest_sequential(r#""payer","timestamp""#, fetch_rows())
            .unwrap_err();
        assert_eq!(error, LedgerError::source_format(&["points"]));
    }

    #[test]
    fn test_sequential_skips_malformed_records() {
        let pipeline = IngestionPipeline::default();
        let ingestion = pipeline.ingest_sequential(HEADER, with_malformed()).unwrap();

        assert_eq!(ingestion.report.malformed, 1);
        assert_eq!(ingestion.report.processed(), 3);
        assert_eq!(ingestion.report.outstanding, 0);
        assert_eq!(ingestion.sinks.len(), 2);
    }

    #[test]
    fn test_sequential_strict_fails_fast() {
        let config = PipelineConfig {
            strict: true,
            ..PipelineConfig::default()
        };
        let pipeline = IngestionPipeline::new(config);
        let error = pipeline.ingest_sequential(HEADER, with_malformed()).unwrap_err();

        assert!(error.is_record_level());
        assert!(error.to_string().contains("line 3"));
    }

    #[test]
    fn test_ensure_credits_rejects_debit_only_batch() {
        let pipeline = IngestionPipeline::default();
        let ingestion = pipeline
            .ingest_sequential(HEADER, rows(&[r#""DANNON",-5,"2020-11-02T14:00:00Z""#]))
            .unwrap();
        assert_eq!(ingestion.ensure_credits(), Err(LedgerError::EmptyCreditSink));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_ingestion_matches_sequential() {
        let pipeline = IngestionPipeline::new(PipelineConfig::new(
            4,
            Duration::from_secs(30),
            Duration::from_secs(1),
            false,
        ));

        let mut concurrent = pipeline.ingest(HEADER, fetch_rows()).await.unwrap();
        let mut sequential = pipeline.ingest_sequential(HEADER, fetch_rows()).unwrap();

        assert_eq!(concurrent.report, sequential.report);
        assert!(!concurrent.report.timed_out);

        while let Some(expected) = sequential.sinks.credits.pop() {
            assert_eq!(concurrent.sinks.credits.pop(), Some(expected));
        }
        assert!(concurrent.sinks.credits.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_ingestion_of_large_batch() {
        let lines: Vec<String> = (0..2_000)
            .map(|i| {
                let points = if i % 4 == 0 { -1 } else { 3 };
                format!(
                    "\"P{}\",{},\"2021-01-01T{:02}:{:02}:{:02}Z\"",
                    i % 7,
                    points,
                    i / 3600,
                    (i / 60) % 60,
                    i % 60
                )
            })
            .collect();
        let records: Vec<RawRecord> = lines
            .iter()
            .enumerate()
            .map(|(i, line)| RawRecord::new(i + 2, line.as_str()))
            .collect();

        let pipeline = IngestionPipeline::default();
        let mut ingestion = pipeline.ingest(HEADER, records).await.unwrap();

        assert_eq!(ingestion.report.debits, 500);
        assert_eq!(ingestion.report.credits, 1_500);
        assert_eq!(ingestion.report.outstanding, 0);

        let mut previous = None;
        while let Some(tx) = ingestion.sinks.credits.pop() {
            if let Some(prev) = previous {
                assert!(prev <= tx.timestamp());
            }
            previous = Some(tx.timestamp());
        }
    }

    #[tokio::test]
    async fn test_concurrent_missing_column_fails() {
        let pipeline = IngestionPipeline::default();
        let error = pipeline
            .ingest("points,timestamp", fetch_rows())
            .await
            .unwrap_err();
        assert_eq!(error, LedgerError::source_format(&["payer"]));
    }

    #[tokio::test]
    async fn test_concurrent_skips_malformed_records() {
        let pipeline = IngestionPipeline::default();
        let ingestion = pipeline.ingest(HEADER, with_malformed()).await.unwrap();

        assert_eq!(ingestion.report.malformed, 1);
        assert_eq!(ingestion.sinks.len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_strict_fails_fast() {
        let config = PipelineConfig {
            strict: true,
            ..PipelineConfig::default()
        };
        let pipeline = IngestionPipeline::new(config);
        let error = pipeline.ingest(HEADER, with_malformed()).await.unwrap_err();
        assert!(error.is_record_level());
    }

    #[tokio::test]
    async fn test_timeout_when_workers_never_start() {
        // No permits: every worker waits until the pipeline gives up.
        let config = PipelineConfig {
            workers: 0,
            timeout: Duration::from_millis(50),
            grace_period: Duration::from_secs(1),
            strict: false,
        };
        let pipeline = IngestionPipeline::new(config);
        let ingestion = pipeline.ingest(HEADER, fetch_rows()).await.unwrap();

        assert!(ingestion.report.timed_out);
        assert_eq!(ingestion.report.outstanding, 5);
        assert!(ingestion.sinks.is_empty());
        assert_eq!(
            ingestion.timeout_error(),
            Some(LedgerError::pipeline_timeout(Duration::from_millis(50), 5))
        );
        assert_eq!(ingestion.ensure_credits(), Err(LedgerError::EmptyCreditSink));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_timeout_abandons_stuck_worker_and_keeps_routed_records() {
        // Line 3 blocks its thread past both the deadline and the grace period.
        fn stuck_on_line_three(
            record: &RawRecord,
            columns: &ColumnMap,
        ) -> Result<Transaction, LedgerError> {
            if record.line == 3 {
                std::thread::sleep(Duration::from_millis(1_500));
            }
            parse_record(record, columns)
        }

        let config = PipelineConfig {
            workers: 2,
            timeout: Duration::from_millis(300),
            grace_period: Duration::from_millis(100),
            strict: false,
        };
        let pipeline = IngestionPipeline::new(config);
        let mut ingestion = pipeline
            .ingest_with(HEADER, fetch_rows(), stuck_on_line_three)
            .await
            .unwrap();

        assert!(ingestion.report.timed_out);
        assert_eq!(ingestion.report.credits, 3);
        assert_eq!(ingestion.report.debits, 1);
        assert_eq!(ingestion.report.outstanding, 1);
        assert_eq!(
            ingestion.timeout_error(),
            Some(LedgerError::pipeline_timeout(Duration::from_millis(300), 1))
        );

        // Detached sinks hold exactly what was routed before the deadline.
        assert_eq!(ingestion.sinks.debits.len(), 1);
        let payers: Vec<(String, i64)> = std::iter::from_fn(|| ingestion.sinks.credits.pop())
            .map(|tx| (tx.payer().to_string(), tx.points()))
            .collect();
        assert_eq!(
            payers,
            vec![
                ("DANNON".to_string(), 300),
                ("MILLER COORS".to_string(), 10000),
                ("DANNON".to_string(), 1000),
            ]
        );
    }
}
