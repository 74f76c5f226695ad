//! The benchmark run: create, optionally upsert, then read back and verify.
//!
//! Phases run strictly in sequence; inside a phase every operation goes
//! through the same bounded `Dispatcher` and is timed by the shared
//! `Recorder`.

use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::config::{BenchConfig, ConfigError};
use crate::dispatch::{Completed, Dispatcher};
use crate::metrics::{Phase, Recorder};
use crate::provision::{ProvisionError, ProvisionReport, SchemaSpec, ensure_schema};
use crate::report::{PhaseReport, summarize};
use crate::store::{DocumentStore, SchemaAdmin, Target};
use crate::types::{Document, DocumentId};
use crate::verify::{self, check_field};
use crate::workload::{RecordGenerator, SyntheticRecord, VERIFY_FIELD};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("provisioning failed: {0}")]
    Provision(#[from] ProvisionError),
}

/// Outcome of writing one record.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationResult {
    /// Service identifier; `None` when the write failed.
    pub record_id: Option<DocumentId>,
    /// Value written to the verification field.
    pub echoed_field: String,
    /// Wall-clock duration of the call; `None` when the write failed.
    pub duration_ms: Option<f64>,
}

impl OperationResult {
    fn failed(echoed_field: String) -> Self {
        Self {
            record_id: None,
            echoed_field,
            duration_ms: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.record_id.is_some()
    }

    /// Identifier and expected value for read-back, if the write landed.
    pub fn written(&self) -> Option<(DocumentId, String)> {
        self.record_id
            .clone()
            .map(|id| (id, self.echoed_field.clone()))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PhaseCounts {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl PhaseCounts {
    fn absorb(&mut self, results: &[OperationResult]) {
        let succeeded = results.iter().filter(|r| r.is_success()).count();
        self.attempted += results.len();
        self.succeeded += succeeded;
        self.failed += results.len() - succeeded;
    }
}

#[derive(Debug)]
pub struct RunReport {
    pub provisioned: Option<ProvisionReport>,
    pub writes: PhaseCounts,
    pub upserts: PhaseCounts,
    /// `succeeded` counts reads whose field matched the written value.
    pub verified: PhaseCounts,
    pub phases: Vec<PhaseReport>,
}

/// Phase runners sharing one dispatcher and one recorder.
pub struct Harness<S> {
    store: Arc<S>,
    target: Target,
    dispatcher: Dispatcher,
    recorder: Arc<Recorder>,
}

impl<S> Harness<S>
where
    S: DocumentStore + 'static,
{
    pub fn new(store: Arc<S>, target: Target, max_workers: usize) -> Self {
        Self {
            store,
            target,
            dispatcher: Dispatcher::new(max_workers),
            recorder: Arc::new(Recorder::new()),
        }
    }

    pub fn recorder(&self) -> &Arc<Recorder> {
        &self.recorder
    }

    /// Creates one document per record, each as its own timed call.
    pub async fn create(&self, records: Vec<SyntheticRecord>) -> Vec<OperationResult> {
        let emails: Vec<String> = records.iter().map(|r| r.email.clone()).collect();
        let operations = records.into_iter().map(|record| {
            let store = self.store.clone();
            let target = self.target.clone();
            let recorder = self.recorder.clone();
            async move {
                let timer = recorder.start(Phase::Write);
                match store
                    .create_document(&target, DocumentId::unique(), record.to_fields())
                    .await
                {
                    Ok(document) => {
                        let elapsed = timer.succeeded();
                        Ok(OperationResult {
                            record_id: Some(document.id),
                            echoed_field: record.email,
                            duration_ms: Some(elapsed.as_secs_f64() * 1000.0),
                        })
                    }
                    Err(err) => {
                        timer.failed();
                        Err(err)
                    }
                }
            }
        });

        let completed = self.dispatcher.run_concurrently(operations).await;
        completed
            .into_iter()
            .map(|Completed { index, result }| {
                result.unwrap_or_else(|_| OperationResult::failed(emails[index].clone()))
            })
            .collect()
    }

    /// Upserts records in chunks; every chunk is one timed call, and all of
    /// its records share that call's outcome.
    pub async fn upsert(
        &self,
        records: Vec<SyntheticRecord>,
        chunk_size: usize,
    ) -> Vec<OperationResult> {
        let chunks: Vec<Vec<(DocumentId, SyntheticRecord)>> = records
            .chunks(chunk_size.max(1))
            .map(|chunk| {
                chunk
                    .iter()
                    .map(|record| (DocumentId::unique(), record.clone()))
                    .collect()
            })
            .collect();

        let operations = chunks.iter().map(|chunk| {
            let documents: Vec<Document> = chunk
                .iter()
                .map(|(id, record)| Document::new(id.clone(), record.to_fields()))
                .collect();
            let store = self.store.clone();
            let target = self.target.clone();
            let recorder = self.recorder.clone();
            async move {
                let timer = recorder.start(Phase::Upsert);
                match store.upsert_documents(&target, documents).await {
                    Ok(_) => Ok(timer.succeeded()),
                    Err(err) => {
                        timer.failed();
                        Err(err)
                    }
                }
            }
        });

        let completed = self.dispatcher.run_concurrently(operations).await;
        let mut results = Vec::with_capacity(records.len());
        for Completed { index, result } in completed {
            let chunk = &chunks[index];
            match result {
                Ok(elapsed) => {
                    let duration_ms = elapsed.as_secs_f64() * 1000.0;
                    results.extend(chunk.iter().map(|(id, record)| OperationResult {
                        record_id: Some(id.clone()),
                        echoed_field: record.email.clone(),
                        duration_ms: Some(duration_ms),
                    }));
                }
                Err(_) => results.extend(
                    chunk
                        .iter()
                        .map(|(_, record)| OperationResult::failed(record.email.clone())),
                ),
            }
        }
        results
    }

    /// Reads each document back and compares the verification field.
    pub async fn verify(&self, written: Vec<(DocumentId, String)>) -> PhaseCounts {
        let operations = written.into_iter().map(|(id, expected)| {
            let store = self.store.clone();
            let target = self.target.clone();
            let recorder = self.recorder.clone();
            async move {
                let timer = recorder.start(Phase::Read);
                match store.get_document(&target, &id).await {
                    Ok(document) => {
                        timer.succeeded();
                        let check = check_field(&document, VERIFY_FIELD, &expected);
                        Ok(verify::report(&id, VERIFY_FIELD, &expected, check))
                    }
                    Err(err) => {
                        timer.failed();
                        Err(err)
                    }
                }
            }
        });

        let completed = self.dispatcher.run_concurrently(operations).await;
        let succeeded = completed
            .iter()
            .filter(|c| matches!(c.result, Ok(true)))
            .count();
        PhaseCounts {
            attempted: completed.len(),
            succeeded,
            failed: completed.len() - succeeded,
        }
    }

    pub fn summarize(&self) -> Vec<PhaseReport> {
        Phase::ALL
            .into_iter()
            .map(|phase| summarize(&self.recorder, phase))
            .collect()
    }
}

/// Picks up to `size` entries uniformly; `None` keeps all of them.
pub fn sample<T>(mut items: Vec<T>, size: Option<usize>, seed: Option<u64>) -> Vec<T> {
    let Some(size) = size else {
        return items;
    };
    if size < items.len() {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        items.shuffle(&mut rng);
        items.truncate(size);
    }
    items
}

/// Runs provisioning (optional), then the create, upsert and verify phases.
///
/// `admin` is only touched before any document is written.
pub async fn run_pipeline<S, A>(
    store: Arc<S>,
    admin: &A,
    config: &BenchConfig,
) -> Result<RunReport, PipelineError>
where
    S: DocumentStore + 'static,
    A: SchemaAdmin + ?Sized,
{
    config.validate()?;
    let workload = &config.workload;

    let provisioned = if workload.provision {
        let spec = SchemaSpec::for_records(&config.target);
        let report = ensure_schema(admin, &spec).await?;
        info!(created = report.created.len(), "target provisioned");
        Some(report)
    } else {
        None
    };

    let harness = Harness::new(store, Target::from(&config.target), workload.max_workers);
    let mut generator = RecordGenerator::new(workload.seed);
    let mut written = Vec::new();

    info!(
        records = workload.record_count,
        batch_size = workload.batch_size,
        max_workers = workload.max_workers,
        "create phase started"
    );
    let mut writes = PhaseCounts::default();
    let mut remaining = workload.record_count;
    while remaining > 0 {
        let batch = remaining.min(workload.batch_size);
        let results = harness.create(generator.generate_batch(batch)).await;
        writes.absorb(&results);
        written.extend(results.iter().filter_map(OperationResult::written));
        remaining -= batch;
    }
    info!(succeeded = writes.succeeded, failed = writes.failed, "create phase finished");

    let mut upserts = PhaseCounts::default();
    if workload.upsert_count > 0 {
        info!(
            records = workload.upsert_count,
            chunk = workload.upsert_batch_size,
            "upsert phase started"
        );
        let results = harness
            .upsert(
                generator.generate_batch(workload.upsert_count),
                workload.upsert_batch_size,
            )
            .await;
        upserts.absorb(&results);
        written.extend(results.iter().filter_map(OperationResult::written));
        info!(succeeded = upserts.succeeded, failed = upserts.failed, "upsert phase finished");
    }

    let targets = sample(written, workload.verify_sample, workload.seed);
    info!(records = targets.len(), "verify phase started");
    let verified = harness.verify(targets).await;
    info!(verified = verified.succeeded, unverified = verified.failed, "verify phase finished");

    Ok(RunReport {
        provisioned,
        writes,
        upserts,
        verified,
        phases: harness.summarize(),
    })
}
