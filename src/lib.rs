//! Core crate exports for docbench.
//!
//! The modules exposed here split the benchmark into its moving parts: the
//! store clients, workload generation, bounded dispatch, latency recording,
//! read-back verification and reporting. `pipeline` wires them into a run.

pub mod config;
pub mod dispatch;
pub mod metrics;
pub mod pipeline;
pub mod provision;
pub mod report;
pub mod store;
pub mod types;
pub mod verify;
pub mod workload;

pub use config::{
    BenchConfig, ConfigError, ServiceConfig, ServiceOverrides, StoreBackend, TargetConfig,
    WorkloadConfig,
};
pub use dispatch::{Completed, Dispatcher, TaskFailure};
pub use metrics::{LatencyHistogram, Phase, PhaseTimer, Recorder, bucket_index};
pub use pipeline::{
    Harness, OperationResult, PhaseCounts, PipelineError, RunReport, run_pipeline,
};
pub use provision::{ProvisionError, ProvisionReport, SchemaSpec, ensure_schema};
pub use report::{PhaseReport, PhaseSummary, summarize};
pub use store::{
    DocumentStore, HttpStore, InMemoryStore, SchemaAdmin, StoreAdapter, StoreError, Target,
};
pub use types::{Document, DocumentId, Fields, FileFilter, FileInfo, Page};
pub use workload::{RecordGenerator, SyntheticRecord};
