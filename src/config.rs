use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Full run configuration supplied at call time.
///
/// Every identifier and count the harness needs lives here; nothing is
/// embedded in the core logic. Values are hydrated from a JSON file and may be
/// overridden by command-line flags.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BenchConfig {
    pub service: ServiceConfig,
    pub target: TargetConfig,
    pub workload: WorkloadConfig,
}

impl BenchConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let bytes = fs::read(path)?;
        let config: BenchConfig = serde_json::from_slice(&bytes)?;
        Ok(config)
    }

    /// Loads `path` when given, otherwise starts from defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service.backend == StoreBackend::Http {
            for (name, value) in [
                ("service.endpoint", &self.service.endpoint),
                ("service.project_id", &self.service.project_id),
                ("service.api_key", &self.service.api_key),
            ] {
                if value.trim().is_empty() {
                    return Err(ConfigError::Invalid(format!("{name} must not be empty")));
                }
            }
            if self.service.request_timeout_ms == 0 {
                return Err(ConfigError::Invalid(
                    "service.request_timeout_ms must be greater than zero".into(),
                ));
            }
        }

        let workload = &self.workload;
        if workload.max_workers == 0 {
            return Err(ConfigError::Invalid(
                "workload.max_workers must be greater than zero".into(),
            ));
        }
        if workload.batch_size == 0 {
            return Err(ConfigError::Invalid(
                "workload.batch_size must be greater than zero".into(),
            ));
        }
        if workload.upsert_count > 0 && workload.upsert_batch_size == 0 {
            return Err(ConfigError::Invalid(
                "workload.upsert_batch_size must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Supported store backends.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Http,
    Memory,
}

/// Connection settings for the hosted service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServiceConfig {
    pub backend: StoreBackend,
    /// API root, e.g. `https://cloud.appwrite.io/v1`.
    pub endpoint: String,
    pub project_id: String,
    pub api_key: String,
    pub request_timeout_ms: u64,
    /// Artificial per-call delay applied by the in-memory backend.
    pub simulated_latency_ms: u64,
}

impl ServiceConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn simulated_latency(&self) -> Duration {
        Duration::from_millis(self.simulated_latency_ms)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Http,
            endpoint: "https://cloud.appwrite.io/v1".into(),
            project_id: String::new(),
            api_key: String::new(),
            request_timeout_ms: 30_000,
            simulated_latency_ms: 0,
        }
    }
}

/// Command-line overrides for the connection settings, shared by the binaries.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct ServiceOverrides {
    /// Store backend to use.
    #[arg(long, value_enum, global = true)]
    pub backend: Option<StoreBackend>,

    /// API root of the document service.
    #[arg(long, env = "DOCBENCH_ENDPOINT", global = true)]
    pub endpoint: Option<String>,

    /// Project identifier sent with every request.
    #[arg(long, env = "DOCBENCH_PROJECT", global = true)]
    pub project: Option<String>,

    /// API key sent with every request.
    #[arg(long, env = "DOCBENCH_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,
}

impl ServiceOverrides {
    pub fn apply(&self, config: &mut ServiceConfig) {
        if let Some(backend) = self.backend {
            config.backend = backend;
        }
        if let Some(endpoint) = &self.endpoint {
            config.endpoint = endpoint.clone();
        }
        if let Some(project) = &self.project {
            config.project_id = project.clone();
        }
        if let Some(api_key) = &self.api_key {
            config.api_key = api_key.clone();
        }
    }
}

/// Identifiers of the database objects the workload targets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TargetConfig {
    pub database_id: String,
    pub database_name: String,
    pub collection_id: String,
    pub collection_name: String,
    pub bucket_id: Option<String>,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            database_id: "benchmark".into(),
            database_name: "Benchmark".into(),
            collection_id: "users".into(),
            collection_name: "Users".into(),
            bucket_id: None,
        }
    }
}

/// Sizing of the benchmark phases.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WorkloadConfig {
    /// Records written during the create phase.
    pub record_count: usize,
    /// Records handed to the dispatcher per create sub-batch.
    pub batch_size: usize,
    /// Upper bound on operations in flight.
    pub max_workers: usize,
    /// Records written during the upsert phase; zero skips the phase.
    pub upsert_count: usize,
    pub upsert_batch_size: usize,
    /// Number of written records to read back; `None` verifies all of them.
    pub verify_sample: Option<usize>,
    /// Ensure the database, collection and attributes exist before writing.
    pub provision: bool,
    pub seed: Option<u64>,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            record_count: 450,
            batch_size: 50,
            max_workers: 16,
            upsert_count: 0,
            upsert_batch_size: 25,
            verify_sample: None,
            provision: true,
            seed: None,
        }
    }
}
