use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::TargetConfig;
use crate::types::{Document, DocumentId, Fields, FileFilter, FileInfo, Page};

/// Errors surfaced by store implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("rate limited: {0}")]
    RateLimited(String),
    #[error("service error {status}: {message}")]
    Service { status: u16, message: String },
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed {0} response from service")]
    MalformedResponse(&'static str),
    #[error("invalid service endpoint {0}")]
    InvalidEndpoint(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

/// Database and collection addressed by document operations.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Target {
    pub database_id: String,
    pub collection_id: String,
}

impl Target {
    pub fn new(database_id: impl Into<String>, collection_id: impl Into<String>) -> Self {
        Self {
            database_id: database_id.into(),
            collection_id: collection_id.into(),
        }
    }
}

impl From<&TargetConfig> for Target {
    fn from(config: &TargetConfig) -> Self {
        Self::new(&config.database_id, &config.collection_id)
    }
}

/// Data-plane capabilities consumed from the hosted document service.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn create_document(
        &self,
        target: &Target,
        id: DocumentId,
        fields: Fields,
    ) -> Result<Document, StoreError>;

    async fn upsert_documents(
        &self,
        target: &Target,
        documents: Vec<Document>,
    ) -> Result<Vec<Document>, StoreError>;

    async fn get_document(&self, target: &Target, id: &DocumentId)
    -> Result<Document, StoreError>;

    async fn list_documents(
        &self,
        target: &Target,
        limit: u32,
        offset: u32,
    ) -> Result<Page, StoreError>;

    async fn list_files(
        &self,
        bucket_id: &str,
        filter: &FileFilter,
    ) -> Result<Vec<FileInfo>, StoreError>;
}

/// Typed attribute definitions understood by the management API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AttributeKind {
    String { size: u32 },
    Email,
    Integer { min: Option<i64>, max: Option<i64> },
}

impl AttributeKind {
    pub fn name(&self) -> &'static str {
        match self {
            AttributeKind::String { .. } => "string",
            AttributeKind::Email => "email",
            AttributeKind::Integer { .. } => "integer",
        }
    }
}

/// Build state of an attribute; the service creates attributes asynchronously.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeStatus {
    Available,
    Processing,
    Failed(String),
}

impl AttributeStatus {
    pub fn from_wire(status: &str, error: &str) -> Self {
        match status {
            "available" => AttributeStatus::Available,
            "failed" | "stuck" => AttributeStatus::Failed(error.to_string()),
            _ => AttributeStatus::Processing,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AttributeSpec {
    pub key: String,
    pub kind: AttributeKind,
    pub required: bool,
}

impl AttributeSpec {
    pub fn new(key: impl Into<String>, kind: AttributeKind, required: bool) -> Self {
        Self {
            key: key.into(),
            kind,
            required,
        }
    }
}

/// Management capabilities used once, before the workload, to provision the target.
///
/// `get_*` calls return `StoreError::NotFound` when the object is absent.
#[async_trait]
pub trait SchemaAdmin: Send + Sync {
    async fn get_database(&self, database_id: &str) -> Result<(), StoreError>;

    async fn create_database(&self, database_id: &str, name: &str) -> Result<(), StoreError>;

    async fn get_collection(&self, target: &Target) -> Result<(), StoreError>;

    async fn create_collection(&self, target: &Target, name: &str) -> Result<(), StoreError>;

    async fn get_attribute(&self, target: &Target, key: &str)
    -> Result<AttributeStatus, StoreError>;

    async fn create_attribute(
        &self,
        target: &Target,
        attribute: &AttributeSpec,
    ) -> Result<(), StoreError>;
}
