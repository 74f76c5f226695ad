use async_trait::async_trait;

use crate::config::{ServiceConfig, StoreBackend};
use crate::types::{Document, DocumentId, Fields, FileFilter, FileInfo, Page};

use super::engine::{
    AttributeSpec, AttributeStatus, DocumentStore, SchemaAdmin, StoreError, Target,
};
use super::http::HttpStore;
use super::memory::InMemoryStore;

/// Runtime-selectable store so binaries can switch between the hosted service
/// and a local dry-run backend.
pub enum StoreAdapter {
    Http(HttpStore),
    Memory(InMemoryStore),
}

impl StoreAdapter {
    pub fn from_config(config: &ServiceConfig) -> Result<Self, StoreError> {
        match config.backend {
            StoreBackend::Http => Ok(Self::Http(HttpStore::connect(config)?)),
            StoreBackend::Memory => Ok(Self::Memory(InMemoryStore::with_latency(
                config.simulated_latency(),
            ))),
        }
    }
}

#[async_trait]
impl DocumentStore for StoreAdapter {
    async fn create_document(
        &self,
        target: &Target,
        id: DocumentId,
        fields: Fields,
    ) -> Result<Document, StoreError> {
        match self {
            StoreAdapter::Http(inner) => inner.create_document(target, id, fields).await,
            StoreAdapter::Memory(inner) => inner.create_document(target, id, fields).await,
        }
    }

    async fn upsert_documents(
        &self,
        target: &Target,
        documents: Vec<Document>,
    ) -> Result<Vec<Document>, StoreError> {
        match self {
            StoreAdapter::Http(inner) => inner.upsert_documents(target, documents).await,
            StoreAdapter::Memory(inner) => inner.upsert_documents(target, documents).await,
        }
    }

    async fn get_document(
        &self,
        target: &Target,
        id: &DocumentId,
    ) -> Result<Document, StoreError> {
        match self {
            StoreAdapter::Http(inner) => inner.get_document(target, id).await,
            StoreAdapter::Memory(inner) => inner.get_document(target, id).await,
        }
    }

    async fn list_documents(
        &self,
        target: &Target,
        limit: u32,
        offset: u32,
    ) -> Result<Page, StoreError> {
        match self {
            StoreAdapter::Http(inner) => inner.list_documents(target, limit, offset).await,
            StoreAdapter::Memory(inner) => inner.list_documents(target, limit, offset).await,
        }
    }

    async fn list_files(
        &self,
        bucket_id: &str,
        filter: &FileFilter,
    ) -> Result<Vec<FileInfo>, StoreError> {
        match self {
            StoreAdapter::Http(inner) => inner.list_files(bucket_id, filter).await,
            StoreAdapter::Memory(inner) => inner.list_files(bucket_id, filter).await,
        }
    }
}

#[async_trait]
impl SchemaAdmin for StoreAdapter {
    async fn get_database(&self, database_id: &str) -> Result<(), StoreError> {
        match self {
            StoreAdapter::Http(inner) => inner.get_database(database_id).await,
            StoreAdapter::Memory(inner) => inner.get_database(database_id).await,
        }
    }

    async fn create_database(&self, database_id: &str, name: &str) -> Result<(), StoreError> {
        match self {
            StoreAdapter::Http(inner) => inner.create_database(database_id, name).await,
            StoreAdapter::Memory(inner) => inner.create_database(database_id, name).await,
        }
    }

    async fn get_collection(&self, target: &Target) -> Result<(), StoreError> {
        match self {
            StoreAdapter::Http(inner) => inner.get_collection(target).await,
            StoreAdapter::Memory(inner) => inner.get_collection(target).await,
        }
    }

    async fn create_collection(&self, target: &Target, name: &str) -> Result<(), StoreError> {
        match self {
            StoreAdapter::Http(inner) => inner.create_collection(target, name).await,
            StoreAdapter::Memory(inner) => inner.create_collection(target, name).await,
        }
    }

    async fn get_attribute(
        &self,
        target: &Target,
        key: &str,
    ) -> Result<AttributeStatus, StoreError> {
        match self {
            StoreAdapter::Http(inner) => inner.get_attribute(target, key).await,
            StoreAdapter::Memory(inner) => inner.get_attribute(target, key).await,
        }
    }

    async fn create_attribute(
        &self,
        target: &Target,
        attribute: &AttributeSpec,
    ) -> Result<(), StoreError> {
        match self {
            StoreAdapter::Http(inner) => inner.create_attribute(target, attribute).await,
            StoreAdapter::Memory(inner) => inner.create_attribute(target, attribute).await,
        }
    }
}
