use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::sleep;

use crate::types::{Document, DocumentId, Fields, FileFilter, FileInfo, Page};

use super::engine::{
    AttributeSpec, AttributeStatus, DocumentStore, SchemaAdmin, StoreError, Target,
};

#[derive(Debug, Default)]
struct Collection {
    attributes: HashMap<String, AttributeSpec>,
    documents: BTreeMap<DocumentId, Fields>,
}

#[derive(Debug, Default)]
struct State {
    databases: HashSet<String>,
    collections: HashMap<Target, Collection>,
    buckets: HashMap<String, Vec<FileInfo>>,
}

/// Process-local implementation of the document service.
///
/// Mirrors the hosted service's observable behavior closely enough for dry
/// runs and tests: writes require a provisioned collection, duplicate ids
/// conflict, and reads of unknown ids are `NotFound`.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
    latency: Duration,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every call by `latency` to approximate a network round trip.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            state: RwLock::default(),
            latency,
        }
    }

    /// Creates the database and collection directly, bypassing the admin API.
    pub async fn provisioned(target: &Target) -> Self {
        let store = Self::new();
        {
            let mut state = store.state.write().await;
            state.databases.insert(target.database_id.clone());
            state
                .collections
                .insert(target.clone(), Collection::default());
        }
        store
    }

    pub async fn add_file(&self, file: FileInfo) {
        let mut state = self.state.write().await;
        state
            .buckets
            .entry(file.bucket_id.clone())
            .or_default()
            .push(file);
    }

    pub async fn document_count(&self, target: &Target) -> usize {
        let state = self.state.read().await;
        state
            .collections
            .get(target)
            .map(|collection| collection.documents.len())
            .unwrap_or(0)
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            sleep(self.latency).await;
        }
    }
}

fn collection_not_found(target: &Target) -> StoreError {
    StoreError::NotFound(format!(
        "collection {}/{}",
        target.database_id, target.collection_id
    ))
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn create_document(
        &self,
        target: &Target,
        id: DocumentId,
        fields: Fields,
    ) -> Result<Document, StoreError> {
        self.simulate_latency().await;
        let mut state = self.state.write().await;
        let collection = state
            .collections
            .get_mut(target)
            .ok_or_else(|| collection_not_found(target))?;

        if collection.documents.contains_key(&id) {
            return Err(StoreError::Conflict(format!("document {id} already exists")));
        }
        collection.documents.insert(id.clone(), fields.clone());
        Ok(Document::new(id, fields))
    }

    async fn upsert_documents(
        &self,
        target: &Target,
        documents: Vec<Document>,
    ) -> Result<Vec<Document>, StoreError> {
        self.simulate_latency().await;
        let mut state = self.state.write().await;
        let collection = state
            .collections
            .get_mut(target)
            .ok_or_else(|| collection_not_found(target))?;

        for document in &documents {
            collection
                .documents
                .insert(document.id.clone(), document.fields.clone());
        }
        Ok(documents)
    }

    async fn get_document(
        &self,
        target: &Target,
        id: &DocumentId,
    ) -> Result<Document, StoreError> {
        self.simulate_latency().await;
        let state = self.state.read().await;
        let collection = state
            .collections
            .get(target)
            .ok_or_else(|| collection_not_found(target))?;

        collection
            .documents
            .get(id)
            .map(|fields| Document::new(id.clone(), fields.clone()))
            .ok_or_else(|| StoreError::NotFound(format!("document {id}")))
    }

    async fn list_documents(
        &self,
        target: &Target,
        limit: u32,
        offset: u32,
    ) -> Result<Page, StoreError> {
        self.simulate_latency().await;
        let state = self.state.read().await;
        let collection = state
            .collections
            .get(target)
            .ok_or_else(|| collection_not_found(target))?;

        let documents = collection
            .documents
            .iter()
            .skip(offset as usize)
            .take(limit as usize)
            .map(|(id, fields)| Document::new(id.clone(), fields.clone()))
            .collect();

        Ok(Page {
            total: collection.documents.len() as u64,
            documents,
        })
    }

    async fn list_files(
        &self,
        bucket_id: &str,
        filter: &FileFilter,
    ) -> Result<Vec<FileInfo>, StoreError> {
        self.simulate_latency().await;
        let state = self.state.read().await;
        let files = state
            .buckets
            .get(bucket_id)
            .ok_or_else(|| StoreError::NotFound(format!("bucket {bucket_id}")))?;

        let limit = filter.limit.map(|l| l as usize).unwrap_or(usize::MAX);
        Ok(files
            .iter()
            .filter(|file| filter.matches(file))
            .take(limit)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl SchemaAdmin for InMemoryStore {
    async fn get_database(&self, database_id: &str) -> Result<(), StoreError> {
        let state = self.state.read().await;
        if state.databases.contains(database_id) {
            Ok(())
        } else {
            Err(StoreError::NotFound(format!("database {database_id}")))
        }
    }

    async fn create_database(&self, database_id: &str, _name: &str) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if !state.databases.insert(database_id.to_string()) {
            return Err(StoreError::Conflict(format!(
                "database {database_id} already exists"
            )));
        }
        Ok(())
    }

    async fn get_collection(&self, target: &Target) -> Result<(), StoreError> {
        let state = self.state.read().await;
        if state.collections.contains_key(target) {
            Ok(())
        } else {
            Err(collection_not_found(target))
        }
    }

    async fn create_collection(&self, target: &Target, _name: &str) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if !state.databases.contains(&target.database_id) {
            return Err(StoreError::NotFound(format!(
                "database {}",
                target.database_id
            )));
        }
        if state.collections.contains_key(target) {
            return Err(StoreError::Conflict(format!(
                "collection {} already exists",
                target.collection_id
            )));
        }
        state
            .collections
            .insert(target.clone(), Collection::default());
        Ok(())
    }

    async fn get_attribute(
        &self,
        target: &Target,
        key: &str,
    ) -> Result<AttributeStatus, StoreError> {
        let state = self.state.read().await;
        let collection = state
            .collections
            .get(target)
            .ok_or_else(|| collection_not_found(target))?;
        if collection.attributes.contains_key(key) {
            Ok(AttributeStatus::Available)
        } else {
            Err(StoreError::NotFound(format!("attribute {key}")))
        }
    }

    async fn create_attribute(
        &self,
        target: &Target,
        attribute: &AttributeSpec,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let collection = state
            .collections
            .get_mut(target)
            .ok_or_else(|| collection_not_found(target))?;
        if collection.attributes.contains_key(&attribute.key) {
            return Err(StoreError::Conflict(format!(
                "attribute {} already exists",
                attribute.key
            )));
        }
        collection
            .attributes
            .insert(attribute.key.clone(), attribute.clone());
        Ok(())
    }
}
