use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use docbench::store::{AttributeSpec, AttributeStatus};
use docbench::{
    BenchConfig, Document, DocumentId, DocumentStore, Fields, FileFilter, FileInfo,
    InMemoryStore, Page, SchemaAdmin, StoreBackend, StoreError, Target, TargetConfig,
};

#[allow(dead_code)]
pub fn target() -> Target {
    Target::from(&TargetConfig::default())
}

/// In-memory configuration sized for fast tests.
#[allow(dead_code)]
pub fn memory_config(records: usize, workers: usize) -> BenchConfig {
    let mut config = BenchConfig::default();
    config.service.backend = StoreBackend::Memory;
    config.workload.record_count = records;
    config.workload.batch_size = records.max(1);
    config.workload.max_workers = workers;
    config.workload.seed = Some(7);
    config
}

fn injected(call: usize) -> StoreError {
    StoreError::Service {
        status: 503,
        message: format!("injected failure on call {call}"),
    }
}

/// Document store that fails chosen calls by their arrival number.
#[allow(dead_code)]
pub struct FaultyStore {
    inner: Arc<InMemoryStore>,
    failing_creates: HashSet<usize>,
    failing_upserts: HashSet<usize>,
    creates: AtomicUsize,
    upserts: AtomicUsize,
}

#[allow(dead_code)]
impl FaultyStore {
    pub fn new(inner: Arc<InMemoryStore>) -> Self {
        Self {
            inner,
            failing_creates: HashSet::new(),
            failing_upserts: HashSet::new(),
            creates: AtomicUsize::new(0),
            upserts: AtomicUsize::new(0),
        }
    }

    pub fn failing_creates(mut self, calls: impl IntoIterator<Item = usize>) -> Self {
        self.failing_creates = calls.into_iter().collect();
        self
    }

    pub fn failing_upserts(mut self, calls: impl IntoIterator<Item = usize>) -> Self {
        self.failing_upserts = calls.into_iter().collect();
        self
    }

    pub fn create_calls(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn upsert_calls(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentStore for FaultyStore {
    async fn create_document(
        &self,
        target: &Target,
        id: DocumentId,
        fields: Fields,
    ) -> Result<Document, StoreError> {
        let call = self.creates.fetch_add(1, Ordering::SeqCst);
        if self.failing_creates.contains(&call) {
            return Err(injected(call));
        }
        self.inner.create_document(target, id, fields).await
    }

    async fn upsert_documents(
        &self,
        target: &Target,
        documents: Vec<Document>,
    ) -> Result<Vec<Document>, StoreError> {
        let call = self.upserts.fetch_add(1, Ordering::SeqCst);
        if self.failing_upserts.contains(&call) {
            return Err(injected(call));
        }
        self.inner.upsert_documents(target, documents).await
    }

    async fn get_document(
        &self,
        target: &Target,
        id: &DocumentId,
    ) -> Result<Document, StoreError> {
        self.inner.get_document(target, id).await
    }

    async fn list_documents(
        &self,
        target: &Target,
        limit: u32,
        offset: u32,
    ) -> Result<Page, StoreError> {
        self.inner.list_documents(target, limit, offset).await
    }

    async fn list_files(
        &self,
        bucket_id: &str,
        filter: &FileFilter,
    ) -> Result<Vec<FileInfo>, StoreError> {
        self.inner.list_files(bucket_id, filter).await
    }
}

/// Admin wrapper that counts create calls and can misbehave on demand.
#[allow(dead_code)]
pub struct CountingAdmin {
    inner: Arc<InMemoryStore>,
    creates: AtomicUsize,
    unavailable: bool,
    pending_polls: AtomicUsize,
    attribute_failure: Option<String>,
}

#[allow(dead_code)]
impl CountingAdmin {
    pub fn new(inner: Arc<InMemoryStore>) -> Self {
        Self {
            inner,
            creates: AtomicUsize::new(0),
            unavailable: false,
            pending_polls: AtomicUsize::new(0),
            attribute_failure: None,
        }
    }

    /// Every existence check fails with a service error instead of `NotFound`.
    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    /// Existing attributes report `Processing` for the next `polls` checks.
    pub fn with_pending_polls(self, polls: usize) -> Self {
        self.pending_polls.store(polls, Ordering::SeqCst);
        self
    }

    /// Existing attributes report a failed build.
    pub fn with_failed_attributes(mut self, reason: &str) -> Self {
        self.attribute_failure = Some(reason.to_string());
        self
    }

    pub fn create_calls(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn remaining_polls(&self) -> usize {
        self.pending_polls.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable {
            return Err(StoreError::Service {
                status: 500,
                message: "general_unknown".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl SchemaAdmin for CountingAdmin {
    async fn get_database(&self, database_id: &str) -> Result<(), StoreError> {
        self.check_available()?;
        self.inner.get_database(database_id).await
    }

    async fn create_database(&self, database_id: &str, name: &str) -> Result<(), StoreError> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.inner.create_database(database_id, name).await
    }

    async fn get_collection(&self, target: &Target) -> Result<(), StoreError> {
        self.check_available()?;
        self.inner.get_collection(target).await
    }

    async fn create_collection(&self, target: &Target, name: &str) -> Result<(), StoreError> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.inner.create_collection(target, name).await
    }

    async fn get_attribute(
        &self,
        target: &Target,
        key: &str,
    ) -> Result<AttributeStatus, StoreError> {
        self.check_available()?;
        let status = self.inner.get_attribute(target, key).await?;
        if let Some(reason) = &self.attribute_failure {
            return Ok(AttributeStatus::Failed(reason.clone()));
        }
        let pending = self
            .pending_polls
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if pending {
            return Ok(AttributeStatus::Processing);
        }
        Ok(status)
    }

    async fn create_attribute(
        &self,
        target: &Target,
        attribute: &AttributeSpec,
    ) -> Result<(), StoreError> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.inner.create_attribute(target, attribute).await
    }
}
