use std::time::{Duration, Instant};

#[path = "common.rs"]
mod common;

use common::target;
use docbench::provision::{SchemaSpec, ensure_schema};
use docbench::workload::RecordGenerator;
use docbench::{
    DocumentId, DocumentStore, FileFilter, ServiceConfig, StoreAdapter, StoreBackend,
    StoreError, TargetConfig, verify,
};

fn memory_adapter(latency_ms: u64) -> StoreAdapter {
    let config = ServiceConfig {
        backend: StoreBackend::Memory,
        simulated_latency_ms: latency_ms,
        ..ServiceConfig::default()
    };
    StoreAdapter::from_config(&config).expect("memory backend")
}

#[tokio::test]
async fn memory_adapter_serves_documents_after_provisioning() {
    let store = memory_adapter(0);
    ensure_schema(&store, &SchemaSpec::for_records(&TargetConfig::default()))
        .await
        .unwrap();

    let mut generator = RecordGenerator::new(Some(11));
    for record in generator.generate_batch(3) {
        let doc = store
            .create_document(&target(), DocumentId::unique(), record.to_fields())
            .await
            .unwrap();
        assert!(verify::verify(&store, &target(), &doc.id, "email", &record.email).await);
    }

    let page = store.list_documents(&target(), 2, 0).await.unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(page.documents.len(), 2);
}

#[tokio::test]
async fn memory_adapter_reports_missing_objects() {
    let store = memory_adapter(0);

    let err = store
        .get_document(&target(), &DocumentId::new("absent"))
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let err = store
        .list_files("assets", &FileFilter::mime_type("image/png"))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
}

#[tokio::test]
async fn simulated_latency_delays_calls() {
    let store = memory_adapter(30);
    let started = Instant::now();
    let _ = store.list_documents(&target(), 1, 0).await;
    assert!(started.elapsed() >= Duration::from_millis(30));
}

#[test]
fn http_adapter_builds_from_config() {
    let config = ServiceConfig {
        project_id: "proj".into(),
        api_key: "key".into(),
        ..ServiceConfig::default()
    };
    assert!(matches!(
        StoreAdapter::from_config(&config),
        Ok(StoreAdapter::Http(_))
    ));
}
