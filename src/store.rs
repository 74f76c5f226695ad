pub mod adapter;
pub mod engine;
pub mod http;
pub mod memory;

pub use adapter::StoreAdapter;
pub use engine::{
    AttributeKind, AttributeSpec, AttributeStatus, DocumentStore, SchemaAdmin, StoreError,
    Target,
};
pub use http::HttpStore;
pub use memory::InMemoryStore;
