use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Field map carried by a document, excluding service metadata (`$`-prefixed keys).
pub type Fields = Map<String, Value>;

/// Identifier of a document (or database, collection, bucket) in the hosted service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    /// Generates a fresh identifier accepted by the service (32 lowercase hex chars).
    pub fn unique() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DocumentId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<&str> for DocumentId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A stored document as returned by the service.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: DocumentId,
    pub fields: Fields,
}

impl Document {
    pub fn new(id: DocumentId, fields: Fields) -> Self {
        Self { id, fields }
    }

    /// Builds a document from the service's wire shape: a flat JSON object
    /// with the identifier under `$id` and metadata under other `$` keys.
    pub fn from_wire(value: Value) -> Option<Self> {
        let Value::Object(mut object) = value else {
            return None;
        };
        let id = match object.remove("$id") {
            Some(Value::String(id)) => DocumentId(id),
            _ => return None,
        };
        object.retain(|key, _| !key.starts_with('$'));
        Some(Self { id, fields: object })
    }

    /// Wire shape used for bulk upserts: fields plus `$id`.
    pub fn to_wire(&self) -> Value {
        let mut object = self.fields.clone();
        object.insert("$id".into(), Value::String(self.id.0.clone()));
        Value::Object(object)
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

/// One page of a document listing.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub total: u64,
    pub documents: Vec<Document>,
}

/// Metadata of a file stored in a bucket.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileInfo {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(rename = "bucketId")]
    pub bucket_id: String,
    pub name: String,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    #[serde(rename = "sizeOriginal", default)]
    pub size_bytes: u64,
}

/// Filter applied when listing files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileFilter {
    pub mime_type: Option<String>,
    pub limit: Option<u32>,
}

impl FileFilter {
    pub fn mime_type(mime: impl Into<String>) -> Self {
        Self {
            mime_type: Some(mime.into()),
            limit: None,
        }
    }

    pub fn matches(&self, file: &FileInfo) -> bool {
        self.mime_type
            .as_deref()
            .map(|mime| file.mime_type == mime)
            .unwrap_or(true)
    }
}
