use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::config::ServiceConfig;
use crate::types::{Document, DocumentId, Fields, FileFilter, FileInfo, Page};

use super::engine::{
    AttributeKind, AttributeSpec, AttributeStatus, DocumentStore, SchemaAdmin, StoreError, Target,
};

const PROJECT_HEADER: &str = "X-Appwrite-Project";
const KEY_HEADER: &str = "X-Appwrite-Key";

/// REST client for the hosted document service.
///
/// Cloning is cheap: the underlying connection pool is shared.
#[derive(Clone)]
pub struct HttpStore {
    client: Client,
    endpoint: Url,
    project_id: String,
    api_key: String,
}

/// Error body returned by the service on non-2xx responses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(rename = "type", default)]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct DocumentList {
    #[serde(default)]
    total: u64,
    #[serde(default)]
    documents: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<FileInfo>,
}

impl HttpStore {
    pub fn connect(config: &ServiceConfig) -> Result<Self, StoreError> {
        let endpoint = Url::parse(config.endpoint.trim_end_matches('/'))
            .map_err(|err| StoreError::InvalidEndpoint(format!("{}: {err}", config.endpoint)))?;
        if endpoint.cannot_be_a_base() {
            return Err(StoreError::InvalidEndpoint(config.endpoint.clone()));
        }
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self {
            client,
            endpoint,
            project_id: config.project_id.clone(),
            api_key: config.api_key.clone(),
        })
    }

    /// Appends `segments` to the endpoint path, percent-encoding each one.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.endpoint.clone();
        // `connect` rejects cannot-be-a-base endpoints, so this always succeeds.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        self.client
            .request(method, self.url(segments))
            .header(PROJECT_HEADER, &self.project_id)
            .header(KEY_HEADER, &self.api_key)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Value, StoreError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            if status == StatusCode::NO_CONTENT {
                return Ok(Value::Null);
            }
            return Ok(response.json().await?);
        }

        let body = response.text().await.unwrap_or_default();
        Err(error_from_response(status, &body))
    }

    async fn send_document(
        &self,
        request: RequestBuilder,
        operation: &'static str,
    ) -> Result<Document, StoreError> {
        let value = self.send(request).await?;
        Document::from_wire(value).ok_or(StoreError::MalformedResponse(operation))
    }
}

fn collection_path(target: &Target) -> [&str; 4] {
    [
        "databases",
        target.database_id.as_str(),
        "collections",
        target.collection_id.as_str(),
    ]
}

fn documents_path(target: &Target) -> Vec<&str> {
    let mut path = collection_path(target).to_vec();
    path.push("documents");
    path
}

/// Maps a failed HTTP exchange onto the store error taxonomy.
pub(crate) fn error_from_response(status: StatusCode, body: &str) -> StoreError {
    let parsed: Option<ErrorBody> = serde_json::from_str(body).ok();
    let message = match parsed {
        Some(ErrorBody { message, kind }) if !message.is_empty() && !kind.is_empty() => {
            format!("{message} ({kind})")
        }
        Some(ErrorBody { message, .. }) if !message.is_empty() => message,
        _ if !body.is_empty() => body.to_string(),
        _ => status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string(),
    };

    match status {
        StatusCode::NOT_FOUND => StoreError::NotFound(message),
        StatusCode::CONFLICT => StoreError::Conflict(message),
        StatusCode::TOO_MANY_REQUESTS => StoreError::RateLimited(message),
        _ => StoreError::Service {
            status: status.as_u16(),
            message,
        },
    }
}

/// Encodes a query in the service's JSON query syntax.
pub(crate) fn query(method: &str, attribute: Option<&str>, values: Value) -> String {
    let mut query = json!({ "method": method, "values": values });
    if let Some(attribute) = attribute {
        query["attribute"] = Value::String(attribute.to_string());
    }
    query.to_string()
}

fn attribute_body(attribute: &AttributeSpec) -> Value {
    let mut body = json!({ "key": attribute.key, "required": attribute.required });
    match &attribute.kind {
        AttributeKind::String { size } => {
            body["size"] = json!(size);
        }
        AttributeKind::Email => {}
        AttributeKind::Integer { min, max } => {
            if let Some(min) = min {
                body["min"] = json!(min);
            }
            if let Some(max) = max {
                body["max"] = json!(max);
            }
        }
    }
    body
}

#[async_trait]
impl DocumentStore for HttpStore {
    async fn create_document(
        &self,
        target: &Target,
        id: DocumentId,
        fields: Fields,
    ) -> Result<Document, StoreError> {
        let request = self
            .request(Method::POST, &documents_path(target))
            .json(&json!({ "documentId": id, "data": fields }));
        self.send_document(request, "create_document").await
    }

    async fn upsert_documents(
        &self,
        target: &Target,
        documents: Vec<Document>,
    ) -> Result<Vec<Document>, StoreError> {
        let payload: Vec<Value> = documents.iter().map(Document::to_wire).collect();
        let request = self
            .request(Method::PUT, &documents_path(target))
            .json(&json!({ "documents": payload }));
        let value = self.send(request).await?;
        let list: DocumentList = serde_json::from_value(value)
            .map_err(|_| StoreError::MalformedResponse("upsert_documents"))?;
        list.documents
            .into_iter()
            .map(|doc| {
                Document::from_wire(doc).ok_or(StoreError::MalformedResponse("upsert_documents"))
            })
            .collect()
    }

    async fn get_document(
        &self,
        target: &Target,
        id: &DocumentId,
    ) -> Result<Document, StoreError> {
        let mut path = documents_path(target);
        path.push(id.as_str());
        self.send_document(self.request(Method::GET, &path), "get_document")
            .await
    }

    async fn list_documents(
        &self,
        target: &Target,
        limit: u32,
        offset: u32,
    ) -> Result<Page, StoreError> {
        let queries = [
            ("queries[]", query("limit", None, json!([limit]))),
            ("queries[]", query("offset", None, json!([offset]))),
        ];
        let request = self
            .request(Method::GET, &documents_path(target))
            .query(&queries);
        let value = self.send(request).await?;
        let list: DocumentList = serde_json::from_value(value)
            .map_err(|_| StoreError::MalformedResponse("list_documents"))?;
        let documents = list
            .documents
            .into_iter()
            .map(|doc| {
                Document::from_wire(doc).ok_or(StoreError::MalformedResponse("list_documents"))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page {
            total: list.total,
            documents,
        })
    }

    async fn list_files(
        &self,
        bucket_id: &str,
        filter: &FileFilter,
    ) -> Result<Vec<FileInfo>, StoreError> {
        let mut queries = Vec::new();
        if let Some(mime) = &filter.mime_type {
            queries.push(("queries[]", query("equal", Some("mimeType"), json!([mime]))));
        }
        if let Some(limit) = filter.limit {
            queries.push(("queries[]", query("limit", None, json!([limit]))));
        }
        let path = ["storage", "buckets", bucket_id, "files"];
        let value = self
            .send(self.request(Method::GET, &path).query(&queries))
            .await?;
        let list: FileList =
            serde_json::from_value(value).map_err(|_| StoreError::MalformedResponse("list_files"))?;
        Ok(list.files)
    }
}

#[async_trait]
impl SchemaAdmin for HttpStore {
    async fn get_database(&self, database_id: &str) -> Result<(), StoreError> {
        self.send(self.request(Method::GET, &["databases", database_id]))
            .await
            .map(|_| ())
    }

    async fn create_database(&self, database_id: &str, name: &str) -> Result<(), StoreError> {
        let request = self
            .request(Method::POST, &["databases"])
            .json(&json!({ "databaseId": database_id, "name": name }));
        self.send(request).await.map(|_| ())
    }

    async fn get_collection(&self, target: &Target) -> Result<(), StoreError> {
        self.send(self.request(Method::GET, &collection_path(target)))
            .await
            .map(|_| ())
    }

    async fn create_collection(&self, target: &Target, name: &str) -> Result<(), StoreError> {
        let path = ["databases", target.database_id.as_str(), "collections"];
        let request = self
            .request(Method::POST, &path)
            .json(&json!({ "collectionId": target.collection_id, "name": name }));
        self.send(request).await.map(|_| ())
    }

    async fn get_attribute(
        &self,
        target: &Target,
        key: &str,
    ) -> Result<AttributeStatus, StoreError> {
        let mut path = collection_path(target).to_vec();
        path.extend(["attributes", key]);
        let value = self.send(self.request(Method::GET, &path)).await?;
        let status = value["status"]
            .as_str()
            .ok_or(StoreError::MalformedResponse("get_attribute"))?;
        Ok(AttributeStatus::from_wire(
            status,
            value["error"].as_str().unwrap_or_default(),
        ))
    }

    async fn create_attribute(
        &self,
        target: &Target,
        attribute: &AttributeSpec,
    ) -> Result<(), StoreError> {
        let mut path = collection_path(target).to_vec();
        path.extend(["attributes", attribute.kind.name()]);
        let request = self
            .request(Method::POST, &path)
            .json(&attribute_body(attribute));
        self.send(request).await.map(|_| ())
    }
}
