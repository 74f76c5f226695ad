use serde_json::Value;
use tracing::{error, warn};

use crate::store::{DocumentStore, Target};
use crate::types::{Document, DocumentId};

/// Result of comparing a stored field with the value that was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldCheck {
    Match,
    Missing,
    Null,
    Mismatch { found: String },
}

impl FieldCheck {
    pub fn is_match(&self) -> bool {
        matches!(self, FieldCheck::Match)
    }
}

/// Exact string comparison; no case folding or trimming.
pub fn check_value(stored: Option<&Value>, expected: &str) -> FieldCheck {
    match stored {
        None => FieldCheck::Missing,
        Some(Value::Null) => FieldCheck::Null,
        Some(Value::String(found)) if found == expected => FieldCheck::Match,
        Some(Value::String(found)) => FieldCheck::Mismatch {
            found: found.clone(),
        },
        Some(other) => FieldCheck::Mismatch {
            found: other.to_string(),
        },
    }
}

pub fn check_field(document: &Document, field: &str, expected: &str) -> FieldCheck {
    check_value(document.field(field), expected)
}

/// Reads one document back and checks `field` equals `expected`.
///
/// Returns false on a failed read or any field problem, logging the reason.
pub async fn verify<S>(
    store: &S,
    target: &Target,
    id: &DocumentId,
    field: &str,
    expected: &str,
) -> bool
where
    S: DocumentStore + ?Sized,
{
    match store.get_document(target, id).await {
        Ok(document) => report(id, field, expected, check_field(&document, field, expected)),
        Err(err) => {
            warn!(id = %id, error = %err, "read-back failed");
            false
        }
    }
}

/// Logs a non-matching check and returns whether the field verified.
pub(crate) fn report(id: &DocumentId, field: &str, expected: &str, check: FieldCheck) -> bool {
    match check {
        FieldCheck::Match => true,
        FieldCheck::Missing => {
            error!(id = %id, field, "verification failed: field missing");
            false
        }
        FieldCheck::Null => {
            error!(id = %id, field, "verification failed: field is null");
            false
        }
        FieldCheck::Mismatch { found } => {
            error!(id = %id, field, expected, found = %found, "verification failed: value mismatch");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::store::InMemoryStore;
    use crate::types::Fields;

    #[test]
    fn identical_strings_match() {
        assert_eq!(
            check_value(Some(&json!("a@example.com")), "a@example.com"),
            FieldCheck::Match
        );
    }

    #[test]
    fn case_and_whitespace_differences_mismatch() {
        assert!(!check_value(Some(&json!("A@example.com")), "a@example.com").is_match());
        assert!(!check_value(Some(&json!(" a@example.com")), "a@example.com").is_match());
        assert!(!check_value(Some(&json!("a@example.com\n")), "a@example.com").is_match());
    }

    #[test]
    fn missing_null_and_non_string_fail() {
        assert_eq!(check_value(None, "x"), FieldCheck::Missing);
        assert_eq!(check_value(Some(&Value::Null), "x"), FieldCheck::Null);
        assert_eq!(
            check_value(Some(&json!(42)), "42"),
            FieldCheck::Mismatch {
                found: "42".into()
            }
        );
    }

    #[tokio::test]
    async fn verify_reads_back_from_store() {
        let target = Target::new("db", "users");
        let store = InMemoryStore::provisioned(&target).await;
        let id = DocumentId::new("v1");
        let mut fields = Fields::new();
        fields.insert("email".into(), json!("v@example.com"));
        store
            .create_document(&target, id.clone(), fields)
            .await
            .unwrap();

        assert!(verify(&store, &target, &id, "email", "v@example.com").await);
        assert!(!verify(&store, &target, &id, "email", "other@example.com").await);
        assert!(!verify(&store, &target, &id, "phone", "v@example.com").await);
        assert!(!verify(&store, &target, &DocumentId::new("nope"), "email", "x").await);
    }
}
