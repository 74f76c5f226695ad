//! Idempotent provisioning of the database, collection and record attributes.
//!
//! Every object is checked first; `NotFound` is the only signal to create it.
//! Any other failure aborts provisioning, and with it the run.

use std::fmt;
use std::time::Duration;

use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::config::TargetConfig;
use crate::store::{
    AttributeKind, AttributeSpec, AttributeStatus, SchemaAdmin, StoreError, Target,
};
use crate::workload::{MAX_AGE, MIN_AGE, VERIFY_FIELD};

const SETTLE_ATTEMPTS: usize = 60;
const SETTLE_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    Database(String),
    Collection(String),
    Attribute(String),
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Database(id) => write!(f, "database {id}"),
            Resource::Collection(id) => write!(f, "collection {id}"),
            Resource::Attribute(key) => write!(f, "attribute {key}"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("failed to check {resource}: {source}")]
    Check {
        resource: Resource,
        #[source]
        source: StoreError,
    },
    #[error("failed to create {resource}: {source}")]
    Create {
        resource: Resource,
        #[source]
        source: StoreError,
    },
    #[error("{resource} failed to build: {reason}")]
    AttributeFailed { resource: Resource, reason: String },
    #[error("{resource} still processing after {waited:?}")]
    AttributeTimeout { resource: Resource, waited: Duration },
}

/// Desired shape of the benchmark target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaSpec {
    pub target: Target,
    pub database_name: String,
    pub collection_name: String,
    pub attributes: Vec<AttributeSpec>,
}

impl SchemaSpec {
    /// Target from configuration with the attributes of a synthetic record.
    pub fn for_records(config: &TargetConfig) -> Self {
        Self {
            target: Target::from(config),
            database_name: config.database_name.clone(),
            collection_name: config.collection_name.clone(),
            attributes: record_attributes(),
        }
    }
}

pub fn record_attributes() -> Vec<AttributeSpec> {
    vec![
        AttributeSpec::new("Name", AttributeKind::String { size: 255 }, false),
        AttributeSpec::new(VERIFY_FIELD, AttributeKind::Email, false),
        AttributeSpec::new(
            "age",
            AttributeKind::Integer {
                min: Some(MIN_AGE.into()),
                max: Some(MAX_AGE.into()),
            },
            false,
        ),
    ]
}

/// Objects created by one provisioning pass, in creation order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvisionReport {
    pub created: Vec<Resource>,
}

impl ProvisionReport {
    pub fn is_noop(&self) -> bool {
        self.created.is_empty()
    }
}

fn exists(check: Result<(), StoreError>, resource: &Resource) -> Result<bool, ProvisionError> {
    match check {
        Ok(()) => Ok(true),
        Err(err) if err.is_not_found() => Ok(false),
        Err(source) => Err(ProvisionError::Check {
            resource: resource.clone(),
            source,
        }),
    }
}

pub async fn ensure_schema<A>(
    admin: &A,
    spec: &SchemaSpec,
) -> Result<ProvisionReport, ProvisionError>
where
    A: SchemaAdmin + ?Sized,
{
    let target = &spec.target;
    let mut report = ProvisionReport::default();

    let database = Resource::Database(target.database_id.clone());
    if !exists(admin.get_database(&target.database_id).await, &database)? {
        admin
            .create_database(&target.database_id, &spec.database_name)
            .await
            .map_err(|source| ProvisionError::Create {
                resource: database.clone(),
                source,
            })?;
        info!(resource = %database, "created");
        report.created.push(database);
    }

    let collection = Resource::Collection(target.collection_id.clone());
    if !exists(admin.get_collection(target).await, &collection)? {
        admin
            .create_collection(target, &spec.collection_name)
            .await
            .map_err(|source| ProvisionError::Create {
                resource: collection.clone(),
                source,
            })?;
        info!(resource = %collection, "created");
        report.created.push(collection);
    }

    let mut pending = Vec::new();
    for attribute in &spec.attributes {
        let resource = Resource::Attribute(attribute.key.clone());
        match admin.get_attribute(target, &attribute.key).await {
            Ok(AttributeStatus::Available) => continue,
            Ok(AttributeStatus::Processing) => {
                debug!(attribute = %attribute.key, "existing attribute still processing");
                pending.push(attribute.key.as_str());
                continue;
            }
            Ok(AttributeStatus::Failed(reason)) => {
                return Err(ProvisionError::AttributeFailed { resource, reason });
            }
            Err(err) if err.is_not_found() => {}
            Err(source) => return Err(ProvisionError::Check { resource, source }),
        }
        admin
            .create_attribute(target, attribute)
            .await
            .map_err(|source| ProvisionError::Create {
                resource: resource.clone(),
                source,
            })?;
        info!(resource = %resource, kind = attribute.kind.name(), "created");
        pending.push(attribute.key.as_str());
        report.created.push(resource);
    }

    for key in pending {
        wait_until_available(admin, target, key).await?;
    }

    Ok(report)
}

async fn wait_until_available<A>(
    admin: &A,
    target: &Target,
    key: &str,
) -> Result<(), ProvisionError>
where
    A: SchemaAdmin + ?Sized,
{
    let resource = Resource::Attribute(key.to_string());
    for attempt in 0..SETTLE_ATTEMPTS {
        let status = admin
            .get_attribute(target, key)
            .await
            .map_err(|source| ProvisionError::Check {
                resource: resource.clone(),
                source,
            })?;
        match status {
            AttributeStatus::Available => return Ok(()),
            AttributeStatus::Failed(reason) => {
                return Err(ProvisionError::AttributeFailed { resource, reason });
            }
            AttributeStatus::Processing => {
                debug!(attribute = key, attempt, "attribute still processing");
                sleep(SETTLE_DELAY).await;
            }
        }
    }

    Err(ProvisionError::AttributeTimeout {
        resource,
        waited: SETTLE_DELAY * SETTLE_ATTEMPTS as u32,
    })
}
