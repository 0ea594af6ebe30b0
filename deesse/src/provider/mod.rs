//! Storage provider contract and the bundled implementations.
//!
//! A provider owns all record state. The orchestrator calls [`Provider::init`]
//! once with every registered collection, then routes each CRUD call here
//! after hooks and permission checks have run.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryProvider;
pub use sqlite::SqliteProvider;

use crate::collection::{Collection, CREATED_AT_FIELD, ID_FIELD, UPDATED_AT_FIELD};
use crate::error::{DeesseError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A stored record: field name -> value.
pub type Record = serde_json::Map<String, Value>;

/// The capability set every storage backend implements.
///
/// Obligations:
/// - `init` allocates storage for each slug and may be called again with the
///   same set without effect.
/// - `create` assigns a fresh id (any caller-supplied `id` is discarded) and
///   returns the stored record.
/// - `read`, `update` and `delete` fail with [`DeesseError::NotFound`] for a
///   missing id.
/// - `update` is a shallow merge: fields absent from `partial` are kept.
#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn init(&self, collections: &[Collection]) -> Result<()>;

    async fn create(&self, slug: &str, data: Record) -> Result<Record>;

    async fn read(&self, slug: &str, id: &str) -> Result<Record>;

    async fn update(&self, slug: &str, id: &str, partial: Record) -> Result<Record>;

    async fn delete(&self, slug: &str, id: &str) -> Result<()>;
}

/// Strategy for generating record ids.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdStrategy {
    #[default]
    Ulid,
    Uuid,
    Nanoid,
}

impl IdStrategy {
    pub fn generate(&self) -> String {
        match self {
            IdStrategy::Ulid => ulid::Ulid::new().to_string().to_lowercase(),
            IdStrategy::Uuid => uuid::Uuid::new_v4().to_string(),
            IdStrategy::Nanoid => nanoid::nanoid!(),
        }
    }

    /// Generate an id for which `taken` returns false.
    pub fn generate_unique(&self, mut taken: impl FnMut(&str) -> bool) -> String {
        loop {
            let id = self.generate();
            if !taken(&id) {
                return id;
            }
            log::warn!("Generated id '{id}' already exists, retrying");
        }
    }
}

fn now() -> Value {
    Value::String(chrono::Utc::now().to_rfc3339())
}

/// Shape a new record: caller data plus the assigned id and timestamps.
pub(crate) fn new_record(mut data: Record, id: &str) -> Record {
    let stamp = now();
    data.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
    data.insert(CREATED_AT_FIELD.to_string(), stamp.clone());
    data.insert(UPDATED_AT_FIELD.to_string(), stamp);
    data
}

/// Shallow-merge `partial` into `existing`. The id and creation time of the
/// existing record cannot be overwritten.
pub(crate) fn merge_record(mut existing: Record, partial: Record) -> Record {
    for (key, value) in partial {
        if key == ID_FIELD || key == CREATED_AT_FIELD {
            continue;
        }
        existing.insert(key, value);
    }
    existing.insert(UPDATED_AT_FIELD.to_string(), now());
    existing
}

/// Names of the unique, non-primary fields of a collection.
pub(crate) fn unique_fields(collection: &Collection) -> Vec<String> {
    collection
        .fields()
        .iter()
        .filter(|(_, f)| f.is_unique() && !f.is_primary())
        .map(|(name, _)| name.to_string())
        .collect()
}

/// Fail if `candidate` repeats a unique value held by another record.
/// Null and missing values never conflict.
pub(crate) fn check_unique<'a>(
    slug: &str,
    unique: &[String],
    candidate: &Record,
    others: impl IntoIterator<Item = (&'a str, &'a Record)>,
) -> Result<()> {
    if unique.is_empty() {
        return Ok(());
    }
    let candidate_id = candidate.get(ID_FIELD).and_then(Value::as_str);
    for (other_id, other) in others {
        if Some(other_id) == candidate_id {
            continue;
        }
        for field in unique {
            match (candidate.get(field), other.get(field)) {
                (Some(a), Some(b)) if !a.is_null() && a == b => {
                    return Err(DeesseError::Provider(format!(
                        "Unique constraint violated: {slug}.{field} = {a}"
                    )));
                }
                _ => {}
            }
        }
    }
    Ok(())
}

pub(crate) fn unknown_collection(slug: &str) -> DeesseError {
    DeesseError::Provider(format!("Collection '{slug}' was not initialized"))
}
