use super::{
    check_unique, merge_record, new_record, unique_fields, unknown_collection, IdStrategy,
    Provider, Record,
};
use crate::collection::Collection;
use crate::error::{DeesseError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Bucket {
    unique: Vec<String>,
    records: HashMap<String, Record>,
}

/// Reference provider keeping one id -> record map per collection slug.
///
/// Nothing is persisted. Concurrent updates to the same id are
/// last-write-wins.
#[derive(Debug, Default)]
pub struct MemoryProvider {
    storage: RwLock<HashMap<String, Bucket>>,
    ids: IdStrategy,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id_strategy(ids: IdStrategy) -> Self {
        MemoryProvider {
            storage: RwLock::default(),
            ids,
        }
    }

    /// Number of records stored for `slug`.
    pub async fn len(&self, slug: &str) -> usize {
        self.storage
            .read()
            .await
            .get(slug)
            .map(|b| b.records.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl Provider for MemoryProvider {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn init(&self, collections: &[Collection]) -> Result<()> {
        log::info!("Initializing in-memory provider");
        let mut storage = self.storage.write().await;
        for col in collections {
            let bucket = storage.entry(col.slug().to_string()).or_default();
            bucket.unique = unique_fields(col);
        }
        Ok(())
    }

    async fn create(&self, slug: &str, data: Record) -> Result<Record> {
        let mut storage = self.storage.write().await;
        let bucket = storage.get_mut(slug).ok_or_else(|| unknown_collection(slug))?;

        let id = self.ids.generate_unique(|id| bucket.records.contains_key(id));
        let record = new_record(data, &id);
        check_unique(
            slug,
            &bucket.unique,
            &record,
            bucket.records.iter().map(|(k, v)| (k.as_str(), v)),
        )?;

        bucket.records.insert(id, record.clone());
        Ok(record)
    }

    async fn read(&self, slug: &str, id: &str) -> Result<Record> {
        let storage = self.storage.read().await;
        storage
            .get(slug)
            .and_then(|b| b.records.get(id))
            .cloned()
            .ok_or_else(|| DeesseError::not_found(slug, id))
    }

    async fn update(&self, slug: &str, id: &str, partial: Record) -> Result<Record> {
        let mut storage = self.storage.write().await;
        let bucket = storage
            .get_mut(slug)
            .ok_or_else(|| DeesseError::not_found(slug, id))?;
        let existing = bucket
            .records
            .get(id)
            .cloned()
            .ok_or_else(|| DeesseError::not_found(slug, id))?;

        let updated = merge_record(existing, partial);
        check_unique(
            slug,
            &bucket.unique,
            &updated,
            bucket.records.iter().map(|(k, v)| (k.as_str(), v)),
        )?;

        bucket.records.insert(id.to_string(), updated.clone());
        Ok(updated)
    }

    async fn delete(&self, slug: &str, id: &str) -> Result<()> {
        let mut storage = self.storage.write().await;
        storage
            .get_mut(slug)
            .and_then(|b| b.records.remove(id))
            .map(|_| ())
            .ok_or_else(|| DeesseError::not_found(slug, id))
    }
}
