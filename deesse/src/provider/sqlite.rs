use super::{
    check_unique, merge_record, new_record, unique_fields, unknown_collection, IdStrategy,
    Provider, Record,
};
use crate::collection::Collection;
use crate::error::{DeesseError, Result};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Provider persisting records as JSON rows in a SQLite database.
pub struct SqliteProvider {
    conn: Mutex<Connection>,
    ids: IdStrategy,
}

impl SqliteProvider {
    /// Open or create the database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let provider = SqliteProvider {
            conn: Mutex::new(conn),
            ids: IdStrategy::default(),
        };
        provider.initialize_tables()?;
        Ok(provider)
    }

    pub fn with_id_strategy(mut self, ids: IdStrategy) -> Self {
        self.ids = ids;
        self
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| DeesseError::Provider("SQLite connection lock poisoned".into()))
    }

    fn initialize_tables(&self) -> Result<()> {
        self.conn()?.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS collections (
                slug TEXT PRIMARY KEY,
                unique_fields TEXT NOT NULL DEFAULT '[]',
                registered_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS records (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                data_json TEXT NOT NULL,
                PRIMARY KEY (collection, id)
            );

            CREATE INDEX IF NOT EXISTS idx_records_collection ON records(collection);
            ",
        )?;
        Ok(())
    }

    /// Unique field names registered for `slug`, or None if it was never
    /// initialized.
    fn registered_unique_fields(conn: &Connection, slug: &str) -> Result<Option<Vec<String>>> {
        let raw: Option<String> = conn
            .query_row(
                "SELECT unique_fields FROM collections WHERE slug = ?1",
                params![slug],
                |row| row.get(0),
            )
            .optional()?;
        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn get_record(conn: &Connection, slug: &str, id: &str) -> Result<Option<Record>> {
        let raw: Option<String> = conn
            .query_row(
                "SELECT data_json FROM records WHERE collection = ?1 AND id = ?2",
                params![slug, id],
                |row| row.get(0),
            )
            .optional()?;
        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn list_records(conn: &Connection, slug: &str) -> Result<Vec<(String, Record)>> {
        let mut stmt =
            conn.prepare("SELECT id, data_json FROM records WHERE collection = ?1 ORDER BY id")?;
        let rows = stmt.query_map(params![slug], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, json) = row?;
            records.push((id, serde_json::from_str(&json)?));
        }
        Ok(records)
    }

    /// Enforce unique fields against the other rows of the collection.
    fn check_unique_rows(
        conn: &Connection,
        slug: &str,
        unique: &[String],
        record: &Record,
    ) -> Result<()> {
        if unique.is_empty() {
            return Ok(());
        }
        let others = Self::list_records(conn, slug)?;
        check_unique(
            slug,
            unique,
            record,
            others.iter().map(|(id, r)| (id.as_str(), r)),
        )
    }

    fn write_record(conn: &Connection, slug: &str, id: &str, record: &Record) -> Result<()> {
        let data_json = serde_json::to_string(record)?;
        conn.execute(
            "INSERT OR REPLACE INTO records (collection, id, data_json) VALUES (?1, ?2, ?3)",
            params![slug, id, data_json],
        )?;
        Ok(())
    }
}

#[async_trait]
impl Provider for SqliteProvider {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn init(&self, collections: &[Collection]) -> Result<()> {
        log::info!("Initializing SQLite provider with {} collections", collections.len());
        let conn = self.conn()?;
        for col in collections {
            let unique = serde_json::to_string(&unique_fields(col))?;
            conn.execute(
                "INSERT INTO collections (slug, unique_fields) VALUES (?1, ?2)
                 ON CONFLICT(slug) DO UPDATE SET unique_fields = excluded.unique_fields",
                params![col.slug(), unique],
            )?;
        }
        Ok(())
    }

    async fn create(&self, slug: &str, data: Record) -> Result<Record> {
        let conn = self.conn()?;
        let unique =
            Self::registered_unique_fields(&conn, slug)?.ok_or_else(|| unknown_collection(slug))?;

        let mut lookup_error = None;
        let id = self.ids.generate_unique(|id| match Self::get_record(&conn, slug, id) {
            Ok(existing) => existing.is_some(),
            Err(e) => {
                lookup_error = Some(e);
                false
            }
        });
        if let Some(e) = lookup_error {
            return Err(e);
        }

        let record = new_record(data, &id);
        Self::check_unique_rows(&conn, slug, &unique, &record)?;
        Self::write_record(&conn, slug, &id, &record)?;
        Ok(record)
    }

    async fn read(&self, slug: &str, id: &str) -> Result<Record> {
        let conn = self.conn()?;
        Self::get_record(&conn, slug, id)?.ok_or_else(|| DeesseError::not_found(slug, id))
    }

    async fn update(&self, slug: &str, id: &str, partial: Record) -> Result<Record> {
        let conn = self.conn()?;
        let existing =
            Self::get_record(&conn, slug, id)?.ok_or_else(|| DeesseError::not_found(slug, id))?;
        let unique = Self::registered_unique_fields(&conn, slug)?.unwrap_or_default();

        let updated = merge_record(existing, partial);
        Self::check_unique_rows(&conn, slug, &unique, &updated)?;
        Self::write_record(&conn, slug, id, &updated)?;
        Ok(updated)
    }

    async fn delete(&self, slug: &str, id: &str) -> Result<()> {
        let conn = self.conn()?;
        let removed = conn.execute(
            "DELETE FROM records WHERE collection = ?1 AND id = ?2",
            params![slug, id],
        )?;
        if removed == 0 {
            return Err(DeesseError::not_found(slug, id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::{collection, CollectionConfig};
    use crate::field::{text, FieldParams};
    use serde_json::json;
    use tempfile::TempDir;

    fn record(value: serde_json::Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    fn posts() -> Collection {
        collection(
            CollectionConfig::new("posts")
                .field("title", text(FieldParams::new()).unwrap().unique())
                .field("content", text(FieldParams::new()).unwrap()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_crud_roundtrip() {
        let provider = SqliteProvider::open_in_memory().unwrap();
        provider.init(&[posts()]).await.unwrap();

        let created = provider
            .create("posts", record(json!({ "title": "T", "content": "old" })))
            .await
            .unwrap();
        let id = created["id"].as_str().unwrap().to_string();

        let updated = provider
            .update("posts", &id, record(json!({ "content": "new" })))
            .await
            .unwrap();
        assert_eq!(updated["title"], json!("T"));
        assert_eq!(updated["content"], json!("new"));
        assert_eq!(provider.read("posts", &id).await.unwrap(), updated);

        provider.delete("posts", &id).await.unwrap();
        assert!(matches!(
            provider.read("posts", &id).await,
            Err(DeesseError::NotFound { .. })
        ));
        assert!(matches!(
            provider.delete("posts", &id).await,
            Err(DeesseError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("data.db");

        let id = {
            let provider = SqliteProvider::open(&path).unwrap();
            provider.init(&[posts()]).await.unwrap();
            let created = provider
                .create("posts", record(json!({ "title": "Kept" })))
                .await
                .unwrap();
            created["id"].as_str().unwrap().to_string()
        };

        let provider = SqliteProvider::open(&path).unwrap();
        provider.init(&[posts()]).await.unwrap();
        let read = provider.read("posts", &id).await.unwrap();
        assert_eq!(read["title"], json!("Kept"));
    }

    #[tokio::test]
    async fn test_unique_and_unknown_collection() {
        let provider = SqliteProvider::open_in_memory()
            .unwrap()
            .with_id_strategy(IdStrategy::Nanoid);
        provider.init(&[posts()]).await.unwrap();

        provider
            .create("posts", record(json!({ "title": "Same" })))
            .await
            .unwrap();
        assert!(matches!(
            provider.create("posts", record(json!({ "title": "Same" }))).await,
            Err(DeesseError::Provider(_))
        ));
        assert!(matches!(
            provider.create("users", Record::new()).await,
            Err(DeesseError::Provider(_))
        ));
    }
}
