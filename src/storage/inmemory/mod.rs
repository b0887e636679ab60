//! Volatile in-memory backend
//!
//! Suitable for tests and ephemeral deployments. All tables share one lock so
//! the multi-kind cascade delete is atomic with respect to concurrent reads.

use crate::errors::StorageError;
use crate::storage::traits::{Backend, EntityKind, IndexField, Result};
use crate::store::types::EncodingInfo;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

type Table = HashMap<Vec<u8>, serde_json::Value>;

#[derive(Default)]
struct Tables {
    clients: Table,
    codes: Table,
    tokens: Table,
    developers: Table,
    client_developers: Table,
}

impl Tables {
    fn table(&self, kind: EntityKind) -> &Table {
        match kind {
            EntityKind::Client => &self.clients,
            EntityKind::AuthorizationCode => &self.codes,
            EntityKind::Token => &self.tokens,
            EntityKind::Developer => &self.developers,
            EntityKind::ClientDeveloper => &self.client_developers,
        }
    }

    fn table_mut(&mut self, kind: EntityKind) -> &mut Table {
        match kind {
            EntityKind::Client => &mut self.clients,
            EntityKind::AuthorizationCode => &mut self.codes,
            EntityKind::Token => &mut self.tokens,
            EntityKind::Developer => &mut self.developers,
            EntityKind::ClientDeveloper => &mut self.client_developers,
        }
    }
}

/// In-memory implementation of the storage backend
#[derive(Default)]
pub struct MemoryBackend {
    tables: Mutex<Tables>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|e| StorageError::Internal(format!("Lock error: {}", e)))
    }
}

fn field_matches(record: &serde_json::Value, field: IndexField, value: &str) -> bool {
    record
        .get(field.column())
        .and_then(serde_json::Value::as_str)
        .is_some_and(|v| v == value)
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn put(&self, kind: EntityKind, key: &[u8], record: &serde_json::Value) -> Result<()> {
        let mut tables = self.lock()?;
        let table = tables.table_mut(kind);
        if table.contains_key(key) {
            return Err(StorageError::Conflict(format!(
                "duplicate key for {:?}",
                kind
            )));
        }
        table.insert(key.to_vec(), record.clone());
        Ok(())
    }

    async fn update(&self, kind: EntityKind, key: &[u8], record: &serde_json::Value) -> Result<()> {
        let mut tables = self.lock()?;
        tables.table_mut(kind).insert(key.to_vec(), record.clone());
        Ok(())
    }

    async fn get(&self, kind: EntityKind, key: &[u8]) -> Result<Option<serde_json::Value>> {
        let tables = self.lock()?;
        Ok(tables.table(kind).get(key).cloned())
    }

    async fn delete(&self, kind: EntityKind, key: &[u8]) -> Result<()> {
        let mut tables = self.lock()?;
        tables.table_mut(kind).remove(key);
        Ok(())
    }

    async fn delete_where(
        &self,
        kinds: &[EntityKind],
        field: IndexField,
        value: &str,
    ) -> Result<u64> {
        // One guard across every kind: readers never observe a partial cascade.
        let mut tables = self.lock()?;
        let mut deleted = 0u64;
        for kind in kinds {
            let table = tables.table_mut(*kind);
            let before = table.len();
            table.retain(|_, record| !field_matches(record, field, value));
            deleted += (before - table.len()) as u64;
        }
        Ok(deleted)
    }

    async fn list_where(
        &self,
        kind: EntityKind,
        field: IndexField,
        value: &str,
    ) -> Result<Vec<serde_json::Value>> {
        let tables = self.lock()?;
        Ok(tables
            .table(kind)
            .values()
            .filter(|record| field_matches(record, field, value))
            .cloned()
            .collect())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn describe_encoding(&self) -> Result<Option<EncodingInfo>> {
        Ok(None)
    }

    async fn close(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn put_rejects_duplicate_keys() {
        let backend = MemoryBackend::new();
        let record = json!({"name": "first"});
        backend
            .put(EntityKind::Client, b"k1", &record)
            .await
            .unwrap();

        let err = backend
            .put(EntityKind::Client, b"k1", &json!({"name": "second"}))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));

        let stored = backend.get(EntityKind::Client, b"k1").await.unwrap();
        assert_eq!(stored, Some(record));
    }

    #[tokio::test]
    async fn update_replaces_existing_record() {
        let backend = MemoryBackend::new();
        backend
            .update(EntityKind::Client, b"k1", &json!({"name": "first"}))
            .await
            .unwrap();
        backend
            .update(EntityKind::Client, b"k1", &json!({"name": "second"}))
            .await
            .unwrap();

        let stored = backend.get(EntityKind::Client, b"k1").await.unwrap();
        assert_eq!(stored, Some(json!({"name": "second"})));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let backend = MemoryBackend::new();
        backend.delete(EntityKind::Token, b"missing").await.unwrap();
    }

    #[tokio::test]
    async fn delete_where_spans_kinds() {
        let backend = MemoryBackend::new();
        backend
            .put(
                EntityKind::AuthorizationCode,
                b"c1",
                &json!({"user_id": "aa", "code": "c1"}),
            )
            .await
            .unwrap();
        backend
            .put(
                EntityKind::Token,
                b"t1",
                &json!({"user_id": "aa", "token": "t1"}),
            )
            .await
            .unwrap();
        backend
            .put(
                EntityKind::Token,
                b"t2",
                &json!({"user_id": "bb", "token": "t2"}),
            )
            .await
            .unwrap();

        let deleted = backend
            .delete_where(
                &[EntityKind::AuthorizationCode, EntityKind::Token],
                IndexField::UserId,
                "aa",
            )
            .await
            .unwrap();
        assert_eq!(deleted, 2);

        assert!(backend
            .get(EntityKind::AuthorizationCode, b"c1")
            .await
            .unwrap()
            .is_none());
        assert!(backend.get(EntityKind::Token, b"t1").await.unwrap().is_none());
        assert!(backend.get(EntityKind::Token, b"t2").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn list_where_filters_on_indexed_field() {
        let backend = MemoryBackend::new();
        backend
            .put(
                EntityKind::ClientDeveloper,
                b"a",
                &json!({"client_id": "c1", "developer_id": "d1"}),
            )
            .await
            .unwrap();
        backend
            .put(
                EntityKind::ClientDeveloper,
                b"b",
                &json!({"client_id": "c2", "developer_id": "d2"}),
            )
            .await
            .unwrap();

        let rows = backend
            .list_where(EntityKind::ClientDeveloper, IndexField::ClientId, "c1")
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["developer_id"], "d1");
    }

    #[tokio::test]
    async fn encoding_is_not_applicable() {
        let backend = MemoryBackend::new();
        backend.ping().await.unwrap();
        assert!(backend.describe_encoding().await.unwrap().is_none());
    }
}
