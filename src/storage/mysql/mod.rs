//! Durable MySQL backend
//!
//! Each entity kind lives in its own table with a `VARBINARY` primary key
//! (byte-exact, so developer email uniqueness stays case-sensitive), mirrored
//! index columns for the range operations, and a `JSON` record column. The
//! schema and the connection both run `utf8mb4` with the
//! `utf8mb4_unicode_ci` collation.

use crate::errors::StorageError;
use crate::storage::traits::{Backend, EntityKind, IndexField, Result};
use crate::store::types::EncodingInfo;
use async_trait::async_trait;
use sqlx::Row;
use sqlx::mysql::MySqlPool;

/// MySQL implementation of the storage backend
pub struct MySqlBackend {
    pool: MySqlPool,
}

impl MySqlBackend {
    /// Create a new MySQL backend over an established pool
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Run database migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations/mysql")
            .run(&self.pool)
            .await
            .map_err(|e| StorageError::QueryFailed(format!("Migration failed: {}", e)))?;
        Ok(())
    }

    fn table(kind: EntityKind) -> &'static str {
        match kind {
            EntityKind::Client => "clients",
            EntityKind::AuthorizationCode => "auth_codes",
            EntityKind::Token => "tokens",
            EntityKind::Developer => "developers",
            EntityKind::ClientDeveloper => "client_developers",
        }
    }

    /// Index columns mirrored out of the record at write time
    fn index_fields(kind: EntityKind) -> &'static [IndexField] {
        match kind {
            EntityKind::Client => &[],
            EntityKind::AuthorizationCode | EntityKind::Token => &[IndexField::UserId],
            EntityKind::Developer => &[IndexField::DeveloperId],
            EntityKind::ClientDeveloper => &[IndexField::ClientId, IndexField::DeveloperId],
        }
    }

    fn insert_sql(kind: EntityKind) -> &'static str {
        match kind {
            EntityKind::Client => "INSERT INTO clients (k, record) VALUES (?, ?)",
            EntityKind::AuthorizationCode => {
                "INSERT INTO auth_codes (k, record, user_id) VALUES (?, ?, ?)"
            }
            EntityKind::Token => "INSERT INTO tokens (k, record, user_id) VALUES (?, ?, ?)",
            EntityKind::Developer => {
                "INSERT INTO developers (k, record, developer_id) VALUES (?, ?, ?)"
            }
            EntityKind::ClientDeveloper => {
                "INSERT INTO client_developers (k, record, client_id, developer_id) VALUES (?, ?, ?, ?)"
            }
        }
    }

    fn upsert_sql(kind: EntityKind) -> &'static str {
        match kind {
            EntityKind::Client => {
                "INSERT INTO clients (k, record) VALUES (?, ?) \
                 ON DUPLICATE KEY UPDATE record = VALUES(record)"
            }
            EntityKind::AuthorizationCode => {
                "INSERT INTO auth_codes (k, record, user_id) VALUES (?, ?, ?) \
                 ON DUPLICATE KEY UPDATE record = VALUES(record), user_id = VALUES(user_id)"
            }
            EntityKind::Token => {
                "INSERT INTO tokens (k, record, user_id) VALUES (?, ?, ?) \
                 ON DUPLICATE KEY UPDATE record = VALUES(record), user_id = VALUES(user_id)"
            }
            EntityKind::Developer => {
                "INSERT INTO developers (k, record, developer_id) VALUES (?, ?, ?) \
                 ON DUPLICATE KEY UPDATE record = VALUES(record), developer_id = VALUES(developer_id)"
            }
            EntityKind::ClientDeveloper => {
                "INSERT INTO client_developers (k, record, client_id, developer_id) VALUES (?, ?, ?, ?) \
                 ON DUPLICATE KEY UPDATE record = VALUES(record), client_id = VALUES(client_id), \
                 developer_id = VALUES(developer_id)"
            }
        }
    }

    async fn write(
        &self,
        sql: &str,
        kind: EntityKind,
        key: &[u8],
        record: &serde_json::Value,
    ) -> Result<()> {
        let mut query = sqlx::query(sql).bind(key.to_vec()).bind(record);
        for field in Self::index_fields(kind) {
            let value = record
                .get(field.column())
                .and_then(serde_json::Value::as_str)
                .map(str::to_string);
            query = query.bind(value);
        }
        query.execute(&self.pool).await.map_err(map_db_err)?;
        Ok(())
    }
}

fn map_db_err(e: sqlx::Error) -> StorageError {
    match e {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => {
            StorageError::Conflict(db.message().to_string())
        }
        sqlx::Error::Io(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => StorageError::Unavailable(e.to_string()),
        _ => StorageError::QueryFailed(e.to_string()),
    }
}

#[async_trait]
impl Backend for MySqlBackend {
    async fn put(&self, kind: EntityKind, key: &[u8], record: &serde_json::Value) -> Result<()> {
        self.write(Self::insert_sql(kind), kind, key, record).await
    }

    async fn update(&self, kind: EntityKind, key: &[u8], record: &serde_json::Value) -> Result<()> {
        self.write(Self::upsert_sql(kind), kind, key, record).await
    }

    async fn get(&self, kind: EntityKind, key: &[u8]) -> Result<Option<serde_json::Value>> {
        let sql = format!("SELECT record FROM {} WHERE k = ?", Self::table(kind));
        let row = sqlx::query(&sql)
            .bind(key.to_vec())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_err)?;

        match row {
            Some(row) => {
                let record: serde_json::Value = row
                    .try_get("record")
                    .map_err(|e| StorageError::SerializationFailed(e.to_string()))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, kind: EntityKind, key: &[u8]) -> Result<()> {
        let sql = format!("DELETE FROM {} WHERE k = ?", Self::table(kind));
        sqlx::query(&sql)
            .bind(key.to_vec())
            .execute(&self.pool)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    async fn delete_where(
        &self,
        kinds: &[EntityKind],
        field: IndexField,
        value: &str,
    ) -> Result<u64> {
        // One transaction across every table: readers never observe a partial
        // cascade, and any failure rolls the whole delete back.
        let mut tx = self.pool.begin().await.map_err(map_db_err)?;
        let mut deleted = 0u64;
        for kind in kinds {
            let sql = format!(
                "DELETE FROM {} WHERE {} = ?",
                Self::table(*kind),
                field.column()
            );
            let result = sqlx::query(&sql)
                .bind(value)
                .execute(&mut *tx)
                .await
                .map_err(map_db_err)?;
            deleted += result.rows_affected();
        }
        tx.commit().await.map_err(map_db_err)?;
        Ok(deleted)
    }

    async fn list_where(
        &self,
        kind: EntityKind,
        field: IndexField,
        value: &str,
    ) -> Result<Vec<serde_json::Value>> {
        let sql = format!(
            "SELECT record FROM {} WHERE {} = ?",
            Self::table(kind),
            field.column()
        );
        let rows = sqlx::query(&sql)
            .bind(value)
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_err)?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let record: serde_json::Value = row
                .try_get("record")
                .map_err(|e| StorageError::SerializationFailed(e.to_string()))?;
            records.push(record);
        }
        Ok(records)
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        Ok(())
    }

    async fn describe_encoding(&self) -> Result<Option<EncodingInfo>> {
        let row = sqlx::query(
            "SELECT @@character_set_connection AS connection_charset, \
             @@character_set_database AS storage_charset, \
             @@collation_connection AS connection_collation, \
             @@collation_database AS storage_collation",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_err)?;

        let info = EncodingInfo {
            connection_charset: row
                .try_get("connection_charset")
                .map_err(|e| StorageError::SerializationFailed(e.to_string()))?,
            storage_charset: row
                .try_get("storage_charset")
                .map_err(|e| StorageError::SerializationFailed(e.to_string()))?,
            connection_collation: row
                .try_get("connection_collation")
                .map_err(|e| StorageError::SerializationFailed(e.to_string()))?,
            storage_collation: row
                .try_get("storage_collation")
                .map_err(|e| StorageError::SerializationFailed(e.to_string()))?,
        };
        Ok(Some(info))
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
