//! Storage capability trait implemented by every backend.
//!
//! Defines the primitive keyed operations the registries are built on:
//! insert, upsert, point lookup, point delete, indexed range delete/read,
//! health probe, and encoding description.

use crate::errors::StorageError;
use crate::store::types::EncodingInfo;
use async_trait::async_trait;

pub type Result<T> = std::result::Result<T, StorageError>;

/// The entity families a backend stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Client,
    AuthorizationCode,
    Token,
    Developer,
    ClientDeveloper,
}

/// Indexed fields a backend can filter on.
///
/// Values are matched against the hex text form carried in the serialized
/// record, so the column name doubles as the record field name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexField {
    UserId,
    ClientId,
    DeveloperId,
}

impl IndexField {
    pub fn column(&self) -> &'static str {
        match self {
            IndexField::UserId => "user_id",
            IndexField::ClientId => "client_id",
            IndexField::DeveloperId => "developer_id",
        }
    }
}

/// Primitive keyed storage exposed by a concrete medium.
///
/// Records cross this boundary as JSON values; the registries own the typed
/// structs and their serde conversion. Point operations are independently
/// safe to run concurrently across different keys.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Insert a record under a key; an existing key is a `Conflict`.
    async fn put(&self, kind: EntityKind, key: &[u8], record: &serde_json::Value) -> Result<()>;

    /// Insert or replace a record under a key.
    async fn update(&self, kind: EntityKind, key: &[u8], record: &serde_json::Value) -> Result<()>;

    /// Point lookup; absence is `Ok(None)`, never an error.
    async fn get(&self, kind: EntityKind, key: &[u8]) -> Result<Option<serde_json::Value>>;

    /// Point delete; deleting a missing key is a no-op.
    async fn delete(&self, kind: EntityKind, key: &[u8]) -> Result<()>;

    /// Delete every record whose indexed field equals `value`, across all the
    /// given kinds within one transactional unit. Returns the deleted count.
    async fn delete_where(
        &self,
        kinds: &[EntityKind],
        field: IndexField,
        value: &str,
    ) -> Result<u64>;

    /// Return every record of one kind whose indexed field equals `value`.
    async fn list_where(
        &self,
        kind: EntityKind,
        field: IndexField,
        value: &str,
    ) -> Result<Vec<serde_json::Value>>;

    /// Health probe; must succeed against a healthy backend.
    async fn ping(&self) -> Result<()>;

    /// Charset/collation served by the medium; `None` when not applicable.
    async fn describe_encoding(&self) -> Result<Option<EncodingInfo>>;

    /// Release backend resources. Further calls may fail.
    async fn close(&self);
}
