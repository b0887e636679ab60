//! Client registry
//!
//! Owns Client records: direct registration, point lookup, non-cascading
//! removal, and idempotent bootstrap from configuration.

use crate::errors::StorageError;
use crate::storage::traits::{Backend, EntityKind, Result};
use crate::store::types::Client;
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

pub struct ClientRegistry {
    backend: Arc<dyn Backend>,
}

impl ClientRegistry {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    fn key(id: Uuid) -> [u8; 16] {
        *id.as_bytes()
    }

    fn to_record(client: &Client) -> Result<serde_json::Value> {
        serde_json::to_value(client).map_err(|e| StorageError::SerializationFailed(e.to_string()))
    }

    fn from_record(record: serde_json::Value) -> Result<Client> {
        serde_json::from_value(record)
            .map_err(|e| StorageError::SerializationFailed(e.to_string()))
    }

    /// Register a new client. A colliding id is a `Conflict`; configuration
    /// sync is the only path that treats an existing id as an update.
    pub async fn register_client(&self, client: &Client) -> Result<Client> {
        let record = Self::to_record(client)?;
        self.backend
            .put(EntityKind::Client, &Self::key(client.id), &record)
            .await?;
        Ok(client.clone())
    }

    pub async fn get_client(&self, id: Uuid) -> Result<Option<Client>> {
        match self.backend.get(EntityKind::Client, &Self::key(id)).await? {
            Some(record) => Ok(Some(Self::from_record(record)?)),
            None => Ok(None),
        }
    }

    /// Delete the client row only. Codes and tokens issued under the client
    /// stay valid; revoking a client's grants is a separate concern.
    pub async fn remove_client(&self, id: Uuid) -> Result<()> {
        self.backend.delete(EntityKind::Client, &Self::key(id)).await
    }

    /// Reconcile the stored clients with configuration.
    ///
    /// Absent ids are inserted; existing rows have exactly their mutable
    /// fields (name, image_uri, redirect_uri, trusted) brought in line with
    /// configuration, leaving id, hashed_secret, and created_at untouched.
    /// Re-running with unchanged configuration performs no write.
    pub async fn sync_configured(&self, configured: &[Client]) -> Result<()> {
        for desired in configured {
            match self.get_client(desired.id).await? {
                None => {
                    let record = Self::to_record(desired)?;
                    self.backend
                        .put(EntityKind::Client, &Self::key(desired.id), &record)
                        .await?;
                    tracing::debug!(client_id = %desired.id.simple(), "configured client inserted");
                }
                Some(existing) => {
                    let unchanged = existing.name == desired.name
                        && existing.image_uri == desired.image_uri
                        && existing.redirect_uri == desired.redirect_uri
                        && existing.trusted == desired.trusted;
                    if unchanged {
                        continue;
                    }

                    let merged = Client {
                        name: desired.name.clone(),
                        image_uri: desired.image_uri.clone(),
                        redirect_uri: desired.redirect_uri.clone(),
                        trusted: desired.trusted,
                        updated_at: Utc::now(),
                        ..existing
                    };
                    let record = Self::to_record(&merged)?;
                    self.backend
                        .update(EntityKind::Client, &Self::key(merged.id), &record)
                        .await?;
                    tracing::debug!(client_id = %merged.id.simple(), "configured client updated");
                }
            }
        }
        Ok(())
    }
}
