//! Developer registry
//!
//! Owns Developer records and the Developer↔Client association. Developer
//! email is the natural key; comparison is case-sensitive unless the registry
//! is configured to normalize.

use crate::errors::StorageError;
use crate::storage::traits::{Backend, EntityKind, IndexField, Result};
use crate::store::types::{ClientDeveloper, Developer};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

pub struct DeveloperRegistry {
    backend: Arc<dyn Backend>,
    normalize_email: bool,
}

impl DeveloperRegistry {
    pub fn new(backend: Arc<dyn Backend>, normalize_email: bool) -> Self {
        Self {
            backend,
            normalize_email,
        }
    }

    fn email_key(&self, email: &str) -> Vec<u8> {
        if self.normalize_email {
            email.to_lowercase().into_bytes()
        } else {
            email.as_bytes().to_vec()
        }
    }

    /// Association key: developer id bytes followed by client id bytes.
    fn association_key(developer_id: Uuid, client_id: Uuid) -> [u8; 32] {
        let mut key = [0u8; 32];
        key[..16].copy_from_slice(developer_id.as_bytes());
        key[16..].copy_from_slice(client_id.as_bytes());
        key
    }

    fn to_record<T: serde::Serialize>(value: &T) -> Result<serde_json::Value> {
        serde_json::to_value(value).map_err(|e| StorageError::SerializationFailed(e.to_string()))
    }

    fn from_record<T: serde::de::DeserializeOwned>(record: serde_json::Value) -> Result<T> {
        serde_json::from_value(record)
            .map_err(|e| StorageError::SerializationFailed(e.to_string()))
    }

    fn require_email(email: &str) -> Result<()> {
        if email.is_empty() {
            return Err(StorageError::InvalidArgument("Email is required".to_string()));
        }
        Ok(())
    }

    /// Activate a developer account. A second activation with the same email
    /// fails with `Conflict` so callers can react to "already registered".
    pub async fn activate_developer(&self, email: &str) -> Result<Developer> {
        Self::require_email(email)?;

        let developer = Developer {
            developer_id: Uuid::new_v4(),
            email: email.to_string(),
            created_at: Utc::now(),
        };
        let record = Self::to_record(&developer)?;
        self.backend
            .put(EntityKind::Developer, &self.email_key(email), &record)
            .await?;
        Ok(developer)
    }

    pub async fn get_developer(&self, email: &str) -> Result<Option<Developer>> {
        Self::require_email(email)?;

        match self
            .backend
            .get(EntityKind::Developer, &self.email_key(email))
            .await?
        {
            Some(record) => Ok(Some(Self::from_record(record)?)),
            None => Ok(None),
        }
    }

    /// Remove a developer account. Removing an unknown email is a no-op.
    pub async fn remove_developer(&self, email: &str) -> Result<()> {
        self.backend
            .delete(EntityKind::Developer, &self.email_key(email))
            .await
    }

    /// Associate a developer with a client. Both are trusted to exist;
    /// re-registering an existing pair is a no-op.
    pub async fn register_client_developer(
        &self,
        developer_id: Uuid,
        client_id: Uuid,
    ) -> Result<()> {
        let association = ClientDeveloper {
            developer_id,
            client_id,
            created_at: Utc::now(),
        };
        let record = Self::to_record(&association)?;
        self.backend
            .update(
                EntityKind::ClientDeveloper,
                &Self::association_key(developer_id, client_id),
                &record,
            )
            .await
    }

    /// Developers associated with a client; empty when there are none.
    pub async fn get_client_developers(&self, client_id: Uuid) -> Result<Vec<Developer>> {
        let associations = self
            .backend
            .list_where(
                EntityKind::ClientDeveloper,
                IndexField::ClientId,
                &client_id.simple().to_string(),
            )
            .await?;

        let mut developers = Vec::with_capacity(associations.len());
        for record in associations {
            let association: ClientDeveloper = Self::from_record(record)?;
            let matches = self
                .backend
                .list_where(
                    EntityKind::Developer,
                    IndexField::DeveloperId,
                    &association.developer_id.simple().to_string(),
                )
                .await?;
            if let Some(record) = matches.into_iter().next() {
                developers.push(Self::from_record(record)?);
            }
        }
        Ok(developers)
    }
}
