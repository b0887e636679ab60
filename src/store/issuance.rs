//! Credential issuance store
//!
//! Owns AuthorizationCode and Token records: opaque value generation with a
//! bounded retry-on-collision loop, point lookups, and the cascading per-user
//! revocation that spans both record families in one transactional unit.

use crate::errors::StorageError;
use crate::storage::traits::{Backend, EntityKind, IndexField, Result};
use crate::store::types::{AuthorizationCode, Token, generate_credential_value};
use chrono::{Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Attempt ceiling for opaque value generation. Collisions are effectively
/// unobservable in a 256-bit value space; the bound exists so a broken
/// backend cannot spin the loop forever.
const MAX_GENERATION_ATTEMPTS: u32 = 5;

/// Attempt ceiling for the per-user cascade before surfacing `Internal`.
const MAX_CASCADE_ATTEMPTS: u32 = 3;

pub struct CredentialIssuanceStore {
    backend: Arc<dyn Backend>,
}

impl CredentialIssuanceStore {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    fn to_record<T: serde::Serialize>(value: &T) -> Result<serde_json::Value> {
        serde_json::to_value(value).map_err(|e| StorageError::SerializationFailed(e.to_string()))
    }

    fn from_record<T: serde::de::DeserializeOwned>(record: serde_json::Value) -> Result<T> {
        serde_json::from_value(record)
            .map_err(|e| StorageError::SerializationFailed(e.to_string()))
    }

    fn require_ids(client_id: Uuid, user_id: Uuid) -> Result<()> {
        if client_id.is_nil() {
            return Err(StorageError::InvalidArgument("clientId is required".to_string()));
        }
        if user_id.is_nil() {
            return Err(StorageError::InvalidArgument("userId is required".to_string()));
        }
        Ok(())
    }

    /// Issue an authorization code for a client/user pair.
    ///
    /// A collision on the synthesized value regenerates and retries; it is a
    /// generation-time concern and never surfaces to the caller.
    pub async fn generate_code(
        &self,
        client_id: Uuid,
        user_id: Uuid,
        email: &str,
        scope: &[String],
        ttl: Duration,
    ) -> Result<AuthorizationCode> {
        Self::require_ids(client_id, user_id)?;

        for attempt in 1..=MAX_GENERATION_ATTEMPTS {
            let issued_at = Utc::now();
            let code = AuthorizationCode {
                code: generate_credential_value(),
                client_id,
                user_id,
                email: email.to_string(),
                scope: scope.to_vec(),
                issued_at,
                expires_at: issued_at + ttl,
            };
            let record = Self::to_record(&code)?;
            match self
                .backend
                .put(EntityKind::AuthorizationCode, code.code.as_bytes(), &record)
                .await
            {
                Ok(()) => return Ok(code),
                Err(StorageError::Conflict(_)) => {
                    tracing::warn!(attempt, "authorization code collision, regenerating");
                }
                Err(e) => return Err(e),
            }
        }
        Err(StorageError::Internal(
            "authorization code generation retry budget exhausted".to_string(),
        ))
    }

    /// Point lookup. Expiry is not interpreted here; callers read
    /// `expires_at` themselves.
    pub async fn get_code(&self, code: &str) -> Result<Option<AuthorizationCode>> {
        match self
            .backend
            .get(EntityKind::AuthorizationCode, code.as_bytes())
            .await?
        {
            Some(record) => Ok(Some(Self::from_record(record)?)),
            None => Ok(None),
        }
    }

    /// Issue a token with the same uniqueness discipline as codes.
    pub async fn generate_token(
        &self,
        client_id: Uuid,
        user_id: Uuid,
        email: &str,
        scope: &[String],
    ) -> Result<Token> {
        Self::require_ids(client_id, user_id)?;

        for attempt in 1..=MAX_GENERATION_ATTEMPTS {
            let token = Token {
                token: generate_credential_value(),
                client_id,
                user_id,
                email: email.to_string(),
                scope: scope.to_vec(),
                issued_at: Utc::now(),
            };
            let record = Self::to_record(&token)?;
            match self
                .backend
                .put(EntityKind::Token, token.token.as_bytes(), &record)
                .await
            {
                Ok(()) => return Ok(token),
                Err(StorageError::Conflict(_)) => {
                    tracing::warn!(attempt, "token collision, regenerating");
                }
                Err(e) => return Err(e),
            }
        }
        Err(StorageError::Internal(
            "token generation retry budget exhausted".to_string(),
        ))
    }

    pub async fn get_token(&self, token: &str) -> Result<Option<Token>> {
        match self.backend.get(EntityKind::Token, token.as_bytes()).await? {
            Some(record) => Ok(Some(Self::from_record(record)?)),
            None => Ok(None),
        }
    }

    /// Delete every code and token issued to a user.
    ///
    /// The backend runs both deletes in one transactional unit, so a reader
    /// never observes a partial cascade. Transient failures retry up to the
    /// attempt ceiling, then surface as `Internal`; validation and conflict
    /// errors are never retried.
    pub async fn remove_user(&self, user_id: Uuid) -> Result<()> {
        if user_id.is_nil() {
            return Err(StorageError::InvalidArgument("userId is required".to_string()));
        }

        let value = user_id.simple().to_string();
        let mut last_error = None;
        for attempt in 1..=MAX_CASCADE_ATTEMPTS {
            match self
                .backend
                .delete_where(
                    &[EntityKind::AuthorizationCode, EntityKind::Token],
                    IndexField::UserId,
                    &value,
                )
                .await
            {
                Ok(deleted) => {
                    tracing::debug!(user_id = %value, deleted, "user credentials revoked");
                    return Ok(());
                }
                Err(e @ (StorageError::Unavailable(_) | StorageError::QueryFailed(_))) => {
                    tracing::warn!(user_id = %value, attempt, error = %e, "user cascade failed, retrying");
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }
        Err(StorageError::Internal(format!(
            "user credential cascade failed after {} attempts: {}",
            MAX_CASCADE_ATTEMPTS,
            last_error.map(|e| e.to_string()).unwrap_or_default()
        )))
    }
}
