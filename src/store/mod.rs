//! Store facade composing the client, issuance, and developer registries.
//!
//! `AuthStore` is the single entry point for callers. Identifiers cross its
//! boundary as lowercase hexadecimal text and are translated to fixed-length
//! binary values here; the registries below it only ever see the binary form.

pub mod clients;
pub mod developers;
pub mod issuance;
pub mod types;

pub use clients::ClientRegistry;
pub use developers::DeveloperRegistry;
pub use issuance::CredentialIssuanceStore;

use crate::errors::StorageError;
use crate::storage::traits::{Backend, Result};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use types::{AuthorizationCode, Client, ClientDescriptor, Developer, EncodingInfo, Token};
use uuid::Uuid;

/// Behavior knobs resolved from configuration.
#[derive(Debug, Clone, Default)]
pub struct StoreOptions {
    /// Compare developer emails case-insensitively. Off by default.
    pub developer_email_case_insensitive: bool,
}

/// The persistence facade callers interact with. Owns no state of its own;
/// constructed once at startup and shared by reference.
pub struct AuthStore {
    backend: Arc<dyn Backend>,
    clients: ClientRegistry,
    issuance: CredentialIssuanceStore,
    developers: DeveloperRegistry,
}

impl AuthStore {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self::with_options(backend, StoreOptions::default())
    }

    pub fn with_options(backend: Arc<dyn Backend>, options: StoreOptions) -> Self {
        Self {
            clients: ClientRegistry::new(backend.clone()),
            issuance: CredentialIssuanceStore::new(backend.clone()),
            developers: DeveloperRegistry::new(
                backend.clone(),
                options.developer_email_case_insensitive,
            ),
            backend,
        }
    }

    /// Readiness gate: probe the backend, log its encoding, and reconcile
    /// configured clients. Run once at startup before accepting traffic.
    pub async fn initialize(&self, configured: &[ClientDescriptor]) -> Result<()> {
        self.ping().await?;

        if let Some(info) = self.backend.describe_encoding().await? {
            if !info.connection_charset.starts_with("utf8")
                || !info.storage_charset.starts_with("utf8")
            {
                tracing::warn!(
                    connection_charset = %info.connection_charset,
                    storage_charset = %info.storage_charset,
                    "backend is not serving a UTF-8 charset; text fidelity is at risk"
                );
            }
        }

        self.sync_configured_clients(configured).await
    }

    /// Release backend resources.
    pub async fn close(&self) {
        self.backend.close().await;
    }

    // ===== Clients =====

    pub async fn register_client(&self, descriptor: &ClientDescriptor) -> Result<Client> {
        let client = resolve_descriptor(descriptor, Utc::now())?;
        self.clients.register_client(&client).await
    }

    pub async fn get_client(&self, id: &str) -> Result<Option<Client>> {
        let id = parse_identifier("id", id)?;
        self.clients.get_client(id).await
    }

    pub async fn remove_client(&self, id: &str) -> Result<()> {
        let id = parse_identifier("id", id)?;
        self.clients.remove_client(id).await
    }

    /// Idempotent reconciliation of configuration-declared clients. Exposed
    /// for re-invocation; `initialize` runs it at startup.
    pub async fn sync_configured_clients(&self, configured: &[ClientDescriptor]) -> Result<()> {
        let now = Utc::now();
        let mut resolved = Vec::with_capacity(configured.len());
        for descriptor in configured {
            resolved.push(resolve_descriptor(descriptor, now)?);
        }
        self.clients.sync_configured(&resolved).await
    }

    // ===== Codes and tokens =====

    pub async fn generate_code(
        &self,
        client_id: &str,
        user_id: &str,
        email: &str,
        scope: &[String],
        ttl: Duration,
    ) -> Result<String> {
        let client_id = parse_identifier("clientId", client_id)?;
        let user_id = parse_identifier("userId", user_id)?;
        let code = self
            .issuance
            .generate_code(client_id, user_id, email, scope, ttl)
            .await?;
        Ok(code.code)
    }

    pub async fn get_code(&self, code: &str) -> Result<Option<AuthorizationCode>> {
        self.issuance.get_code(code).await
    }

    pub async fn generate_token(
        &self,
        client_id: &str,
        user_id: &str,
        email: &str,
        scope: &[String],
    ) -> Result<Token> {
        let client_id = parse_identifier("clientId", client_id)?;
        let user_id = parse_identifier("userId", user_id)?;
        self.issuance
            .generate_token(client_id, user_id, email, scope)
            .await
    }

    pub async fn get_token(&self, token: &str) -> Result<Option<Token>> {
        self.issuance.get_token(token).await
    }

    /// Revoke every code and token issued to a user, atomically.
    pub async fn remove_user(&self, user_id: &str) -> Result<()> {
        let user_id = parse_identifier("userId", user_id)?;
        self.issuance.remove_user(user_id).await
    }

    // ===== Developers =====

    pub async fn activate_developer(&self, email: &str) -> Result<Developer> {
        self.developers.activate_developer(email).await
    }

    pub async fn get_developer(&self, email: &str) -> Result<Option<Developer>> {
        self.developers.get_developer(email).await
    }

    pub async fn remove_developer(&self, email: &str) -> Result<()> {
        self.developers.remove_developer(email).await
    }

    pub async fn register_client_developer(
        &self,
        developer_id: &str,
        client_id: &str,
    ) -> Result<()> {
        let developer_id = parse_identifier("developerId", developer_id)?;
        let client_id = parse_identifier("clientId", client_id)?;
        self.developers
            .register_client_developer(developer_id, client_id)
            .await
    }

    pub async fn get_client_developers(&self, client_id: &str) -> Result<Vec<Developer>> {
        let client_id = parse_identifier("clientId", client_id)?;
        self.developers.get_client_developers(client_id).await
    }

    // ===== Backend passthrough =====

    pub async fn ping(&self) -> Result<()> {
        self.backend.ping().await
    }

    pub async fn get_encoding_info(&self) -> Result<Option<EncodingInfo>> {
        self.backend.describe_encoding().await
    }
}

/// Translate a lowercase-hex identifier into its binary form.
fn parse_identifier(field: &str, value: &str) -> Result<Uuid> {
    if value.is_empty() {
        return Err(StorageError::InvalidArgument(format!("{} is required", field)));
    }
    Uuid::try_parse(value).map_err(|_| {
        StorageError::InvalidArgument(format!(
            "{} must be a hexadecimal identifier: {}",
            field, value
        ))
    })
}

/// Resolve a boundary descriptor into a full client record.
fn resolve_descriptor(descriptor: &ClientDescriptor, now: DateTime<Utc>) -> Result<Client> {
    let id = parse_identifier("id", &descriptor.id)?;
    let hashed_secret = if descriptor.hashed_secret.is_empty() {
        Vec::new()
    } else {
        hex::decode(&descriptor.hashed_secret).map_err(|e| {
            StorageError::InvalidArgument(format!("hashedSecret must be hexadecimal: {}", e))
        })?
    };

    Ok(Client {
        id,
        name: descriptor.name.clone(),
        hashed_secret,
        image_uri: descriptor.image_uri.clone(),
        redirect_uri: descriptor.redirect_uri.clone(),
        trusted: descriptor.trusted,
        created_at: now,
        updated_at: now,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_identifier_names_the_field() {
        let err = parse_identifier("clientId", "").unwrap_err();
        assert!(matches!(err, StorageError::InvalidArgument(m) if m == "clientId is required"));
    }

    #[test]
    fn malformed_identifier_is_invalid_argument() {
        let err = parse_identifier("id", "not-hex").unwrap_err();
        assert!(matches!(err, StorageError::InvalidArgument(_)));
    }

    #[test]
    fn identifier_round_trips_through_hex() {
        let id = Uuid::new_v4();
        let hex = id.simple().to_string();
        assert_eq!(parse_identifier("id", &hex).unwrap(), id);
    }

    #[test]
    fn descriptor_resolves_secret_from_hex() {
        let descriptor = ClientDescriptor {
            id: Uuid::new_v4().simple().to_string(),
            name: "Example App".to_string(),
            hashed_secret: "deadbeef".to_string(),
            image_uri: String::new(),
            redirect_uri: "https://app.example.com/callback".to_string(),
            trusted: false,
        };
        let client = resolve_descriptor(&descriptor, Utc::now()).unwrap();
        assert_eq!(client.hashed_secret, vec![0xde, 0xad, 0xbe, 0xef]);

        let bad = ClientDescriptor {
            hashed_secret: "zz".to_string(),
            ..descriptor
        };
        assert!(matches!(
            resolve_descriptor(&bad, Utc::now()),
            Err(StorageError::InvalidArgument(_))
        ));
    }
}
