//! Core record types held by the store.
//!
//! Identifiers are fixed-length binary values internally and lowercase
//! hexadecimal text at the caller boundary; the serde representation uses the
//! hex form so records survive any backend byte-for-byte.

use base64::prelude::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered relying-party application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    /// Unique client identifier
    #[serde(with = "uuid::serde::simple")]
    pub id: Uuid,
    /// Display name, stored byte-for-byte
    pub name: String,
    /// Hashed client secret; opaque to the store, never compared as plaintext
    pub hashed_secret: Vec<u8>,
    /// Logo or image location shown on consent screens
    pub image_uri: String,
    /// Redirect target registered for the client
    pub redirect_uri: String,
    /// Whether the client skips explicit user consent
    pub trusted: bool,
    /// Registration timestamp, server-assigned
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp, server-assigned
    pub updated_at: DateTime<Utc>,
}

/// A short-lived grant exchanged for a token.
///
/// Expiry is metadata: nothing here purges or filters expired codes, callers
/// interpret `expires_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationCode {
    /// The opaque code value, primary key
    pub code: String,
    /// Client the code was issued under
    #[serde(with = "uuid::serde::simple")]
    pub client_id: Uuid,
    /// User that authorized the grant
    #[serde(with = "uuid::serde::simple")]
    pub user_id: Uuid,
    /// Email captured at authorization time
    pub email: String,
    /// Granted scope values
    pub scope: Vec<String>,
    /// Issuance timestamp
    pub issued_at: DateTime<Utc>,
    /// Issuance timestamp plus the requested ttl
    pub expires_at: DateTime<Utc>,
}

/// An access grant held by a client on behalf of a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    /// The opaque token value, primary key
    pub token: String,
    /// Client the token was issued under
    #[serde(with = "uuid::serde::simple")]
    pub client_id: Uuid,
    /// User the token acts on behalf of
    #[serde(with = "uuid::serde::simple")]
    pub user_id: Uuid,
    /// Email captured at issuance time
    pub email: String,
    /// Granted scope values
    pub scope: Vec<String>,
    /// Issuance timestamp
    pub issued_at: DateTime<Utc>,
}

/// An account owning one or more clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Developer {
    /// Generated internal identifier
    #[serde(with = "uuid::serde::simple")]
    pub developer_id: Uuid,
    /// Natural external key, globally unique
    pub email: String,
    /// Activation timestamp
    pub created_at: DateTime<Utc>,
}

/// Association between a developer and a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientDeveloper {
    #[serde(with = "uuid::serde::simple")]
    pub developer_id: Uuid,
    #[serde(with = "uuid::serde::simple")]
    pub client_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Client descriptor as supplied by callers and configuration.
///
/// Identifiers and the hashed secret cross this boundary as lowercase hex
/// text; the facade resolves them into their binary forms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientDescriptor {
    /// Client identifier, hex text
    pub id: String,
    pub name: String,
    /// Hashed secret, hex text
    #[serde(default)]
    pub hashed_secret: String,
    #[serde(default)]
    pub image_uri: String,
    #[serde(default)]
    pub redirect_uri: String,
    #[serde(default)]
    pub trusted: bool,
}

/// Charset and collation reported by a durable backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodingInfo {
    pub connection_charset: String,
    pub storage_charset: String,
    pub connection_collation: String,
    pub storage_collation: String,
}

/// Generate a secure random credential value for codes and tokens
pub fn generate_credential_value() -> String {
    let bytes: [u8; 32] = rand::random();
    BASE64_URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_values_are_unique_and_urlsafe() {
        let a = generate_credential_value();
        let b = generate_credential_value();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn identifiers_serialize_as_lowercase_hex() {
        let developer = Developer {
            developer_id: Uuid::new_v4(),
            email: "dev@example.com".to_string(),
            created_at: Utc::now(),
        };
        let value = serde_json::to_value(&developer).unwrap();
        let id = value["developer_id"].as_str().unwrap();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));

        let back: Developer = serde_json::from_value(value).unwrap();
        assert_eq!(back, developer);
    }
}
