//! Environment-based configuration for the store runtime.

use anyhow::Result;

use crate::errors::ConfigError;
use crate::store::types::ClientDescriptor;

/// Default ttl applied to authorization codes when callers pass none through
#[derive(Clone)]
pub struct DefaultCodeTtl(chrono::Duration);

/// Developer email uniqueness comparison mode
#[derive(Clone)]
pub struct DeveloperEmailCaseInsensitive(bool);

/// Clients declared in configuration, reconciled at startup
#[derive(Clone, Default)]
pub struct ConfiguredClients(Vec<ClientDescriptor>);

/// Main application configuration
#[derive(Clone)]
pub struct Config {
    pub version: String,
    pub storage_backend: String,
    pub database_url: Option<String>,
    pub configured_clients: ConfiguredClients,
    pub default_code_ttl: DefaultCodeTtl,
    pub developer_email_case_insensitive: DeveloperEmailCaseInsensitive,
}

impl Config {
    /// Create a new configuration from environment variables
    pub fn new() -> Result<Self> {
        let storage_backend = default_env("STORAGE_BACKEND", "memory");
        let database_url = optional_env("DATABASE_URL");
        let configured_clients: ConfiguredClients = optional_env("CLIENTS_FILE").try_into()?;
        let default_code_ttl: DefaultCodeTtl = default_env("DEFAULT_CODE_TTL", "10m").try_into()?;
        let developer_email_case_insensitive: DeveloperEmailCaseInsensitive =
            default_env("DEVELOPER_EMAIL_CASE_INSENSITIVE", "false").try_into()?;

        Ok(Self {
            version: version()?,
            storage_backend,
            database_url,
            configured_clients,
            default_code_ttl,
            developer_email_case_insensitive,
        })
    }
}

/// Get application version from build environment
pub fn version() -> Result<String> {
    option_env!("GIT_HASH")
        .or(option_env!("CARGO_PKG_VERSION"))
        .map(|val| val.to_string())
        .ok_or(ConfigError::VersionNotSet.into())
}

pub(crate) fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn default_env(name: &str, default_value: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default_value.to_string())
}

fn parse_bool(value: &str) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::BoolParsingFailed(value.to_string())),
    }
}

impl TryFrom<String> for DefaultCodeTtl {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let duration = duration_str::parse(&value)
            .map_err(|e| ConfigError::DurationParsingFailed(value.clone(), e.to_string()))?;
        let duration = chrono::Duration::from_std(duration)
            .map_err(|e| ConfigError::DurationParsingFailed(value, e.to_string()))?;
        Ok(Self(duration))
    }
}

impl AsRef<chrono::Duration> for DefaultCodeTtl {
    fn as_ref(&self) -> &chrono::Duration {
        &self.0
    }
}

impl TryFrom<String> for DeveloperEmailCaseInsensitive {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Ok(Self(parse_bool(&value)?))
    }
}

impl AsRef<bool> for DeveloperEmailCaseInsensitive {
    fn as_ref(&self) -> &bool {
        &self.0
    }
}

impl TryFrom<Option<String>> for ConfiguredClients {
    type Error = anyhow::Error;

    fn try_from(value: Option<String>) -> Result<Self, Self::Error> {
        let path = match value {
            None => return Ok(Self(Vec::new())),
            Some(p) if p.is_empty() => return Ok(Self(Vec::new())),
            Some(p) => p,
        };

        let contents = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::ClientsFileReadFailed(path.clone(), e.to_string()))?;
        let clients: Vec<ClientDescriptor> = serde_json::from_str(&contents)
            .map_err(|e| ConfigError::ClientsFileParseFailed(path, e.to_string()))?;
        Ok(Self(clients))
    }
}

impl AsRef<Vec<ClientDescriptor>> for ConfiguredClients {
    fn as_ref(&self) -> &Vec<ClientDescriptor> {
        &self.0
    }
}
