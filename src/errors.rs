//! Standardized error types following the `error-authdb-<domain>-<number>` format.

use thiserror::Error;

/// Configuration errors that occur during application startup
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Error when a required environment variable is not set
    #[error("error-authdb-config-1 {0} must be set")]
    EnvVarRequired(String),

    /// Error when version information is not available
    #[error("error-authdb-config-2 One of GIT_HASH or CARGO_PKG_VERSION must be set")]
    VersionNotSet,

    /// Error when a duration string cannot be parsed
    #[error("error-authdb-config-3 Failed to parse duration '{0}': {1}")]
    DurationParsingFailed(String, String),

    /// Error when a boolean string cannot be parsed
    #[error(
        "error-authdb-config-4 Failed to parse boolean '{0}': expected true/false/1/0/yes/no/on/off"
    )]
    BoolParsingFailed(String),

    /// Error when the configured clients file cannot be read
    #[error("error-authdb-config-5 Failed to read clients file '{0}': {1}")]
    ClientsFileReadFailed(String, String),

    /// Error when the configured clients file cannot be parsed
    #[error("error-authdb-config-6 Failed to parse clients file '{0}': {1}")]
    ClientsFileParseFailed(String, String),
}

/// Storage errors surfaced by the backends and the store built on them.
///
/// "Not found" is not represented here: point lookups return `Ok(None)`.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Error when the backend connection cannot be established
    #[error("error-authdb-storage-1 Backend connection failed: {0}")]
    ConnectionFailed(String),

    /// Error when query execution fails
    #[error("error-authdb-storage-2 Query execution failed: {0}")]
    QueryFailed(String),

    /// Error when record serialization fails
    #[error("error-authdb-storage-3 Record serialization failed: {0}")]
    SerializationFailed(String),

    /// Error when the backend is unreachable or unhealthy
    #[error("error-authdb-storage-4 Backend unavailable: {0}")]
    Unavailable(String),

    /// Error when a required argument is missing or malformed
    #[error("error-authdb-storage-5 Invalid argument: {0}")]
    InvalidArgument(String),

    /// Error when a uniqueness constraint is violated
    #[error("error-authdb-storage-6 Conflict: {0}")]
    Conflict(String),

    /// Error when stored or configured data is malformed
    #[error("error-authdb-storage-7 Invalid data: {0}")]
    InvalidData(String),

    /// Error when a retry budget is exhausted or an internal invariant breaks
    #[error("error-authdb-storage-8 Internal error: {0}")]
    Internal(String),
}
