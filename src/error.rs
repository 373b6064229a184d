//! Error types for the azad provisioning system.
//!
//! This module provides the error hierarchy for every stage of a resource
//! lifecycle: configuration, state management, Azure API calls, long-running
//! operation reconciliation, and directory lookups.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// The main error type for the azad provisioning system.
#[derive(Debug, Error)]
pub enum AzadError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// State management errors.
    #[error("State error: {0}")]
    State(#[from] StateError),

    /// Azure API errors.
    #[error("Azure API error: {0}")]
    Api(#[from] ApiError),

    /// Long-running operation errors.
    #[error("{0}")]
    Operation(#[from] OperationError),

    /// Directory lookup errors.
    #[error("{0}")]
    Lookup(#[from] LookupError),

    /// A resource handler call failed; `message` names the resource.
    #[error("{message}: {source}")]
    Resource {
        /// What was being attempted.
        message: String,
        /// Underlying error.
        #[source]
        source: Box<AzadError>,
    },

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file was not found.
    #[error("Configuration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The configuration file could not be parsed.
    #[error("Failed to parse configuration: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("Configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },

    /// No usable credentials were configured.
    #[error("Missing credentials: {message}")]
    MissingCredentials {
        /// What is missing.
        message: String,
    },

    /// Duplicate resource definition.
    #[error("Duplicate {resource_type} name: {name}")]
    DuplicateName {
        /// Type of resource.
        resource_type: String,
        /// The duplicated name.
        name: String,
    },
}

/// State management errors.
#[derive(Debug, Error)]
pub enum StateError {
    /// State is corrupted.
    #[error("State is corrupted: {message}")]
    Corrupted {
        /// Description of the corruption.
        message: String,
    },

    /// State could not be written.
    #[error("Failed to write state: {message}")]
    WriteFailed {
        /// Description of the write failure.
        message: String,
    },

    /// State lock acquisition failed.
    #[error("Failed to acquire state lock: {message}")]
    LockFailed {
        /// Description of the lock failure.
        message: String,
    },

    /// State lock is held by another process.
    #[error("State is locked by another process (lock holder: {holder}, since: {since})")]
    LockedByOther {
        /// Identifier of the lock holder.
        holder: String,
        /// When the lock was acquired.
        since: String,
    },

    /// Serialization error.
    #[error("State serialization error: {message}")]
    SerializationError {
        /// Description of the serialization error.
        message: String,
    },

    /// State version mismatch.
    #[error("State version mismatch: expected {expected}, found {found}")]
    VersionMismatch {
        /// Expected state version.
        expected: String,
        /// Found state version.
        found: String,
    },

    /// The state lock was removed or taken over while held.
    #[error("State lock {lock_id} is no longer held by this run")]
    LockLost {
        /// ID of the lock that was lost.
        lock_id: String,
    },

    /// A resource is not tracked in state.
    #[error("Resource '{name}' is not tracked in state")]
    UnknownResource {
        /// Name of the resource.
        name: String,
    },
}

/// Azure API errors.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Authentication failed.
    #[error("authentication failed: {message}")]
    AuthenticationFailed {
        /// Description of the auth failure.
        message: String,
    },

    /// API request failed with a non-success status.
    #[error("request failed: {status} {code} - {message}")]
    RequestFailed {
        /// HTTP status code.
        status: u16,
        /// Azure error code, `Unknown` when the body carried none.
        code: String,
        /// Error message from the API.
        message: String,
    },

    /// The requested resource does not exist.
    #[error("resource not found: {url}")]
    NotFound {
        /// URL that returned 404.
        url: String,
    },

    /// Rate limited.
    #[error("rate limited, retry after {retry_after_secs} seconds")]
    RateLimited {
        /// Seconds to wait before retrying.
        retry_after_secs: u64,
    },

    /// Network error.
    #[error("network error: {message}")]
    NetworkError {
        /// Description of the network error.
        message: String,
    },

    /// Invalid response from the API.
    #[error("invalid response: {message}")]
    InvalidResponse {
        /// Description of the response issue.
        message: String,
    },

    /// A string could not be parsed as an ARM resource ID.
    #[error("invalid resource ID {id:?}: {reason}")]
    InvalidResourceId {
        /// The offending ID.
        id: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Long-running operation errors.
#[derive(Debug, Error)]
pub enum OperationError {
    /// The initiating request was rejected; waiting will not help.
    #[error("Error {operation} {resource}: {source}")]
    RequestRejected {
        /// Operation name.
        operation: String,
        /// Resource description.
        resource: String,
        /// Underlying error.
        #[source]
        source: Box<AzadError>,
    },

    /// The remote side reported the operation as failed.
    #[error("Error waiting for completion of {operation} {resource}: {code}: {message}")]
    OperationFailed {
        /// Operation name.
        operation: String,
        /// Resource description.
        resource: String,
        /// Remote error code.
        code: String,
        /// Remote error message.
        message: String,
    },

    /// The deadline passed or the operation was cancelled while polling.
    #[error(
        "Timed out waiting for {operation} {resource} after {}s{}; the remote operation may still be running",
        .elapsed.as_secs(),
        cancel_suffix(.cancelled)
    )]
    Timeout {
        /// Operation name.
        operation: String,
        /// Resource description.
        resource: String,
        /// Time spent polling.
        elapsed: Duration,
        /// Whether a cancellation signal ended the wait.
        cancelled: bool,
    },

    /// A poll failed with an error that is not transient.
    #[error("Error polling {operation} {resource}: {source}")]
    PollFailed {
        /// Operation name.
        operation: String,
        /// Resource description.
        resource: String,
        /// Underlying error.
        #[source]
        source: Box<AzadError>,
    },
}

/// Directory lookup errors.
#[derive(Debug, Error)]
pub enum LookupError {
    /// No entity matched the lookup key.
    #[error("{message}")]
    NotFound {
        /// Human-readable description of what was not found.
        message: String,
    },

    /// More than one mutually exclusive key was populated.
    #[error("only one of {} may be set, got: {}", .allowed.join(", "), .populated.join(", "))]
    AmbiguousInput {
        /// Keys the lookup accepts.
        allowed: Vec<&'static str>,
        /// Keys that were populated.
        populated: Vec<&'static str>,
    },

    /// None of the accepted keys was populated.
    #[error("one of {} must be set", .allowed.join(", "))]
    MissingKey {
        /// Keys the lookup accepts.
        allowed: Vec<&'static str>,
    },

    /// Fetching a candidate by its direct key failed.
    #[error("Error retrieving {kind} {id:?}: {source}")]
    FetchFailed {
        /// Entity kind being fetched.
        kind: &'static str,
        /// Key that was used.
        id: String,
        /// Underlying error.
        #[source]
        source: Box<AzadError>,
    },

    /// Listing candidates failed.
    #[error("Error listing {kind}: {source}")]
    ListFailed {
        /// Entity kind being listed.
        kind: &'static str,
        /// Underlying error.
        #[source]
        source: Box<AzadError>,
    },
}

const fn cancel_suffix(cancelled: &bool) -> &'static str {
    if *cancelled { " (cancelled)" } else { "" }
}

/// Result type alias for azad operations.
pub type Result<T> = std::result::Result<T, AzadError>;

impl AzadError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Wraps this error with a description of what was being attempted.
    #[must_use]
    pub fn context(self, message: impl Into<String>) -> Self {
        Self::Resource {
            message: message.into(),
            source: Box::new(self),
        }
    }

    /// Returns true if this error is retryable.
    ///
    /// Network failures, throttling, and server-side (5xx) failures are
    /// transient; everything else is final.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Api(ApiError::RateLimited { .. } | ApiError::NetworkError { .. }) => true,
            Self::Api(ApiError::RequestFailed { status, .. }) => *status >= 500,
            Self::State(StateError::LockFailed { .. }) => true,
            _ => false,
        }
    }

    /// Returns the suggested retry delay in seconds, if applicable.
    #[must_use]
    pub const fn retry_delay_secs(&self) -> Option<u64> {
        match self {
            Self::Api(ApiError::RateLimited { retry_after_secs }) => Some(*retry_after_secs),
            Self::Api(ApiError::NetworkError { .. } | ApiError::RequestFailed { .. }) => Some(5),
            Self::State(StateError::LockFailed { .. }) => Some(2),
            _ => None,
        }
    }

    /// Returns true if this error is an HTTP 404 from the API.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Api(ApiError::NotFound { .. }))
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Creates a validation error without a specific field.
    #[must_use]
    pub fn validation_general(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: None,
        }
    }
}

impl StateError {
    /// Creates a serialization error with the given message.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::SerializationError {
            message: message.into(),
        }
    }

    /// Creates a corruption error with the given message.
    #[must_use]
    pub fn corrupted(message: impl Into<String>) -> Self {
        Self::Corrupted {
            message: message.into(),
        }
    }
}

impl ApiError {
    /// Creates a request error.
    #[must_use]
    pub fn request_failed(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RequestFailed {
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    /// Creates a network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::NetworkError {
            message: message.into(),
        }
    }

    /// Creates an invalid-response error.
    #[must_use]
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }
}

impl LookupError {
    /// Creates a not-found error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(AzadError::Api(ApiError::network("reset")).is_retryable());
        assert!(AzadError::Api(ApiError::RateLimited { retry_after_secs: 3 }).is_retryable());
        assert!(AzadError::Api(ApiError::request_failed(503, "ServiceUnavailable", "busy")).is_retryable());
        assert!(!AzadError::Api(ApiError::request_failed(400, "BadRequest", "nope")).is_retryable());
        assert!(!AzadError::Api(ApiError::NotFound { url: String::from("/x") }).is_retryable());
    }

    #[test]
    fn test_timeout_message_mentions_cancellation() {
        let err = OperationError::Timeout {
            operation: String::from("creating"),
            resource: String::from("AAD Domain Services \"corp\""),
            elapsed: Duration::from_secs(42),
            cancelled: true,
        };
        let text = err.to_string();
        assert!(text.contains("42s"));
        assert!(text.contains("(cancelled)"));
        assert!(text.contains("may still be running"));
    }

    #[test]
    fn test_ambiguous_input_lists_keys() {
        let err = LookupError::AmbiguousInput {
            allowed: vec!["object_id", "display_name", "application_id"],
            populated: vec!["object_id", "display_name"],
        };
        assert_eq!(
            err.to_string(),
            "only one of object_id, display_name, application_id may be set, got: object_id, display_name"
        );
    }

    #[test]
    fn test_context_prefixes_message() {
        let err = AzadError::Api(ApiError::request_failed(409, "Conflict", "busy"))
            .context("Error retrieving Azure AD Domain Services with name \"corp\"");
        assert_eq!(
            err.to_string(),
            "Error retrieving Azure AD Domain Services with name \"corp\": Azure API error: request failed: 409 Conflict - busy"
        );
        assert!(!err.is_retryable());
    }
}
