//! Unified error types for the server and connector sides.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use thiserror::Error;

/// Unified error type for Slumber.
///
/// Variants cover encode-side registry misses, decode-side payload problems,
/// authentication configuration faults and transport failures.
#[derive(Error, Debug)]
pub enum SlumberError {
    // ============ Codec Errors ============
    /// A related instance's model type has no registered path.
    #[error("Unmapped type: {0} is not exposed by this server")]
    UnmappedType(String),

    /// Required wire-format keys are missing or have the wrong shape.
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// The instance has no attribute with this name.
    #[error("Unknown field: {model} has no field {field}")]
    UnknownField { model: String, field: String },

    // ============ Registry Errors ============
    /// A model (or path) is already registered with a different counterpart.
    #[error("Duplicate registration: {model} is already registered at {existing}, cannot register at {requested}")]
    DuplicateRegistration {
        model: String,
        existing: String,
        requested: String,
    },

    // ============ Authentication Errors ============
    /// The remote authentication service cannot be reached or queried.
    #[error("Improperly configured: {0}")]
    ImproperlyConfigured(String),

    // ============ Resource Errors ============
    /// Resource not found
    #[error("Resource not found: {resource_type} {id}")]
    NotFound {
        resource_type: &'static str,
        id: String,
    },

    // ============ Infrastructure Errors ============
    /// The HTTP transport failed before a response arrived.
    #[error("Transport error: {url} - {message}")]
    Transport { url: String, message: String },

    /// A remote service answered with a non-success status.
    #[error("Remote service returned {status} for {url}")]
    RemoteStatus { url: String, status: u16 },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    // ============ Internal Errors ============
    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Generic error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SlumberError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::NotFound { .. } => 404,
            Self::MalformedPayload(_) | Self::UnknownField { .. } => 400,
            Self::Transport { .. } | Self::RemoteStatus { .. } => 502,
            Self::UnmappedType(_)
            | Self::DuplicateRegistration { .. }
            | Self::ImproperlyConfigured(_)
            | Self::Configuration(_)
            | Self::Internal(_)
            | Self::Other(_) => 500,
        }
    }

    /// Returns a machine-readable error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::UnmappedType(_) => "UNMAPPED_TYPE",
            Self::MalformedPayload(_) => "MALFORMED_PAYLOAD",
            Self::UnknownField { .. } => "UNKNOWN_FIELD",
            Self::DuplicateRegistration { .. } => "DUPLICATE_REGISTRATION",
            Self::ImproperlyConfigured(_) => "IMPROPERLY_CONFIGURED",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Transport { .. } => "TRANSPORT_ERROR",
            Self::RemoteStatus { .. } => "REMOTE_STATUS",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Internal(_) | Self::Other(_) => "INTERNAL_ERROR",
        }
    }

    /// Creates a not found error for a resource.
    #[must_use]
    pub fn not_found<T: ToString>(resource_type: &'static str, id: T) -> Self {
        Self::NotFound {
            resource_type,
            id: id.to_string(),
        }
    }

    /// Creates a malformed payload error.
    #[must_use]
    pub fn malformed<T: Into<String>>(message: T) -> Self {
        Self::MalformedPayload(message.into())
    }

    /// Creates an improperly configured error.
    #[must_use]
    pub fn improperly_configured<T: Into<String>>(message: T) -> Self {
        Self::ImproperlyConfigured(message.into())
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal<T: Into<String>>(message: T) -> Self {
        Self::Internal(message.into())
    }

    /// Creates a transport error for a URL.
    #[must_use]
    pub fn transport(url: impl ToString, message: impl ToString) -> Self {
        Self::Transport {
            url: url.to_string(),
            message: message.to_string(),
        }
    }

    /// Checks if this error came from talking to a remote service.
    #[must_use]
    pub const fn is_remote_failure(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::RemoteStatus { .. })
    }
}

impl From<serde_json::Error> for SlumberError {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedPayload(format!("JSON error: {err}"))
    }
}

impl From<url::ParseError> for SlumberError {
    fn from(err: url::ParseError) -> Self {
        Self::MalformedPayload(format!("invalid URL: {err}"))
    }
}

/// Serializable error body placed next to `_meta` in error responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable error code
    pub code: String,
    /// Human-readable error message
    pub message: String,
}

impl ErrorResponse {
    /// Creates a new error response from a `SlumberError`.
    #[must_use]
    pub fn from_error(error: &SlumberError) -> Self {
        Self {
            code: error.error_code().to_string(),
            message: error.to_string(),
        }
    }
}

impl From<&SlumberError> for ErrorResponse {
    fn from(error: &SlumberError) -> Self {
        Self::from_error(error)
    }
}
