//! Error types for the storefront-auth crate.
//!
//! Errors follow the client's taxonomy:
//! - `DecodeError`: a bearer token could not be turned into claims
//! - `StorageError`: the durable session storage could not be read or written
//! - `ApiError`: a backend round trip failed (transport or rejection)
//! - `AuthError`: everything a gateway operation can report to the UI layer
//!
//! Validation failures live in [`crate::validation::ValidationErrors`] and are
//! wrapped by `AuthError::Validation`.

use crate::validation::ValidationErrors;
use std::fmt;

/// Errors from decoding a bearer token payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The token does not have the `header.payload.signature` shape.
    MalformedToken { segments: usize },
    /// The payload segment is not valid base64.
    InvalidBase64 { reason: String },
    /// The decoded payload bytes are not valid UTF-8.
    InvalidUtf8 { reason: String },
    /// The payload text is not valid JSON.
    InvalidJson { reason: String },
    /// The payload is valid JSON but not an object.
    NotAnObject,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedToken { segments } => {
                write!(f, "malformed token: expected 3 segments, found {segments}")
            }
            Self::InvalidBase64 { reason } => {
                write!(f, "token payload is not valid base64: {reason}")
            }
            Self::InvalidUtf8 { reason } => {
                write!(f, "token payload is not valid UTF-8: {reason}")
            }
            Self::InvalidJson { reason } => {
                write!(f, "token payload is not valid JSON: {reason}")
            }
            Self::NotAnObject => write!(f, "token payload is not a JSON object"),
        }
    }
}

impl std::error::Error for DecodeError {}

/// Errors from the session storage backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Reading or writing the backing file failed.
    Io { path: String, reason: String },
    /// A stored value could not be parsed.
    Corrupt { key: String, reason: String },
    /// A value could not be serialized for storage.
    Serialization { reason: String },
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, reason } => {
                write!(f, "session storage I/O error at '{path}': {reason}")
            }
            Self::Corrupt { key, reason } => {
                write!(f, "stored value for '{key}' is corrupt: {reason}")
            }
            Self::Serialization { reason } => {
                write!(f, "failed to serialize session value: {reason}")
            }
        }
    }
}

impl std::error::Error for StorageError {}

/// Errors from a single backend round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The request did not complete (connection refused, DNS, TLS, ...).
    Network { reason: String },
    /// The request timed out.
    Timeout,
    /// The backend answered with a non-success status.
    Rejected {
        status: u16,
        message: String,
        code: Option<String>,
    },
    /// The backend answered successfully but the body was not understood.
    InvalidResponse { reason: String },
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network { reason } => write!(f, "request failed: {reason}"),
            Self::Timeout => write!(f, "request timed out"),
            Self::Rejected {
                status, message, ..
            } => {
                write!(f, "server rejected request ({status}): {message}")
            }
            Self::InvalidResponse { reason } => {
                write!(f, "invalid server response: {reason}")
            }
        }
    }
}

impl std::error::Error for ApiError {}

/// Errors surfaced by gateway operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Client-side validation blocked the submission; no request was sent.
    Validation(ValidationErrors),
    /// The request failed to complete.
    Network { reason: String },
    /// The backend rejected the request.
    Rejected {
        status: u16,
        message: String,
        code: Option<String>,
    },
    /// The backend answered successfully but the body was not understood.
    InvalidResponse { reason: String },
    /// The token returned by the backend could not be decoded.
    Decode(DecodeError),
    /// The session could not be persisted.
    Storage(StorageError),
    /// The operation requires a session and none is present.
    NotAuthenticated,
    /// The operation requires the Admin role.
    Forbidden,
    /// A submission of the same form is already in flight.
    Busy,
    /// The session changed while the request was in flight; the response was discarded.
    Stale,
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(errors) => write!(f, "validation failed: {errors}"),
            Self::Network { reason } => write!(f, "network error: {reason}"),
            Self::Rejected {
                status, message, ..
            } => write!(f, "rejected by server ({status}): {message}"),
            Self::InvalidResponse { reason } => write!(f, "invalid server response: {reason}"),
            Self::Decode(err) => write!(f, "{err}"),
            Self::Storage(err) => write!(f, "{err}"),
            Self::NotAuthenticated => write!(f, "not authenticated"),
            Self::Forbidden => write!(f, "admin access required"),
            Self::Busy => write!(f, "a submission is already in progress"),
            Self::Stale => write!(f, "session changed while the request was in flight"),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<ValidationErrors> for AuthError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

impl From<DecodeError> for AuthError {
    fn from(err: DecodeError) -> Self {
        Self::Decode(err)
    }
}

impl From<StorageError> for AuthError {
    fn from(err: StorageError) -> Self {
        Self::Storage(err)
    }
}

impl From<ApiError> for AuthError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Network { reason } => Self::Network { reason },
            ApiError::Timeout => Self::Network {
                reason: "request timed out".to_string(),
            },
            ApiError::Rejected {
                status,
                message,
                code,
            } => Self::Rejected {
                status,
                message,
                code,
            },
            ApiError::InvalidResponse { reason } => Self::InvalidResponse { reason },
        }
    }
}
