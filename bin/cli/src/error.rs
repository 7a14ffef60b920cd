//! Errors reported by the `storefront` command.
//!
//! Library errors are converted here so that what reaches the terminal is
//! the user-facing text, never the raw backend message.

use std::fmt;
use storefront_auth::{AuthError, Flow, StorageError, UserMessage, user_message};

/// Command failures.
#[derive(Debug)]
pub enum CliError {
    /// Configuration could not be loaded or is incomplete.
    Config { details: String },
    /// The HTTP client could not be built.
    Client { details: String },
    /// An authentication flow failed.
    Auth { message: UserMessage },
    /// The session file could not be read or written.
    Session { details: String },
    /// A guard check denied the navigation.
    Redirected { location: String },
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { details } => write!(f, "configuration error: {}", details),
            Self::Client { details } => write!(f, "failed to create HTTP client: {}", details),
            Self::Auth { message } => write!(f, "{}", message),
            Self::Session { details } => write!(f, "session error: {}", details),
            Self::Redirected { location } => write!(f, "redirect to {}", location),
        }
    }
}

impl std::error::Error for CliError {}

impl CliError {
    /// Wraps a failed flow with its user-facing message.
    pub fn auth(flow: Flow, error: &AuthError) -> Self {
        tracing::debug!(?flow, %error, "flow failed");
        Self::Auth {
            message: user_message(error, flow),
        }
    }
}

impl From<StorageError> for CliError {
    fn from(error: StorageError) -> Self {
        Self::Session {
            details: error.to_string(),
        }
    }
}
