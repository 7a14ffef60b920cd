//! Session state for the authenticated user.
//!
//! `SessionStore` is the single source of truth for who is signed in. It
//! keeps nothing in memory besides bookkeeping: the token and the user
//! profile live in [`SessionStorage`] under two keys, so a restarted client
//! (or a second client sharing the same storage) sees the same session.
//!
//! The store is an explicit context object. Share it with `Arc` between the
//! gateway and the guards; there is no global instance.

use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;

use crate::error::{DecodeError, StorageError};
use crate::role::RoleSet;
use crate::storage::{SessionStorage, StorageWrite};
use crate::token::{self, Claims};
use crate::user::UserProfile;

/// Storage key holding the bearer token.
pub const TOKEN_KEY: &str = "authToken";

/// Storage key holding the JSON-serialized current user.
pub const USER_KEY: &str = "currentUser";

/// Who the client is acting as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthState {
    Anonymous,
    AuthenticatedUser,
    AuthenticatedAdmin,
}

impl AuthState {
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        !matches!(self, Self::Anonymous)
    }
}

/// A stored session whose token decodes.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveSession {
    token: String,
    user: UserProfile,
    claims: Claims,
}

impl ActiveSession {
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    #[must_use]
    pub fn user(&self) -> &UserProfile {
        &self.user
    }

    #[must_use]
    pub fn claims(&self) -> &Claims {
        &self.claims
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.user.is_admin()
    }

    #[must_use]
    pub fn state(&self) -> AuthState {
        if self.is_admin() {
            AuthState::AuthenticatedAdmin
        } else {
            AuthState::AuthenticatedUser
        }
    }
}

/// Result of inspecting the stored session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionStatus {
    /// No token or no user is stored.
    Anonymous,
    /// Token and user are stored and the token decodes.
    Active(Box<ActiveSession>),
    /// The token's `exp` claim is in the past.
    Expired,
    /// The stored token does not decode.
    Invalid(DecodeError),
}

/// Session store backed by client-local storage.
pub struct SessionStore {
    storage: Box<dyn SessionStorage>,
    enforce_expiry: bool,
    generation: AtomicU64,
    state_tx: watch::Sender<AuthState>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("enforce_expiry", &self.enforce_expiry)
            .field("generation", &self.generation())
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Creates a store over the given storage, enforcing token expiry.
    #[must_use]
    pub fn new(storage: impl SessionStorage + 'static) -> Self {
        Self::with_expiry_enforcement(storage, true)
    }

    /// Creates a store; when `enforce_expiry` is false only presence counts.
    #[must_use]
    pub fn with_expiry_enforcement(storage: impl SessionStorage + 'static, enforce_expiry: bool) -> Self {
        let (state_tx, _) = watch::channel(AuthState::Anonymous);
        let store = Self {
            storage: Box::new(storage),
            enforce_expiry,
            generation: AtomicU64::new(0),
            state_tx,
        };
        store.publish();
        store
    }

    /// Inspects the stored session without modifying it.
    #[must_use]
    pub fn inspect(&self) -> SessionStatus {
        let (Some(token), Some(user)) = (self.token(), self.current_user()) else {
            return SessionStatus::Anonymous;
        };
        match token::decode(&token) {
            Ok(claims) if self.enforce_expiry && claims.is_expired_at(Utc::now()) => {
                SessionStatus::Expired
            }
            Ok(claims) => SessionStatus::Active(Box::new(ActiveSession {
                token,
                user,
                claims,
            })),
            Err(err) => SessionStatus::Invalid(err),
        }
    }

    /// Returns the active session, if any.
    #[must_use]
    pub fn active(&self) -> Option<ActiveSession> {
        match self.inspect() {
            SessionStatus::Active(session) => Some(*session),
            _ => None,
        }
    }

    /// Returns true if a token and user are stored, the token decodes and
    /// (when enforced) has not expired.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(self.inspect(), SessionStatus::Active(_))
    }

    /// Returns true if the current user holds the Admin role.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.active().is_some_and(|session| session.is_admin())
    }

    /// Returns the current auth state.
    #[must_use]
    pub fn state(&self) -> AuthState {
        self.active()
            .map_or(AuthState::Anonymous, |session| session.state())
    }

    /// Returns the stored bearer token.
    #[must_use]
    pub fn token(&self) -> Option<String> {
        match self.storage.get(TOKEN_KEY) {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(error) => {
                tracing::warn!(%error, "failed to read session token");
                None
            }
        }
    }

    /// Returns the stored user profile.
    #[must_use]
    pub fn current_user(&self) -> Option<UserProfile> {
        let raw = match self.storage.get(USER_KEY) {
            Ok(raw) => raw?,
            Err(error) => {
                tracing::warn!(%error, "failed to read current user");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(error) => {
                tracing::warn!(%error, "stored current user is corrupt");
                None
            }
        }
    }

    /// Returns the current user's roles, empty when anonymous.
    #[must_use]
    pub fn roles(&self) -> RoleSet {
        self.current_user()
            .map(|user| user.roles().clone())
            .unwrap_or_default()
    }

    /// Stores a new session. Token and user are written in one batch.
    ///
    /// # Errors
    ///
    /// Returns an error if the user cannot be serialized or the storage
    /// write fails; in that case the previous session is left untouched.
    pub fn set_session(&self, token: &str, user: &UserProfile) -> Result<(), StorageError> {
        let user_json = serialize_user(user)?;
        self.storage.apply(&[
            StorageWrite::set(TOKEN_KEY, token),
            StorageWrite::set(USER_KEY, user_json),
        ])?;
        tracing::info!(user_id = %user.id(), admin = user.is_admin(), "session established");
        self.changed();
        Ok(())
    }

    /// Refreshes the stored profile fields from `fresh`.
    ///
    /// Returns `false` without writing when there is no session.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage write fails.
    pub fn update_user(&self, fresh: &UserProfile) -> Result<bool, StorageError> {
        let Some(mut user) = self.current_user() else {
            return Ok(false);
        };
        if self.token().is_none() {
            return Ok(false);
        }
        user.refresh_from(fresh);
        self.storage
            .apply(&[StorageWrite::set(USER_KEY, serialize_user(&user)?)])?;
        tracing::debug!(user_id = %user.id(), "session profile refreshed");
        self.changed();
        Ok(true)
    }

    /// Clears the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage write fails.
    pub fn logout(&self) -> Result<(), StorageError> {
        self.storage.apply(&[
            StorageWrite::remove(TOKEN_KEY),
            StorageWrite::remove(USER_KEY),
        ])?;
        tracing::info!("session cleared");
        self.changed();
        Ok(())
    }

    /// Subscribes to auth state changes made through this store.
    ///
    /// Changes made by another client sharing the storage are not pushed;
    /// they become visible on the next read.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state_tx.subscribe()
    }

    /// Counter bumped on every session change made through this store.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn changed(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.publish();
    }

    fn publish(&self) {
        let state = self.state();
        self.state_tx.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
    }
}

fn serialize_user(user: &UserProfile) -> Result<String, StorageError> {
    serde_json::to_string(user).map_err(|e| StorageError::Serialization {
        reason: e.to_string(),
    })
}
