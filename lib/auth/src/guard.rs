//! Route guards.
//!
//! Guards are consulted before a navigation completes and answer with a
//! [`GuardDecision`]. They read the [`SessionStore`] synchronously on every
//! call; nothing is cached between navigations.
//!
//! - [`AuthGuard`]: signed-in users only
//! - [`AdminGuard`]: signed-in Admins only
//! - [`GuestGuard`]: anonymous visitors only (login, registration pages)
//!
//! A stored token that no longer decodes, or has expired, ends the session
//! before the guard decides.

use serde::Deserialize;
use std::fmt;

use crate::session::{ActiveSession, SessionStatus, SessionStore};

/// Where a denied navigation is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    /// Target path.
    pub path: String,
    /// The originally requested URL, passed back after login.
    pub return_url: Option<String>,
}

impl Redirect {
    #[must_use]
    pub fn to(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            return_url: None,
        }
    }

    #[must_use]
    pub fn with_return_url(path: impl Into<String>, return_url: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            return_url: Some(return_url.into()),
        }
    }

    /// Renders the redirect as a URL, e.g. `/login?returnUrl=%2Fadmin%2Fdashboard`.
    #[must_use]
    pub fn to_url(&self) -> String {
        match &self.return_url {
            Some(url) => format!("{}?returnUrl={}", self.path, urlencoding::encode(url)),
            None => self.path.clone(),
        }
    }
}

impl fmt::Display for Redirect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_url())
    }
}

/// Outcome of a guard check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect(Redirect),
}

impl GuardDecision {
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Redirect targets used by the guards.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GuardPaths {
    /// Login page; unauthenticated or unauthorized navigations land here.
    #[serde(default = "default_login_path")]
    pub login_path: String,
    /// Where signed-in Admins are sent away from guest-only pages.
    #[serde(default = "default_admin_home")]
    pub admin_home: String,
    /// Where other signed-in users are sent away from guest-only pages.
    #[serde(default = "default_user_home")]
    pub user_home: String,
}

fn default_login_path() -> String {
    "/login".to_string()
}

fn default_admin_home() -> String {
    "/admin/dashboard".to_string()
}

fn default_user_home() -> String {
    "/".to_string()
}

impl Default for GuardPaths {
    fn default() -> Self {
        Self {
            login_path: default_login_path(),
            admin_home: default_admin_home(),
            user_home: default_user_home(),
        }
    }
}

/// A navigation predicate.
pub trait RouteGuard {
    /// Decides whether navigating to `target` may proceed.
    fn check(&self, session: &SessionStore, target: &str) -> GuardDecision;
}

/// Resolves the stored session, ending it when the token is unusable.
fn resolve(session: &SessionStore) -> Option<ActiveSession> {
    match session.inspect() {
        SessionStatus::Active(active) => Some(*active),
        SessionStatus::Anonymous => None,
        SessionStatus::Expired => {
            tracing::info!("stored token has expired; ending session");
            end_session(session);
            None
        }
        SessionStatus::Invalid(error) => {
            tracing::warn!(%error, "stored token does not decode; ending session");
            end_session(session);
            None
        }
    }
}

fn end_session(session: &SessionStore) {
    if let Err(error) = session.logout() {
        tracing::warn!(%error, "failed to clear unusable session");
    }
}

/// Allows signed-in users.
#[derive(Debug, Clone, Default)]
pub struct AuthGuard {
    paths: GuardPaths,
}

impl AuthGuard {
    #[must_use]
    pub fn new(paths: GuardPaths) -> Self {
        Self { paths }
    }
}

impl RouteGuard for AuthGuard {
    fn check(&self, session: &SessionStore, target: &str) -> GuardDecision {
        if resolve(session).is_some() {
            return GuardDecision::Allow;
        }
        tracing::debug!(target, "unauthenticated navigation redirected to login");
        GuardDecision::Redirect(Redirect::with_return_url(&self.paths.login_path, target))
    }
}

/// Allows signed-in Admins.
#[derive(Debug, Clone, Default)]
pub struct AdminGuard {
    paths: GuardPaths,
}

impl AdminGuard {
    #[must_use]
    pub fn new(paths: GuardPaths) -> Self {
        Self { paths }
    }
}

impl RouteGuard for AdminGuard {
    fn check(&self, session: &SessionStore, target: &str) -> GuardDecision {
        match resolve(session) {
            Some(active) if active.is_admin() => GuardDecision::Allow,
            Some(active) => {
                tracing::warn!(user_id = %active.user().id(), target, "non-admin navigation to admin route");
                GuardDecision::Redirect(Redirect::with_return_url(&self.paths.login_path, target))
            }
            None => {
                GuardDecision::Redirect(Redirect::with_return_url(&self.paths.login_path, target))
            }
        }
    }
}

/// Allows anonymous visitors; sends signed-in users home.
#[derive(Debug, Clone, Default)]
pub struct GuestGuard {
    paths: GuardPaths,
}

impl GuestGuard {
    #[must_use]
    pub fn new(paths: GuardPaths) -> Self {
        Self { paths }
    }
}

impl RouteGuard for GuestGuard {
    fn check(&self, session: &SessionStore, _target: &str) -> GuardDecision {
        match resolve(session) {
            None => GuardDecision::Allow,
            Some(active) if active.is_admin() => {
                GuardDecision::Redirect(Redirect::to(&self.paths.admin_home))
            }
            Some(_) => GuardDecision::Redirect(Redirect::to(&self.paths.user_home)),
        }
    }
}

/// The three guards, addressable by kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardKind {
    Auth,
    Admin,
    Guest,
}

impl GuardKind {
    /// Runs the guard of this kind.
    #[must_use]
    pub fn check(self, paths: &GuardPaths, session: &SessionStore, target: &str) -> GuardDecision {
        match self {
            Self::Auth => AuthGuard::new(paths.clone()).check(session, target),
            Self::Admin => AdminGuard::new(paths.clone()).check(session, target),
            Self::Guest => GuestGuard::new(paths.clone()).check(session, target),
        }
    }
}
