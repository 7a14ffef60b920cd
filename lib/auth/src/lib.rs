//! Client-side authentication for the storefront.
//!
//! This crate provides:
//! - Bearer token decoding and role extraction (`token`, `RoleSet`)
//! - The persisted session (`SessionStore` over a `SessionStorage` backend)
//! - The authentication flows (`AuthGateway` over an `AuthApi` transport)
//! - Route guards (`AuthGuard`, `AdminGuard`, `GuestGuard`)
//! - User-facing error text (`user_message`)
//!
//! # Access Control Model
//!
//! The only role with meaning on the client is `Admin`. Roles are read from
//! the login response's user, or from the token's role claims when the
//! response carries none. The backend remains the authority; guards only
//! decide where navigation goes.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use storefront_auth::{
//!     AdminGuard, GuardDecision, MemoryStorage, RoleSet, RouteGuard, SessionStore, UserProfile,
//! };
//! use storefront_core::UserId;
//!
//! let session = Arc::new(SessionStore::new(MemoryStorage::new()));
//!
//! // Anonymous visitors are sent to the login page.
//! let decision = AdminGuard::default().check(&session, "/admin/dashboard");
//! assert_eq!(
//!     decision,
//!     GuardDecision::Redirect(storefront_auth::Redirect::with_return_url(
//!         "/login",
//!         "/admin/dashboard",
//!     ))
//! );
//!
//! // `{"alg":"none"}.{"sub":"u-1","role":"Admin"}.sig`
//! let token = "eyJhbGciOiJub25lIn0.eyJzdWIiOiJ1LTEiLCJyb2xlIjoiQWRtaW4ifQ.sig";
//! assert_eq!(storefront_auth::token::roles_of(token), vec!["Admin".to_string()]);
//!
//! let admin = UserProfile::new(UserId::new("u-1"), "admin@shop.test").with_roles(RoleSet::admin());
//! session.set_session(token, &admin).expect("store session");
//! assert!(AdminGuard::default().check(&session, "/admin/dashboard").is_allowed());
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod forms;
pub mod gateway;
pub mod guard;
pub mod http;
pub mod messages;
pub mod role;
pub mod session;
pub mod storage;
pub mod token;
pub mod user;
pub mod validation;

// Re-export main types at crate root
pub use api::AuthApi;
pub use config::{ClientConfig, SessionConfig};
pub use error::{ApiError, AuthError, DecodeError, StorageError};
pub use forms::{
    ChangePasswordForm, ConfirmEmailForm, EmailForm, LoginForm, RegisterForm, ResetPasswordForm,
};
pub use gateway::{AuthGateway, SubmitLatch};
pub use guard::{
    AdminGuard, AuthGuard, GuardDecision, GuardKind, GuardPaths, GuestGuard, Redirect, RouteGuard,
};
pub use http::HttpAuthApi;
pub use messages::{Flow, MessageKind, UserMessage, user_message};
pub use role::{ADMIN_ROLE, RoleSet};
pub use session::{ActiveSession, AuthState, SessionStatus, SessionStore};
pub use storage::{FileStorage, MemoryStorage, SessionStorage, StorageWrite};
pub use token::Claims;
pub use user::{AdminUserUpdate, ProfilePatch, UserProfile};
pub use validation::{Field, FieldRule, FormRule, Validate, ValidationErrors};
