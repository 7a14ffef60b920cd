//! Authentication flows.
//!
//! [`AuthGateway`] runs each flow as validate, take the submit latch, one
//! request, then update the [`SessionStore`]. Nothing is retried. Validation
//! failures never reach the network.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use storefront_core::UserId;
use tracing::instrument;

use crate::api::{
    AuthApi, ChangePasswordRequest, EmailRequest, LoginRequest, LoginResponse, MessageResponse,
    RegisterRequest, ResetPasswordRequest,
};
use crate::error::{ApiError, AuthError};
use crate::forms::{
    ChangePasswordForm, ConfirmEmailForm, EmailForm, LoginForm, RegisterForm, ResetPasswordForm,
};
use crate::role::RoleSet;
use crate::session::{ActiveSession, SessionStatus, SessionStore};
use crate::token::{self, Claims};
use crate::user::{AdminUserUpdate, ProfilePatch, UserProfile};
use crate::validation::Validate;

/// Status reported for a 2xx response whose body says the call failed.
const ACCEPTED_BUT_FAILED: u16 = 200;

/// At most one submission in flight per gateway.
#[derive(Debug, Default)]
pub struct SubmitLatch {
    busy: AtomicBool,
}

impl SubmitLatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes the latch until the returned guard is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Busy`] if a submission is already in flight.
    pub fn acquire(&self) -> Result<LatchGuard<'_>, AuthError> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| AuthError::Busy)?;
        Ok(LatchGuard { latch: self })
    }

    #[must_use]
    pub fn is_held(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Releases the [`SubmitLatch`] on drop.
#[derive(Debug)]
pub struct LatchGuard<'a> {
    latch: &'a SubmitLatch,
}

impl Drop for LatchGuard<'_> {
    fn drop(&mut self) {
        self.latch.busy.store(false, Ordering::Release);
    }
}

/// Client-side entry point for every authentication flow.
#[derive(Debug)]
pub struct AuthGateway<A> {
    api: A,
    session: Arc<SessionStore>,
    latch: SubmitLatch,
}

impl<A: AuthApi> AuthGateway<A> {
    #[must_use]
    pub fn new(api: A, session: Arc<SessionStore>) -> Self {
        Self {
            api,
            session,
            latch: SubmitLatch::new(),
        }
    }

    #[must_use]
    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    #[must_use]
    pub fn api(&self) -> &A {
        &self.api
    }

    /// Returns true while a submission is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.latch.is_held()
    }

    /// Signs in and persists the session.
    ///
    /// Roles come from the response's user when it carries any, otherwise
    /// from the token's role claims.
    ///
    /// # Errors
    ///
    /// Fails on invalid input, a rejected or unusable response, or when the
    /// session changed while the request was in flight ([`AuthError::Stale`]).
    #[instrument(skip(self, form), fields(email = %form.email))]
    pub async fn login(&self, form: &LoginForm) -> Result<UserProfile, AuthError> {
        form.validate()?;
        let _busy = self.latch.acquire()?;
        let generation = self.session.generation();

        let response = self
            .api
            .login(&LoginRequest {
                email: form.email.trim().to_string(),
                password: form.password.clone(),
                remember_me: form.remember_me,
            })
            .await?;

        let (token, user) = accepted_login(response)?;
        let claims = token::decode(&token)?;
        let user = session_user(user, &claims)?;

        self.ensure_current(generation)?;
        self.session.set_session(&token, &user)?;
        tracing::info!(user_id = %user.id(), admin = user.is_admin(), "login succeeded");
        Ok(user)
    }

    /// Creates an account. Never signs in.
    ///
    /// # Errors
    ///
    /// Fails on invalid input or when the backend rejects the registration.
    #[instrument(skip(self, form), fields(email = %form.email))]
    pub async fn register(&self, form: &RegisterForm) -> Result<String, AuthError> {
        form.validate()?;
        let _busy = self.latch.acquire()?;
        let response = self
            .api
            .register(&RegisterRequest {
                email: form.email.trim().to_string(),
                password: form.password.clone(),
                confirm_password: form.confirm_password.clone(),
                full_name: form
                    .full_name
                    .as_deref()
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(str::to_string),
            })
            .await?;
        acknowledged(response, "Registration successful. Please check your email.")
    }

    /// Reports whether an account exists for `email`.
    ///
    /// Advisory only: it does not take the submit latch, so it can run while
    /// the user is still filling in a form.
    ///
    /// # Errors
    ///
    /// Fails on an invalid address or a failed request.
    #[instrument(skip(self))]
    pub async fn check_email_status(&self, email: &str) -> Result<bool, AuthError> {
        let form = EmailForm::new(email.trim());
        form.validate()?;
        let status = self.api.check_email(&form.email).await?;
        Ok(status.exists)
    }

    /// Requests a password reset email.
    ///
    /// # Errors
    ///
    /// Fails on an invalid address or when the backend rejects the request.
    #[instrument(skip(self))]
    pub async fn forgot_password(&self, email: &str) -> Result<String, AuthError> {
        let form = EmailForm::new(email.trim());
        form.validate()?;
        let _busy = self.latch.acquire()?;
        let response = self
            .api
            .forgot_password(&EmailRequest { email: form.email })
            .await?;
        acknowledged(
            response,
            "If an account exists for this email, a reset link has been sent.",
        )
    }

    /// Sets a new password using a reset token.
    ///
    /// # Errors
    ///
    /// Fails on invalid input (the new password must be exactly six digits)
    /// or when the backend rejects the token.
    #[instrument(skip(self, form), fields(email = %form.email))]
    pub async fn reset_password(&self, form: &ResetPasswordForm) -> Result<String, AuthError> {
        form.validate()?;
        let _busy = self.latch.acquire()?;
        let response = self
            .api
            .reset_password(&ResetPasswordRequest {
                email: form.email.trim().to_string(),
                token: form.token.clone(),
                new_password: form.new_password.clone(),
                confirm_password: form.confirm_password.clone(),
            })
            .await?;
        acknowledged(response, "Your password has been reset.")
    }

    /// Confirms an email address from a confirmation link.
    ///
    /// # Errors
    ///
    /// Fails on missing parameters or when the backend rejects the token.
    #[instrument(skip(self, form), fields(email = %form.email))]
    pub async fn confirm_email(&self, form: &ConfirmEmailForm) -> Result<String, AuthError> {
        form.validate()?;
        let _busy = self.latch.acquire()?;
        let response = self
            .api
            .confirm_email(form.email.trim(), &form.token)
            .await?;
        acknowledged(response, "Your email address has been confirmed.")
    }

    /// Sends the confirmation email again.
    ///
    /// # Errors
    ///
    /// Fails on an invalid address or when the backend rejects the request.
    #[instrument(skip(self))]
    pub async fn resend_confirmation(&self, email: &str) -> Result<String, AuthError> {
        let form = EmailForm::new(email.trim());
        form.validate()?;
        let _busy = self.latch.acquire()?;
        let response = self
            .api
            .resend_confirmation(&EmailRequest { email: form.email })
            .await?;
        acknowledged(response, "A new confirmation email has been sent.")
    }

    /// Changes the signed-in user's password.
    ///
    /// # Errors
    ///
    /// Fails without a session, on invalid input (including a new password
    /// equal to the current one) or when the backend rejects the change.
    #[instrument(skip_all)]
    pub async fn change_password(&self, form: &ChangePasswordForm) -> Result<(), AuthError> {
        form.validate()?;
        let active = self.require_session()?;
        let _busy = self.latch.acquire()?;
        self.api
            .change_password(
                active.token(),
                active.user().id(),
                &ChangePasswordRequest {
                    current_password: form.current_password.clone(),
                    new_password: form.new_password.clone(),
                    confirm_password: form.confirm_password.clone(),
                },
            )
            .await
            .map_err(|e| self.bearer_failure(e))?;
        tracing::info!(user_id = %active.user().id(), "password changed");
        Ok(())
    }

    /// Updates the signed-in user's own profile and refreshes the stored copy.
    ///
    /// # Errors
    ///
    /// Fails without a session, on an empty patch, when the backend rejects
    /// the update, or when the session changed while it was in flight.
    #[instrument(skip_all)]
    pub async fn update_profile(&self, patch: &ProfilePatch) -> Result<UserProfile, AuthError> {
        patch.validate()?;
        let active = self.require_session()?;
        let _busy = self.latch.acquire()?;
        let generation = self.session.generation();
        let fresh = self
            .api
            .update_profile(active.token(), patch)
            .await
            .map_err(|e| self.bearer_failure(e))?;
        self.store_refreshed(generation, &fresh)
    }

    /// Fetches the signed-in user's profile and refreshes the stored copy.
    ///
    /// # Errors
    ///
    /// Fails without a session, on a failed request, or when the session
    /// changed while it was in flight.
    #[instrument(skip_all)]
    pub async fn reload_user(&self) -> Result<UserProfile, AuthError> {
        let active = self.require_session()?;
        let _busy = self.latch.acquire()?;
        let generation = self.session.generation();
        let fresh = self
            .api
            .get_user(active.token(), active.user().id())
            .await
            .map_err(|e| self.bearer_failure(e))?;
        self.store_refreshed(generation, &fresh)
    }

    /// Updates another user's account. Admin only.
    ///
    /// # Errors
    ///
    /// Fails without a session, with [`AuthError::Forbidden`] for non-admins,
    /// on missing names, or when the backend rejects the update.
    #[instrument(skip(self, update), fields(user_id = %id))]
    pub async fn admin_update_user(
        &self,
        id: &UserId,
        update: &AdminUserUpdate,
    ) -> Result<(), AuthError> {
        update.validate()?;
        let active = self.require_session()?;
        if !active.is_admin() {
            tracing::warn!(user_id = %active.user().id(), "non-admin attempted a user update");
            return Err(AuthError::Forbidden);
        }
        let _busy = self.latch.acquire()?;
        self.api
            .admin_update_user(active.token(), id, update)
            .await
            .map_err(|e| self.bearer_failure(e))
    }

    /// Ends the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session storage cannot be written.
    pub fn logout(&self) -> Result<(), AuthError> {
        self.session.logout()?;
        Ok(())
    }

    fn require_session(&self) -> Result<ActiveSession, AuthError> {
        match self.session.inspect() {
            SessionStatus::Active(active) => Ok(*active),
            SessionStatus::Anonymous => Err(AuthError::NotAuthenticated),
            SessionStatus::Expired | SessionStatus::Invalid(_) => {
                self.session.logout()?;
                Err(AuthError::NotAuthenticated)
            }
        }
    }

    fn ensure_current(&self, generation: u64) -> Result<(), AuthError> {
        if self.session.generation() == generation {
            return Ok(());
        }
        tracing::warn!("session changed while request was in flight; discarding response");
        Err(AuthError::Stale)
    }

    fn store_refreshed(&self, generation: u64, fresh: &UserProfile) -> Result<UserProfile, AuthError> {
        self.ensure_current(generation)?;
        if !self.session.update_user(fresh)? {
            return Err(AuthError::NotAuthenticated);
        }
        self.session.current_user().ok_or(AuthError::NotAuthenticated)
    }

    /// A 401 on a bearer call means the backend no longer accepts the token.
    fn bearer_failure(&self, error: ApiError) -> AuthError {
        if matches!(error, ApiError::Rejected { status: 401, .. }) {
            tracing::info!("backend rejected the session token; ending session");
            if let Err(storage) = self.session.logout() {
                tracing::warn!(error = %storage, "failed to clear rejected session");
            }
        }
        error.into()
    }
}

fn accepted_login(response: LoginResponse) -> Result<(String, Option<UserProfile>), AuthError> {
    let token = response.token.filter(|token| !token.is_empty());
    match token {
        Some(token) if response.success => Ok((token, response.user)),
        _ => Err(AuthError::Rejected {
            status: ACCEPTED_BUT_FAILED,
            message: response
                .message
                .unwrap_or_else(|| "Login failed".to_string()),
            code: None,
        }),
    }
}

/// The profile to store for a new session.
fn session_user(user: Option<UserProfile>, claims: &Claims) -> Result<UserProfile, AuthError> {
    let mut user = match user {
        Some(user) => user,
        None => {
            let subject = claims.subject().ok_or_else(|| AuthError::Rejected {
                status: ACCEPTED_BUT_FAILED,
                message: "Login response carried no user".to_string(),
                code: None,
            })?;
            UserProfile::new(UserId::new(subject), claims.email().unwrap_or_default())
        }
    };
    if user.roles().is_empty() {
        user.set_roles(RoleSet::from_names(claims.roles()));
    }
    Ok(user)
}

fn acknowledged(response: MessageResponse, fallback: &str) -> Result<String, AuthError> {
    let message = response.message.filter(|m| !m.trim().is_empty());
    if response.success == Some(false) {
        return Err(AuthError::Rejected {
            status: ACCEPTED_BUT_FAILED,
            message: message.unwrap_or_else(|| "Request failed".to_string()),
            code: None,
        });
    }
    Ok(message.unwrap_or_else(|| fallback.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::EmailStatus;
    use crate::guard::{AdminGuard, GuardDecision, RouteGuard};
    use crate::session::AuthState;
    use crate::storage::MemoryStorage;
    use crate::token::test_tokens::token_with;
    use crate::validation::{Field, FieldRule, FormRule};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;
    use tokio::sync::Notify;

    type Hook = Box<dyn FnOnce() + Send>;

    #[derive(Default)]
    struct StubApi {
        calls: Mutex<Vec<&'static str>>,
        login: Mutex<Option<Result<LoginResponse, ApiError>>>,
        profile: Mutex<Option<UserProfile>>,
        bearer_failure: Mutex<Option<ApiError>>,
        during_login: Mutex<Option<Hook>>,
        hold_login: Option<Arc<Notify>>,
    }

    impl StubApi {
        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().clone()
        }

        fn record(&self, call: &'static str) {
            self.calls.lock().push(call);
        }

        fn bearer_result(&self) -> Result<(), ApiError> {
            self.bearer_failure.lock().take().map_or(Ok(()), Err)
        }
    }

    #[async_trait]
    impl AuthApi for StubApi {
        async fn login(&self, _request: &LoginRequest) -> Result<LoginResponse, ApiError> {
            self.record("login");
            if let Some(release) = &self.hold_login {
                release.notified().await;
            }
            let hook = self.during_login.lock().take();
            if let Some(hook) = hook {
                hook();
            }
            self.login
                .lock()
                .take()
                .unwrap_or_else(|| Ok(LoginResponse::default()))
        }

        async fn register(&self, _request: &RegisterRequest) -> Result<MessageResponse, ApiError> {
            self.record("register");
            Ok(MessageResponse::ok("Registered"))
        }

        async fn check_email(&self, email: &str) -> Result<EmailStatus, ApiError> {
            self.record("check_email");
            Ok(EmailStatus {
                exists: email == "taken@shop.test",
            })
        }

        async fn forgot_password(&self, _request: &EmailRequest) -> Result<MessageResponse, ApiError> {
            self.record("forgot_password");
            Ok(MessageResponse::default())
        }

        async fn reset_password(
            &self,
            _request: &ResetPasswordRequest,
        ) -> Result<MessageResponse, ApiError> {
            self.record("reset_password");
            Ok(MessageResponse::ok("Password reset"))
        }

        async fn confirm_email(&self, _email: &str, _token: &str) -> Result<MessageResponse, ApiError> {
            self.record("confirm_email");
            Ok(MessageResponse {
                success: Some(false),
                message: Some("Invalid token".to_string()),
            })
        }

        async fn resend_confirmation(
            &self,
            _request: &EmailRequest,
        ) -> Result<MessageResponse, ApiError> {
            self.record("resend_confirmation");
            Ok(MessageResponse::ok("Sent"))
        }

        async fn get_user(&self, _bearer: &str, id: &UserId) -> Result<UserProfile, ApiError> {
            self.record("get_user");
            self.bearer_result()?;
            Ok(self
                .profile
                .lock()
                .clone()
                .unwrap_or_else(|| UserProfile::new(id.clone(), "fresh@shop.test")))
        }

        async fn update_profile(
            &self,
            _bearer: &str,
            patch: &ProfilePatch,
        ) -> Result<UserProfile, ApiError> {
            self.record("update_profile");
            self.bearer_result()?;
            let first = patch.first_name.clone().unwrap_or_default();
            let last = patch.last_name.clone().unwrap_or_default();
            Ok(UserProfile::new(UserId::new("u-1"), "a@b.com").with_names(first, last))
        }

        async fn admin_update_user(
            &self,
            _bearer: &str,
            _id: &UserId,
            _update: &AdminUserUpdate,
        ) -> Result<(), ApiError> {
            self.record("admin_update_user");
            self.bearer_result()
        }

        async fn change_password(
            &self,
            _bearer: &str,
            _id: &UserId,
            _request: &ChangePasswordRequest,
        ) -> Result<(), ApiError> {
            self.record("change_password");
            self.bearer_result()
        }
    }

    fn store() -> Arc<SessionStore> {
        Arc::new(SessionStore::new(MemoryStorage::new()))
    }

    fn gateway(api: StubApi) -> AuthGateway<StubApi> {
        AuthGateway::new(api, store())
    }

    fn admin_login_response() -> LoginResponse {
        LoginResponse {
            success: true,
            token: Some(token_with(&json!({
                "sub": "u-admin",
                "email": "admin@shop.test",
                "http://schemas.microsoft.com/ws/2008/06/identity/claims/role": "Admin"
            }))),
            user: Some(
                UserProfile::new(UserId::new("u-admin"), "admin@shop.test")
                    .with_names("Ada", "Admin"),
            ),
            message: None,
        }
    }

    fn signed_in_customer(gateway: &AuthGateway<StubApi>) {
        let token = token_with(&json!({ "sub": "u-1", "role": "Customer" }));
        let user = UserProfile::new(UserId::new("u-1"), "a@b.com")
            .with_roles(RoleSet::from_names(["Customer"]));
        gateway.session().set_session(&token, &user).expect("set");
    }

    fn change_form() -> ChangePasswordForm {
        ChangePasswordForm {
            current_password: "secret1".to_string(),
            new_password: "secret2".to_string(),
            confirm_password: "secret2".to_string(),
        }
    }

    #[tokio::test]
    async fn admin_login_opens_admin_dashboard() {
        let api = StubApi::default();
        *api.login.lock() = Some(Ok(admin_login_response()));
        let gateway = gateway(api);

        let user = gateway
            .login(&LoginForm::new("a@b.com", "123456"))
            .await
            .expect("login");

        assert!(user.is_admin());
        assert_eq!(gateway.session().current_user(), Some(user));
        assert_eq!(gateway.session().state(), AuthState::AuthenticatedAdmin);
        assert_eq!(
            AdminGuard::default().check(gateway.session(), "/admin/dashboard"),
            GuardDecision::Allow
        );
    }

    #[tokio::test]
    async fn login_keeps_roles_from_response_user() {
        let mut response = admin_login_response();
        response.user = response
            .user
            .map(|u| u.with_roles(RoleSet::from_names(["Customer"])));
        let api = StubApi::default();
        *api.login.lock() = Some(Ok(response));
        let gateway = gateway(api);

        let user = gateway
            .login(&LoginForm::new("admin@shop.test", "secret"))
            .await
            .expect("login");
        assert!(!user.is_admin());
        assert!(user.roles().contains("Customer"));
    }

    #[tokio::test]
    async fn login_builds_user_from_claims_when_missing() {
        let mut response = admin_login_response();
        response.user = None;
        let api = StubApi::default();
        *api.login.lock() = Some(Ok(response));
        let gateway = gateway(api);

        let user = gateway
            .login(&LoginForm::new("admin@shop.test", "secret"))
            .await
            .expect("login");
        assert_eq!(user.id(), &UserId::new("u-admin"));
        assert_eq!(user.email(), "admin@shop.test");
        assert!(user.is_admin());
    }

    #[tokio::test]
    async fn unsuccessful_login_is_rejected_and_leaves_session_empty() {
        let api = StubApi::default();
        *api.login.lock() = Some(Ok(LoginResponse {
            success: false,
            message: Some("Invalid login attempt".to_string()),
            ..LoginResponse::default()
        }));
        let gateway = gateway(api);

        let err = gateway
            .login(&LoginForm::new("a@b.com", "wrong-password"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            AuthError::Rejected {
                status: 200,
                message: "Invalid login attempt".to_string(),
                code: None,
            }
        );
        assert!(!gateway.session().is_authenticated());
        assert!(!gateway.is_loading());
    }

    #[tokio::test]
    async fn malformed_login_token_is_a_decode_error() {
        let api = StubApi::default();
        *api.login.lock() = Some(Ok(LoginResponse {
            success: true,
            token: Some("only.two".to_string()),
            ..admin_login_response()
        }));
        let gateway = gateway(api);

        let err = gateway
            .login(&LoginForm::new("admin@shop.test", "secret"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Decode(_)));
        assert!(gateway.session().token().is_none());
    }

    #[tokio::test]
    async fn invalid_login_form_sends_nothing() {
        let gateway = gateway(StubApi::default());
        let err = gateway
            .login(&LoginForm::new("not-an-email", ""))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));
        assert!(gateway.api().calls().is_empty());
    }

    #[tokio::test]
    async fn login_with_short_password_sends_nothing() {
        let gateway = gateway(StubApi::default());
        let err = gateway
            .login(&LoginForm::new("a@b.com", "12345"))
            .await
            .unwrap_err();
        match err {
            AuthError::Validation(errors) => assert_eq!(
                errors.for_field(Field::Password).collect::<Vec<_>>(),
                vec![&FieldRule::MinLength(6)]
            ),
            other => panic!("expected validation error, got {other:?}"),
        }
        assert!(gateway.api().calls().is_empty());
        assert!(!gateway.is_loading());
    }

    #[tokio::test]
    async fn reset_with_five_digits_sends_nothing() {
        let gateway = gateway(StubApi::default());
        let form = ResetPasswordForm {
            email: "a@b.com".to_string(),
            token: "reset-token".to_string(),
            new_password: "12345".to_string(),
            confirm_password: "12345".to_string(),
        };

        let err = gateway.reset_password(&form).await.unwrap_err();
        match err {
            AuthError::Validation(errors) => assert_eq!(
                errors.for_field(Field::NewPassword).collect::<Vec<_>>(),
                vec![&FieldRule::SixDigits]
            ),
            other => panic!("expected validation error, got {other:?}"),
        }
        assert!(gateway.api().calls().is_empty());
    }

    #[tokio::test]
    async fn reset_with_six_digits_is_sent() {
        let gateway = gateway(StubApi::default());
        let form = ResetPasswordForm {
            email: "a@b.com".to_string(),
            token: "reset-token".to_string(),
            new_password: "123456".to_string(),
            confirm_password: "123456".to_string(),
        };
        assert_eq!(
            gateway.reset_password(&form).await.expect("reset"),
            "Password reset"
        );
        assert_eq!(gateway.api().calls(), vec!["reset_password"]);
    }

    #[tokio::test]
    async fn register_does_not_sign_in() {
        let gateway = gateway(StubApi::default());
        let form = RegisterForm {
            email: "new@shop.test".to_string(),
            password: "secret1".to_string(),
            confirm_password: "secret1".to_string(),
            full_name: Some("  ".to_string()),
        };
        assert_eq!(gateway.register(&form).await.expect("register"), "Registered");
        assert!(!gateway.session().is_authenticated());
    }

    #[tokio::test]
    async fn forgot_password_falls_back_to_default_message() {
        let gateway = gateway(StubApi::default());
        let message = gateway.forgot_password("a@b.com").await.expect("forgot");
        assert!(message.contains("reset link"));
    }

    #[tokio::test]
    async fn confirm_email_failure_in_body_is_rejected() {
        let gateway = gateway(StubApi::default());
        let form = ConfirmEmailForm {
            email: "a@b.com".to_string(),
            token: "abc".to_string(),
        };
        let err = gateway.confirm_email(&form).await.unwrap_err();
        assert!(matches!(err, AuthError::Rejected { status: 200, ref message, .. } if message == "Invalid token"));
    }

    #[tokio::test]
    async fn check_email_status_reports_existence() {
        let gateway = gateway(StubApi::default());
        assert!(gateway.check_email_status("taken@shop.test").await.expect("check"));
        assert!(!gateway.check_email_status("free@shop.test").await.expect("check"));
    }

    #[tokio::test]
    async fn second_submit_while_in_flight_is_busy() {
        let release = Arc::new(Notify::new());
        let api = StubApi {
            hold_login: Some(Arc::clone(&release)),
            ..StubApi::default()
        };
        *api.login.lock() = Some(Ok(admin_login_response()));
        let gateway = gateway(api);
        let form = LoginForm::new("admin@shop.test", "secret");

        let (first, second) = tokio::join!(gateway.login(&form), async {
            let second = gateway.login(&form).await;
            assert!(gateway.is_loading());
            release.notify_one();
            second
        });

        assert!(first.is_ok());
        assert_eq!(second.unwrap_err(), AuthError::Busy);
        assert_eq!(gateway.api().calls(), vec!["login"]);
        assert!(!gateway.is_loading());
    }

    #[tokio::test]
    async fn login_response_after_session_change_is_discarded() {
        let session = store();
        let api = StubApi::default();
        *api.login.lock() = Some(Ok(admin_login_response()));
        let other_tab = Arc::clone(&session);
        *api.during_login.lock() = Some(Box::new(move || {
            other_tab.logout().expect("logout");
        }));
        let gateway = AuthGateway::new(api, session);

        let err = gateway
            .login(&LoginForm::new("admin@shop.test", "secret"))
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::Stale);
        assert!(!gateway.session().is_authenticated());
    }

    #[tokio::test]
    async fn change_password_requires_session() {
        let gateway = gateway(StubApi::default());
        let err = gateway.change_password(&change_form()).await.unwrap_err();
        assert_eq!(err, AuthError::NotAuthenticated);
        assert!(gateway.api().calls().is_empty());
    }

    #[tokio::test]
    async fn change_password_to_same_password_fails_fast() {
        let gateway = gateway(StubApi::default());
        signed_in_customer(&gateway);
        let form = ChangePasswordForm {
            current_password: "secret1".to_string(),
            new_password: "secret1".to_string(),
            confirm_password: "secret1".to_string(),
        };
        let err = gateway.change_password(&form).await.unwrap_err();
        assert!(matches!(err, AuthError::Validation(ref e) if e.has_form_error(FormRule::PasswordUnchanged)));
        assert!(gateway.api().calls().is_empty());
    }

    #[tokio::test]
    async fn unauthorized_bearer_call_ends_session() {
        let gateway = gateway(StubApi::default());
        signed_in_customer(&gateway);
        *gateway.api().bearer_failure.lock() = Some(ApiError::Rejected {
            status: 401,
            message: "Unauthorized".to_string(),
            code: None,
        });

        let err = gateway.change_password(&change_form()).await.unwrap_err();
        assert!(matches!(err, AuthError::Rejected { status: 401, .. }));
        assert!(!gateway.session().is_authenticated());
    }

    #[tokio::test]
    async fn update_profile_refreshes_stored_user_and_keeps_roles() {
        let gateway = gateway(StubApi::default());
        signed_in_customer(&gateway);
        let patch = ProfilePatch {
            first_name: Some("Cora".to_string()),
            last_name: Some("Customer".to_string()),
            phone_number: None,
        };

        let user = gateway.update_profile(&patch).await.expect("update");
        assert_eq!(user.full_name(), "Cora Customer");
        assert!(user.roles().contains("Customer"));
        assert_eq!(gateway.session().current_user(), Some(user));
    }

    #[tokio::test]
    async fn reload_user_refreshes_profile() {
        let api = StubApi::default();
        *api.profile.lock() =
            Some(UserProfile::new(UserId::new("u-1"), "a@b.com").with_email_confirmed(true));
        let gateway = gateway(api);
        signed_in_customer(&gateway);

        let user = gateway.reload_user().await.expect("reload");
        assert!(user.email_confirmed());
        assert_eq!(gateway.api().calls(), vec!["get_user"]);
    }

    #[tokio::test]
    async fn admin_update_is_forbidden_for_customers() {
        let gateway = gateway(StubApi::default());
        signed_in_customer(&gateway);
        let update = AdminUserUpdate {
            first_name: "Cora".to_string(),
            last_name: "Customer".to_string(),
            phone_number: None,
            is_active: false,
            roles: vec![],
        };
        let err = gateway
            .admin_update_user(&UserId::new("u-2"), &update)
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::Forbidden);
        assert!(gateway.api().calls().is_empty());
    }

    #[tokio::test]
    async fn logout_clears_session() {
        let gateway = gateway(StubApi::default());
        signed_in_customer(&gateway);
        gateway.logout().expect("logout");
        assert_eq!(gateway.session().state(), AuthState::Anonymous);
    }
}
