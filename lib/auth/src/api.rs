//! Backend transport for the authentication flows.
//!
//! [`AuthApi`] is one method per endpoint and nothing else: no validation,
//! no session handling, no retries. [`crate::http::HttpAuthApi`] is the
//! production implementation; tests substitute their own.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use storefront_core::UserId;

use crate::error::ApiError;
use crate::user::{AdminUserUpdate, ProfilePatch, UserProfile};

/// `POST /Account/login` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    pub remember_me: bool,
}

/// `POST /Account/login` response.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<UserProfile>,
    #[serde(default)]
    pub message: Option<String>,
}

/// `POST /Account/register` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}

/// Body for endpoints that take only an email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailRequest {
    pub email: String,
}

/// `POST /Account/reset-password` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub email: String,
    pub token: String,
    pub new_password: String,
    pub confirm_password: String,
}

/// `POST /User/{id}/change-password` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

/// Generic `{success, message}` acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
}

impl MessageResponse {
    #[must_use]
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: Some(true),
            message: Some(message.into()),
        }
    }
}

/// `GET /Account/check-email` response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EmailStatus {
    pub exists: bool,
}

/// One method per backend endpoint used by the authentication flows.
///
/// Methods taking `bearer` send it as `Authorization: Bearer <token>`.
#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, ApiError>;

    async fn register(&self, request: &RegisterRequest) -> Result<MessageResponse, ApiError>;

    async fn check_email(&self, email: &str) -> Result<EmailStatus, ApiError>;

    async fn forgot_password(&self, request: &EmailRequest) -> Result<MessageResponse, ApiError>;

    async fn reset_password(
        &self,
        request: &ResetPasswordRequest,
    ) -> Result<MessageResponse, ApiError>;

    async fn confirm_email(&self, email: &str, token: &str) -> Result<MessageResponse, ApiError>;

    async fn resend_confirmation(
        &self,
        request: &EmailRequest,
    ) -> Result<MessageResponse, ApiError>;

    /// `GET /User/{id}`.
    async fn get_user(&self, bearer: &str, id: &UserId) -> Result<UserProfile, ApiError>;

    /// Self-service profile update for the bearer's own account.
    async fn update_profile(
        &self,
        bearer: &str,
        patch: &ProfilePatch,
    ) -> Result<UserProfile, ApiError>;

    /// `PUT /User/{id}` (back-office).
    async fn admin_update_user(
        &self,
        bearer: &str,
        id: &UserId,
        update: &AdminUserUpdate,
    ) -> Result<(), ApiError>;

    /// `POST /User/{id}/change-password`.
    async fn change_password(
        &self,
        bearer: &str,
        id: &UserId,
        request: &ChangePasswordRequest,
    ) -> Result<(), ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn login_request_uses_camel_case() {
        let request = LoginRequest {
            email: "a@b.com".to_string(),
            password: "123456".to_string(),
            remember_me: true,
        };
        assert_eq!(
            serde_json::to_value(&request).expect("serialize"),
            json!({ "email": "a@b.com", "password": "123456", "rememberMe": true })
        );
    }

    #[test]
    fn login_failure_response_parses_without_token() {
        let response: LoginResponse =
            serde_json::from_value(json!({ "success": false, "message": "Invalid login" }))
                .expect("deserialize");
        assert!(!response.success);
        assert!(response.token.is_none());
        assert_eq!(response.message.as_deref(), Some("Invalid login"));
    }

    #[test]
    fn register_request_omits_missing_full_name() {
        let request = RegisterRequest {
            email: "a@b.com".to_string(),
            password: "secret1".to_string(),
            confirm_password: "secret1".to_string(),
            full_name: None,
        };
        let value = serde_json::to_value(&request).expect("serialize");
        assert!(value.get("fullName").is_none());
        assert_eq!(value["confirmPassword"], "secret1");
    }
}
