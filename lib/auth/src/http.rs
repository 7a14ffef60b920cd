//! `AuthApi` over HTTP with `reqwest`.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use storefront_core::UserId;
use tracing::instrument;

use crate::api::{
    AuthApi, ChangePasswordRequest, EmailRequest, EmailStatus, LoginRequest, LoginResponse,
    MessageResponse, RegisterRequest, ResetPasswordRequest,
};
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::user::{AdminUserUpdate, ProfilePatch, UserProfile};

/// HTTP client for the storefront backend's account and user endpoints.
#[derive(Clone)]
pub struct HttpAuthApi {
    client: Client,
    base_url: Arc<str>,
}

impl std::fmt::Debug for HttpAuthApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpAuthApi")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl HttpAuthApi {
    /// Creates a client for `base_url` with the given per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Network {
                reason: e.to_string(),
            })?;
        Ok(Self {
            client,
            base_url: Arc::from(base_url.trim_end_matches('/')),
        })
    }

    /// Creates a client from the loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ApiError> {
        Self::new(config.api_url(), config.request_timeout())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn user_url(&self, id: &UserId, suffix: &str) -> String {
        self.url(&format!(
            "/User/{}{}",
            urlencoding::encode(id.as_str()),
            suffix
        ))
    }
}

#[async_trait]
impl AuthApi for HttpAuthApi {
    #[instrument(skip(self, request), fields(email = %request.email))]
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, ApiError> {
        let builder = self.client.post(self.url("/Account/login")).json(request);
        send_json(builder).await
    }

    #[instrument(skip(self, request), fields(email = %request.email))]
    async fn register(&self, request: &RegisterRequest) -> Result<MessageResponse, ApiError> {
        let builder = self.client.post(self.url("/Account/register")).json(request);
        send_json(builder).await
    }

    #[instrument(skip(self))]
    async fn check_email(&self, email: &str) -> Result<EmailStatus, ApiError> {
        let builder = self
            .client
            .get(self.url("/Account/check-email"))
            .query(&[("email", email)]);
        send_json(builder).await
    }

    #[instrument(skip(self, request), fields(email = %request.email))]
    async fn forgot_password(&self, request: &EmailRequest) -> Result<MessageResponse, ApiError> {
        let builder = self
            .client
            .post(self.url("/Account/forgot-password"))
            .json(request);
        send_json(builder).await
    }

    #[instrument(skip(self, request), fields(email = %request.email))]
    async fn reset_password(
        &self,
        request: &ResetPasswordRequest,
    ) -> Result<MessageResponse, ApiError> {
        let builder = self
            .client
            .post(self.url("/Account/reset-password"))
            .json(request);
        send_json(builder).await
    }

    #[instrument(skip(self, token))]
    async fn confirm_email(&self, email: &str, token: &str) -> Result<MessageResponse, ApiError> {
        let builder = self
            .client
            .get(self.url("/Account/confirm-email"))
            .query(&[("email", email), ("token", token)]);
        send_json(builder).await
    }

    #[instrument(skip(self, request), fields(email = %request.email))]
    async fn resend_confirmation(
        &self,
        request: &EmailRequest,
    ) -> Result<MessageResponse, ApiError> {
        let builder = self
            .client
            .post(self.url("/Account/resend-confirmation"))
            .json(request);
        send_json(builder).await
    }

    #[instrument(skip(self, bearer), fields(user_id = %id))]
    async fn get_user(&self, bearer: &str, id: &UserId) -> Result<UserProfile, ApiError> {
        let builder = self.client.get(self.user_url(id, "")).bearer_auth(bearer);
        send_json(builder).await
    }

    #[instrument(skip_all)]
    async fn update_profile(
        &self,
        bearer: &str,
        patch: &ProfilePatch,
    ) -> Result<UserProfile, ApiError> {
        let builder = self
            .client
            .put(self.url("/User/profile"))
            .bearer_auth(bearer)
            .json(patch);
        send_json(builder).await
    }

    #[instrument(skip(self, bearer, update), fields(user_id = %id))]
    async fn admin_update_user(
        &self,
        bearer: &str,
        id: &UserId,
        update: &AdminUserUpdate,
    ) -> Result<(), ApiError> {
        let builder = self
            .client
            .put(self.user_url(id, ""))
            .bearer_auth(bearer)
            .json(update);
        send_empty(builder).await
    }

    #[instrument(skip(self, bearer, request), fields(user_id = %id))]
    async fn change_password(
        &self,
        bearer: &str,
        id: &UserId,
        request: &ChangePasswordRequest,
    ) -> Result<(), ApiError> {
        let builder = self
            .client
            .post(self.user_url(id, "/change-password"))
            .bearer_auth(bearer)
            .json(request);
        send_empty(builder).await
    }
}

async fn send(builder: RequestBuilder) -> Result<Response, ApiError> {
    let response = builder.send().await.map_err(|e| {
        tracing::warn!(error = %e, "request to backend failed");
        if e.is_timeout() {
            ApiError::Timeout
        } else {
            ApiError::Network {
                reason: e.to_string(),
            }
        }
    })?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_else(|error| {
        tracing::debug!(status = %status, %error, "failed to read rejection body");
        String::new()
    });
    let rejection = rejection_from_body(status, &body);
    tracing::warn!(status = %status, error = %rejection, "backend rejected request");
    Err(rejection)
}

async fn send_json<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T, ApiError> {
    let response = send(builder).await?;
    response.json().await.map_err(|e| ApiError::InvalidResponse {
        reason: e.to_string(),
    })
}

async fn send_empty(builder: RequestBuilder) -> Result<(), ApiError> {
    send(builder).await.map(|_| ())
}

/// Builds a rejection from an error body.
///
/// Accepts `{message}`, `{code, message}`, ASP.NET problem details
/// (`{title, errors}`) and plain text.
fn rejection_from_body(status: StatusCode, body: &str) -> ApiError {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let field = |name: &str| {
        parsed
            .as_ref()
            .and_then(|v| v.get(name))
            .and_then(Value::as_str)
            .map(str::to_string)
    };

    let message = field("message")
        .or_else(|| first_validation_error(parsed.as_ref()))
        .or_else(|| field("title"))
        .or_else(|| field("error"))
        .or_else(|| {
            let text = body.trim();
            (parsed.is_none() && !text.is_empty()).then(|| text.to_string())
        })
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string()
        });

    ApiError::Rejected {
        status: status.as_u16(),
        message,
        code: field("code"),
    }
}

fn first_validation_error(parsed: Option<&Value>) -> Option<String> {
    parsed?
        .get("errors")?
        .as_object()?
        .values()
        .filter_map(Value::as_array)
        .flatten()
        .find_map(Value::as_str)
        .map(str::to_string)
}
