//! User-facing text for gateway errors.
//!
//! A structured `code` from the backend decides the category when present.
//! Without one, the rejection message is matched against known phrases,
//! which breaks silently if the backend rewords its messages; every flow
//! therefore has a generic fallback.

use std::fmt;

use crate::error::AuthError;

/// The operation that failed; selects the fallback wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Login,
    Register,
    CheckEmail,
    ForgotPassword,
    ResetPassword,
    ConfirmEmail,
    ResendConfirmation,
    ChangePassword,
    UpdateProfile,
    ReloadUser,
    AdminUpdateUser,
}

/// Category of a user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    InvalidInput,
    AccountNotFound,
    AccountLocked,
    EmailNotConfirmed,
    WrongPassword,
    AlreadyExists,
    InvalidLink,
    SessionExpired,
    Forbidden,
    Unavailable,
    Busy,
    Generic,
}

/// Text to show the user, with its category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserMessage {
    pub kind: MessageKind,
    pub text: String,
}

impl fmt::Display for UserMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Maps an error from `flow` to text for the user.
#[must_use]
pub fn user_message(error: &AuthError, flow: Flow) -> UserMessage {
    let kind = match error {
        AuthError::Validation(_) => MessageKind::InvalidInput,
        AuthError::Network { .. } => MessageKind::Unavailable,
        AuthError::InvalidResponse { .. }
        | AuthError::Decode(_)
        | AuthError::Storage(_)
        | AuthError::Stale => MessageKind::Generic,
        AuthError::NotAuthenticated => MessageKind::SessionExpired,
        AuthError::Forbidden => MessageKind::Forbidden,
        AuthError::Busy => MessageKind::Busy,
        AuthError::Rejected {
            status,
            message,
            code,
        } => code
            .as_deref()
            .and_then(kind_from_code)
            .or_else(|| kind_from_message(message, flow))
            .unwrap_or_else(|| kind_from_status(*status, flow)),
    };

    let text = match (kind, error) {
        (MessageKind::InvalidInput, AuthError::Validation(errors)) => {
            format!("Please correct the highlighted fields: {errors}.")
        }
        _ => text_for(kind, flow).to_string(),
    };
    UserMessage { kind, text }
}

fn kind_from_code(code: &str) -> Option<MessageKind> {
    let kind = match code.to_ascii_uppercase().as_str() {
        "USER_NOT_FOUND" | "ACCOUNT_NOT_FOUND" => MessageKind::AccountNotFound,
        "ACCOUNT_LOCKED" | "LOCKED_OUT" => MessageKind::AccountLocked,
        "EMAIL_NOT_CONFIRMED" => MessageKind::EmailNotConfirmed,
        "INVALID_PASSWORD" | "INVALID_CREDENTIALS" | "PASSWORD_MISMATCH" => {
            MessageKind::WrongPassword
        }
        "EMAIL_EXISTS" | "DUPLICATE_EMAIL" | "ALREADY_EXISTS" => MessageKind::AlreadyExists,
        "INVALID_TOKEN" | "TOKEN_EXPIRED" => MessageKind::InvalidLink,
        _ => return None,
    };
    Some(kind)
}

fn kind_from_message(message: &str, flow: Flow) -> Option<MessageKind> {
    let message = message.to_lowercase();
    if message.contains("locked") {
        Some(MessageKind::AccountLocked)
    } else if message.contains("not found") || message.contains("does not exist") {
        Some(MessageKind::AccountNotFound)
    } else if message.contains("not confirmed") || message.contains("confirm your email") {
        Some(MessageKind::EmailNotConfirmed)
    } else if message.contains("already") || message.contains("exists") {
        Some(MessageKind::AlreadyExists)
    } else if matches!(flow, Flow::ResetPassword | Flow::ConfirmEmail)
        && (message.contains("token") || message.contains("expired"))
    {
        Some(MessageKind::InvalidLink)
    } else if message.contains("password") || message.contains("credentials") {
        Some(MessageKind::WrongPassword)
    } else {
        None
    }
}

fn kind_from_status(status: u16, flow: Flow) -> MessageKind {
    match (status, flow) {
        (401, Flow::Login) => MessageKind::WrongPassword,
        (401, _) => MessageKind::SessionExpired,
        (403, _) => MessageKind::Forbidden,
        (404, Flow::Login | Flow::ForgotPassword | Flow::ResendConfirmation) => {
            MessageKind::AccountNotFound
        }
        (500..=599, _) => MessageKind::Unavailable,
        _ => MessageKind::Generic,
    }
}

fn text_for(kind: MessageKind, flow: Flow) -> &'static str {
    match kind {
        MessageKind::InvalidInput => "Please correct the highlighted fields.",
        MessageKind::AccountNotFound => "No account was found for this email address.",
        MessageKind::AccountLocked => {
            "This account is temporarily locked. Please try again later."
        }
        MessageKind::EmailNotConfirmed => {
            "Please confirm your email address before signing in."
        }
        MessageKind::WrongPassword => match flow {
            Flow::ChangePassword => "The current password is incorrect.",
            _ => "The email or password is incorrect.",
        },
        MessageKind::AlreadyExists => "An account with this email address already exists.",
        MessageKind::InvalidLink => "This link is invalid or has expired. Please request a new one.",
        MessageKind::SessionExpired => "Your session has ended. Please sign in again.",
        MessageKind::Forbidden => "You do not have permission to do this.",
        MessageKind::Unavailable => {
            "The service is unavailable right now. Please check your connection and try again."
        }
        MessageKind::Busy => "Please wait for the current request to finish.",
        MessageKind::Generic => generic_failure(flow),
    }
}

fn generic_failure(flow: Flow) -> &'static str {
    match flow {
        Flow::Login => "Sign-in failed. Please try again.",
        Flow::Register => "Registration failed. Please try again.",
        Flow::CheckEmail => "Could not check this email address.",
        Flow::ForgotPassword => "Could not send the password reset email.",
        Flow::ResetPassword => "Could not reset the password.",
        Flow::ConfirmEmail => "Could not confirm the email address.",
        Flow::ResendConfirmation => "Could not resend the confirmation email.",
        Flow::ChangePassword => "Could not change the password.",
        Flow::UpdateProfile => "Could not update the profile.",
        Flow::ReloadUser => "Could not load the profile.",
        Flow::AdminUpdateUser => "Could not update the user.",
    }
}
