//! Submission forms for the authentication flows.
//!
//! Each form validates itself with the rules in [`crate::validation`].
//! Password rules differ per flow on purpose: login, registration and
//! password change take any six or more characters, while the reset flow
//! takes a six-digit code-like password.

use crate::user::{AdminUserUpdate, ProfilePatch};
use crate::validation::{
    Field, FormRule, MIN_PASSWORD_LENGTH, Validate, ValidationErrors, check_email, check_matches,
    check_min_length, check_required, check_six_digits,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    /// Forwarded to the backend; has no client-side effect.
    pub remember_me: bool,
}

impl LoginForm {
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            remember_me: false,
        }
    }
}

impl Validate for LoginForm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_email(&mut errors, Field::Email, &self.email);
        check_min_length(
            &mut errors,
            Field::Password,
            &self.password,
            MIN_PASSWORD_LENGTH,
        );
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub full_name: Option<String>,
}

impl Validate for RegisterForm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_email(&mut errors, Field::Email, &self.email);
        check_min_length(
            &mut errors,
            Field::Password,
            &self.password,
            MIN_PASSWORD_LENGTH,
        );
        check_required(&mut errors, Field::ConfirmPassword, &self.confirm_password);
        check_matches(&mut errors, &self.password, &self.confirm_password);
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResetPasswordForm {
    pub email: String,
    /// Single-use reset credential from the reset link.
    pub token: String,
    pub new_password: String,
    pub confirm_password: String,
}

impl Validate for ResetPasswordForm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_email(&mut errors, Field::Email, &self.email);
        check_required(&mut errors, Field::Token, &self.token);
        check_six_digits(&mut errors, Field::NewPassword, &self.new_password);
        check_required(&mut errors, Field::ConfirmPassword, &self.confirm_password);
        check_matches(&mut errors, &self.new_password, &self.confirm_password);
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangePasswordForm {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

impl Validate for ChangePasswordForm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_required(&mut errors, Field::CurrentPassword, &self.current_password);
        check_min_length(
            &mut errors,
            Field::NewPassword,
            &self.new_password,
            MIN_PASSWORD_LENGTH,
        );
        check_required(&mut errors, Field::ConfirmPassword, &self.confirm_password);
        check_matches(&mut errors, &self.new_password, &self.confirm_password);
        if !self.new_password.is_empty() && self.new_password == self.current_password {
            errors.add_form(FormRule::PasswordUnchanged);
        }
        errors.into_result()
    }
}

/// Email confirmation link parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfirmEmailForm {
    pub email: String,
    pub token: String,
}

impl Validate for ConfirmEmailForm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_email(&mut errors, Field::Email, &self.email);
        check_required(&mut errors, Field::Token, &self.token);
        errors.into_result()
    }
}

/// Forms with a single email field (forgot password, resend confirmation,
/// email status check).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmailForm {
    pub email: String,
}

impl EmailForm {
    #[must_use]
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
        }
    }
}

impl Validate for EmailForm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_email(&mut errors, Field::Email, &self.email);
        errors.into_result()
    }
}

impl Validate for ProfilePatch {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if self.is_empty() {
            errors.add_form(FormRule::NothingToUpdate);
        }
        if let Some(first) = &self.first_name {
            check_required(&mut errors, Field::FirstName, first);
        }
        if let Some(last) = &self.last_name {
            check_required(&mut errors, Field::LastName, last);
        }
        errors.into_result()
    }
}

impl Validate for AdminUserUpdate {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_required(&mut errors, Field::FirstName, &self.first_name);
        check_required(&mut errors, Field::LastName, &self.last_name);
        errors.into_result()
    }
}
