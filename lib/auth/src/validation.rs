//! Client-side validation rules.
//!
//! Every gateway operation validates its form before any request is sent.
//! Per-field rules attach to a [`Field`]; cross-field rules (confirmation
//! equality, new-vs-current password) are form-level and attach to no field.

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
});

static SIX_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{6}$").expect("six-digit pattern is valid"));

/// Minimum password length at registration and password change.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Form fields that can fail validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Email,
    Password,
    ConfirmPassword,
    CurrentPassword,
    NewPassword,
    Token,
    FirstName,
    LastName,
}

impl Field {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Password => "password",
            Self::ConfirmPassword => "confirmPassword",
            Self::CurrentPassword => "currentPassword",
            Self::NewPassword => "newPassword",
            Self::Token => "token",
            Self::FirstName => "firstName",
            Self::LastName => "lastName",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A per-field rule violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldRule {
    /// The field is empty.
    Required,
    /// The value is not an email address.
    EmailFormat,
    /// The value is shorter than the minimum length.
    MinLength(usize),
    /// The value must be exactly six digits.
    SixDigits,
}

impl fmt::Display for FieldRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Required => write!(f, "is required"),
            Self::EmailFormat => write!(f, "must be a valid email address"),
            Self::MinLength(n) => write!(f, "must be at least {n} characters"),
            Self::SixDigits => write!(f, "must be exactly 6 digits"),
        }
    }
}

/// A form-level (cross-field) rule violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormRule {
    /// The confirmation does not equal the password it confirms.
    PasswordMismatch,
    /// The new password equals the current one.
    PasswordUnchanged,
    /// Nothing to submit.
    NothingToUpdate,
}

impl fmt::Display for FormRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PasswordMismatch => write!(f, "passwords do not match"),
            Self::PasswordUnchanged => {
                write!(f, "new password must differ from the current password")
            }
            Self::NothingToUpdate => write!(f, "no changes to submit"),
        }
    }
}

/// All rule violations found in one form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    fields: Vec<(Field, FieldRule)>,
    form: Vec<FormRule>,
}

impl ValidationErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a per-field violation.
    pub fn add_field(&mut self, field: Field, rule: FieldRule) {
        self.fields.push((field, rule));
    }

    /// Records a form-level violation.
    pub fn add_form(&mut self, rule: FormRule) {
        self.form.push(rule);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.form.is_empty()
    }

    /// Returns the violations attached to one field.
    pub fn for_field(&self, field: Field) -> impl Iterator<Item = &FieldRule> {
        self.fields
            .iter()
            .filter(move |(f, _)| *f == field)
            .map(|(_, rule)| rule)
    }

    #[must_use]
    pub fn field_errors(&self) -> &[(Field, FieldRule)] {
        &self.fields
    }

    #[must_use]
    pub fn form_errors(&self) -> &[FormRule] {
        &self.form
    }

    #[must_use]
    pub fn has_form_error(&self, rule: FormRule) -> bool {
        self.form.contains(&rule)
    }

    /// Converts into a `Result`, `Ok` when nothing was recorded.
    ///
    /// # Errors
    ///
    /// Returns `self` when at least one violation was recorded.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = self
            .fields
            .iter()
            .map(|(field, rule)| format!("{field} {rule}"))
            .collect();
        parts.extend(self.form.iter().map(ToString::to_string));
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Something that can check itself before submission.
pub trait Validate {
    /// # Errors
    ///
    /// Returns every violated rule.
    fn validate(&self) -> Result<(), ValidationErrors>;
}

/// Returns true if `value` looks like an email address.
#[must_use]
pub fn is_valid_email(value: &str) -> bool {
    EMAIL_PATTERN.is_match(value.trim())
}

/// Returns true if `value` is exactly six ASCII digits.
#[must_use]
pub fn is_six_digits(value: &str) -> bool {
    SIX_DIGITS.is_match(value)
}

/// Required + email format.
pub fn check_email(errors: &mut ValidationErrors, field: Field, value: &str) {
    if value.trim().is_empty() {
        errors.add_field(field, FieldRule::Required);
    } else if !is_valid_email(value) {
        errors.add_field(field, FieldRule::EmailFormat);
    }
}

/// Required only.
pub fn check_required(errors: &mut ValidationErrors, field: Field, value: &str) {
    if value.trim().is_empty() {
        errors.add_field(field, FieldRule::Required);
    }
}

/// Required + at least `min` characters.
pub fn check_min_length(errors: &mut ValidationErrors, field: Field, value: &str, min: usize) {
    if value.is_empty() {
        errors.add_field(field, FieldRule::Required);
    } else if value.chars().count() < min {
        errors.add_field(field, FieldRule::MinLength(min));
    }
}

/// Required + exactly six digits.
pub fn check_six_digits(errors: &mut ValidationErrors, field: Field, value: &str) {
    if value.is_empty() {
        errors.add_field(field, FieldRule::Required);
    } else if !is_six_digits(value) {
        errors.add_field(field, FieldRule::SixDigits);
    }
}

/// Form-level confirmation equality.
pub fn check_matches(errors: &mut ValidationErrors, primary: &str, confirmation: &str) {
    if primary != confirmation {
        errors.add_form(FormRule::PasswordMismatch);
    }
}
