//! User profile DTOs.
//!
//! `UserProfile` mirrors the backend's user resource and is the shape
//! persisted in the session. Wire names are camelCase.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use storefront_core::UserId;

use crate::role::RoleSet;

/// The authenticated user's profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Backend user ID.
    id: UserId,
    /// Login email address.
    email: String,
    #[serde(default, deserialize_with = "null_as_default")]
    first_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    phone_number: Option<String>,
    /// Whether the email address has been confirmed.
    #[serde(default, deserialize_with = "null_as_default")]
    email_confirmed: bool,
    /// Role names.
    #[serde(default, deserialize_with = "null_as_default")]
    roles: RoleSet,
    #[serde(default, with = "lenient_timestamp")]
    created_at: DateTime<Utc>,
    #[serde(default, with = "lenient_timestamp")]
    updated_at: DateTime<Utc>,
}

impl UserProfile {
    /// Creates a profile with empty names, no roles and timestamps set to now.
    #[must_use]
    pub fn new(id: UserId, email: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            email: email.into(),
            first_name: String::new(),
            last_name: String::new(),
            phone_number: None,
            email_confirmed: false,
            roles: RoleSet::none(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the first and last name.
    #[must_use]
    pub fn with_names(mut self, first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        self.first_name = first_name.into();
        self.last_name = last_name.into();
        self
    }

    /// Sets the roles.
    #[must_use]
    pub fn with_roles(mut self, roles: RoleSet) -> Self {
        self.roles = roles;
        self
    }

    /// Sets the email confirmation flag.
    #[must_use]
    pub fn with_email_confirmed(mut self, confirmed: bool) -> Self {
        self.email_confirmed = confirmed;
        self
    }

    #[must_use]
    pub fn id(&self) -> &UserId {
        &self.id
    }

    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    #[must_use]
    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    #[must_use]
    pub fn last_name(&self) -> &str {
        &self.last_name
    }

    /// Returns "First Last", trimmed; empty when neither name is set.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    #[must_use]
    pub fn phone_number(&self) -> Option<&str> {
        self.phone_number.as_deref()
    }

    #[must_use]
    pub fn email_confirmed(&self) -> bool {
        self.email_confirmed
    }

    #[must_use]
    pub fn roles(&self) -> &RoleSet {
        &self.roles
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.roles.is_admin()
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Replaces the role set.
    pub fn set_roles(&mut self, roles: RoleSet) {
        self.roles = roles;
    }

    /// Copies the profile fields of `fresh` into this profile.
    ///
    /// Identity (`id`) and roles are kept: roles come from the token and only
    /// change on the next login.
    pub fn refresh_from(&mut self, fresh: &UserProfile) {
        self.email = fresh.email.clone();
        self.first_name = fresh.first_name.clone();
        self.last_name = fresh.last_name.clone();
        self.phone_number = fresh.phone_number.clone();
        self.email_confirmed = fresh.email_confirmed;
        self.created_at = fresh.created_at;
        self.updated_at = fresh.updated_at;
    }
}

/// Self-service profile changes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
}

impl ProfilePatch {
    /// Returns true if the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none() && self.last_name.is_none() && self.phone_number.is_none()
    }
}

/// Back-office update of another user's account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUserUpdate {
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
    pub is_active: bool,
    pub roles: Vec<String>,
}

/// Reads JSON `null` as the field's default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Timestamps from the backend may omit the offset; those are read as UTC.
/// `null` reads as the Unix epoch, same as a missing field.
mod lenient_timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let Some(raw) = Option::<String>::deserialize(deserializer)? else {
            return Ok(DateTime::<Utc>::default());
        };
        if let Ok(parsed) = DateTime::parse_from_rfc3339(&raw) {
            return Ok(parsed.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| naive.and_utc())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> UserProfile {
        UserProfile::new(UserId::new("u-1"), "a@b.com")
            .with_names("Ada", "Lovelace")
            .with_roles(RoleSet::admin())
            .with_email_confirmed(true)
    }

    #[test]
    fn deserializes_backend_dto() {
        let dto = json!({
            "id": "8d2f",
            "email": "a@b.com",
            "firstName": "Ada",
            "lastName": "Lovelace",
            "emailConfirmed": true,
            "roles": ["Admin"],
            "createdAt": "2024-03-01T10:00:00Z",
            "updatedAt": "2024-03-02T11:30:00.123"
        });
        let user: UserProfile = serde_json::from_value(dto).expect("deserialize");
        assert_eq!(user.id().as_str(), "8d2f");
        assert_eq!(user.full_name(), "Ada Lovelace");
        assert!(user.email_confirmed());
        assert!(user.is_admin());
        assert_eq!(user.updated_at().timestamp(), 1_709_379_000);
    }

    #[test]
    fn missing_optional_fields_default() {
        let user: UserProfile =
            serde_json::from_value(json!({ "id": "u", "email": "u@x.io" })).expect("deserialize");
        assert!(user.roles().is_empty());
        assert!(!user.email_confirmed());
        assert_eq!(user.full_name(), "");
    }

    #[test]
    fn null_names_and_timestamps_default() {
        let dto = json!({
            "id": "u-2",
            "email": "c@shop.test",
            "firstName": null,
            "lastName": null,
            "phoneNumber": null,
            "emailConfirmed": null,
            "roles": null,
            "createdAt": "2024-03-01T10:00:00Z",
            "updatedAt": null
        });
        let user: UserProfile = serde_json::from_value(dto).expect("deserialize");
        assert_eq!(user.full_name(), "");
        assert_eq!(user.phone_number(), None);
        assert!(!user.email_confirmed());
        assert!(user.roles().is_empty());
        assert_eq!(user.created_at().timestamp(), 1_709_287_200);
        assert_eq!(user.updated_at().timestamp(), 0);
    }

    #[test]
    fn login_response_with_null_user_fields_parses() {
        let body = r#"{"success":true,"token":"a.b.c","user":{"id":"u-1","email":"a@b.com","firstName":null,"lastName":"Lovelace","createdAt":null,"updatedAt":null}}"#;
        let response: crate::api::LoginResponse = serde_json::from_str(body).expect("deserialize");
        let user = response.user.expect("user");
        assert_eq!(user.full_name(), "Lovelace");
        assert_eq!(user.created_at(), DateTime::<Utc>::default());
    }

    #[test]
    fn serialization_roundtrip_is_deep_equal() {
        let user = sample();
        let json = serde_json::to_string(&user).expect("serialize");
        assert!(json.contains("\"firstName\":\"Ada\""));
        let parsed: UserProfile = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, user);
    }

    #[test]
    fn refresh_keeps_identity_and_roles() {
        let mut stored = sample();
        let fresh = UserProfile::new(UserId::new("other"), "new@b.com").with_names("Ada", "King");
        stored.refresh_from(&fresh);
        assert_eq!(stored.id().as_str(), "u-1");
        assert_eq!(stored.email(), "new@b.com");
        assert_eq!(stored.last_name(), "King");
        assert!(stored.is_admin());
    }

    #[test]
    fn profile_patch_skips_unset_fields() {
        let patch = ProfilePatch {
            first_name: Some("Grace".to_string()),
            ..ProfilePatch::default()
        };
        assert!(!patch.is_empty());
        assert_eq!(
            serde_json::to_value(&patch).expect("serialize"),
            json!({ "firstName": "Grace" })
        );
    }
}
