//! Role types for storefront access control.
//!
//! Roles are plain names issued by the backend. Only `Admin` carries
//! meaning on the client: it unlocks the back-office routes. Any other
//! name, or no role at all, is an ordinary customer.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Name of the privileged back-office role.
pub const ADMIN_ROLE: &str = "Admin";

/// Set of role names assigned to a user.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleSet {
    roles: BTreeSet<String>,
}

impl RoleSet {
    /// Creates an empty role set (ordinary user).
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Creates a role set holding only the Admin role.
    #[must_use]
    pub fn admin() -> Self {
        Self::from_names([ADMIN_ROLE])
    }

    /// Creates a role set from role names, dropping blanks and duplicates.
    #[must_use]
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let roles = names
            .into_iter()
            .map(|name| name.as_ref().trim().to_string())
            .filter(|name| !name.is_empty())
            .collect();
        Self { roles }
    }

    /// Returns true if the set contains the given role.
    #[must_use]
    pub fn contains(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    /// Returns true if the user has back-office access.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.contains(ADMIN_ROLE)
    }

    /// Returns true if no roles are assigned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    /// Iterates over role names in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.roles.iter().map(String::as_str)
    }
}

impl<S: AsRef<str>> FromIterator<S> for RoleSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::from_names(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_is_not_admin() {
        let roles = RoleSet::none();
        assert!(roles.is_empty());
        assert!(!roles.is_admin());
    }

    #[test]
    fn admin_set_is_admin() {
        assert!(RoleSet::admin().is_admin());
    }

    #[test]
    fn role_names_are_case_sensitive() {
        let roles = RoleSet::from_names(["admin"]);
        assert!(!roles.is_admin());
    }

    #[test]
    fn from_names_drops_blanks_and_duplicates() {
        let roles = RoleSet::from_names(["Customer", " ", "Customer", "Admin"]);
        assert_eq!(roles.iter().collect::<Vec<_>>(), vec!["Admin", "Customer"]);
    }

    #[test]
    fn serializes_as_array() {
        let roles = RoleSet::from_names(["Admin", "Customer"]);
        let json = serde_json::to_string(&roles).expect("serialize");
        assert_eq!(json, r#"["Admin","Customer"]"#);
        let parsed: RoleSet = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, roles);
    }
}
