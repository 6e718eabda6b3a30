//! User profile records, stored at `users/{uid}`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use droidshop_core::Email;

/// Profile written once at registration.
///
/// `is_admin` is never set by the storefront; it is granted out of band by
/// editing the record directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default)]
    pub name: String,
    pub email: Email,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl User {
    /// A fresh non-admin profile.
    #[must_use]
    pub fn new(name: impl Into<String>, email: Email) -> Self {
        Self {
            name: name.into(),
            email,
            is_admin: false,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_wire_format() {
        let user: User = serde_json::from_value(json!({
            "name": "Ada",
            "email": "ada@example.com",
            "isAdmin": true,
            "createdAt": 1_700_000_000_000_i64
        }))
        .unwrap();
        assert!(user.is_admin);
        assert_eq!(user.created_at.timestamp_millis(), 1_700_000_000_000);

        let value = serde_json::to_value(&user).unwrap();
        assert_eq!(value["isAdmin"], json!(true));
        assert_eq!(value["createdAt"], json!(1_700_000_000_000_i64));
    }

    #[test]
    fn test_new_user_is_not_admin() {
        let user = User::new("Ada", Email::parse("ada@example.com").unwrap());
        assert!(!user.is_admin);
    }
}
