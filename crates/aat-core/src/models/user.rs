//! Dashboard user model

use serde::{Deserialize, Serialize};

/// Access level of a dashboard user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Manager,
    Staff,
    #[default]
    Viewer,
}

/// A dashboard user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub last_login: Option<String>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_user_role_parses_lowercase() {
        let user: User = serde_json::from_value(json!({
            "id": "u1",
            "email": "ops@example.com",
            "name": "Ops",
            "role": "manager",
            "isActive": true
        }))
        .unwrap();
        assert_eq!(user.role, UserRole::Manager);
        assert!(user.is_active);
    }
}
