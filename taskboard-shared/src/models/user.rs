/// User model and roles
///
/// Users belong to an organization and carry exactly one role. The role drives
/// every authorization decision made on the client (see [`crate::auth`]).
///
/// # Roles
///
/// - **Admin**: Manage users and projects
/// - **Project Manager**: Create projects, manage tasks
/// - **Developer**: Work on tasks
/// - **Viewer**: Read-only access
///
/// # Wire format
///
/// ```json
/// {
///   "userId": 3,
///   "username": "bob",
///   "role": "Project Manager",
///   "profilePictureUrl": "https://media.example.com/bob.png",
///   "organizationId": 1
/// }
/// ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed set of user roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Full control over users and projects
    Admin,

    /// Can create projects and manage tasks
    #[serde(rename = "Project Manager")]
    ProjectManager,

    /// Can create and move tasks
    Developer,

    /// Read-only access
    Viewer,
}

impl Role {
    /// All roles, most privileged first
    pub const ALL: [Role; 4] = [
        Role::Admin,
        Role::ProjectManager,
        Role::Developer,
        Role::Viewer,
    ];

    /// Converts role to its wire string
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::ProjectManager => "Project Manager",
            Role::Developer => "Developer",
            Role::Viewer => "Viewer",
        }
    }

    /// Can drag task cards between board columns
    pub fn can_drag(&self) -> bool {
        !matches!(self, Role::Viewer)
    }

    /// Can delete tasks
    pub fn can_delete_tasks(&self) -> bool {
        !matches!(self, Role::Viewer)
    }

    /// Can create projects
    pub fn can_create_projects(&self) -> bool {
        matches!(self, Role::Admin | Role::ProjectManager)
    }

    /// Can add and update users
    pub fn can_manage_users(&self) -> bool {
        matches!(self, Role::Admin | Role::ProjectManager)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User account as returned by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Backend user ID (absent on users not yet created)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,

    /// Unique username
    pub username: String,

    /// Role within the organization
    pub role: Role,

    /// Optional profile picture URL on the media host
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_picture_url: Option<String>,

    /// Organization the user belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<i64>,
}

/// Input for creating a user (`POST /users`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub role: Role,
    pub profile_picture_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<i64>,
}

/// Full replacement of a user (`PUT /users`)
///
/// The password is write-only: it is sent when set and never read back.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    pub username: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_picture_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<i64>,
}

impl UserUpdate {
    /// Starts an update from an existing user, keeping every field
    pub fn from_user(user: &User) -> Self {
        UserUpdate {
            user_id: user.user_id,
            username: user.username.clone(),
            role: user.role,
            profile_picture_url: user.profile_picture_url.clone(),
            password: None,
            organization_id: user.organization_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_wire_names() {
        for role in Role::ALL {
            let json = serde_json::to_string(&role).unwrap();
            assert_eq!(json, format!("\"{}\"", role.as_str()));
        }
        let pm: Role = serde_json::from_str("\"Project Manager\"").unwrap();
        assert_eq!(pm, Role::ProjectManager);
    }

    #[test]
    fn test_role_capabilities() {
        assert!(Role::Admin.can_drag());
        assert!(Role::ProjectManager.can_drag());
        assert!(Role::Developer.can_drag());
        assert!(!Role::Viewer.can_drag());

        assert!(Role::Admin.can_create_projects());
        assert!(Role::ProjectManager.can_create_projects());
        assert!(!Role::Developer.can_create_projects());

        assert!(Role::Admin.can_manage_users());
        assert!(Role::ProjectManager.can_manage_users());
        assert!(!Role::Developer.can_manage_users());
    }

    #[test]
    fn test_user_deserializes_camel_case() {
        let user: User = serde_json::from_str(
            r#"{"userId": 3, "username": "bob", "role": "Developer", "organizationId": 1}"#,
        )
        .unwrap();
        assert_eq!(user.user_id, Some(3));
        assert_eq!(user.role, Role::Developer);
        assert_eq!(user.profile_picture_url, None);
    }

    #[test]
    fn test_user_update_omits_unset_password() {
        let user = User {
            user_id: Some(1),
            username: "alice".to_string(),
            role: Role::Admin,
            profile_picture_url: None,
            organization_id: Some(2),
        };
        let update = UserUpdate::from_user(&user);
        let json = serde_json::to_value(&update).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["organizationId"], 2);
    }
}
