use serde::{Deserialize, Serialize};

/// Site role, ordered by privilege
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Researcher,
    Moderator,
    Admin,
    /// Any role string this client does not know about
    #[serde(other)]
    Unknown,
}

impl UserRole {
    /// Position in the role hierarchy; unknown roles rank below everyone
    pub fn level(self) -> u8 {
        match self {
            UserRole::User => 1,
            UserRole::Researcher => 2,
            UserRole::Moderator => 3,
            UserRole::Admin => 4,
            UserRole::Unknown => 0,
        }
    }

    /// True if this role is `required` or higher
    pub fn includes(self, required: UserRole) -> bool {
        self.level() >= required.level()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Researcher => "researcher",
            UserRole::Moderator => "moderator",
            UserRole::Admin => "admin",
            UserRole::Unknown => "unknown",
        }
    }
}

/// Account as returned by `/auth/me`, login and registration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_verified: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<String>,
    #[serde(default)]
    pub research_count: u32,
    #[serde(default)]
    pub forum_posts_count: u32,
}

impl User {
    /// Effective role; a logged-in user without one is a plain user
    pub fn effective_role(&self) -> UserRole {
        self.role.unwrap_or(UserRole::User)
    }

    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{} {}", first, last),
            (Some(first), None) => first.clone(),
            _ => self.username.clone(),
        }
    }
}
