// Session management
// Tracks who is logged in and derives what the UI should offer them

use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::http_client::ApiClient;
use crate::models::{RegisterRequest, User, UserRole};

/// What a rendering layer should show for the current session
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct UiVisibility {
    /// Login/register buttons (nobody logged in)
    pub show_auth_buttons: bool,
    /// Greeting next to the logout button
    pub greeting: Option<String>,
    /// Research submission entry points
    pub can_submit_research: bool,
    /// Moderation and admin tools
    pub show_admin: bool,
}

/// Map the current user to a UI descriptor
pub fn ui_visibility(user: Option<&User>) -> UiVisibility {
    match user {
        None => UiVisibility {
            show_auth_buttons: true,
            greeting: None,
            can_submit_research: false,
            show_admin: false,
        },
        Some(user) => {
            let role = user.effective_role();
            UiVisibility {
                show_auth_buttons: false,
                greeting: Some(format!("Welcome, {}!", user.username)),
                can_submit_research: matches!(
                    role,
                    UserRole::Researcher | UserRole::Moderator | UserRole::Admin
                ),
                show_admin: matches!(role, UserRole::Moderator | UserRole::Admin),
            }
        }
    }
}

/// Current-user bookkeeping on top of an `ApiClient`
pub struct SessionManager {
    api: Arc<ApiClient>,
    current_user: RwLock<Option<User>>,
}

impl SessionManager {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self {
            api,
            current_user: RwLock::new(None),
        }
    }

    pub fn api(&self) -> &Arc<ApiClient> {
        &self.api
    }

    /// Resolve the stored credentials into a user
    /// A failing `/auth/me` drops the credentials; the session ends up logged out.
    pub async fn check_auth_status(&self) -> Option<User> {
        if !self.api.is_authenticated().await {
            *self.current_user.write().await = None;
            return None;
        }

        match self.api.current_user().await {
            Ok(user) => {
                tracing::debug!(username = %user.username, "Session restored");
                *self.current_user.write().await = Some(user.clone());
                Some(user)
            }
            Err(e) => {
                tracing::warn!("Failed to get current user: {}", e);
                self.api.clear_tokens().await;
                *self.current_user.write().await = None;
                None
            }
        }
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<User> {
        let response = self.api.login(username, password).await?;
        *self.current_user.write().await = Some(response.user.clone());
        Ok(response.user)
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<User> {
        let response = self.api.register(request).await?;
        *self.current_user.write().await = Some(response.user.clone());
        Ok(response.user)
    }

    /// Always ends logged out, whatever the server says
    pub async fn logout(&self) {
        self.api.logout().await;
        *self.current_user.write().await = None;
    }

    pub async fn current_user(&self) -> Option<User> {
        self.current_user.read().await.clone()
    }

    pub async fn is_logged_in(&self) -> bool {
        self.current_user.read().await.is_some()
    }

    /// True if the current user holds `role` or a higher one
    pub async fn has_role(&self, role: UserRole) -> bool {
        match self.current_user.read().await.as_ref() {
            Some(user) => user.role.unwrap_or(UserRole::Unknown).includes(role),
            None => false,
        }
    }

    pub async fn visibility(&self) -> UiVisibility {
        ui_visibility(self.current_user.read().await.as_ref())
    }
}
