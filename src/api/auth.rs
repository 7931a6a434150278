use super::to_json;
use crate::error::Result;
use crate::http_client::{ApiClient, RequestOptions};
use crate::models::{AuthResponse, LoginRequest, MeResponse, RegisterRequest, User};

impl ApiClient {
    /// Log in and store the returned token pair
    pub async fn login(&self, username: &str, password: &str) -> Result<AuthResponse> {
        let body = to_json(&LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        })?;

        let response: AuthResponse = self
            .request_json("/auth/login", RequestOptions::post().json(body), "Login failed")
            .await?;

        self.set_tokens(response.access_token.clone(), response.refresh_token.clone())
            .await;
        tracing::info!(username = %response.user.username, "Logged in");

        Ok(response)
    }

    /// Create an account and store the returned token pair
    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse> {
        let response: AuthResponse = self
            .request_json(
                "/auth/register",
                RequestOptions::post().json(to_json(request)?),
                "Registration failed",
            )
            .await?;

        self.set_tokens(response.access_token.clone(), response.refresh_token.clone())
            .await;
        tracing::info!(username = %response.user.username, "Registered");

        Ok(response)
    }

    /// Tell the server we are leaving, then drop local credentials no matter
    /// how the request went
    pub async fn logout(&self) {
        match self.send("/auth/logout", RequestOptions::post()).await {
            Ok(response) if !response.is_success() => {
                tracing::warn!(status = %response.status(), "Logout request rejected");
            }
            Err(e) => tracing::warn!("Logout request failed: {}", e),
            Ok(_) => {}
        }

        self.clear_tokens().await;
    }

    pub async fn current_user(&self) -> Result<User> {
        let me: MeResponse = self
            .request_json("/auth/me", RequestOptions::get(), "Failed to get current user")
            .await?;
        Ok(me.user)
    }
}
