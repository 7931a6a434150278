use serde_json::Value;

use super::ListQuery;
use crate::error::Result;
use crate::http_client::{ApiClient, RequestOptions};

impl ApiClient {
    pub async fn list_users(&self, query: &ListQuery) -> Result<Value> {
        self.request_json("/users", query.options(), "Failed to fetch users")
            .await
    }

    pub async fn get_user(&self, id: i64) -> Result<Value> {
        self.request_json(&format!("/users/{}", id), RequestOptions::get(), "Failed to fetch user")
            .await
    }

    pub async fn update_profile(&self, profile: Value) -> Result<Value> {
        self.request_json(
            "/profile",
            RequestOptions::put().json(profile),
            "Failed to update profile",
        )
        .await
    }
}
