use serde_json::{json, Value};

use super::ListQuery;
use crate::error::Result;
use crate::http_client::{ApiClient, RequestOptions};

impl ApiClient {
    // Forum

    pub async fn forum_categories(&self) -> Result<Value> {
        self.request_json(
            "/forum/categories",
            RequestOptions::get(),
            "Failed to fetch forum categories",
        )
        .await
    }

    pub async fn forum_topics(&self, query: &ListQuery) -> Result<Value> {
        self.request_json("/forum/topics", query.options(), "Failed to fetch forum topics")
            .await
    }

    /// Topic with a page of its posts
    pub async fn forum_topic(&self, id: i64, query: &ListQuery) -> Result<Value> {
        self.request_json(
            &format!("/forum/topics/{}", id),
            query.options(),
            "Failed to fetch forum topic",
        )
        .await
    }

    pub async fn create_forum_topic(&self, topic: Value) -> Result<Value> {
        self.request_json(
            "/forum/topics",
            RequestOptions::post().json(topic),
            "Failed to create forum topic",
        )
        .await
    }

    pub async fn create_forum_post(&self, topic_id: i64, content: &str) -> Result<Value> {
        self.request_json(
            &format!("/forum/topics/{}/posts", topic_id),
            RequestOptions::post().json(json!({ "content": content })),
            "Failed to create forum post",
        )
        .await
    }

    // Interest groups

    pub async fn interest_groups(&self, query: &ListQuery) -> Result<Value> {
        self.request_json("/groups", query.options(), "Failed to fetch interest groups")
            .await
    }

    pub async fn create_interest_group(&self, group: Value) -> Result<Value> {
        self.request_json(
            "/groups",
            RequestOptions::post().json(group),
            "Failed to create interest group",
        )
        .await
    }

    // Events

    pub async fn community_events(&self, query: &ListQuery) -> Result<Value> {
        self.request_json("/events", query.options(), "Failed to fetch community events")
            .await
    }

    pub async fn create_community_event(&self, event: Value) -> Result<Value> {
        self.request_json(
            "/events",
            RequestOptions::post().json(event),
            "Failed to create community event",
        )
        .await
    }

    pub async fn attend_event(&self, event_id: i64) -> Result<Value> {
        self.request_json(
            &format!("/events/{}/attend", event_id),
            RequestOptions::post(),
            "Failed to register for event",
        )
        .await
    }

    pub async fn community_stats(&self) -> Result<Value> {
        self.request_json(
            "/community/stats",
            RequestOptions::get(),
            "Failed to fetch community statistics",
        )
        .await
    }
}
