use serde_json::Value;

use super::ListQuery;
use crate::error::Result;
use crate::http_client::{ApiClient, RequestOptions};

impl ApiClient {
    pub async fn list_news(&self, query: &ListQuery) -> Result<Value> {
        self.request_json("/news", query.options(), "Failed to fetch news articles")
            .await
    }

    pub async fn get_news(&self, id: i64) -> Result<Value> {
        self.request_json(
            &format!("/news/{}", id),
            RequestOptions::get(),
            "Failed to fetch news article",
        )
        .await
    }

    pub async fn featured_news(&self) -> Result<Value> {
        self.request_json("/news/featured", RequestOptions::get(), "Failed to fetch featured news")
            .await
    }

    pub async fn news_categories(&self) -> Result<Value> {
        self.request_json(
            "/news/categories",
            RequestOptions::get(),
            "Failed to fetch news categories",
        )
        .await
    }

    pub async fn news_stats(&self) -> Result<Value> {
        self.request_json("/news/stats", RequestOptions::get(), "Failed to fetch news statistics")
            .await
    }
}
