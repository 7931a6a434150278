use bytes::Bytes;
use serde_json::Value;

use super::ListQuery;
use crate::error::Result;
use crate::http_client::{ApiClient, RequestOptions};
use crate::transport::MultipartForm;

/// Paper upload; sent as multipart with the document in the `file` field
#[derive(Debug, Clone)]
pub struct ResearchSubmission {
    pub title: String,
    pub abstract_text: String,
    pub keywords: String,
    pub category: String,
    pub file_name: String,
    pub mime: Option<String>,
    pub data: Bytes,
}

impl ResearchSubmission {
    pub fn into_form(self) -> MultipartForm {
        MultipartForm::new()
            .text("title", self.title)
            .text("abstract", self.abstract_text)
            .text("keywords", self.keywords)
            .text("category", self.category)
            .file("file", self.file_name, self.mime.as_deref(), self.data)
    }
}

impl ApiClient {
    pub async fn list_research(&self, query: &ListQuery) -> Result<Value> {
        self.request_json("/research", query.options(), "Failed to fetch research papers")
            .await
    }

    pub async fn get_research(&self, id: i64) -> Result<Value> {
        self.request_json(
            &format!("/research/{}", id),
            RequestOptions::get(),
            "Failed to fetch research paper",
        )
        .await
    }

    pub async fn submit_research(&self, submission: ResearchSubmission) -> Result<Value> {
        self.request_json(
            "/research",
            RequestOptions::post().multipart(submission.into_form()),
            "Failed to submit research paper",
        )
        .await
    }

    pub async fn my_research(&self, query: &ListQuery) -> Result<Value> {
        self.request_json(
            "/research/my-papers",
            query.options(),
            "Failed to fetch your research papers",
        )
        .await
    }

    pub async fn like_research(&self, id: i64) -> Result<Value> {
        self.request_json(
            &format!("/research/{}/like", id),
            RequestOptions::post(),
            "Failed to like research paper",
        )
        .await
    }

    pub async fn research_categories(&self) -> Result<Value> {
        self.request_json(
            "/research/categories",
            RequestOptions::get(),
            "Failed to fetch research categories",
        )
        .await
    }

    pub async fn research_stats(&self) -> Result<Value> {
        self.request_json(
            "/research/stats",
            RequestOptions::get(),
            "Failed to fetch research statistics",
        )
        .await
    }
}
