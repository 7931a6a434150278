// Endpoint wrappers for the H2PETRONS API
// Every helper goes through `ApiClient::send`, so all of them get the bearer
// header and the refresh-and-retry behaviour for free.

mod auth;
mod community;
mod news;
mod research;
mod users;

pub use research::ResearchSubmission;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{ApiError, Result};
use crate::http_client::{ApiClient, RequestOptions};

/// Query parameters for list endpoints
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListQuery {
    pairs: Vec<(String, String)>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(self, page: u32) -> Self {
        self.param("page", page.to_string())
    }

    pub fn per_page(self, per_page: u32) -> Self {
        self.param("per_page", per_page.to_string())
    }

    pub fn search(self, search: impl Into<String>) -> Self {
        self.param("search", search)
    }

    pub fn category(self, category: impl Into<String>) -> Self {
        self.param("category", category)
    }

    pub fn sort_by(self, sort_by: impl Into<String>) -> Self {
        self.param("sort_by", sort_by)
    }

    /// Any other filter the endpoint understands (e.g. `category_id`, `type`)
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.pairs.push((key.into(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    fn options(&self) -> RequestOptions {
        RequestOptions::get().query(self.pairs.iter().cloned())
    }
}

impl ApiClient {
    /// Send and decode a JSON success body, or turn the failure into
    /// `ApiError::Api` using the server's `error` message or `fallback`
    pub(crate) async fn request_json<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
        fallback: &str,
    ) -> Result<T> {
        let response = self.send(path, options).await?;

        if !response.is_success() {
            let err = ApiError::from_response(&response, fallback);
            tracing::debug!(path = path, error = %err, "API request failed");
            return Err(err);
        }

        response
            .json()
            .map_err(|e| ApiError::Decode(format!("{}: {}", path, e)))
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<serde_json::Value> {
    Ok(serde_json::to_value(value).map_err(anyhow::Error::from)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_query_builder() {
        let query = ListQuery::new()
            .page(2)
            .per_page(50)
            .search("aero")
            .category("aerodynamics")
            .sort_by("popular")
            .param("category_id", "4");

        assert_eq!(
            query.pairs(),
            &[
                ("page".to_string(), "2".to_string()),
                ("per_page".to_string(), "50".to_string()),
                ("search".to_string(), "aero".to_string()),
                ("category".to_string(), "aerodynamics".to_string()),
                ("sort_by".to_string(), "popular".to_string()),
                ("category_id".to_string(), "4".to_string()),
            ]
        );
        assert_eq!(query.options().query.len(), 6);
    }

    #[test]
    fn test_empty_list_query_adds_nothing() {
        let query = ListQuery::new();
        assert!(query.is_empty());
        assert!(query.options().query.is_empty());
    }
}
