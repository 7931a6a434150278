// Token refresh logic

use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;

use super::types::RefreshResponse;
use crate::transport::{HttpRequest, Transport};

/// Refresh endpoint for a given API root
pub fn refresh_url(base_url: &str) -> String {
    format!("{}/auth/refresh", base_url.trim_end_matches('/'))
}

/// Exchange a refresh token for a new access token
///
/// The request carries the refresh token as its only credential; the current
/// access token is never sent here.
pub async fn request_access_token(
    transport: &dyn Transport,
    url: &str,
    refresh_token: &str,
) -> Result<String> {
    tracing::debug!("Refreshing access token...");

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", refresh_token))
            .context("Refresh token is not a valid header value")?,
    );

    let request = HttpRequest {
        method: Method::POST,
        url: url.to_string(),
        headers,
        query: Vec::new(),
        body: None,
    };

    let response = transport
        .execute(request)
        .await
        .context("Failed to send refresh request")?;

    let status = response.status();
    if !status.is_success() {
        anyhow::bail!("Token refresh failed: {} - {}", status, response.text());
    }

    let data: RefreshResponse = response
        .json()
        .context("Failed to parse refresh response")?;

    if data.access_token.is_empty() {
        anyhow::bail!("Refresh response does not contain access_token");
    }

    tracing::info!("Access token refreshed");

    Ok(data.access_token)
}
