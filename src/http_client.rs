use anyhow::Result;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use std::sync::Arc;

use crate::auth::{AuthManager, TokenStore};
use crate::error::ApiError;
use crate::transport::{HttpRequest, HttpResponse, MultipartForm, RequestBody, Transport};

/// Per-call request options: method, extra headers, query and body
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub method: Method,
    pub headers: HeaderMap,
    pub query: Vec<(String, String)>,
    pub body: Option<RequestBody>,
}

impl RequestOptions {
    pub fn get() -> Self {
        Self::default()
    }

    pub fn post() -> Self {
        Self::with_method(Method::POST)
    }

    pub fn put() -> Self {
        Self::with_method(Method::PUT)
    }

    pub fn with_method(method: Method) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    /// Add or replace a header; caller headers override the JSON default
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn query<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.query
            .extend(pairs.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(RequestBody::Json(body));
        self
    }

    pub fn text(mut self, body: impl Into<String>) -> Self {
        self.body = Some(RequestBody::Text(body.into()));
        self
    }

    pub fn multipart(mut self, form: MultipartForm) -> Self {
        self.body = Some(RequestBody::Multipart(form));
        self
    }
}

/// Outgoing header set: JSON content type, then caller headers, then bearer
/// credentials when an access token is held
pub fn build_headers(options: &RequestOptions, access_token: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::new();

    // Multipart bodies get their content type (with boundary) from the transport
    if !matches!(options.body, Some(RequestBody::Multipart(_))) {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    }

    // Replace per name, keeping every value of multi-valued caller headers
    for name in options.headers.keys() {
        headers.remove(name);
        for value in options.headers.get_all(name) {
            headers.append(name.clone(), value.clone());
        }
    }

    if let Some(token) = access_token {
        match HeaderValue::from_str(&format!("Bearer {}", token)) {
            Ok(value) => {
                headers.insert(AUTHORIZATION, value);
            }
            Err(_) => tracing::warn!("Access token is not a valid header value, sending without it"),
        }
    }

    headers
}

/// Authenticated client for the H2PETRONS API
/// Attaches the bearer token and performs at most one refresh-and-retry on 401
pub struct ApiClient {
    /// API root every path is appended to
    base_url: String,

    /// Transport for API requests
    transport: Arc<dyn Transport>,

    /// Credential owner
    auth_manager: Arc<AuthManager>,
}

impl ApiClient {
    /// Create a client whose credentials are hydrated from `store`
    pub fn new(
        base_url: &str,
        transport: Arc<dyn Transport>,
        store: Arc<dyn TokenStore>,
    ) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();
        let auth_manager = Arc::new(AuthManager::new(store, transport.clone(), &base_url)?);

        Ok(Self::with_auth_manager(&base_url, transport, auth_manager))
    }

    /// Create a client around an existing auth manager
    pub fn with_auth_manager(
        base_url: &str,
        transport: Arc<dyn Transport>,
        auth_manager: Arc<AuthManager>,
    ) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            transport,
            auth_manager,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn auth_manager(&self) -> &Arc<AuthManager> {
        &self.auth_manager
    }

    /// Send a request to `base_url + path`
    ///
    /// A 401 while a refresh token is held triggers one refresh; if it
    /// succeeds the identical request is reissued once with the new token and
    /// that response is returned as-is, otherwise the original 401 is returned.
    /// Only transport failures become errors.
    pub async fn send(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> std::result::Result<HttpResponse, ApiError> {
        let snapshot = self.auth_manager.snapshot().await;
        let request = self.build_request(path, &options, snapshot.access_token.as_deref());

        tracing::debug!(
            method = %request.method,
            url = %request.url,
            authenticated = snapshot.access_token.is_some(),
            "Sending API request"
        );

        let response = self.transport.execute(request).await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        if !self.auth_manager.has_refresh_token().await {
            tracing::debug!(path = path, "Received 401 without refresh token");
            return Ok(response);
        }

        tracing::warn!(path = path, "Received 401, refreshing token and retrying...");

        if !self.auth_manager.refresh_after(snapshot.generation).await {
            tracing::warn!(path = path, "Token refresh failed, returning original response");
            return Ok(response);
        }

        let access_token = self.auth_manager.access_token().await;
        let retry = self.build_request(path, &options, access_token.as_deref());
        let response = self.transport.execute(retry).await?;

        tracing::debug!(status = %response.status(), path = path, "Retried request completed");

        Ok(response)
    }

    /// Refresh the access token; false when no refresh token is held or the
    /// refresh was rejected (both tokens are then cleared)
    pub async fn refresh(&self) -> bool {
        self.auth_manager.refresh().await
    }

    pub async fn set_tokens(&self, access_token: impl Into<String>, refresh_token: impl Into<String>) {
        self.auth_manager
            .set_tokens(access_token.into(), refresh_token.into())
            .await;
    }

    pub async fn clear_tokens(&self) {
        self.auth_manager.clear_tokens().await;
    }

    /// True while an access token is held (no expiry check)
    pub async fn is_authenticated(&self) -> bool {
        self.auth_manager.is_authenticated().await
    }

    fn build_request(
        &self,
        path: &str,
        options: &RequestOptions,
        access_token: Option<&str>,
    ) -> HttpRequest {
        HttpRequest {
            method: options.method.clone(),
            url: format!("{}{}", self.base_url, path),
            headers: build_headers(options, access_token),
            query: options.query.clone(),
            body: options.body.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MemoryTokenStore;
    use crate::transport::mock::{bearer, MockTransport};
    use proptest::prelude::*;
    use reqwest::header::ACCEPT;
    use serde_json::json;

    fn client_with(transport: Arc<MockTransport>) -> ApiClient {
        ApiClient::new(
            "http://localhost:5000/api/",
            transport,
            Arc::new(MemoryTokenStore::new()),
        )
        .unwrap()
    }

    #[test]
    fn test_default_headers() {
        let headers = build_headers(&RequestOptions::get(), None);
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "application/json");
        assert!(headers.get(AUTHORIZATION).is_none());
    }

    #[test]
    fn test_caller_headers_win_over_default() {
        let options = RequestOptions::post()
            .header(CONTENT_TYPE, HeaderValue::from_static("text/plain"))
            .header(
                HeaderName::from_static("x-client"),
                HeaderValue::from_static("cli"),
            );
        let headers = build_headers(&options, Some("A1"));
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "text/plain");
        assert_eq!(headers.get("x-client").unwrap(), "cli");
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer A1");
    }

    #[test]
    fn test_token_overrides_caller_authorization() {
        let options = RequestOptions::get()
            .header(AUTHORIZATION, HeaderValue::from_static("Bearer stale"));
        let headers = build_headers(&options, Some("fresh"));
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer fresh");
    }

    #[test]
    fn test_multipart_has_no_default_content_type() {
        let options = RequestOptions::post().multipart(MultipartForm::new().text("title", "x"));
        let headers = build_headers(&options, None);
        assert!(headers.get(CONTENT_TYPE).is_none());
    }

    #[test]
    fn test_multi_valued_caller_header_kept_intact() {
        let mut options = RequestOptions::get();
        options
            .headers
            .append(ACCEPT, HeaderValue::from_static("application/json"));
        options
            .headers
            .append(ACCEPT, HeaderValue::from_static("text/plain"));

        let headers = build_headers(&options, Some("A1"));
        let accept: Vec<&str> = headers
            .get_all(ACCEPT)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect();
        assert_eq!(accept, vec!["application/json", "text/plain"]);
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer A1");
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "application/json");
    }

    #[test]
    fn test_multi_valued_caller_header_replaces_default() {
        let mut options = RequestOptions::post();
        options
            .headers
            .append(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        options
            .headers
            .append(CONTENT_TYPE, HeaderValue::from_static("charset=utf-8"));

        let headers = build_headers(&options, None);
        assert_eq!(headers.get_all(CONTENT_TYPE).iter().count(), 2);
        assert!(headers
            .get_all(CONTENT_TYPE)
            .iter()
            .all(|v| v != "application/json"));
    }

    #[test]
    fn test_invalid_token_is_skipped() {
        let headers = build_headers(&RequestOptions::get(), Some("bad\ntoken"));
        assert!(headers.get(AUTHORIZATION).is_none());
    }

    proptest! {
        #[test]
        fn prop_bearer_matches_access_token(token in "[A-Za-z0-9._~+/=-]{1,128}") {
            let headers = build_headers(&RequestOptions::get(), Some(&token));
            let expected = format!("Bearer {}", token);
            prop_assert_eq!(
                headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()),
                Some(expected.as_str())
            );
        }

        #[test]
        fn prop_no_token_no_authorization(name in "x-[a-z]{1,12}", value in "[A-Za-z0-9]{0,32}") {
            let options = RequestOptions::get().header(
                HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(&value).unwrap(),
            );
            let headers = build_headers(&options, None);
            prop_assert!(headers.get(AUTHORIZATION).is_none());
            prop_assert_eq!(headers.get(name.as_str()).and_then(|v| v.to_str().ok()), Some(value.as_str()));
        }
    }

    #[tokio::test]
    async fn test_send_joins_base_url_and_query() {
        let transport = Arc::new(MockTransport::new(|_| {
            Ok(HttpResponse::from_json(StatusCode::OK, &json!({"papers": []})))
        }));
        let client = client_with(transport.clone());
        assert_eq!(client.base_url(), "http://localhost:5000/api");

        let response = client
            .send("/research", RequestOptions::get().query([("page", "2")]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url, "http://localhost:5000/api/research");
        assert_eq!(requests[0].method, Method::GET);
        assert_eq!(requests[0].query, vec![("page".to_string(), "2".to_string())]);
    }

    #[tokio::test]
    async fn test_non_401_errors_are_returned_untouched() {
        let transport = Arc::new(MockTransport::new(|_| {
            Ok(HttpResponse::from_json(
                StatusCode::FORBIDDEN,
                &json!({"error": "Insufficient permissions"}),
            ))
        }));
        let client = client_with(transport.clone());
        client.set_tokens("A1", "R1").await;

        let response = client.send("/research/pending", RequestOptions::get()).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(transport.requests().len(), 1);
        assert!(client.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_retry_that_fails_again_is_not_refreshed_twice() {
        let transport = Arc::new(MockTransport::new(|request| {
            if request.url.ends_with("/auth/refresh") {
                Ok(HttpResponse::from_json(StatusCode::OK, &json!({"access_token": "A2"})))
            } else {
                Ok(HttpResponse::from_json(
                    StatusCode::UNAUTHORIZED,
                    &json!({"msg": "Token has expired"}),
                ))
            }
        }));
        let client = client_with(transport.clone());
        client.set_tokens("A1", "R1").await;

        let response = client.send("/auth/me", RequestOptions::get()).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(transport.calls_to("/auth/me"), 2);
        assert_eq!(transport.calls_to("/auth/refresh"), 1);

        let requests = transport.requests();
        assert_eq!(bearer(&requests[0]).as_deref(), Some("Bearer A1"));
        assert_eq!(bearer(&requests[2]).as_deref(), Some("Bearer A2"));
    }

    #[tokio::test]
    async fn test_retry_reissues_identical_body() {
        let transport = Arc::new(MockTransport::new(|request| {
            if request.url.ends_with("/auth/refresh") {
                return Ok(HttpResponse::from_json(StatusCode::OK, &json!({"access_token": "A2"})));
            }
            match bearer(request).as_deref() {
                Some("Bearer A2") => Ok(HttpResponse::from_json(StatusCode::CREATED, &json!({"id": 7}))),
                _ => Ok(HttpResponse::from_json(StatusCode::UNAUTHORIZED, &json!({}))),
            }
        }));
        let client = client_with(transport.clone());
        client.set_tokens("A1", "R1").await;

        let response = client
            .send(
                "/forum/topics",
                RequestOptions::post().json(json!({"title": "Monza", "content": "Low downforce"})),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let topics: Vec<_> = transport
            .requests()
            .into_iter()
            .filter(|r| r.url.ends_with("/forum/topics"))
            .collect();
        assert_eq!(topics.len(), 2);
        for request in &topics {
            assert_eq!(request.method, Method::POST);
            match &request.body {
                Some(RequestBody::Json(body)) => assert_eq!(body["title"], "Monza"),
                other => panic!("unexpected body: {:?}", other),
            }
        }
    }
}
