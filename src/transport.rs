// Transport boundary
// Requests and responses are plain owned values so a request can be reissued
// verbatim after a token refresh.

use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;

/// Failure to obtain any response from the server
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Request(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout(e.to_string())
        } else if e.is_connect() {
            TransportError::Connect(e.to_string())
        } else {
            TransportError::Request(e.to_string())
        }
    }
}

/// Request body
#[derive(Debug, Clone)]
pub enum RequestBody {
    /// Raw text, sent as-is
    Text(String),
    /// JSON document, serialized at send time
    Json(serde_json::Value),
    /// multipart/form-data; the transport sets the content type and boundary
    Multipart(MultipartForm),
}

/// A single multipart field
#[derive(Debug, Clone, PartialEq)]
pub enum FormPart {
    Text(String),
    File {
        file_name: String,
        mime: Option<String>,
        data: Bytes,
    },
}

/// Cloneable multipart form (reqwest's `Form` is consumed on send)
#[derive(Debug, Clone, Default)]
pub struct MultipartForm {
    parts: Vec<(String, FormPart)>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a text field
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push((name.into(), FormPart::Text(value.into())));
        self
    }

    /// Add a binary file field
    pub fn file(
        mut self,
        name: impl Into<String>,
        file_name: impl Into<String>,
        mime: Option<&str>,
        data: impl Into<Bytes>,
    ) -> Self {
        self.parts.push((
            name.into(),
            FormPart::File {
                file_name: file_name.into(),
                mime: mime.map(str::to_string),
                data: data.into(),
            },
        ));
        self
    }

    pub fn parts(&self) -> &[(String, FormPart)] {
        &self.parts
    }

    /// Look up the first field with the given name
    pub fn get(&self, name: &str) -> Option<&FormPart> {
        self.parts
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, part)| part)
    }

    fn to_reqwest(&self) -> Result<Form, TransportError> {
        let mut form = Form::new();
        for (name, part) in &self.parts {
            form = match part {
                FormPart::Text(value) => form.text(name.clone(), value.clone()),
                FormPart::File {
                    file_name,
                    mime,
                    data,
                } => {
                    let mut file = Part::bytes(data.to_vec()).file_name(file_name.clone());
                    if let Some(mime) = mime {
                        file = file.mime_str(mime)?;
                    }
                    form.part(name.clone(), file)
                }
            };
        }
        Ok(form)
    }
}

/// Fully resolved outgoing request
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub query: Vec<(String, String)>,
    pub body: Option<RequestBody>,
}

/// Buffered response
#[derive(Debug, Clone)]
pub struct HttpResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl HttpResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Response with a JSON body, mostly useful for test transports
    pub fn from_json(status: StatusCode, body: &serde_json::Value) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            reqwest::header::CONTENT_TYPE,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        Self::new(status, headers, Bytes::from(body.to_string()))
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Body as text (lossy for invalid UTF-8)
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.body)
    }
}

/// Anything that can carry an HTTP request to the API
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Production transport backed by a pooled reqwest client
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Create a transport with connection pooling and timeouts (seconds)
    pub fn new(max_connections: usize, connect_timeout: u64, request_timeout: u64) -> Result<Self> {
        let client = Client::builder()
            .pool_max_idle_per_host(max_connections)
            .connect_timeout(Duration::from_secs(connect_timeout))
            .timeout(Duration::from_secs(request_timeout))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    /// Wrap an already configured client
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let HttpRequest {
            method,
            url,
            headers,
            query,
            body,
        } = request;

        tracing::debug!(method = %method, url = %url, "Sending HTTP request");

        let mut builder = self.client.request(method.clone(), &url).headers(headers);
        if !query.is_empty() {
            builder = builder.query(&query);
        }
        builder = match body {
            None => builder,
            Some(RequestBody::Text(text)) => builder.body(text),
            Some(RequestBody::Json(value)) => builder.body(value.to_string()),
            Some(RequestBody::Multipart(form)) => builder.multipart(form.to_reqwest()?),
        };

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                let error_kind = if e.is_timeout() {
                    "timeout"
                } else if e.is_connect() {
                    "connection_failed"
                } else if e.is_request() {
                    "request_error"
                } else {
                    "unknown"
                };
                tracing::error!(
                    error_kind = error_kind,
                    error = %e,
                    method = %method,
                    url = %url,
                    "HTTP request failed"
                );
                return Err(e.into());
            }
        };

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        tracing::debug!(status = %status, url = %url, "Received HTTP response");

        Ok(HttpResponse::new(status, headers, body))
    }
}

#[cfg(test)]
pub(crate) mod mock {
    //! Scripted transport for unit tests

    use super::*;
    use std::sync::Mutex;

    type Handler = Box<dyn Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync>;

    pub struct MockTransport {
        handler: Handler,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl MockTransport {
        pub fn new<F>(handler: F) -> Self
        where
            F: Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync + 'static,
        {
            Self {
                handler: Box::new(handler),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn requests(&self) -> Vec<HttpRequest> {
            self.requests.lock().unwrap().clone()
        }

        pub fn calls_to(&self, suffix: &str) -> usize {
            self.requests()
                .iter()
                .filter(|r| r.url.ends_with(suffix))
                .count()
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            let result = (self.handler)(&request);
            self.requests.lock().unwrap().push(request);
            // Let concurrently polled requests interleave
            tokio::task::yield_now().await;
            result
        }
    }

    pub fn bearer(request: &HttpRequest) -> Option<String> {
        request
            .headers
            .get(reqwest::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_helpers() {
        let response = HttpResponse::from_json(
            StatusCode::OK,
            &serde_json::json!({"items": [], "total": 0}),
        );
        assert!(response.is_success());
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/json"
        );
        let body: serde_json::Value = response.json().unwrap();
        assert_eq!(body["total"], 0);
        assert!(response.text().contains("\"items\":[]"));
    }

    #[test]
    fn test_unauthorized_is_not_success() {
        let response = HttpResponse::new(StatusCode::UNAUTHORIZED, HeaderMap::new(), Bytes::new());
        assert!(!response.is_success());
        assert!(response.json::<serde_json::Value>().is_err());
    }

    #[test]
    fn test_multipart_form_builder() {
        let form = MultipartForm::new()
            .text("title", "Tyre degradation at Monza")
            .text("category", "strategy")
            .file(
                "file",
                "paper.pdf",
                Some("application/pdf"),
                Bytes::from_static(b"%PDF-1.4"),
            );

        assert_eq!(form.parts().len(), 3);
        assert_eq!(
            form.get("title"),
            Some(&FormPart::Text("Tyre degradation at Monza".to_string()))
        );
        match form.get("file") {
            Some(FormPart::File {
                file_name, mime, ..
            }) => {
                assert_eq!(file_name, "paper.pdf");
                assert_eq!(mime.as_deref(), Some("application/pdf"));
            }
            other => panic!("unexpected part: {:?}", other),
        }
        assert!(form.get("abstract").is_none());
        assert!(form.to_reqwest().is_ok());
    }

    #[test]
    fn test_multipart_rejects_bad_mime() {
        let form = MultipartForm::new().file("file", "x.bin", Some("not a mime"), vec![1u8, 2, 3]);
        assert!(form.to_reqwest().is_err());
    }
}
