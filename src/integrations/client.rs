//! Provider HTTP client
//!
//! Thin wrapper around reqwest that attaches basic-auth credentials, applies
//! a per-request timeout and hands back a uniform `{status, body}` response.
//! Everything above this layer deals in [`ProviderResponse`] and
//! [`TransportError`] only.

use crate::error::TransportError;
use crate::model::Credential;
use crate::{Result, ScrumboardError};
use async_trait::async_trait;
use reqwest::{header, Client};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Per-request timeout for search/query operations (large result sets)
pub const SEARCH_TIMEOUT: Duration = Duration::from_secs(30);
/// Per-request timeout for identity and inventory fetches
pub const GET_TIMEOUT: Duration = Duration::from_secs(10);
/// Per-request timeout for label updates
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
}

/// An outbound provider call
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderRequest {
    pub method: Method,
    pub url: String,
    pub body: Option<Value>,
    pub timeout: Duration,
}

impl ProviderRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            body: None,
            timeout: GET_TIMEOUT,
        }
    }

    pub fn post(url: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            body: Some(body),
            timeout: WRITE_TIMEOUT,
        }
    }

    pub fn put(url: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Put,
            url: url.into(),
            body: Some(body),
            timeout: WRITE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Uniform provider answer. An empty body is represented as `Value::Null`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderResponse {
    pub status: u16,
    pub body: Value,
}

impl ProviderResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn has_body(&self) -> bool {
        match &self.body {
            Value::Null => false,
            Value::Object(map) => !map.is_empty(),
            Value::Array(items) => !items.is_empty(),
            Value::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    /// Decode a successful response, turning other statuses into
    /// [`ScrumboardError::Provider`]
    pub fn json<T: DeserializeOwned>(self) -> Result<T> {
        if !self.is_success() {
            return Err(self.into_error());
        }
        serde_json::from_value(self.body)
            .map_err(|e| ScrumboardError::Parse(format!("unexpected provider payload: {}", e)))
    }

    /// Provider error carrying the most useful message found in the body
    pub fn into_error(self) -> ScrumboardError {
        ScrumboardError::Provider {
            status: self.status,
            message: error_message(&self.body),
        }
    }
}

/// Pull a readable message out of Jira (`errorMessages`) or GitHub (`message`)
/// error bodies
fn error_message(body: &Value) -> String {
    if let Some(messages) = body.get("errorMessages").and_then(Value::as_array) {
        let joined = messages
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join("; ");
        if !joined.is_empty() {
            return joined;
        }
    }
    if let Some(message) = body.get("message").and_then(Value::as_str) {
        return message.to_string();
    }
    match body {
        Value::Null => "empty response".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Executes provider calls on behalf of an authenticated user
#[async_trait]
pub trait ProviderClient: Send + Sync {
    async fn execute(
        &self,
        credential: &Credential,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, TransportError>;
}

/// reqwest-backed [`ProviderClient`]
#[derive(Debug, Clone)]
pub struct HttpProviderClient {
    client: Client,
}

impl HttpProviderClient {
    /// Create a new HTTP client
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(SEARCH_TIMEOUT)
            .default_headers({
                let mut headers = header::HeaderMap::new();
                headers.insert(
                    header::USER_AGENT,
                    header::HeaderValue::from_static(concat!(
                        "scrumboard/",
                        env!("CARGO_PKG_VERSION")
                    )),
                );
                headers.insert(
                    header::ACCEPT,
                    header::HeaderValue::from_static("application/json"),
                );
                headers
            })
            .build()?; // reqwest::Error converts to ScrumboardError::Http via #[from]

        Ok(Self { client })
    }
}

#[async_trait]
impl ProviderClient for HttpProviderClient {
    async fn execute(
        &self,
        credential: &Credential,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, TransportError> {
        debug!(
            method = ?request.method,
            url = %request.url,
            user = %credential.username(),
            "Provider request"
        );

        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
            Method::Put => self.client.put(&request.url),
        };
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        let response = builder
            .basic_auth(credential.username(), Some(credential.password()))
            .timeout(request.timeout)
            .send()
            .await?;

        let status = response.status().as_u16();
        let text = response.text().await?;
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            // Error pages are not always JSON; keep them as plain text
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };

        debug!(status, "Provider response");
        Ok(ProviderResponse { status, body })
    }
}
