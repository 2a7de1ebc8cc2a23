//! HTTP transport for Leshan REST calls

use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::Value;
use std::time::Duration;

/// Timeout applied when the caller does not pass one
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(4);

/// Maximum length of response body to log
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Truncate a response body for logging and drop control characters
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let mut end = MAX_LOG_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated, {} bytes total]", &body[..end], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| c.is_control(), "")
}

/// Successful response of a single request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub url: String,
    pub status: u16,
    pub body: String,
}

impl Response {
    /// Parse the body as JSON; an empty body is `null`
    pub fn json(&self) -> Result<Value> {
        if self.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&self.body).map_err(|source| Error::Decode {
            url: self.url.clone(),
            source,
        })
    }
}

/// Executes one HTTP request. Non-success statuses are returned as
/// [`Error::Status`], expired timeouts as [`Error::Timeout`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn request(
        &self,
        method: Method,
        url: &str,
        timeout: Duration,
        body: Option<&Value>,
    ) -> Result<Response>;
}

/// reqwest-backed transport
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a new HTTP transport
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("leshan-rest/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| Error::Request {
                url: String::new(),
                source,
            })?;

        Ok(Self { client })
    }
}

fn request_error(url: &str, timeout: Duration, source: reqwest::Error) -> Error {
    if source.is_timeout() {
        Error::Timeout {
            url: url.to_string(),
            timeout,
        }
    } else {
        Error::Request {
            url: url.to_string(),
            source,
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(
        &self,
        method: Method,
        url: &str,
        timeout: Duration,
        body: Option<&Value>,
    ) -> Result<Response> {
        tracing::debug!("{} {}", method, url);

        let mut request = self.client.request(method, url).timeout(timeout);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| request_error(url, timeout, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| request_error(url, timeout, e))?;

        if !status.is_success() {
            tracing::error!("Leshan error: {} - {}", status, sanitize_for_log(&body));
            return Err(Error::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(Response {
            url: url.to_string(),
            status: status.as_u16(),
            body,
        })
    }
}
