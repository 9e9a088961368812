//! HTTP transport for REST backends

use super::transport::{HttpRequest, Method, Response, Transport, NON_OK_STATUS};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde_json::Value;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Sanitize response body for logging
/// Truncates long responses and strips control characters
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.chars().count() > MAX_LOG_BODY_LENGTH {
        let head: String = body.chars().take(MAX_LOG_BODY_LENGTH).collect();
        format!("{}... [truncated, {} bytes total]", head, body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// reqwest-backed [`Transport`]
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a new HTTP transport
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("hastily/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    fn method(method: Method) -> reqwest::Method {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: HttpRequest) -> Response {
        tracing::debug!("{} {}", request.method, request.url);

        let mut builder = self
            .client
            .request(Self::method(request.method), &request.url)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, format!("bearer {}", request.token));

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Request to {} failed: {}", request.url, e);
                return Response::failure(0, format!("Failed to send request: {}", e));
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Response::failure(
                    status.as_u16(),
                    format!("Failed to read response body: {}", e),
                )
            }
        };

        if status != StatusCode::OK {
            // Security: Only log sanitized/truncated error body to avoid leaking sensitive data
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&body));
            return Response::failure(status.as_u16(), NON_OK_STATUS);
        }

        // Handle empty response
        if body.trim().is_empty() {
            return Response::ok(None);
        }

        // Non-JSON bodies are kept as text; decoding into a typed value reports the mismatch
        let value = serde_json::from_str(&body).unwrap_or_else(|e| {
            tracing::debug!("Response body is not JSON ({}): {}", e, sanitize_for_log(&body));
            Value::String(body)
        });
        Response::ok(Some(value))
    }
}

/// Hint for a failed status code, for display alongside the raw message
pub fn status_hint(status_code: u16) -> Option<&'static str> {
    match status_code {
        0 => Some("Request did not reach the server. Check your network connection."),
        400 => Some("Invalid request. Check your parameters."),
        401 => Some("Authentication failed. Run 'hastily login'."),
        403 => Some("Permission denied."),
        404 => Some("Resource not found."),
        409 => Some("Resource conflict. The resource may already exist or be in use."),
        429 => Some("Rate limit exceeded. Please try again later."),
        500 | 502 | 503 => Some("Service temporarily unavailable. Please try again."),
        _ => None,
    }
}
