//! Transport contract
//!
//! The orchestrator only ever sees a [`Transport`]: one request in, one
//! [`Response`] out. Failures never escape as errors at this level; they are
//! folded into `Response { success: false, .. }` with a best-effort message.

use crate::common::{Outcome, ResultList};
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Message used for any non-OK HTTP status
pub const NON_OK_STATUS: &str = "Non-OK HTTP Status code";

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fully resolved request handed to a transport
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub body: Option<Value>,
    pub token: String,
}

/// Outcome of one request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Response {
    pub success: bool,
    pub message: String,
    pub status_code: u16,
    /// True when the request was never sent because of an earlier failure
    pub skipped: bool,
    #[serde(skip)]
    pub body: Option<Value>,
}

impl Response {
    /// 200 with an optional decoded body
    pub fn ok(body: Option<Value>) -> Self {
        Self {
            success: true,
            message: String::new(),
            status_code: 200,
            skipped: false,
            body,
        }
    }

    pub fn failure(status_code: u16, message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            status_code,
            skipped: false,
            body: None,
        }
    }

    /// Failure synthesized without issuing a request
    pub fn skipped(message: impl Into<String>) -> Self {
        Self {
            skipped: true,
            ..Self::failure(0, message)
        }
    }

    /// Response for a local error, or success when there is none
    ///
    /// A non-empty `message` takes precedence over the error text.
    pub fn from_result(message: &str, result: std::result::Result<(), &Error>) -> Self {
        match result {
            Ok(()) => Self {
                message: message.to_string(),
                ..Self::ok(None)
            },
            Err(e) => {
                let status_code = match e {
                    Error::Transport { status_code, .. } => *status_code,
                    _ => 0,
                };
                let text = if message.is_empty() {
                    e.to_string()
                } else {
                    message.to_string()
                };
                Self::failure(status_code, text)
            }
        }
    }

    /// Convert a failed response into [`Error::Transport`]
    pub fn into_result(self) -> Result<Option<Value>> {
        if self.success {
            Ok(self.body)
        } else {
            Err(Error::transport(self.status_code, self.message))
        }
    }

    /// Decode the body into a caller type; `None` when there was no body
    pub fn decode<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        match &self.body {
            None => Ok(None),
            Some(body) => serde_json::from_value(body.clone())
                .map(Some)
                .map_err(|e| Error::Parse(e.to_string())),
        }
    }
}

impl Outcome for Response {
    fn success(&self) -> bool {
        self.success
    }

    fn message(&self) -> &str {
        &self.message
    }

    fn failed_with(message: String) -> Self {
        Self::failure(0, message)
    }
}

/// Aggregated request outcomes
pub type ResponseList = ResultList<Response>;

/// A request/response channel to the backend
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Response;
}
