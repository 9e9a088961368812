//! Backend client
//!
//! Combines a [`Context`] (endpoint, model, token) with a [`Transport`] and
//! resolves request forms into concrete URLs.

use super::transport::{HttpRequest, Method, Response, Transport};
use crate::error::Error;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use url::Url;

/// Message returned when the verify endpoint rejects the credentials
pub const INVALID_CREDENTIALS: &str = "Invalid or expired credentials. Please login again.";

/// Everything a client needs to address one backend model
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Context {
    /// Base URL, e.g. `https://api.example.com/v2`
    pub endpoint: String,
    /// Model path segment, e.g. `users`
    pub model: String,
    /// Bearer token; empty when the backend needs none
    pub token: String,
}

impl Context {
    pub fn new(endpoint: &str, model: &str, token: &str) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.trim_matches('/').to_string(),
            token: token.to_string(),
        }
    }
}

/// Request form, resolved against the client's context
///
/// Resolution order: `uri` as-is, else `endpoint/path`, else
/// `endpoint/model/id`.
#[derive(Debug, Clone, Default)]
pub struct Request {
    pub uri: Option<String>,
    pub id: String,
    pub path: Option<String>,
    pub query: BTreeMap<String, String>,
    pub body: Option<Value>,
}

impl Request {
    pub fn for_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_query(mut self, key: &str, value: &str) -> Self {
        self.query.insert(key.to_string(), value.to_string());
        self
    }
}

/// Client for one backend model
#[derive(Clone)]
pub struct Client {
    context: Context,
    transport: Arc<dyn Transport>,
}

impl Client {
    pub fn new(context: Context, transport: Arc<dyn Transport>) -> Self {
        Self { context, transport }
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Build API URL for a request form
    /// e.g. {https://example.com} / {v2/users} / {1} ? {arg1=val1} & {arg2=val2}
    pub fn endpoint_for(&self, request: &Request) -> Result<String, Error> {
        let base = match (&request.uri, &request.path) {
            (Some(uri), _) if !uri.is_empty() => uri.clone(),
            (_, Some(path)) if !path.is_empty() => self.endpoint_for_path(path),
            _ => self.endpoint_for_id(&request.id),
        };

        let mut url = Url::parse(&base)
            .map_err(|e| Error::Validation(format!("Invalid endpoint '{}': {}", base, e)))?;
        if !request.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &request.query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url.to_string())
    }

    fn endpoint_for_path(&self, path: &str) -> String {
        format!("{}/{}", self.context.endpoint, path.trim_start_matches('/'))
    }

    fn endpoint_for_id(&self, id: &str) -> String {
        format!("{}/{}/{}", self.context.endpoint, self.context.model, id)
    }

    async fn request(&self, method: Method, request: Request) -> Response {
        let url = match self.endpoint_for(&request) {
            Ok(url) => url,
            Err(e) => return Response::from_result("", Err(&e)),
        };

        self.transport
            .send(HttpRequest {
                method,
                url,
                body: request.body,
                token: self.context.token.clone(),
            })
            .await
    }

    /// GET request
    pub async fn get(&self, request: Request) -> Response {
        self.request(Method::Get, request).await
    }

    /// PUT request
    pub async fn put(&self, request: Request) -> Response {
        self.request(Method::Put, request).await
    }

    /// POST request
    pub async fn post(&self, request: Request) -> Response {
        self.request(Method::Post, request).await
    }

    /// DELETE request
    pub async fn delete(&self, request: Request) -> Response {
        self.request(Method::Delete, request).await
    }

    /// Verify endpoint and credentials against a user-listing endpoint
    ///
    /// Succeeds only if the endpoint returns at least one user with an email.
    pub async fn check_connection(&self, verify_uri: &str) -> Response {
        #[derive(Deserialize)]
        struct User {
            #[serde(default)]
            email: String,
        }

        let request = Request {
            uri: Some(verify_uri.to_string()),
            ..Request::default()
        };
        let response = self.get(request).await;
        if !response.success {
            tracing::warn!("Connection check failed: {}", response.message);
            return Response::failure(response.status_code, INVALID_CREDENTIALS);
        }

        match response.decode::<Vec<User>>() {
            Ok(Some(users)) if users.first().is_some_and(|u| !u.email.is_empty()) => {
                Response::ok(None)
            }
            _ => Response::failure(response.status_code, INVALID_CREDENTIALS),
        }
    }
}
