//! Authentication
//!
//! OAuth password-grant login and the on-disk credential store
//! (`~/.hastily.json`).

use crate::error::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use reqwest::header::ACCEPT;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CREDENTIALS_FILE: &str = ".hastily.json";

/// Message for a credential set without an access token
pub const INVALID_LOGIN: &str =
    "Invalid login credentials. Please provide valid authentication data.";

/// Token endpoint response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: String,
    #[serde(default)]
    refresh_token: String,
    #[serde(default)]
    id_token: String,
    #[serde(default)]
    token_type: String,
    #[serde(default)]
    expires_in: i64,
}

/// Stored OAuth credentials
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub id_token: String,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub endpoint: String,
    /// Where the credentials were last saved; empty if never saved
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Default credential file location
pub fn credentials_path() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(CREDENTIALS_FILE))
        .ok_or_else(|| Error::Validation("Could not determine home directory".into()))
}

impl Credentials {
    /// Reject credentials without an access token
    pub fn validate(&self) -> Result<()> {
        if self.access_token.is_empty() {
            return Err(Error::Validation(INVALID_LOGIN.into()));
        }
        Ok(())
    }

    /// Whether the access token is past its expiry
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| at <= Utc::now())
    }

    /// Load and validate the saved credentials
    pub fn load() -> Result<Self> {
        Self::load_from(&credentials_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        let credentials: Self =
            serde_json::from_slice(&data).map_err(|e| Error::Parse(e.to_string()))?;
        credentials.validate()?;
        tracing::debug!("Loaded credentials for {} from {:?}", credentials.username, path);
        Ok(credentials)
    }

    /// Save to the default location and record the path
    pub fn save(&mut self) -> Result<()> {
        let path = credentials_path()?;
        self.save_to(&path)
    }

    /// Save to `path`; the recorded path is cleared if the write fails
    pub fn save_to(&mut self, path: &Path) -> Result<()> {
        self.path = path.to_string_lossy().into_owned();
        let write = serde_json::to_vec_pretty(self)
            .map_err(|e| Error::Parse(e.to_string()))
            .and_then(|data| std::fs::write(path, data).map_err(Error::from));

        if let Err(e) = write {
            self.path.clear();
            return Err(e);
        }
        tracing::info!("Saved credentials to {:?}", path);
        Ok(())
    }

    /// Obtain a token with the OAuth password grant
    pub async fn login(endpoint: &str, username: &str, password: &str) -> Result<Self> {
        let client = reqwest::Client::new();
        Self::login_with(&client, endpoint, username, password).await
    }

    pub async fn login_with(
        client: &reqwest::Client,
        endpoint: &str,
        username: &str,
        password: &str,
    ) -> Result<Self> {
        tracing::info!("Requesting token for {} from {}", username, endpoint);
        let response = client
            .post(endpoint)
            .header(ACCEPT, "application/json")
            .form(&[
                ("grant_type", "password"),
                ("username", username),
                ("password", password),
            ])
            .send()
            .await
            .map_err(|e| Error::transport(0, format!("Failed to send login request: {}", e)))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::transport(status.as_u16(), e.to_string()))?;
        let token: TokenResponse = serde_json::from_slice(&body).map_err(|e| {
            tracing::warn!("Undecodable token response (HTTP {})", status);
            Error::Parse(e.to_string())
        })?;

        let credentials = Self {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            id_token: token.id_token,
            token_type: token.token_type,
            endpoint: endpoint.to_string(),
            path: String::new(),
            username: username.to_string(),
            expires_at: (token.expires_in > 0)
                .then(|| Utc::now() + Duration::seconds(token.expires_in)),
        };
        credentials.validate()?;
        Ok(credentials)
    }
}
