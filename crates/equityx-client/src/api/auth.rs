//! Login client
//!
//! Exchanges an email and password for a bearer token. Token issuance and
//! verification stay on the server; this only carries the result into a
//! [`TokenSession`](crate::session::TokenSession).

use super::http_client;
use crate::config::ClientConfig;
use crate::error::{ReportError, Result};
use crate::session::TokenSession;
use reqwest::Client;
use tracing::info;
use url::Url;

const TOKEN_FIELDS: [&str; 3] = ["token", "access_token", "id_token"];

/// Pull a token out of a login response body.
///
/// Accepts a bare JSON string or an object carrying one of [`TOKEN_FIELDS`].
pub fn extract_token(body: &str) -> Result<String> {
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| ReportError::Parse(format!("invalid login response: {e}")))?;

    let token = match &value {
        serde_json::Value::String(token) => Some(token.as_str()),
        serde_json::Value::Object(map) => TOKEN_FIELDS
            .iter()
            .find_map(|field| map.get(*field).and_then(serde_json::Value::as_str)),
        _ => None,
    };

    token
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ReportError::Parse("login response carries no token".to_string()))
}

/// `reqwest` login client
#[derive(Debug, Clone)]
pub struct AuthClient {
    client: Client,
    endpoint: Url,
}

impl AuthClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(config.request_timeout)?,
            endpoint: config.login_url()?,
        })
    }

    /// Request a token for the given credentials
    pub async fn login(&self, email: &str, password: &str) -> Result<String> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(ReportError::Validation(
                "email and password are required".to_string(),
            ));
        }

        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&[("email", email), ("password", password)])
            .send()
            .await
            // the URL carries the password
            .map_err(|e| ReportError::network("login request failed", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReportError::Network(format!("login failed: HTTP {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ReportError::network("login response unreadable", e))?;

        extract_token(&body)
    }

    /// Log in and store the token in `session`
    pub async fn sign_in(&self, session: &TokenSession, email: &str, password: &str) -> Result<()> {
        let token = self.login(email, password).await?;
        session.sign_in(token);
        info!("Signed in as {email}");
        Ok(())
    }
}
