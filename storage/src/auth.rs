// OAuth2 client-credentials grant against the platform's token endpoint

use crate::{Error, Result};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Scope needed to edit environment variable groups.
pub const DEFAULT_SCOPE: &str = "cloud_controller.admin";

#[derive(Debug, Clone)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub scopes: Vec<String>,
}

impl ClientCredentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            scopes: vec![DEFAULT_SCOPE.to_string()],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    #[serde(default = "bearer")]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

fn bearer() -> String {
    "bearer".to_string()
}

impl AccessToken {
    /// Value for the `Authorization` header. Token endpoints commonly answer
    /// with a lowercase `bearer` type.
    pub fn header_value(&self) -> String {
        if self.token_type.eq_ignore_ascii_case("bearer") {
            format!("Bearer {}", self.access_token)
        } else {
            format!("{} {}", self.token_type, self.access_token)
        }
    }

    pub fn lifetime(&self) -> Option<Duration> {
        self.expires_in.map(Duration::from_secs)
    }
}

/// Exchange client credentials for an access token.
pub async fn fetch_token(
    client: &reqwest::Client,
    token_url: &reqwest::Url,
    credentials: &ClientCredentials,
) -> Result<AccessToken> {
    let scope = credentials.scopes.join(" ");
    let mut form = vec![("grant_type", "client_credentials")];
    if !scope.is_empty() {
        form.push(("scope", scope.as_str()));
    }

    debug!("Requesting token from {}", token_url);
    let response = client
        .post(token_url.clone())
        .basic_auth(&credentials.client_id, Some(&credentials.client_secret))
        .form(&form)
        .send()
        .await
        .map_err(|e| Error::request(token_url, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(Error::Token(format!(
            "{token_url} answered {status}"
        )));
    }

    let token: AccessToken = response
        .json()
        .await
        .map_err(|e| Error::Token(format!("unreadable token response: {e}")))?;
    if token.access_token.is_empty() {
        return Err(Error::Token("empty access token".to_string()));
    }
    Ok(token)
}
