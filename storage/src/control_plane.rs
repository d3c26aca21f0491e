// Lease value kept in a Cloud Controller environment variable group
//
// The group is a flat JSON object of strings that the API only lets us
// replace wholesale, so every write is read-modify-write with no
// precondition. Two replicas writing concurrently: last PUT wins.

use crate::{
    auth::{fetch_token, AccessToken, ClientCredentials},
    http::build_client,
    store::LeaseStore,
    Error, Result,
};
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// Default environment variable group.
pub const DEFAULT_GROUP: &str = "running";

type Group = Map<String, Value>;

#[derive(Debug, Clone)]
pub struct EnvGroupLeaseStore {
    client: reqwest::Client,
    group_url: Url,
    key: String,
    token: AccessToken,
}

impl EnvGroupLeaseStore {
    pub fn new(
        client: reqwest::Client,
        api: &Url,
        group: &str,
        key: impl Into<String>,
        token: AccessToken,
    ) -> Self {
        let mut group_url = api.clone();
        let base = api.path().trim_end_matches('/');
        group_url.set_path(&format!(
            "{base}/v2/config/environment_variable_groups/{group}"
        ));
        group_url.set_query(None);

        Self {
            client,
            group_url,
            key: key.into(),
            token,
        }
    }

    pub fn group_url(&self) -> &Url {
        &self.group_url
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    async fn read_group(&self) -> Result<Group> {
        debug!("GET {}", self.group_url);
        let response = self
            .client
            .get(self.group_url.clone())
            .bearer_auth(&self.token.access_token)
            .send()
            .await
            .map_err(|e| Error::request(&self.group_url, e))?;

        match response.status() {
            StatusCode::NOT_FOUND => return Ok(Group::new()),
            status if !status.is_success() => {
                return Err(Error::Status {
                    url: self.group_url.to_string(),
                    status,
                })
            }
            _ => {}
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::request(&self.group_url, e))?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Group::new());
        }
        Ok(serde_json::from_slice(&body)?)
    }

    async fn write_group(&self, group: &Group) -> Result<()> {
        debug!("PUT {} ({} entries)", self.group_url, group.len());
        let response = self
            .client
            .put(self.group_url.clone())
            .bearer_auth(&self.token.access_token)
            .json(group)
            .send()
            .await
            .map_err(|e| Error::request(&self.group_url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status {
                url: self.group_url.to_string(),
                status,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl LeaseStore for EnvGroupLeaseStore {
    async fn get(&self) -> Result<Option<String>> {
        let group = self.read_group().await?;
        Ok(group
            .get(&self.key)
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    async fn set(&self, value: &str) -> Result<()> {
        let mut group = self.read_group().await?;
        group.insert(self.key.clone(), Value::String(value.to_string()));
        self.write_group(&group).await
    }

    async fn clear(&self) -> Result<()> {
        let mut group = self.read_group().await?;
        if group.remove(&self.key).is_none() {
            return Ok(());
        }
        self.write_group(&group).await
    }
}

/// Everything needed to reach the control plane.
#[derive(Debug, Clone)]
pub struct ControlPlaneSettings {
    pub api: Url,
    pub api_ca_cert: Option<PathBuf>,
    pub token_url: Url,
    pub token_ca_cert: Option<PathBuf>,
    pub credentials: ClientCredentials,
    pub group: String,
    pub key: String,
    pub timeout: Duration,
}

/// Authenticate and build an [`EnvGroupLeaseStore`].
pub async fn connect(settings: &ControlPlaneSettings) -> Result<EnvGroupLeaseStore> {
    let token_client = build_client(settings.token_ca_cert.as_deref(), settings.timeout)?;
    let token = fetch_token(&token_client, &settings.token_url, &settings.credentials).await?;
    match token.lifetime() {
        Some(lifetime) => info!(
            "Authenticated against {} ({} token valid for {:?})",
            settings.token_url, token.token_type, lifetime
        ),
        None => info!(
            "Authenticated against {} ({} token)",
            settings.token_url, token.token_type
        ),
    }

    let api_client = build_client(settings.api_ca_cert.as_deref(), settings.timeout)?;
    Ok(EnvGroupLeaseStore::new(
        api_client,
        &settings.api,
        &settings.group,
        settings.key.clone(),
        token,
    ))
}

/// Connects on first use, so that an unreachable token endpoint surfaces as
/// an ordinary store error from whichever operation needed it.
#[derive(Debug)]
pub struct ConnectingLeaseStore {
    settings: ControlPlaneSettings,
    store: OnceCell<EnvGroupLeaseStore>,
}

impl ConnectingLeaseStore {
    pub fn new(settings: ControlPlaneSettings) -> Self {
        Self {
            settings,
            store: OnceCell::new(),
        }
    }

    async fn connected(&self) -> Result<&EnvGroupLeaseStore> {
        self.store.get_or_try_init(|| connect(&self.settings)).await
    }
}

#[async_trait]
impl LeaseStore for ConnectingLeaseStore {
    async fn get(&self) -> Result<Option<String>> {
        self.connected().await?.get().await
    }

    async fn set(&self, value: &str) -> Result<()> {
        self.connected().await?.set(value).await
    }

    async fn clear(&self) -> Result<()> {
        self.connected().await?.clear().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token() -> AccessToken {
        AccessToken {
            access_token: "t".to_string(),
            token_type: "bearer".to_string(),
            expires_in: None,
        }
    }

    #[test]
    fn test_group_url_keeps_api_prefix() {
        let api = Url::parse("https://api.example.com/cf/").unwrap();
        let store = EnvGroupLeaseStore::new(reqwest::Client::new(), &api, "running", "K", token());
        assert_eq!(
            store.group_url().as_str(),
            "https://api.example.com/cf/v2/config/environment_variable_groups/running"
        );

        let api = Url::parse("https://api.example.com?x=1").unwrap();
        let store = EnvGroupLeaseStore::new(reqwest::Client::new(), &api, "staging", "K", token());
        assert_eq!(
            store.group_url().as_str(),
            "https://api.example.com/v2/config/environment_variable_groups/staging"
        );
    }
}
