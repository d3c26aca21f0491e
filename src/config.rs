// Environment-driven configuration

use crate::lease::{validate_identity, ClaimParams, ParamsError};
use crate::util;
use lease_storage::{auth::ClientCredentials, ControlPlaneSettings, Url};
use std::fmt::Write as _;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_LEASE_KEY: &str = "READINESS_LEASE";
pub const DEFAULT_LOG_FILE: &str = "/tmp/lease-probe.log";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// An environment variable the probe reads.
#[derive(Debug, Clone, Copy)]
pub struct EnvVar {
    pub name: &'static str,
    pub help: &'static str,
    pub required: bool,
}

const fn required(name: &'static str, help: &'static str) -> EnvVar {
    EnvVar { name, help, required: true }
}

const fn optional(name: &'static str, help: &'static str) -> EnvVar {
    EnvVar { name, help, required: false }
}

pub const ENV_VARS: &[EnvVar] = &[
    required("CC_URL", "Cloud controller API URL"),
    optional("CC_CA_CERT", "Path to cloud controller CA certificate file"),
    required("UAA_TOKEN_URL", "UAA token endpoint URL"),
    optional("UAA_CA_CERT", "Path to UAA CA certificate file"),
    required("OAUTH_CLIENT", "UAA OAuth client ID"),
    required("OAUTH_SECRET", "UAA OAuth client secret"),
    required("HEALTH_PORT", "Local port that must accept connections"),
    optional("HEALTH_HOST", "Local address to probe (default 127.0.0.1)"),
    optional("POD_NAME", "Lease identity (default: host name)"),
    optional("LEASE_KEY", "Environment variable group key holding the lease"),
    optional("LEASE_GROUP", "Environment variable group (default running)"),
    optional("LEASE_DURATION", "Lease duration in seconds (default 30)"),
    optional("GRACE_DELAY", "Takeover confirmation delay in seconds (default 2)"),
    optional("REQUEST_TIMEOUT", "HTTP request timeout in seconds (default 10)"),
    optional("PROBE_LOG", "Log file, truncated on every run"),
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variables: {}", .0.join(", "))]
    Missing(Vec<&'static str>),

    #[error("invalid value {value:?} for {name}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("invalid lease timing: {0}")]
    Params(#[from] ParamsError),

    #[error("no POD_NAME given and the host name is unavailable")]
    Identity,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub cc_url: Url,
    pub cc_ca_cert: Option<PathBuf>,
    pub uaa_token_url: Url,
    pub uaa_ca_cert: Option<PathBuf>,
    pub oauth_client: String,
    pub oauth_secret: String,
    pub health_addr: SocketAddr,
    pub identity: String,
    pub lease_key: String,
    pub lease_group: String,
    pub claim: ClaimParams,
    pub request_timeout: Duration,
    pub log_file: PathBuf,
}

/// Reads variables through `lookup`, treating blank values as unset.
struct Env<F> {
    lookup: F,
    missing: Vec<&'static str>,
}

impl<F: Fn(&str) -> Option<String>> Env<F> {
    fn optional(&self, name: &'static str) -> Option<String> {
        (self.lookup)(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn required(&mut self, name: &'static str) -> String {
        self.optional(name).unwrap_or_else(|| {
            self.missing.push(name);
            String::new()
        })
    }
}

fn invalid(name: &'static str, value: &str, reason: impl ToString) -> ConfigError {
    ConfigError::Invalid {
        name,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_url(name: &'static str, value: &str) -> Result<Url, ConfigError> {
    Url::parse(value).map_err(|e| invalid(name, value, e))
}

fn parse_seconds(name: &'static str, value: Option<String>, default: Duration) -> Result<Duration, ConfigError> {
    match value {
        None => Ok(default),
        Some(v) => v
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| invalid(name, &v, e)),
    }
}

impl Config {
    /// Load configuration, e.g. `Config::load(|name| std::env::var(name).ok())`.
    ///
    /// All missing required variables are reported together, sorted.
    pub fn load(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut env = Env {
            lookup,
            missing: Vec::new(),
        };

        let cc_url = env.required("CC_URL");
        let uaa_token_url = env.required("UAA_TOKEN_URL");
        let oauth_client = env.required("OAUTH_CLIENT");
        let oauth_secret = env.required("OAUTH_SECRET");
        let health_port = env.required("HEALTH_PORT");

        if !env.missing.is_empty() {
            let mut missing = std::mem::take(&mut env.missing);
            missing.sort_unstable();
            return Err(ConfigError::Missing(missing));
        }

        let port = health_port
            .parse::<u16>()
            .map_err(|e| invalid("HEALTH_PORT", &health_port, e))?;
        let host = match env.optional("HEALTH_HOST") {
            Some(h) => h.parse::<IpAddr>().map_err(|e| invalid("HEALTH_HOST", &h, e))?,
            None => IpAddr::V4(Ipv4Addr::LOCALHOST),
        };

        let identity = match env.optional("POD_NAME") {
            Some(name) => name,
            None => util::hostname().ok_or(ConfigError::Identity)?,
        };
        validate_identity(&identity).map_err(|e| invalid("POD_NAME", &identity, e))?;

        let claim = ClaimParams {
            lease_duration: parse_seconds(
                "LEASE_DURATION",
                env.optional("LEASE_DURATION"),
                ClaimParams::default().lease_duration,
            )?,
            grace_delay: parse_seconds(
                "GRACE_DELAY",
                env.optional("GRACE_DELAY"),
                ClaimParams::default().grace_delay,
            )?,
        };
        claim.validate()?;

        Ok(Self {
            cc_url: parse_url("CC_URL", &cc_url)?,
            cc_ca_cert: env.optional("CC_CA_CERT").map(PathBuf::from),
            uaa_token_url: parse_url("UAA_TOKEN_URL", &uaa_token_url)?,
            uaa_ca_cert: env.optional("UAA_CA_CERT").map(PathBuf::from),
            oauth_client,
            oauth_secret,
            health_addr: SocketAddr::new(host, port),
            identity,
            lease_key: env
                .optional("LEASE_KEY")
                .unwrap_or_else(|| DEFAULT_LEASE_KEY.to_string()),
            lease_group: env
                .optional("LEASE_GROUP")
                .unwrap_or_else(|| lease_storage::control_plane::DEFAULT_GROUP.to_string()),
            claim,
            request_timeout: parse_seconds(
                "REQUEST_TIMEOUT",
                env.optional("REQUEST_TIMEOUT"),
                DEFAULT_REQUEST_TIMEOUT,
            )?,
            log_file: Self::log_file(&env.lookup),
        })
    }

    pub fn control_plane(&self) -> ControlPlaneSettings {
        ControlPlaneSettings {
            api: self.cc_url.clone(),
            api_ca_cert: self.cc_ca_cert.clone(),
            token_url: self.uaa_token_url.clone(),
            token_ca_cert: self.uaa_ca_cert.clone(),
            credentials: ClientCredentials::new(&self.oauth_client, &self.oauth_secret),
            group: self.lease_group.clone(),
            key: self.lease_key.clone(),
            timeout: self.request_timeout,
        }
    }

    /// Log sink location; resolvable even when the rest of the config is not.
    pub fn log_file(lookup: impl Fn(&str) -> Option<String>) -> PathBuf {
        lookup("PROBE_LOG")
            .filter(|v| !v.trim().is_empty())
            .map_or_else(|| PathBuf::from(DEFAULT_LOG_FILE), PathBuf::from)
    }
}

/// Aligned listing of every variable, for `lease-probe env`.
pub fn help_text() -> String {
    let width = ENV_VARS.iter().map(|v| v.name.len()).max().unwrap_or(0);
    let mut out = String::from("Environment variables:\n");
    for var in ENV_VARS {
        let marker = if var.required { "*" } else { " " };
        let _ = writeln!(out, "  {marker} {:<width$}    {}", var.name, var.help);
    }
    out.push_str("\n  * required\n");
    out
}
