// HTTP client construction with an optional private CA

use crate::{Error, Result};
use std::path::Path;
use std::time::Duration;

/// Build a client for the control plane or token endpoint.
///
/// With `ca_cert` set, only that PEM bundle is trusted and the platform roots
/// are ignored. Without it the bundled web PKI roots apply.
pub fn build_client(ca_cert: Option<&Path>, timeout: Duration) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder().timeout(timeout);

    if let Some(path) = ca_cert {
        let pem = std::fs::read(path)?;
        let certificate =
            reqwest::Certificate::from_pem(&pem).map_err(|e| Error::Certificate {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        builder = builder
            .tls_built_in_root_certs(false)
            .add_root_certificate(certificate);
    }

    builder.build().map_err(|e| Error::Certificate {
        path: ca_cert
            .map(|p| p.display().to_string())
            .unwrap_or_default(),
        reason: e.to_string(),
    })
}
