// HTTP settings for the REST client. The chat socket does its own TLS
// (webpki roots) and ignores these.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use reqwest::{Certificate, ClientBuilder};
use tracing::warn;

use crate::error::Error;

const USER_AGENT: &str = concat!("pairup/", env!("CARGO_PKG_VERSION"));

/// Ceiling on TCP + TLS setup, independent of the per-request timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// How server certificates are checked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsMode {
    /// Bundled web PKI roots.
    #[default]
    System,
    /// Bundled roots plus one extra CA from a PEM file.
    CustomCa(PathBuf),
    /// No verification at all.
    DangerAcceptInvalid,
}

impl TlsMode {
    fn apply(&self, builder: ClientBuilder) -> Result<ClientBuilder, Error> {
        Ok(match self {
            Self::System => builder,
            Self::CustomCa(path) => builder.add_root_certificate(read_ca(path)?),
            Self::DangerAcceptInvalid => {
                warn!("TLS certificate verification is disabled for REST calls");
                builder.danger_accept_invalid_certs(true)
            }
        })
    }
}

fn read_ca(path: &Path) -> Result<Certificate, Error> {
    let pem = fs::read(path).map_err(|e| {
        Error::Tls(format!("cannot read CA certificate {}: {e}", path.display()))
    })?;
    Certificate::from_pem(&pem).map_err(|e| {
        Error::Tls(format!("{} is not a PEM certificate: {e}", path.display()))
    })
}

#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tls: TlsMode,
    /// Whole-request timeout.
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tls: TlsMode::default(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl TransportConfig {
    pub(crate) fn http_client(&self) -> Result<reqwest::Client, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let builder = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(self.timeout)
            .connect_timeout(CONNECT_TIMEOUT.min(self.timeout));

        self.tls
            .apply(builder)?
            .build()
            .map_err(|e| Error::Tls(format!("cannot set up HTTP client: {e}")))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn every_mode_without_files_builds() {
        for tls in [TlsMode::System, TlsMode::DangerAcceptInvalid] {
            let config = TransportConfig {
                tls,
                ..TransportConfig::default()
            };
            assert!(config.http_client().is_ok());
        }
    }

    #[test]
    fn missing_ca_file_names_the_path() {
        let config = TransportConfig {
            tls: TlsMode::CustomCa(PathBuf::from("/nonexistent/pairup-ca.pem")),
            ..TransportConfig::default()
        };
        let err = config.http_client().unwrap_err();
        assert!(matches!(&err, Error::Tls(msg) if msg.contains("/nonexistent/pairup-ca.pem")));
    }
}
