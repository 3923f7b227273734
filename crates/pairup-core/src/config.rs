// ── Runtime client configuration ──
//
// Describes where the service lives and how to talk to it. Never touches
// disk: the CLI builds a `ClientConfig` and hands it in.

use std::path::PathBuf;
use std::time::Duration;

use pairup_api::realtime::{RealtimeConfig, ReconnectPolicy};
use pairup_api::transport::{TlsMode, TransportConfig};
use url::Url;

use crate::error::CoreError;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// TLS verification strategy for REST calls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (self-signed development servers).
    DangerAcceptInvalid,
}

impl From<&TlsVerification> for TlsMode {
    fn from(tls: &TlsVerification) -> Self {
        match tls {
            TlsVerification::SystemDefaults => Self::System,
            TlsVerification::CustomCa(path) => Self::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => Self::DangerAcceptInvalid,
        }
    }
}

/// Connection settings for one service deployment.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// REST origin, e.g. `http://localhost:8000`.
    pub api_url: Url,
    /// WebSocket origin. Derived from `api_url` when unset.
    pub ws_url: Option<Url>,
    pub tls: TlsVerification,
    /// REST request timeout.
    pub timeout: Duration,
    pub reconnect: ReconnectPolicy,
}

impl ClientConfig {
    /// Defaults everything but the REST origin: derived WebSocket origin,
    /// strict TLS, 30s timeout, default reconnect policy.
    pub fn new(api_url: Url) -> Self {
        Self {
            api_url,
            ws_url: None,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            reconnect: ReconnectPolicy::default(),
        }
    }

    /// The configured WebSocket origin, or one derived from the API URL.
    pub fn ws_origin(&self) -> Result<Url, CoreError> {
        match &self.ws_url {
            Some(url) => Ok(url.clone()),
            None => derive_ws_origin(&self.api_url),
        }
    }

    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: TlsMode::from(&self.tls),
            timeout: self.timeout,
        }
    }

    pub fn realtime(&self) -> Result<RealtimeConfig, CoreError> {
        Ok(RealtimeConfig::new(self.ws_origin()?).with_reconnect(self.reconnect))
    }
}

/// `http → ws`, `https → wss`. Path prefix is kept; query and fragment are
/// dropped.
fn derive_ws_origin(api_url: &Url) -> Result<Url, CoreError> {
    let scheme = match api_url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(CoreError::Config {
                message: format!("cannot derive a WebSocket URL from scheme {other:?}"),
            });
        }
    };

    let mut url = api_url.clone();
    url.set_scheme(scheme).map_err(|()| CoreError::Config {
        message: format!("cannot use {api_url} as a WebSocket origin"),
    })?;
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config(api: &str) -> ClientConfig {
        ClientConfig::new(Url::parse(api).unwrap())
    }

    #[test]
    fn new_fills_in_defaults() {
        let cfg = ClientConfig::new(DEFAULT_API_URL.parse().unwrap());
        assert_eq!(cfg.tls, TlsVerification::SystemDefaults);
        assert_eq!(cfg.timeout, Duration::from_secs(30));
        assert_eq!(cfg.reconnect, ReconnectPolicy::default());
        assert_eq!(cfg.ws_origin().unwrap().as_str(), "ws://localhost:8000/");
    }

    #[test]
    fn derives_ws_from_http() {
        assert_eq!(
            config("http://localhost:8000").ws_origin().unwrap().as_str(),
            "ws://localhost:8000/"
        );
    }

    #[test]
    fn derives_wss_from_https_and_keeps_prefix() {
        assert_eq!(
            config("https://pairup.example.com/backend?x=1")
                .ws_origin()
                .unwrap()
                .as_str(),
            "wss://pairup.example.com/backend"
        );
    }

    #[test]
    fn explicit_ws_url_wins() {
        let mut cfg = config("https://api.example.com");
        cfg.ws_url = Some(Url::parse("wss://chat.example.com").unwrap());
        assert_eq!(cfg.ws_origin().unwrap().host_str(), Some("chat.example.com"));
    }

    #[test]
    fn rejects_unrelated_schemes() {
        assert!(matches!(
            config("ftp://example.com").ws_origin(),
            Err(CoreError::Config { .. })
        ));
    }

    #[test]
    fn realtime_config_carries_reconnect_policy() {
        let mut cfg = config("http://localhost:8000");
        cfg.reconnect.max_attempts = 2;
        let realtime = cfg.realtime().unwrap();
        assert_eq!(realtime.reconnect.max_attempts, 2);
        assert_eq!(realtime.ws_url.scheme(), "ws");
    }
}
