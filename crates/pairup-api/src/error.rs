use thiserror::Error;

/// Top-level error type for the `pairup-api` crate.
///
/// REST failures of every kind (transport, non-success status, undecodable
/// body) collapse into [`Error::Request`] so callers handle one shape.
/// `pairup-core` maps these into user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Configuration ───────────────────────────────────────────────
    /// An operation ran before `configure()` supplied a device identity.
    #[error("Device identity not configured -- call configure() first")]
    NotConfigured,

    /// A second, different identity was offered after one was configured.
    #[error("Device identity already configured as {configured}, refusing {requested}")]
    IdentityMismatch {
        configured: String,
        requested: String,
    },

    /// The identity string cannot be carried in a header or URL path.
    #[error("Invalid device identity: {0}")]
    InvalidIdentity(String),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The URL parsed but cannot be used for the requested endpoint.
    #[error("Unsupported URL {url}: {reason}")]
    UnsupportedUrl { url: String, reason: String },

    /// TLS setup or HTTP client construction failed.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── REST ────────────────────────────────────────────────────────
    /// A REST call failed. `message` is the server's `detail` when one
    /// could be extracted, otherwise the call-site fallback.
    #[error("{message}")]
    Request {
        message: String,
        status: Option<u16>,
        #[source]
        source: Option<reqwest::Error>,
    },

    // ── Realtime ────────────────────────────────────────────────────
    /// The chat socket could not be opened.
    #[error("WebSocket connection failed: {0}")]
    WebSocketConnect(String),

    /// Writing to an open chat socket failed.
    #[error("WebSocket send failed: {0}")]
    WebSocketSend(String),
}

impl Error {
    /// Returns `true` for errors caused by missing or conflicting identity
    /// setup rather than by the network.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::NotConfigured
                | Self::IdentityMismatch { .. }
                | Self::InvalidIdentity(_)
                | Self::InvalidUrl(_)
                | Self::UnsupportedUrl { .. }
                | Self::Tls(_)
        )
    }

    /// HTTP status of a failed REST call, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Request { status, .. } => *status,
            _ => None,
        }
    }

    /// Returns `true` if the server reported the resource as missing.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Returns `true` if the server refused the caller (ban or restriction).
    pub fn is_forbidden(&self) -> bool {
        self.status() == Some(403)
    }
}
