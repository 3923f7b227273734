// ── Core error types ──
//
// User-facing errors from pairup-core. The `From<pairup_api::Error>` impl
// folds transport-layer errors into the handful of cases a consumer acts
// on differently.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Configuration & identity ─────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Device identity not configured")]
    NotConfigured,

    #[error("Device identity error: {message}")]
    Identity { message: String },

    // ── Connection ───────────────────────────────────────────────────
    #[error("Cannot connect to chat server: {reason}")]
    ConnectionFailed { reason: String },

    #[error("Not connected to the chat server")]
    NotConnected,

    // ── Session ──────────────────────────────────────────────────────
    #[error("Cannot {action} while {phase}")]
    WrongPhase { action: &'static str, phase: String },

    #[error("Validation failed: {message}")]
    Validation { message: String },

    // ── API ──────────────────────────────────────────────────────────
    /// The server rejected a REST call. `message` is already user-facing.
    #[error("{message}")]
    Api { message: String, status: Option<u16> },
}

impl CoreError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => *status,
            _ => None,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<pairup_api::Error> for CoreError {
    fn from(err: pairup_api::Error) -> Self {
        use pairup_api::Error as ApiError;

        match err {
            ApiError::NotConfigured => Self::NotConfigured,
            ApiError::IdentityMismatch { .. } | ApiError::InvalidIdentity(_) => Self::Identity {
                message: err.to_string(),
            },
            ApiError::InvalidUrl(_) | ApiError::UnsupportedUrl { .. } | ApiError::Tls(_) => {
                Self::Config {
                    message: err.to_string(),
                }
            }
            ApiError::Request {
                message, status, ..
            } => Self::Api { message, status },
            ApiError::WebSocketConnect(reason) | ApiError::WebSocketSend(reason) => {
                Self::ConnectionFailed { reason }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn request_errors_keep_message_and_status() {
        let err = CoreError::from(pairup_api::Error::Request {
            message: "Bad thing".into(),
            status: Some(403),
            source: None,
        });
        assert_eq!(err.to_string(), "Bad thing");
        assert_eq!(err.status(), Some(403));
    }

    #[test]
    fn identity_and_url_errors_are_classified() {
        assert!(matches!(
            CoreError::from(pairup_api::Error::NotConfigured),
            CoreError::NotConfigured
        ));
        assert!(matches!(
            CoreError::from(pairup_api::Error::InvalidIdentity("x".into())),
            CoreError::Identity { .. }
        ));
        let parse = url::Url::parse("::").unwrap_err();
        assert!(matches!(
            CoreError::from(pairup_api::Error::InvalidUrl(parse)),
            CoreError::Config { .. }
        ));
    }

    #[test]
    fn wrong_phase_reads_naturally() {
        let err = CoreError::WrongPhase {
            action: "send a message",
            phase: "idle".into(),
        };
        assert_eq!(err.to_string(), "Cannot send a message while idle");
    }
}
