//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` variants into user-facing errors with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use pairup_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const CONFIG: i32 = 3;
    pub const CONNECTION: i32 = 7;
    pub const API: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the pairup server: {message}")]
    #[diagnostic(
        code(pairup::unreachable),
        help(
            "Check that the server is running and the URL is right.\n\
             Set it with --server or PAIRUP_SERVER."
        )
    )]
    Unreachable { message: String },

    #[error("Chat connection failed: {reason}")]
    #[diagnostic(
        code(pairup::connection_failed),
        help("Set --ws-server if the chat socket is not served next to the API.")
    )]
    ConnectionFailed { reason: String },

    // ── API ──────────────────────────────────────────────────────────
    #[error("{message} (HTTP {status})")]
    #[diagnostic(code(pairup::api_error))]
    Api { message: String, status: u16 },

    // ── Identity ─────────────────────────────────────────────────────
    #[error("Device identity error: {message}")]
    #[diagnostic(
        code(pairup::identity),
        help("Run: pairup identity --reset to generate a fresh identity")
    )]
    Identity { message: String },

    // ── Session ──────────────────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(code(pairup::session))]
    Session { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(pairup::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    #[diagnostic(
        code(pairup::config),
        help("Config file: {path}")
    )]
    Config { message: String, path: String },

    #[error(transparent)]
    #[diagnostic(code(pairup::config))]
    Figment(Box<figment::Error>),

    #[error("Cannot locate a data directory for the device identity")]
    #[diagnostic(
        code(pairup::no_data_dir),
        help("Set identity_file in the config file, or pass --device-id.")
    )]
    NoDataDir,

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    #[diagnostic(code(pairup::json))]
    Json(#[from] serde_json::Error),
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Unreachable { .. } | Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Api { .. } => exit_code::API,
            Self::Identity { .. } | Self::Config { .. } | Self::Figment(_) | Self::NoDataDir => {
                exit_code::CONFIG
            }
            Self::Validation { .. } => exit_code::USAGE,
            Self::Session { .. } | Self::Io(_) | Self::Json(_) => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Api {
                message,
                status: Some(status),
            } => Self::Api { message, status },
            CoreError::Api {
                message,
                status: None,
            } => Self::Unreachable { message },

            CoreError::ConnectionFailed { reason } => Self::ConnectionFailed { reason },

            CoreError::NotConfigured => Self::Identity {
                message: "no device identity configured".into(),
            },
            CoreError::Identity { message } => Self::Identity { message },

            CoreError::Config { message } => Self::Config {
                message,
                path: crate::config::config_path().display().to_string(),
            },

            CoreError::Validation { message } => Self::Validation {
                field: "input".into(),
                reason: message,
            },

            err @ (CoreError::NotConnected | CoreError::WrongPhase { .. }) => Self::Session {
                message: err.to_string(),
            },
        }
    }
}
