//! CLI-owned configuration: TOML file, environment, and translation to
//! `pairup_core::ClientConfig`.
//!
//! Core never sees these types -- it receives a pre-built `ClientConfig`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use pairup_core::config::DEFAULT_API_URL;
use pairup_core::{
    ClientConfig, DeviceIdentity, FileIdentity, IdentityProvider, ReconnectPolicy, StaticIdentity,
    TlsVerification,
};

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── TOML config structs ──────────────────────────────────────────────

/// CLI-owned TOML configuration. Core never touches this type.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// REST server URL.
    #[serde(default = "default_server")]
    pub server: String,

    /// WebSocket server URL; derived from `server` when absent.
    pub ws_server: Option<String>,

    /// REST timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default)]
    pub insecure: bool,

    /// Path to a custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Fixed device identity. Overrides `identity_file`.
    pub device_id: Option<String>,

    /// Where the generated identity is persisted.
    pub identity_file: Option<PathBuf>,

    #[serde(default)]
    pub reconnect: ReconnectSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: default_server(),
            ws_server: None,
            timeout: default_timeout(),
            insecure: false,
            ca_cert: None,
            device_id: None,
            identity_file: None,
            reconnect: ReconnectSettings::default(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ReconnectSettings {
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for ReconnectSettings {
    fn default() -> Self {
        Self {
            base_delay_ms: default_base_delay_ms(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl From<&ReconnectSettings> for ReconnectPolicy {
    fn from(settings: &ReconnectSettings) -> Self {
        Self {
            base_delay: Duration::from_millis(settings.base_delay_ms),
            max_attempts: settings.max_attempts,
        }
    }
}

fn default_server() -> String {
    DEFAULT_API_URL.into()
}
fn default_timeout() -> u64 {
    30
}
fn default_base_delay_ms() -> u64 {
    2000
}
fn default_max_attempts() -> u32 {
    5
}

// ── Paths ────────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("chat", "pairup", "pairup")
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || PathBuf::from("pairup.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Default location of the persisted device identity.
pub fn identity_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.data_dir().join("device_id"))
}

// ── Config loading ───────────────────────────────────────────────────

/// Load the full Config: defaults, then the TOML file, then `PAIRUP_*`
/// environment variables.
pub fn load_config(global: &GlobalOpts) -> Result<Config, CliError> {
    let path = global.config.clone().unwrap_or_else(config_path);
    load_from(&path)
}

fn load_from(path: &Path) -> Result<Config, CliError> {
    let config = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("PAIRUP_").split("__"))
        .extract()?;
    Ok(config)
}

// ── Resolution ───────────────────────────────────────────────────────

/// Translate the file config plus global flags into a `ClientConfig`.
///
/// This is the single boundary where CLI config types cross into core types.
pub fn resolve(config: &Config, global: &GlobalOpts) -> Result<ClientConfig, CliError> {
    // 1. Server URLs (flag > env > file)
    let server = global.server.as_deref().unwrap_or(&config.server);
    let api_url = parse_url("server", server)?;

    let ws_url = global
        .ws_server
        .as_deref()
        .or(config.ws_server.as_deref())
        .map(|raw| parse_url("ws-server", raw))
        .transpose()?;

    // 2. TLS verification
    let tls = if global.insecure || config.insecure {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = config.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    // 3. Timeout
    let timeout = Duration::from_secs(global.timeout.unwrap_or(config.timeout));

    Ok(ClientConfig {
        api_url,
        ws_url,
        tls,
        timeout,
        reconnect: ReconnectPolicy::from(&config.reconnect),
    })
}

/// Pick the identity source: a fixed id (flag > env > file), else the
/// persisted identity file.
pub fn identity_provider(
    config: &Config,
    global: &GlobalOpts,
) -> Result<Box<dyn IdentityProvider>, CliError> {
    if let Some(raw) = global.device_id.as_deref().or(config.device_id.as_deref()) {
        let identity = DeviceIdentity::new(raw).map_err(|e| CliError::Identity {
            message: e.to_string(),
        })?;
        return Ok(Box::new(StaticIdentity::new(identity)));
    }
    Ok(Box::new(identity_file(config)?))
}

/// The persisted identity file, from config or the platform data dir.
pub fn identity_file(config: &Config) -> Result<FileIdentity, CliError> {
    let path = match &config.identity_file {
        Some(path) => path.clone(),
        None => identity_path().ok_or(CliError::NoDataDir)?,
    };
    Ok(FileIdentity::new(path))
}

fn parse_url(field: &str, raw: &str) -> Result<Url, CliError> {
    Url::parse(raw).map_err(|_| CliError::Validation {
        field: field.into(),
        reason: format!("invalid URL: {raw}"),
    })
}
