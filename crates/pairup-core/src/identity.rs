// ── Device identity providers ──
//
// Where the process-wide device identity comes from. The identity is read
// once at startup and handed to both the REST client and the connection
// manager.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use pairup_api::DeviceIdentity;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::CoreError;

/// Source of the device identity.
pub trait IdentityProvider: Send + Sync {
    fn identity(&self) -> Result<DeviceIdentity, CoreError>;
}

/// A fixed identity, e.g. from a flag or environment variable.
#[derive(Debug, Clone)]
pub struct StaticIdentity(DeviceIdentity);

impl StaticIdentity {
    pub fn new(identity: DeviceIdentity) -> Self {
        Self(identity)
    }
}

impl IdentityProvider for StaticIdentity {
    fn identity(&self) -> Result<DeviceIdentity, CoreError> {
        Ok(self.0.clone())
    }
}

/// Identity persisted in a file.
///
/// On first use a random 32-hex-character identifier is generated and
/// written; afterwards the stored value is reused so the device keeps its
/// account across runs.
#[derive(Debug, Clone)]
pub struct FileIdentity {
    path: PathBuf,
}

impl FileIdentity {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether an identity has already been stored.
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Replace the stored identity with a fresh one.
    pub fn regenerate(&self) -> Result<DeviceIdentity, CoreError> {
        let identity = generate()?;
        self.store(&identity)?;
        info!(path = %self.path.display(), "generated new device identity");
        Ok(identity)
    }

    fn load(&self) -> Result<Option<DeviceIdentity>, CoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error("read", &e)),
        };
        let identity = DeviceIdentity::new(raw.trim()).map_err(|e| CoreError::Identity {
            message: format!("{} holds an invalid identity: {e}", self.path.display()),
        })?;
        Ok(Some(identity))
    }

    fn store(&self, identity: &DeviceIdentity) -> Result<(), CoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.io_error("create directory for", &e))?;
        }
        fs::write(&self.path, format!("{identity}\n")).map_err(|e| self.io_error("write", &e))
    }

    fn io_error(&self, action: &str, err: &io::Error) -> CoreError {
        CoreError::Identity {
            message: format!("failed to {action} {}: {err}", self.path.display()),
        }
    }
}

impl IdentityProvider for FileIdentity {
    fn identity(&self) -> Result<DeviceIdentity, CoreError> {
        if let Some(identity) = self.load()? {
            debug!(path = %self.path.display(), "loaded device identity");
            return Ok(identity);
        }
        self.regenerate()
    }
}

fn generate() -> Result<DeviceIdentity, CoreError> {
    let raw = Uuid::new_v4().simple().to_string();
    DeviceIdentity::new(raw).map_err(CoreError::from)
}
