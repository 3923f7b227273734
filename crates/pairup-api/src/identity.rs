// Device identity: the opaque per-device key that scopes every REST call
// and the chat socket URL. Configured once per process, then frozen.

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Longest identity the service accepts.
const MAX_IDENTITY_LEN: usize = 64;

/// Stable identifier for this device.
///
/// Restricted to ASCII alphanumerics plus `-`, `_` and `.` so it can be sent
/// verbatim as the `X-Device-ID` header and as a URL path segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceIdentity(String);

impl DeviceIdentity {
    pub fn new(raw: impl Into<String>) -> Result<Self, Error> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(Error::InvalidIdentity("identity is empty".into()));
        }
        if raw.len() > MAX_IDENTITY_LEN {
            return Err(Error::InvalidIdentity(format!(
                "identity is {} characters, limit is {MAX_IDENTITY_LEN}",
                raw.len()
            )));
        }
        if let Some(bad) = raw
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
        {
            return Err(Error::InvalidIdentity(format!(
                "identity contains unsupported character {bad:?}"
            )));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DeviceIdentity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for DeviceIdentity {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DeviceIdentity> for String {
    fn from(value: DeviceIdentity) -> Self {
        value.0
    }
}

/// Write-once identity cell shared by the REST client and the connection
/// manager, so both always carry the same identity.
#[derive(Debug, Clone, Default)]
pub struct IdentitySlot(Arc<OnceLock<DeviceIdentity>>);

impl IdentitySlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// A slot that is already configured.
    pub fn with_identity(identity: DeviceIdentity) -> Self {
        let slot = Self::new();
        let _ = slot.0.set(identity);
        slot
    }

    /// Store the identity. Re-configuring the same value is a no-op;
    /// a different value is rejected.
    pub fn configure(&self, identity: DeviceIdentity) -> Result<(), Error> {
        let stored = self.0.get_or_init(|| identity.clone());
        if *stored == identity {
            Ok(())
        } else {
            Err(Error::IdentityMismatch {
                configured: stored.to_string(),
                requested: identity.to_string(),
            })
        }
    }

    pub fn get(&self) -> Result<&DeviceIdentity, Error> {
        self.0.get().ok_or(Error::NotConfigured)
    }

    pub fn is_configured(&self) -> bool {
        self.0.get().is_some()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn accepts_hex_fingerprint() {
        let id = DeviceIdentity::new("0f1e2d3c4b5a69788796a5b4c3d2e1f0").unwrap();
        assert_eq!(id.as_str(), "0f1e2d3c4b5a69788796a5b4c3d2e1f0");
    }

    #[test]
    fn rejects_empty_and_path_breaking_values() {
        assert!(DeviceIdentity::new("").is_err());
        assert!(DeviceIdentity::new("abc/def").is_err());
        assert!(DeviceIdentity::new("abc def").is_err());
        assert!(DeviceIdentity::new("a".repeat(65)).is_err());
    }

    #[test]
    fn slot_is_write_once() {
        let slot = IdentitySlot::new();
        assert!(matches!(slot.get(), Err(Error::NotConfigured)));

        let first = DeviceIdentity::new("device-a").unwrap();
        slot.configure(first.clone()).unwrap();
        slot.configure(first.clone()).unwrap();

        let err = slot
            .configure(DeviceIdentity::new("device-b").unwrap())
            .unwrap_err();
        assert!(matches!(err, Error::IdentityMismatch { .. }));
        assert_eq!(slot.get().unwrap(), &first);
    }

    #[test]
    fn cloned_slots_share_the_identity() {
        let slot = IdentitySlot::new();
        let shared = slot.clone();
        slot.configure(DeviceIdentity::new("device-a").unwrap())
            .unwrap();
        assert!(shared.is_configured());
    }

    #[test]
    fn serde_validates_on_the_way_in() {
        let ok: DeviceIdentity = serde_json::from_str("\"abc123\"").unwrap();
        assert_eq!(ok.as_str(), "abc123");
        assert!(serde_json::from_str::<DeviceIdentity>("\"a b\"").is_err());
    }
}
