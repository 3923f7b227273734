use std::time::Duration;

use url::Url;

use crate::error::Error;
use crate::identity::DeviceIdentity;

/// Linear backoff for automatic reconnection.
///
/// Attempt `n` (1-based) waits `base_delay * n`. After `max_attempts`
/// consecutive drops without a successful open, reconnection stops until
/// the caller connects explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Delay unit. Default: 2s.
    pub base_delay: Duration,

    /// Ceiling on automatic attempts. Default: 5.
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(2000),
            max_attempts: 5,
        }
    }
}

impl ReconnectPolicy {
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }
}

/// Connection manager configuration, injected at construction.
#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    /// WebSocket origin, e.g. `ws://localhost:8000`.
    pub ws_url: Url,
    pub reconnect: ReconnectPolicy,
}

impl RealtimeConfig {
    pub fn new(ws_url: Url) -> Self {
        Self {
            ws_url,
            reconnect: ReconnectPolicy::default(),
        }
    }

    pub fn with_reconnect(mut self, reconnect: ReconnectPolicy) -> Self {
        self.reconnect = reconnect;
        self
    }

    /// `<ws-origin>/ws/chat/<identity>`, keeping any path prefix on the origin.
    pub fn chat_url(&self, identity: &DeviceIdentity) -> Result<Url, Error> {
        let mut url = self.ws_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::UnsupportedUrl {
                url: self.ws_url.to_string(),
                reason: "URL cannot carry a path".into(),
            })?
            .pop_if_empty()
            .extend(["ws", "chat", identity.as_str()]);
        Ok(url)
    }
}
