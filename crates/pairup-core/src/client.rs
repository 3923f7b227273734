// Client facade: one identity, one REST client, one chat socket.

use pairup_api::{ApiClient, ConnectionManager, DeviceIdentity, IdentitySlot};
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::CoreError;
use crate::identity::IdentityProvider;
use crate::session::SessionController;

/// Wires the identity into both the REST client and the connection
/// manager, so every request and the socket URL carry the same value.
pub struct PairupClient {
    config: ClientConfig,
    identity: DeviceIdentity,
    api: ApiClient,
    realtime: ConnectionManager,
}

impl PairupClient {
    pub fn new(config: ClientConfig, identity: &dyn IdentityProvider) -> Result<Self, CoreError> {
        let identity = identity.identity()?;
        let slot = IdentitySlot::with_identity(identity.clone());

        let api = ApiClient::new(config.api_url.clone(), &config.transport())?
            .with_identity_slot(slot.clone());
        let realtime = ConnectionManager::new(config.realtime()?, slot);
        debug!(api = %config.api_url, ws = %realtime.config().ws_url, "client configured");

        Ok(Self {
            config,
            identity,
            api,
            realtime,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn realtime(&self) -> &ConnectionManager {
        &self.realtime
    }

    /// Start a chat session on this client's socket.
    pub fn session(&self) -> SessionController {
        SessionController::new(self.realtime.clone())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use url::Url;

    use super::*;
    use crate::identity::StaticIdentity;

    #[test]
    fn identity_is_shared_by_rest_and_realtime() {
        let config = ClientConfig::new(Url::parse("https://pairup.example.com").unwrap());
        let provider = StaticIdentity::new(DeviceIdentity::new("device-42").unwrap());
        let client = PairupClient::new(config, &provider).unwrap();

        assert_eq!(client.identity().as_str(), "device-42");
        assert_eq!(client.api().identity().unwrap().as_str(), "device-42");
        let chat_url = client
            .realtime()
            .config()
            .chat_url(client.identity())
            .unwrap();
        assert_eq!(chat_url.as_str(), "wss://pairup.example.com/ws/chat/device-42");
    }
}
