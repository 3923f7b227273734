//! Persistent chat socket.
//!
//! [`ConnectionManager`] owns one socket per device identity, dispatches
//! inbound frames to subscribers by event name, and reconnects with linear
//! backoff after the connection drops.

pub mod config;
pub mod frame;
pub mod handlers;
pub mod manager;
pub mod socket;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;


pub use config::{RealtimeConfig, ReconnectPolicy};
pub use frame::{
    ChatMessage, CloseInfo, Command, InboundFrame, LookingFor, MatchInfo, Payload, QueueStatus,
    ServerEvent, ServerNotice,
};
pub use handlers::{Handler, handler};
pub use manager::{ConnectionManager, ConnectionState};
pub use socket::{Connector, Transport, TransportEvent, WebSocketConnector, WebSocketTransport};
