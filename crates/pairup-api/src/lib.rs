// pairup-api: Async Rust client for the pairup chat-matching service (REST + realtime)

pub mod client;
pub mod error;
pub mod identity;
pub mod models;
pub mod realtime;
pub mod transport;

pub use client::ApiClient;
pub use error::Error;
pub use identity::{DeviceIdentity, IdentitySlot};
pub use models::{
    AccessLevel, ChatCompletion, KarmaStatus, ReportReason, ReportReceipt, UserProfile,
    VerificationResult,
};
pub use realtime::{ConnectionManager, ConnectionState, RealtimeConfig, ReconnectPolicy};
pub use transport::{TlsMode, TransportConfig};
