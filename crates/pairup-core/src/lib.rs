// pairup-core: Session control and client wiring between pairup-api and consumers.

pub mod client;
pub mod config;
pub mod error;
pub mod identity;
pub mod session;

// ── Primary re-exports ──────────────────────────────────────────────
pub use client::PairupClient;
pub use config::{ClientConfig, TlsVerification};
pub use error::CoreError;
pub use identity::{FileIdentity, IdentityProvider, StaticIdentity};
pub use session::{EndReason, Partner, SessionController, SessionPhase, SessionUpdate};

pub use pairup_api::realtime::{ChatMessage, ConnectionState, LookingFor, ReconnectPolicy};
pub use pairup_api::{
    AccessLevel, ChatCompletion, DeviceIdentity, KarmaStatus, ReportReason, ReportReceipt,
    UserProfile, VerificationResult,
};
