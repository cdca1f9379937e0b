//! Message-related types (`Message`, `MessageCode`, `Payload`, id aliases).

mod code;
mod msg;
mod payload;

pub use code::{MessageCode, MessageShape};
pub use msg::Message;
pub use payload::{Dict, List, Payload};

/// Session-scope id assigned by the router in WELCOME.
pub type SessionId = u64;
/// Request id chosen by this peer for request-shaped messages.
pub type RequestId = u64;
/// Router-assigned id of a registered procedure.
pub type RegistrationId = u64;
/// Router-assigned id of a topic subscription.
pub type SubscriptionId = u64;
/// Router-assigned id of a publication.
pub type PublicationId = u64;

/// Largest id value allowed by WAMP (ids must be representable as IEEE-754 doubles).
pub const MAX_ID: u64 = 1 << 53;
