//! rwamp - An asynchronous, pure-Rust WAMP client using Tokio.
//!
//! A [`Session`] joins one realm on a router and offers the four client
//! roles (Caller, Callee, Publisher, Subscriber) over a single connection.

pub mod error;
pub mod message;
pub mod protocol;
pub mod roles;
pub mod runtime;
pub mod session;
pub mod transport;

// Re-export core types for user convenience
pub use error::WampError;
pub use message::{Dict, List, Message, MessageCode, Payload};
pub use protocol::{Codec, JsonCodec};
pub use roles::{
  event_handler_fn, procedure_fn, CallError, Event, EventHandler, Invocation, InvocationPolicy, Procedure, Roles,
};
pub use session::{
  CallResult, CloseOutcome, RawSocketOptions, RegistrationInfo, RegistrationList, RegistrationRecord, Session,
  SessionOptions, SessionState, SubscriptionRecord, Welcome, WeakSession,
};
pub use transport::Transport;

// --- Top-Level Functions ---

const VERSION_MAJOR: i32 = 0;
const VERSION_MINOR: i32 = 1;
const VERSION_PATCH: i32 = 0;

/// Returns the library version as a tuple (major, minor, patch).
pub fn version() -> (i32, i32, i32) {
  (VERSION_MAJOR, VERSION_MINOR, VERSION_PATCH)
}

/// Returns the major version number of the library.
pub fn version_major() -> i32 {
  VERSION_MAJOR
}

/// Returns the minor version number of the library.
pub fn version_minor() -> i32 {
  VERSION_MINOR
}

/// Returns the patch version number of the library.
pub fn version_patch() -> i32 {
  VERSION_PATCH
}

/// Creates a session for `url` joining `realm` with default options.
/// Call [`Session::begin`] on the result to connect.
pub fn session(url: &str, realm: &str) -> Result<Session, WampError> {
  Session::connect_to(url, SessionOptions::new(realm))
}
