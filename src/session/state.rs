// src/session/state.rs

use crate::message::{Dict, SessionId};
use std::fmt;

/// Connection state of a [`Session`](super::Session).
///
/// The router-assigned session id lives inside `Established`, so a session
/// has an id exactly when it is established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
  #[default]
  Disconnected,
  Connecting,
  Established(SessionId),
  Closing,
}

impl SessionState {
  pub fn session_id(&self) -> Option<SessionId> {
    match self {
      SessionState::Established(id) => Some(*id),
      _ => None,
    }
  }

  pub fn is_established(&self) -> bool {
    matches!(self, SessionState::Established(_))
  }
}

impl fmt::Display for SessionState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      SessionState::Disconnected => f.write_str("disconnected"),
      SessionState::Connecting => f.write_str("connecting"),
      SessionState::Established(id) => write!(f, "established({})", id),
      SessionState::Closing => f.write_str("closing"),
    }
  }
}

/// The router's WELCOME, as returned by `begin()`.
#[derive(Debug, Clone, PartialEq)]
pub struct Welcome {
  pub session: SessionId,
  pub details: Dict,
}

/// How the best-effort part of `end()` went. Local teardown always happens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseOutcome {
  /// The router answered our GOODBYE.
  Acknowledged { reason: String },
  /// GOODBYE was sent but no GOODBYE came back in time (or something else did).
  Unacknowledged,
  /// GOODBYE could not be sent; the connection was probably already gone.
  SendFailed,
  /// The session was not established; nothing was sent.
  NotConnected,
}

impl CloseOutcome {
  pub fn is_acknowledged(&self) -> bool {
    matches!(self, CloseOutcome::Acknowledged { .. })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn only_established_sessions_have_an_id() {
    assert_eq!(SessionState::Disconnected.session_id(), None);
    assert_eq!(SessionState::Connecting.session_id(), None);
    assert_eq!(SessionState::Closing.session_id(), None);
    assert_eq!(SessionState::Established(9).session_id(), Some(9));
    assert_eq!(SessionState::Established(9).to_string(), "established(9)");
    assert_eq!(SessionState::default(), SessionState::Disconnected);
  }
}
