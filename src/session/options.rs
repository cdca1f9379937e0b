// src/session/options.rs

use crate::roles::Roles;
use std::time::Duration;

pub const DEFAULT_REALM: &str = "realm1";
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_GOODBYE_TIMEOUT: Duration = Duration::from_secs(2);

/// Holds validated session options.
#[derive(Debug, Clone)]
pub struct SessionOptions {
  /// Realm joined by HELLO.
  pub realm: String,
  /// Roles announced in HELLO details.
  pub roles: Roles,
  /// Optional `agent` string announced in HELLO details.
  pub agent: Option<String>,
  /// How long `begin()` waits for WELCOME.
  pub handshake_timeout: Duration,
  /// Default bound on every correlated request (CALL, REGISTER, SUBSCRIBE, ...).
  pub call_timeout: Duration,
  /// How long `end()` waits for the router to acknowledge GOODBYE.
  pub goodbye_timeout: Duration,
}

impl Default for SessionOptions {
  fn default() -> Self {
    Self {
      realm: DEFAULT_REALM.to_string(),
      roles: Roles::default(),
      agent: Some(format!("rwamp-{}", env!("CARGO_PKG_VERSION"))),
      handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
      call_timeout: DEFAULT_CALL_TIMEOUT,
      goodbye_timeout: DEFAULT_GOODBYE_TIMEOUT,
    }
  }
}

impl SessionOptions {
  pub fn new(realm: impl Into<String>) -> Self {
    Self {
      realm: realm.into(),
      ..Default::default()
    }
  }

  pub fn with_roles(mut self, roles: Roles) -> Self {
    self.roles = roles;
    self
  }

  pub fn with_agent(mut self, agent: impl Into<String>) -> Self {
    self.agent = Some(agent.into());
    self
  }

  pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
    self.handshake_timeout = timeout;
    self
  }

  pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
    self.call_timeout = timeout;
    self
  }

  pub fn with_goodbye_timeout(mut self, timeout: Duration) -> Self {
    self.goodbye_timeout = timeout;
    self
  }
}

/// TCP/RawSocket transport configuration.
#[derive(Debug, Clone)]
pub struct RawSocketOptions {
  /// Announced receive limit, as `2^(9 + exponent)` octets.
  pub max_length_exponent: u8,
  pub connect_timeout: Duration,
  pub tcp_nodelay: bool,
  pub tcp_keepalive: Option<Duration>,
}

impl Default for RawSocketOptions {
  fn default() -> Self {
    Self {
      max_length_exponent: crate::protocol::rawsocket::MAX_LENGTH_EXPONENT,
      connect_timeout: Duration::from_secs(5),
      tcp_nodelay: true, // Common default for messaging
      tcp_keepalive: None,
    }
  }
}
