// src/message/code.rs

use crate::error::WampError;
use std::fmt;

/// Numeric message codes from the WAMP v2 basic and advanced profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u64)]
pub enum MessageCode {
  Hello = 1,
  Welcome = 2,
  Abort = 3,
  Challenge = 4,
  Authenticate = 5,
  Goodbye = 6,
  Error = 8,
  Publish = 16,
  Published = 17,
  Subscribe = 32,
  Subscribed = 33,
  Unsubscribe = 34,
  Unsubscribed = 35,
  Event = 36,
  Call = 48,
  Result = 50,
  Register = 64,
  Registered = 65,
  Unregister = 66,
  Unregistered = 67,
  Invocation = 68,
  Yield = 70,
}

/// How the session routes a message kind on the receive path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageShape {
  /// Session-level handshake traffic (WELCOME, ABORT, CHALLENGE, GOODBYE).
  Control,
  /// Carries the request id of one of our requests.
  Response,
  /// Unsolicited; matched against a registry (EVENT, INVOCATION).
  Push,
  /// Only ever sent by a client; receiving one is a protocol violation.
  Outbound,
}

impl MessageCode {
  /// Human-readable kind name, used for diagnostics only.
  pub fn name(self) -> &'static str {
    match self {
      MessageCode::Hello => "HELLO",
      MessageCode::Welcome => "WELCOME",
      MessageCode::Abort => "ABORT",
      MessageCode::Challenge => "CHALLENGE",
      MessageCode::Authenticate => "AUTHENTICATE",
      MessageCode::Goodbye => "GOODBYE",
      MessageCode::Error => "ERROR",
      MessageCode::Publish => "PUBLISH",
      MessageCode::Published => "PUBLISHED",
      MessageCode::Subscribe => "SUBSCRIBE",
      MessageCode::Subscribed => "SUBSCRIBED",
      MessageCode::Unsubscribe => "UNSUBSCRIBE",
      MessageCode::Unsubscribed => "UNSUBSCRIBED",
      MessageCode::Event => "EVENT",
      MessageCode::Call => "CALL",
      MessageCode::Result => "RESULT",
      MessageCode::Register => "REGISTER",
      MessageCode::Registered => "REGISTERED",
      MessageCode::Unregister => "UNREGISTER",
      MessageCode::Unregistered => "UNREGISTERED",
      MessageCode::Invocation => "INVOCATION",
      MessageCode::Yield => "YIELD",
    }
  }

  pub fn shape(self) -> MessageShape {
    match self {
      MessageCode::Welcome | MessageCode::Abort | MessageCode::Challenge | MessageCode::Goodbye => {
        MessageShape::Control
      }
      MessageCode::Error
      | MessageCode::Published
      | MessageCode::Subscribed
      | MessageCode::Unsubscribed
      | MessageCode::Result
      | MessageCode::Registered
      | MessageCode::Unregistered => MessageShape::Response,
      MessageCode::Event | MessageCode::Invocation => MessageShape::Push,
      MessageCode::Hello
      | MessageCode::Authenticate
      | MessageCode::Publish
      | MessageCode::Subscribe
      | MessageCode::Unsubscribe
      | MessageCode::Call
      | MessageCode::Register
      | MessageCode::Unregister
      | MessageCode::Yield => MessageShape::Outbound,
    }
  }

  pub fn as_u64(self) -> u64 {
    self as u64
  }
}

impl TryFrom<u64> for MessageCode {
  type Error = WampError;

  fn try_from(value: u64) -> Result<Self, WampError> {
    let code = match value {
      1 => MessageCode::Hello,
      2 => MessageCode::Welcome,
      3 => MessageCode::Abort,
      4 => MessageCode::Challenge,
      5 => MessageCode::Authenticate,
      6 => MessageCode::Goodbye,
      8 => MessageCode::Error,
      16 => MessageCode::Publish,
      17 => MessageCode::Published,
      32 => MessageCode::Subscribe,
      33 => MessageCode::Subscribed,
      34 => MessageCode::Unsubscribe,
      35 => MessageCode::Unsubscribed,
      36 => MessageCode::Event,
      48 => MessageCode::Call,
      50 => MessageCode::Result,
      64 => MessageCode::Register,
      65 => MessageCode::Registered,
      66 => MessageCode::Unregister,
      67 => MessageCode::Unregistered,
      68 => MessageCode::Invocation,
      70 => MessageCode::Yield,
      other => {
        return Err(WampError::ProtocolViolation(format!("unknown message code {}", other)));
      }
    };
    Ok(code)
  }
}

impl fmt::Display for MessageCode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}({})", self.name(), self.as_u64())
  }
}
