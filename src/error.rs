// src/error.rs

use serde_json::{Map, Value};
use std::io;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
#[non_exhaustive] // Allows adding more variants later without breaking change
pub enum WampError {
  // --- I/O Errors ---
  #[error("I/O error: {0}")]
  Io(#[from] io::Error),

  #[error("Invalid argument provided: {0}")]
  InvalidArgument(String),

  // --- Connection Errors ---
  #[error("cannot connect to \"{url}\": {source}")]
  Connection {
    url: String,
    #[source]
    source: Box<WampError>,
  },
  #[error("Connection refused by peer: {0}")]
  ConnectionRefused(String),
  #[error("Connection closed by peer or transport")]
  ConnectionClosed,

  // --- Endpoint Errors ---
  #[error("Invalid endpoint format: {0}")]
  InvalidEndpoint(String),
  #[error("Transport scheme not supported or enabled: {0}")]
  UnsupportedTransport(String),

  // --- Protocol Errors ---
  #[error("no message returned (timed-out in {0:?})")]
  Timeout(Duration),
  #[error("WAMP protocol violation: {0}")]
  ProtocolViolation(String),
  #[error("session aborted by router: {reason}")]
  Aborted { reason: String, message: Option<String> },
  #[error("router returned error \"{uri}\" (args: {args:?})")]
  Remote { uri: String, args: Vec<Value>, kwargs: Map<String, Value> },
  #[error("Codec error: {0}")]
  Codec(String),

  // --- State Errors ---
  #[error("Operation is invalid for the current session state: {0}")]
  InvalidState(&'static str),

  // --- Internal Errors ---
  #[error("Internal library error: {0}")]
  Internal(String),
}

impl WampError {
  /// Wraps a transport failure raised while opening `url`.
  pub fn connection(url: &str, source: WampError) -> Self {
    WampError::Connection {
      url: url.to_string(),
      source: Box::new(source),
    }
  }

  /// Maps common `std::io::Error` kinds raised against `endpoint`.
  pub fn from_io_endpoint(e: io::Error, endpoint: &str) -> Self {
    match e.kind() {
      io::ErrorKind::ConnectionRefused => WampError::ConnectionRefused(endpoint.to_string()),
      io::ErrorKind::ConnectionReset | io::ErrorKind::BrokenPipe | io::ErrorKind::UnexpectedEof => {
        WampError::ConnectionClosed
      }
      _ => WampError::Io(e),
    }
  }

  /// True for failures that are fatal to the current session: a new
  /// `begin()` is required.
  pub fn is_connection_error(&self) -> bool {
    matches!(
      self,
      WampError::Connection { .. } | WampError::ConnectionRefused(_) | WampError::ConnectionClosed | WampError::Io(_)
    )
  }

  /// True for failures of the WAMP conversation itself: expired waits,
  /// unexpected message kinds and router-returned ERROR/ABORT messages.
  pub fn is_protocol_error(&self) -> bool {
    matches!(
      self,
      WampError::Timeout(_)
        | WampError::ProtocolViolation(_)
        | WampError::Aborted { .. }
        | WampError::Remote { .. }
        | WampError::Codec(_)
    )
  }

  /// The WAMP error or reason URI carried by a router reply, if any.
  pub fn error_uri(&self) -> Option<&str> {
    match self {
      WampError::Remote { uri, .. } => Some(uri),
      WampError::Aborted { reason, .. } => Some(reason),
      _ => None,
    }
  }
}
