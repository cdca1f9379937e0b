// src/protocol/json.rs

use crate::error::WampError;
use crate::message::Message;
use bytes::Bytes;
use serde_json::Value;

/// Converts messages to and from their wire representation.
///
/// Implementations are pure: no I/O, no shared state. The session holds one
/// codec for its whole lifetime and calls it from the listener task and from
/// every caller concurrently.
pub trait Codec: Send + Sync + std::fmt::Debug + 'static {
  /// The WebSocket subprotocol / RawSocket serializer name (e.g. `wamp.2.json`).
  fn subprotocol(&self) -> &'static str;

  /// RawSocket serializer id advertised during the handshake.
  fn rawsocket_serializer(&self) -> u8;

  fn encode(&self, message: &Message) -> Result<Bytes, WampError>;

  fn decode(&self, frame: &[u8]) -> Result<Message, WampError>;
}

/// The `wamp.2.json` serializer.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

impl JsonCodec {
  pub const SUBPROTOCOL: &'static str = "wamp.2.json";
  pub const RAWSOCKET_SERIALIZER: u8 = 1;

  pub fn new() -> Self {
    JsonCodec
  }
}

impl Codec for JsonCodec {
  fn subprotocol(&self) -> &'static str {
    Self::SUBPROTOCOL
  }

  fn rawsocket_serializer(&self) -> u8 {
    Self::RAWSOCKET_SERIALIZER
  }

  fn encode(&self, message: &Message) -> Result<Bytes, WampError> {
    let array = Value::Array(message.to_array());
    serde_json::to_vec(&array)
      .map(Bytes::from)
      .map_err(|e| WampError::Codec(format!("cannot serialize {}: {}", message.code(), e)))
  }

  fn decode(&self, frame: &[u8]) -> Result<Message, WampError> {
    match serde_json::from_slice::<Value>(frame) {
      Ok(Value::Array(array)) => Message::from_array(array),
      Ok(other) => Err(WampError::Codec(format!("expected a JSON list, got: {}", other))),
      Err(e) => Err(WampError::Codec(format!("invalid JSON frame: {}", e))),
    }
  }
}
