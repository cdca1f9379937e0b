// src/protocol/mod.rs

//! Wire-level protocol pieces: message serialization, RawSocket framing and
//! the well-known WAMP URIs.

pub mod json;
pub mod rawsocket;
pub mod uri;

pub use json::{Codec, JsonCodec};
pub use rawsocket::{FrameKind, RawFrame, RawSocketCodec, RawSocketHandshake};
