// src/protocol/rawsocket.rs

use crate::error::WampError;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

// --- Constants ---
pub const HANDSHAKE_LENGTH: usize = 4;
pub const HANDSHAKE_MAGIC: u8 = 0x7F;
pub const FRAME_HEADER_LENGTH: usize = 4;

/// Largest length exponent a peer may announce: 2^(9 + 15) = 16 MiB.
pub const MAX_LENGTH_EXPONENT: u8 = 15;

// Handshake error codes, sent by a router in the high nibble of byte 1.
const HANDSHAKE_ERR_SERIALIZER: u8 = 1;
const HANDSHAKE_ERR_MAX_LENGTH: u8 = 2;
const HANDSHAKE_ERR_RESERVED_BITS: u8 = 3;
const HANDSHAKE_ERR_CONNECTION_COUNT: u8 = 4;

/// The four-octet RawSocket opening handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSocketHandshake {
  /// Maximum message length the sender is willing to receive, as
  /// `2^(9 + max_length_exponent)` octets.
  pub max_length_exponent: u8,
  pub serializer: u8,
}

impl RawSocketHandshake {
  pub fn new(max_length_exponent: u8, serializer: u8) -> Self {
    Self {
      max_length_exponent: max_length_exponent.min(MAX_LENGTH_EXPONENT),
      serializer,
    }
  }

  pub fn max_message_len(&self) -> usize {
    1usize << (9 + self.max_length_exponent as usize)
  }

  pub fn encode(&self) -> [u8; HANDSHAKE_LENGTH] {
    [
      HANDSHAKE_MAGIC,
      (self.max_length_exponent << 4) | (self.serializer & 0x0F),
      0x00,
      0x00,
    ]
  }

  /// Parses the router's reply to our handshake.
  pub fn decode_reply(reply: &[u8; HANDSHAKE_LENGTH], expected_serializer: u8) -> Result<Self, WampError> {
    if reply[0] != HANDSHAKE_MAGIC {
      return Err(WampError::ProtocolViolation(format!(
        "RawSocket handshake does not start with 0x7F (got {:#04x})",
        reply[0]
      )));
    }
    let high = reply[1] >> 4;
    let serializer = reply[1] & 0x0F;
    if serializer == 0 {
      let reason = match high {
        HANDSHAKE_ERR_SERIALIZER => "serializer unsupported",
        HANDSHAKE_ERR_MAX_LENGTH => "maximum message length unacceptable",
        HANDSHAKE_ERR_RESERVED_BITS => "use of reserved bits",
        HANDSHAKE_ERR_CONNECTION_COUNT => "maximum connection count reached",
        _ => "unknown handshake error",
      };
      return Err(WampError::ConnectionRefused(format!("router rejected RawSocket handshake: {}", reason)));
    }
    if serializer != expected_serializer {
      return Err(WampError::ProtocolViolation(format!(
        "router answered with serializer {} (requested {})",
        serializer, expected_serializer
      )));
    }
    if reply[2] != 0 || reply[3] != 0 {
      return Err(WampError::ProtocolViolation("non-zero reserved octets in RawSocket handshake".into()));
    }
    Ok(Self {
      max_length_exponent: high,
      serializer,
    })
  }
}

/// RawSocket frame type carried in the low three bits of the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
  Message,
  Ping,
  Pong,
}

impl FrameKind {
  fn to_bits(self) -> u8 {
    match self {
      FrameKind::Message => 0,
      FrameKind::Ping => 1,
      FrameKind::Pong => 2,
    }
  }

  fn from_bits(bits: u8) -> Result<Self, WampError> {
    match bits {
      0 => Ok(FrameKind::Message),
      1 => Ok(FrameKind::Ping),
      2 => Ok(FrameKind::Pong),
      other => Err(WampError::ProtocolViolation(format!("unknown RawSocket frame type {}", other))),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
  pub kind: FrameKind,
  pub payload: Bytes,
}

impl RawFrame {
  pub fn message(payload: Bytes) -> Self {
    Self {
      kind: FrameKind::Message,
      payload,
    }
  }
}

/// Codec for RawSocket framing: a 4-octet header (type, 24-bit length)
/// followed by the payload.
#[derive(Debug)]
pub struct RawSocketCodec {
  max_inbound_len: usize,
  max_outbound_len: usize,
  pending_header: Option<(FrameKind, usize)>,
}

impl RawSocketCodec {
  pub fn new(max_inbound_len: usize, max_outbound_len: usize) -> Self {
    Self {
      max_inbound_len,
      max_outbound_len,
      pending_header: None,
    }
  }
}

impl Default for RawSocketCodec {
  fn default() -> Self {
    let max = RawSocketHandshake::new(MAX_LENGTH_EXPONENT, 0).max_message_len();
    Self::new(max, max)
  }
}

impl Encoder<RawFrame> for RawSocketCodec {
  type Error = WampError;

  fn encode(&mut self, item: RawFrame, dst: &mut BytesMut) -> Result<(), Self::Error> {
    let size = item.payload.len();
    if size > self.max_outbound_len {
      return Err(WampError::InvalidArgument(format!(
        "frame of {} bytes exceeds the router limit of {} bytes",
        size, self.max_outbound_len
      )));
    }
    dst.reserve(FRAME_HEADER_LENGTH + size);
    dst.put_u8(item.kind.to_bits());
    dst.put_uint(size as u64, 3);
    dst.put_slice(&item.payload);
    Ok(())
  }
}

impl Decoder for RawSocketCodec {
  type Item = RawFrame;
  type Error = WampError;

  fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
    let (kind, size) = match self.pending_header {
      Some(header) => header,
      None => {
        if src.len() < FRAME_HEADER_LENGTH {
          return Ok(None);
        }
        let mut header = src.split_to(FRAME_HEADER_LENGTH);
        let first = header.get_u8();
        if first & 0xF8 != 0 {
          return Err(WampError::ProtocolViolation("reserved bits set in RawSocket frame header".into()));
        }
        let kind = FrameKind::from_bits(first & 0x07)?;
        let size = header.get_uint(3) as usize;
        if size > self.max_inbound_len {
          return Err(WampError::ProtocolViolation(format!(
            "incoming frame of {} bytes exceeds the negotiated limit of {} bytes",
            size, self.max_inbound_len
          )));
        }
        self.pending_header = Some((kind, size));
        (kind, size)
      }
    };

    if src.len() < size {
      src.reserve(size - src.len());
      return Ok(None);
    }
    self.pending_header = None;
    let payload = src.split_to(size).freeze();
    Ok(Some(RawFrame { kind, payload }))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn handshake_encodes_length_and_serializer() {
    let hs = RawSocketHandshake::new(15, 1);
    assert_eq!(hs.encode(), [0x7F, 0xF1, 0x00, 0x00]);
    assert_eq!(hs.max_message_len(), 16 * 1024 * 1024);
    assert_eq!(RawSocketHandshake::new(0, 1).max_message_len(), 512);
  }

  #[test]
  fn handshake_reply_errors_are_reported() {
    let reply = [0x7F, HANDSHAKE_ERR_SERIALIZER << 4, 0, 0];
    let err = RawSocketHandshake::decode_reply(&reply, 1).unwrap_err();
    assert!(err.to_string().contains("serializer unsupported"));

    let bad_magic = [0x00, 0xF1, 0, 0];
    assert!(RawSocketHandshake::decode_reply(&bad_magic, 1).is_err());

    let ok = RawSocketHandshake::decode_reply(&[0x7F, 0x91, 0, 0], 1).unwrap();
    assert_eq!(ok.max_length_exponent, 9);
  }

  #[test]
  fn frames_decode_across_partial_reads() {
    let mut codec = RawSocketCodec::default();
    let mut wire = BytesMut::new();
    codec
      .encode(RawFrame::message(Bytes::from_static(b"[1,\"realm1\",{}]")), &mut wire)
      .unwrap();
    codec
      .encode(
        RawFrame {
          kind: FrameKind::Ping,
          payload: Bytes::from_static(b"hi"),
        },
        &mut wire,
      )
      .unwrap();

    let mut src = BytesMut::new();
    src.extend_from_slice(&wire[..6]);
    assert_eq!(codec.decode(&mut src).unwrap(), None);
    src.extend_from_slice(&wire[6..]);
    let first = codec.decode(&mut src).unwrap().unwrap();
    assert_eq!(first.kind, FrameKind::Message);
    assert_eq!(&first.payload[..], b"[1,\"realm1\",{}]");
    let second = codec.decode(&mut src).unwrap().unwrap();
    assert_eq!(second.kind, FrameKind::Ping);
    assert_eq!(&second.payload[..], b"hi");
    assert_eq!(codec.decode(&mut src).unwrap(), None);
  }

  #[test]
  fn oversized_frames_are_rejected() {
    let mut codec = RawSocketCodec::new(4, 4);
    let mut dst = BytesMut::new();
    assert!(codec
      .encode(RawFrame::message(Bytes::from_static(b"too long")), &mut dst)
      .is_err());

    let mut src = BytesMut::from(&[0u8, 0, 0, 9][..]);
    assert!(codec.decode(&mut src).is_err());
  }
}
