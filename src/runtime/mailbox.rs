// src/runtime/mailbox.rs

//! Type aliases for in-process frame channels based on `async-channel`.

use bytes::Bytes;

/// The sending end of a frame channel. Cloneable.
pub type FrameSender = async_channel::Sender<Bytes>;

/// The receiving end of a frame channel.
pub type FrameReceiver = async_channel::Receiver<Bytes>;

/// Default capacity for bounded frame channels.
pub const DEFAULT_FRAME_CAPACITY: usize = 128;

/// Creates a new bounded frame channel pair.
pub fn frame_channel() -> (FrameSender, FrameReceiver) {
  async_channel::bounded(DEFAULT_FRAME_CAPACITY)
}
