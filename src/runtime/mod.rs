// src/runtime/mod.rs

//! Core asynchronous primitives shared by transports and the session.

pub mod mailbox;

pub use mailbox::{frame_channel, FrameReceiver, FrameSender};
