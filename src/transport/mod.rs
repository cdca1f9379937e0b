// src/transport/mod.rs

//! Router transports. A transport moves opaque frames; it knows nothing
//! about WAMP messages beyond what its own handshake needs.

pub mod endpoint;
#[cfg(feature = "inproc")]
pub mod inproc;
pub mod tcp;

pub use endpoint::{parse_endpoint, Endpoint};
#[cfg(feature = "inproc")]
pub use inproc::{bind_inproc, InprocConnection, InprocListener, InprocTransport};
pub use tcp::RawSocketTransport;

use crate::error::WampError;
use crate::session::options::RawSocketOptions;
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;

/// A byte-oriented connection to a router.
///
/// The session's listener task is the only caller of [`Transport::receive`];
/// [`Transport::send`] is called concurrently from any task.
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug + 'static {
  /// The endpoint URL this transport connects to.
  fn url(&self) -> &str;

  /// Opens the connection, including any transport-level handshake.
  async fn connect(&self) -> Result<(), WampError>;

  /// Sends one complete frame.
  async fn send(&self, frame: Bytes) -> Result<(), WampError>;

  /// Receives the next frame. `Ok(None)` means the peer closed the connection.
  async fn receive(&self) -> Result<Option<Bytes>, WampError>;

  /// Closes the connection. Closing an already closed transport is not an error.
  async fn disconnect(&self) -> Result<(), WampError>;
}

/// Builds the transport matching the scheme of `url`.
pub fn transport_for_endpoint(
  url: &str,
  options: &RawSocketOptions,
  serializer: u8,
) -> Result<Arc<dyn Transport>, WampError> {
  match parse_endpoint(url)? {
    Endpoint::Tcp(address, original) => Ok(Arc::new(RawSocketTransport::new(
      original,
      address,
      options.clone(),
      serializer,
    ))),
    #[cfg(feature = "inproc")]
    Endpoint::Inproc(name) => Ok(Arc::new(InprocTransport::new(name))),
  }
}
