// src/transport/inproc.rs

#![cfg(feature = "inproc")]

use crate::error::WampError;
use crate::runtime::{frame_channel, FrameReceiver, FrameSender};
use crate::transport::Transport;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::OnceLock;

type Bindings = Mutex<HashMap<String, async_channel::Sender<InprocConnection>>>;

fn bindings() -> &'static Bindings {
  static BINDINGS: OnceLock<Bindings> = OnceLock::new();
  BINDINGS.get_or_init(|| Mutex::new(HashMap::new()))
}

/// One end of an in-process frame pipe.
#[derive(Debug, Clone)]
pub struct InprocConnection {
  tx: FrameSender,
  rx: FrameReceiver,
}

impl InprocConnection {
  /// Creates two connected ends.
  fn pair() -> (InprocConnection, InprocConnection) {
    let (tx_a_to_b, rx_a_to_b) = frame_channel();
    let (tx_b_to_a, rx_b_to_a) = frame_channel();
    (
      InprocConnection {
        tx: tx_a_to_b,
        rx: rx_b_to_a,
      },
      InprocConnection {
        tx: tx_b_to_a,
        rx: rx_a_to_b,
      },
    )
  }

  pub async fn send(&self, frame: Bytes) -> Result<(), WampError> {
    self.tx.send(frame).await.map_err(|_| WampError::ConnectionClosed)
  }

  /// Next frame from the other end, `None` once either side closed.
  pub async fn recv(&self) -> Option<Bytes> {
    self.rx.recv().await.ok()
  }

  /// Closes both directions; the other end observes EOF.
  pub fn close(&self) {
    self.tx.close();
    self.rx.close();
  }

  pub fn is_closed(&self) -> bool {
    self.tx.is_closed()
  }
}

/// Accepts in-process connections made to `inproc://<name>`.
#[derive(Debug)]
pub struct InprocListener {
  name: String,
  incoming: async_channel::Receiver<InprocConnection>,
}

/// Binds `name` so that `inproc://<name>` transports can connect to it.
pub fn bind_inproc(name: impl Into<String>) -> Result<InprocListener, WampError> {
  let name = name.into();
  let mut bound = bindings().lock();
  if bound.contains_key(&name) {
    return Err(WampError::InvalidEndpoint(format!("inproc://{} is already bound", name)));
  }
  let (tx, rx) = async_channel::unbounded();
  bound.insert(name.clone(), tx);
  tracing::debug!(name = %name, "Inproc endpoint bound");
  Ok(InprocListener { name, incoming: rx })
}

impl InprocListener {
  pub fn name(&self) -> &str {
    &self.name
  }

  /// Waits for the next connecting transport.
  pub async fn accept(&self) -> Option<InprocConnection> {
    self.incoming.recv().await.ok()
  }
}

impl Drop for InprocListener {
  fn drop(&mut self) {
    bindings().lock().remove(&self.name);
    tracing::debug!(name = %self.name, "Inproc endpoint unbound");
  }
}

/// Client side of an in-process connection.
#[derive(Debug)]
pub struct InprocTransport {
  endpoint: String,
  name: String,
  link: Mutex<Option<InprocConnection>>,
}

impl InprocTransport {
  pub fn new(name: impl Into<String>) -> Self {
    let name = name.into();
    Self {
      endpoint: format!("inproc://{}", name),
      name,
      link: Mutex::new(None),
    }
  }

  fn current(&self) -> Result<InprocConnection, WampError> {
    self.link.lock().clone().ok_or(WampError::ConnectionClosed)
  }
}

#[async_trait]
impl Transport for InprocTransport {
  fn url(&self) -> &str {
    &self.endpoint
  }

  async fn connect(&self) -> Result<(), WampError> {
    if self.link.lock().as_ref().is_some_and(|link| !link.is_closed()) {
      return Err(WampError::InvalidState("transport already connected"));
    }
    let binder = bindings()
      .lock()
      .get(&self.name)
      .cloned()
      .ok_or_else(|| WampError::ConnectionRefused(self.endpoint.clone()))?;

    let (ours, theirs) = InprocConnection::pair();
    binder
      .send(theirs)
      .await
      .map_err(|_| WampError::ConnectionRefused(self.endpoint.clone()))?;
    *self.link.lock() = Some(ours);
    tracing::debug!(uri = %self.endpoint, "Inproc transport connected");
    Ok(())
  }

  async fn send(&self, frame: Bytes) -> Result<(), WampError> {
    self.current()?.send(frame).await
  }

  async fn receive(&self) -> Result<Option<Bytes>, WampError> {
    Ok(self.current()?.recv().await)
  }

  async fn disconnect(&self) -> Result<(), WampError> {
    if let Some(link) = self.link.lock().take() {
      link.close();
      tracing::debug!(uri = %self.endpoint, "Inproc transport disconnected");
    }
    Ok(())
  }
}
