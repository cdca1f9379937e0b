// src/session/listener.rs

use super::SessionInner;
use crate::error::WampError;
use crate::protocol::Codec;
use crate::transport::Transport;

use std::sync::{Arc, Weak};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Why the listener loop stopped.
#[derive(Debug)]
enum ExitReason {
  Cancelled,
  SessionDropped,
  PeerClosed,
  Transport(WampError),
  Decode(WampError),
}

/// Handle on the background task that reads the transport.
#[derive(Debug)]
pub(crate) struct ListenerHandle {
  cancel: CancellationToken,
  join: JoinHandle<()>,
}

impl ListenerHandle {
  /// Starts the listener for one connection. `epoch` identifies that
  /// connection so late work from a previous one can be recognised.
  pub fn spawn(
    session: Weak<SessionInner>,
    transport: Arc<dyn Transport>,
    codec: Arc<dyn Codec>,
    epoch: u64,
  ) -> Self {
    let cancel = CancellationToken::new();
    let join = tokio::spawn(run_listener(session, transport, codec, cancel.clone(), epoch));
    Self { cancel, join }
  }

  /// False once the loop has exited or been asked to.
  pub fn is_running(&self) -> bool {
    !self.cancel.is_cancelled()
  }

  /// Signals the loop without waiting for it.
  pub fn cancel(&self) {
    self.cancel.cancel();
  }

  /// Cancels the loop and waits for it to finish. Must not be called from
  /// the listener task itself.
  pub async fn stop(self) {
    self.cancel.cancel();
    if let Err(e) = self.join.await {
      if e.is_panic() {
        tracing::error!("Listener task panicked: {}", e);
      }
    }
  }
}

async fn run_listener(
  session: Weak<SessionInner>,
  transport: Arc<dyn Transport>,
  codec: Arc<dyn Codec>,
  cancel: CancellationToken,
  epoch: u64,
) {
  tracing::debug!(uri = %transport.url(), epoch, "Listener started");

  let reason = loop {
    let received = tokio::select! {
      biased;
      _ = cancel.cancelled() => break ExitReason::Cancelled,
      received = transport.receive() => received,
    };

    let frame = match received {
      Ok(Some(frame)) => frame,
      Ok(None) => break ExitReason::PeerClosed,
      Err(e) => break ExitReason::Transport(e),
    };
    tracing::trace!(uri = %transport.url(), len = frame.len(), "Frame received");

    let message = match codec.decode(&frame) {
      Ok(message) => message,
      Err(e) => break ExitReason::Decode(e),
    };

    let Some(inner) = session.upgrade() else {
      break ExitReason::SessionDropped;
    };
    inner.route(message, epoch);
  };

  // Mark the connection dead before failing waiters, so a request that
  // registers itself after the sweep still sees the cancellation.
  cancel.cancel();

  match &reason {
    ExitReason::Cancelled => tracing::debug!(uri = %transport.url(), epoch, "Listener stopped"),
    ExitReason::SessionDropped => {
      tracing::debug!(uri = %transport.url(), epoch, "Session dropped, closing transport");
      if let Err(e) = transport.disconnect().await {
        tracing::warn!(uri = %transport.url(), error = %e, "Transport disconnect failed");
      }
    }
    ExitReason::PeerClosed => tracing::info!(uri = %transport.url(), epoch, "Router closed the connection"),
    ExitReason::Transport(e) => tracing::error!(uri = %transport.url(), epoch, error = %e, "Transport receive failed"),
    ExitReason::Decode(e) => tracing::error!(uri = %transport.url(), epoch, error = %e, "Undecodable frame, dropping connection"),
  }

  if let Some(inner) = session.upgrade() {
    let lost = !matches!(reason, ExitReason::Cancelled);
    inner.on_listener_exit(epoch, lost);
  }
}
