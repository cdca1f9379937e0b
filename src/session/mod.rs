// src/session/mod.rs

//! The WAMP client session: connection lifecycle, realm join, request
//! correlation and handler dispatch.

mod dispatch;
mod listener;
pub mod meta;
pub mod options;
mod pending;
mod registry;
mod state;

pub use meta::{RegistrationInfo, RegistrationList};
pub use options::{RawSocketOptions, SessionOptions};
pub use pending::RequestKind;
pub use registry::{RegistrationRecord, SubscriptionRecord};
pub use state::{CloseOutcome, SessionState, Welcome};

use crate::error::WampError;
use crate::message::{Dict, List, Message, PublicationId, RegistrationId, RequestId, SessionId, SubscriptionId};
use crate::protocol::{uri, Codec, JsonCodec};
use crate::roles::{EventHandler, InvocationPolicy, Procedure};
use crate::transport::{transport_for_endpoint, Transport};
use listener::ListenerHandle;
use pending::{OnResolved, PendingGuard, PendingRequests};
use registry::{RegistrationRegistry, SubscriptionRegistry};

use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{oneshot, Mutex as TokioMutex};

/// Payload and details of a RESULT.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallResult {
  pub args: List,
  pub kwargs: Dict,
  pub details: Dict,
}

impl CallResult {
  /// First positional result, if present.
  pub fn first(&self) -> Option<&Value> {
    self.args.first()
  }
}

/// A WAMP client session.
///
/// Cheap to clone; clones share one connection. A handler running on a
/// dispatch task may hold a clone and issue requests on it.
#[derive(Clone)]
pub struct Session {
  inner: Arc<SessionInner>,
}

pub(crate) struct SessionInner {
  options: SessionOptions,
  transport: Arc<dyn Transport>,
  codec: Arc<dyn Codec>,
  state: RwLock<SessionState>,
  /// Serialises `begin()`, `end()` and router-initiated teardown.
  lifecycle: TokioMutex<()>,
  /// Bumped for every connection, so stale listener work can be told apart.
  epoch: AtomicU64,
  pending: PendingRequests,
  registrations: RegistrationRegistry,
  subscriptions: SubscriptionRegistry,
  control_waiter: Mutex<Option<oneshot::Sender<Message>>>,
  listener: Mutex<Option<ListenerHandle>>,
}

impl fmt::Debug for Session {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Session")
      .field("url", &self.inner.transport.url())
      .field("realm", &self.inner.options.realm)
      .field("state", &*self.inner.state.read())
      .field("pending", &self.inner.pending)
      .finish()
  }
}

impl Session {
  /// Creates a disconnected session over `transport`. Call [`Session::begin`]
  /// to connect and join the realm.
  pub fn new(options: SessionOptions, transport: Arc<dyn Transport>, codec: Arc<dyn Codec>) -> Self {
    Self {
      inner: Arc::new(SessionInner {
        options,
        transport,
        codec,
        state: RwLock::new(SessionState::Disconnected),
        lifecycle: TokioMutex::new(()),
        epoch: AtomicU64::new(0),
        pending: PendingRequests::new(),
        registrations: RegistrationRegistry::new(),
        subscriptions: SubscriptionRegistry::new(),
        control_waiter: Mutex::new(None),
        listener: Mutex::new(None),
      }),
    }
  }

  /// Creates a JSON session for `url` (`tcp://host:port` or `inproc://name`)
  /// with default transport options. Nothing is connected yet.
  pub fn connect_to(url: &str, options: SessionOptions) -> Result<Self, WampError> {
    Self::connect_with(url, options, &RawSocketOptions::default())
  }

  pub fn connect_with(url: &str, options: SessionOptions, transport_options: &RawSocketOptions) -> Result<Self, WampError> {
    let codec: Arc<dyn Codec> = Arc::new(JsonCodec::new());
    let transport = transport_for_endpoint(url, transport_options, codec.rawsocket_serializer())?;
    Ok(Self::new(options, transport, codec))
  }

  pub fn options(&self) -> &SessionOptions {
    &self.inner.options
  }

  pub fn realm(&self) -> &str {
    &self.inner.options.realm
  }

  pub fn url(&self) -> &str {
    self.inner.transport.url()
  }

  pub fn state(&self) -> SessionState {
    *self.inner.state.read()
  }

  /// The router-assigned session id; `None` unless established.
  pub fn id(&self) -> Option<SessionId> {
    self.inner.state.read().session_id()
  }

  pub fn is_established(&self) -> bool {
    self.inner.state.read().is_established()
  }

  /// Opens the transport and joins the configured realm.
  ///
  /// Only valid on a disconnected session. On any failure the connection
  /// is closed again and the session stays disconnected.
  pub async fn begin(&self) -> Result<Welcome, WampError> {
    let inner = &self.inner;
    let _lifecycle = inner.lifecycle.lock().await;
    {
      let mut state = inner.state.write();
      if *state != SessionState::Disconnected {
        return Err(WampError::InvalidState("begin() requires a disconnected session"));
      }
      *state = SessionState::Connecting;
    }

    tracing::debug!(uri = %inner.transport.url(), realm = %inner.options.realm, "Connecting");
    if let Err(e) = inner.transport.connect().await {
      *inner.state.write() = SessionState::Disconnected;
      tracing::debug!(uri = %inner.transport.url(), error = %e, "Connect failed");
      return Err(WampError::connection(inner.transport.url(), e));
    }

    let epoch = inner.epoch.fetch_add(1, Ordering::SeqCst) + 1;
    let (reply_tx, reply_rx) = oneshot::channel();
    *inner.control_waiter.lock() = Some(reply_tx);
    *inner.listener.lock() = Some(ListenerHandle::spawn(
      Arc::downgrade(inner),
      inner.transport.clone(),
      inner.codec.clone(),
      epoch,
    ));

    match inner.join_realm(reply_rx).await {
      Ok(welcome) => {
        *inner.state.write() = SessionState::Established(welcome.session);
        tracing::info!(
          session_id = welcome.session,
          realm = %inner.options.realm,
          uri = %inner.transport.url(),
          "Session established"
        );
        Ok(welcome)
      }
      Err(e) => {
        tracing::debug!(realm = %inner.options.realm, error = %e, "Realm join failed");
        inner.teardown().await;
        Err(e)
      }
    }
  }

  /// Leaves the realm and closes the connection.
  ///
  /// The GOODBYE exchange is best effort and its result is reported in the
  /// returned [`CloseOutcome`]. Local teardown always happens, and calling
  /// this on a session that is not established does nothing.
  pub async fn end(&self) -> CloseOutcome {
    let inner = &self.inner;
    let _lifecycle = inner.lifecycle.lock().await;
    let session_id = {
      let mut state = inner.state.write();
      match *state {
        SessionState::Established(id) => {
          *state = SessionState::Closing;
          id
        }
        _ => return CloseOutcome::NotConnected,
      }
    };

    let outcome = if inner.is_linked() {
      inner.say_goodbye().await
    } else {
      tracing::debug!(session_id, "Connection already lost, skipping GOODBYE");
      CloseOutcome::SendFailed
    };
    inner.teardown().await;
    tracing::info!(session_id, outcome = ?outcome, "Session ended");
    outcome
  }

  /// Sends an arbitrary message on an established session.
  pub async fn send_message(&self, message: &Message) -> Result<(), WampError> {
    self.inner.ensure_established()?;
    self.inner.transmit(message).await
  }

  /// Calls `procedure` with the session's default call timeout.
  pub async fn call(&self, procedure: &str, args: List, kwargs: Dict) -> Result<CallResult, WampError> {
    self
      .call_with_timeout(procedure, args, kwargs, self.inner.options.call_timeout)
      .await
  }

  pub async fn call_with_timeout(
    &self,
    procedure: &str,
    args: List,
    kwargs: Dict,
    timeout: Duration,
  ) -> Result<CallResult, WampError> {
    let reply = self
      .inner
      .request(RequestKind::Call, timeout, None, |request| Message::Call {
        request,
        options: Dict::new(),
        procedure: procedure.to_string(),
        args,
        kwargs,
      })
      .await?;
    match reply {
      Message::Result { args, kwargs, details, .. } => Ok(CallResult { args, kwargs, details }),
      other => Err(unexpected(RequestKind::Call, &other)),
    }
  }

  /// Registers `handler` as `procedure` with the default invocation policy.
  pub async fn register<P: Procedure>(&self, procedure: &str, handler: P) -> Result<RegistrationId, WampError> {
    self
      .register_with_policy(procedure, handler, InvocationPolicy::default())
      .await
  }

  /// Registers `handler` as `procedure`. The registration is recorded
  /// locally before this returns, so no INVOCATION for it can be missed.
  pub async fn register_with_policy<P: Procedure>(
    &self,
    procedure: &str,
    handler: P,
    policy: InvocationPolicy,
  ) -> Result<RegistrationId, WampError> {
    let mut options = Dict::new();
    if policy != InvocationPolicy::Single {
      options.insert("invoke".into(), Value::from(policy.as_str()));
    }

    let weak = Arc::downgrade(&self.inner);
    let name = procedure.to_string();
    let handler: Arc<dyn Procedure> = Arc::new(handler);
    let on_registered: OnResolved = Box::new(move |reply| {
      if let (Message::Registered { registration, .. }, Some(inner)) = (reply, weak.upgrade()) {
        inner.registrations.insert(*registration, name, policy, handler);
      }
    });

    let reply = self
      .inner
      .request(
        RequestKind::Register,
        self.inner.options.call_timeout,
        Some(on_registered),
        |request| Message::Register {
          request,
          options,
          procedure: procedure.to_string(),
        },
      )
      .await?;
    match reply {
      Message::Registered { registration, .. } => {
        tracing::debug!(registration, uri = %procedure, policy = %policy, "Procedure registered");
        Ok(registration)
      }
      other => Err(unexpected(RequestKind::Register, &other)),
    }
  }

  pub async fn unregister(&self, registration: RegistrationId) -> Result<(), WampError> {
    let weak = Arc::downgrade(&self.inner);
    let on_unregistered: OnResolved = Box::new(move |_| {
      if let Some(inner) = weak.upgrade() {
        inner.registrations.remove(registration);
      }
    });
    self
      .inner
      .request(
        RequestKind::Unregister,
        self.inner.options.call_timeout,
        Some(on_unregistered),
        |request| Message::Unregister { request, registration },
      )
      .await?;
    tracing::debug!(registration, "Procedure unregistered");
    Ok(())
  }

  /// Subscribes `handler` to `topic`. Events for the new subscription are
  /// delivered from the moment the router confirms it.
  pub async fn subscribe<H: EventHandler>(&self, topic: &str, handler: H) -> Result<SubscriptionId, WampError> {
    self.subscribe_with_options(topic, handler, Dict::new()).await
  }

  /// Like [`Session::subscribe`] but passes SUBSCRIBE options (e.g. `match`)
  /// through to the router unchanged.
  pub async fn subscribe_with_options<H: EventHandler>(
    &self,
    topic: &str,
    handler: H,
    options: Dict,
  ) -> Result<SubscriptionId, WampError> {
    let weak = Arc::downgrade(&self.inner);
    let name = topic.to_string();
    let handler: Arc<dyn EventHandler> = Arc::new(handler);
    let on_subscribed: OnResolved = Box::new(move |reply| {
      if let (Message::Subscribed { subscription, .. }, Some(inner)) = (reply, weak.upgrade()) {
        inner.subscriptions.insert(*subscription, name, handler);
      }
    });

    let reply = self
      .inner
      .request(
        RequestKind::Subscribe,
        self.inner.options.call_timeout,
        Some(on_subscribed),
        |request| Message::Subscribe {
          request,
          options,
          topic: topic.to_string(),
        },
      )
      .await?;
    match reply {
      Message::Subscribed { subscription, .. } => {
        tracing::debug!(subscription, uri = %topic, "Subscribed");
        Ok(subscription)
      }
      other => Err(unexpected(RequestKind::Subscribe, &other)),
    }
  }

  pub async fn unsubscribe(&self, subscription: SubscriptionId) -> Result<(), WampError> {
    let weak = Arc::downgrade(&self.inner);
    let on_unsubscribed: OnResolved = Box::new(move |_| {
      if let Some(inner) = weak.upgrade() {
        inner.subscriptions.remove(subscription);
      }
    });
    self
      .inner
      .request(
        RequestKind::Unsubscribe,
        self.inner.options.call_timeout,
        Some(on_unsubscribed),
        |request| Message::Unsubscribe { request, subscription },
      )
      .await?;
    tracing::debug!(subscription, "Unsubscribed");
    Ok(())
  }

  /// Publishes to `topic`. Without `acknowledge` the PUBLISH is sent and
  /// `Ok(None)` returned at once; with it, the router's publication id is
  /// awaited and returned.
  pub async fn publish(
    &self,
    topic: &str,
    args: List,
    kwargs: Dict,
    acknowledge: bool,
  ) -> Result<Option<PublicationId>, WampError> {
    let mut options = Dict::new();
    if !acknowledge {
      self.inner.ensure_established()?;
      let message = Message::Publish {
        request: self.inner.pending.allocate_id(),
        options,
        topic: topic.to_string(),
        args,
        kwargs,
      };
      self.inner.transmit(&message).await?;
      return Ok(None);
    }

    options.insert("acknowledge".into(), Value::Bool(true));
    let reply = self
      .inner
      .request(RequestKind::Publish, self.inner.options.call_timeout, None, |request| {
        Message::Publish {
          request,
          options,
          topic: topic.to_string(),
          args,
          kwargs,
        }
      })
      .await?;
    match reply {
      Message::Published { publication, .. } => Ok(Some(publication)),
      other => Err(unexpected(RequestKind::Publish, &other)),
    }
  }

  /// Id of the local registration for `procedure`, if any.
  pub fn registration_id(&self, procedure: &str) -> Option<RegistrationId> {
    self.inner.registrations.id_for(procedure)
  }

  /// Snapshot of this peer's registrations, ordered by id.
  pub fn registrations(&self) -> Vec<RegistrationRecord> {
    self.inner.registrations.snapshot()
  }

  /// Snapshot of this peer's subscriptions, ordered by id.
  pub fn subscriptions(&self) -> Vec<SubscriptionRecord> {
    self.inner.subscriptions.snapshot()
  }

  /// Number of requests still waiting for a response.
  pub fn pending_requests(&self) -> usize {
    self.inner.pending.len()
  }
}

impl SessionInner {
  /// Sends HELLO and waits for the router's answer.
  async fn join_realm(&self, reply_rx: oneshot::Receiver<Message>) -> Result<Welcome, WampError> {
    let hello = Message::Hello {
      realm: self.options.realm.clone(),
      details: self.options.roles.hello_details(self.options.agent.as_deref()),
    };
    self.transmit(&hello).await?;

    let timeout = self.options.handshake_timeout;
    let reply = match tokio::time::timeout(timeout, reply_rx).await {
      Ok(Ok(reply)) => reply,
      Ok(Err(_)) => return Err(WampError::ConnectionClosed),
      Err(_) => return Err(WampError::Timeout(timeout)),
    };

    match reply {
      Message::Welcome { session, details } => Ok(Welcome { session, details }),
      Message::Abort { details, reason } => Err(WampError::Aborted {
        reason,
        message: details.get("message").and_then(Value::as_str).map(str::to_string),
      }),
      Message::Challenge { auth_method, .. } => Err(WampError::ProtocolViolation(format!(
        "router requested authentication ({}), which is not supported",
        auth_method
      ))),
      other => Err(WampError::ProtocolViolation(format!(
        "expected WELCOME or ABORT, got {}",
        other.code()
      ))),
    }
  }

  async fn say_goodbye(&self) -> CloseOutcome {
    let (reply_tx, reply_rx) = oneshot::channel();
    *self.control_waiter.lock() = Some(reply_tx);

    if let Err(e) = self.transmit(&Message::goodbye(uri::CLOSE_SYSTEM_SHUTDOWN)).await {
      tracing::warn!(error = %e, "Could not send GOODBYE");
      return CloseOutcome::SendFailed;
    }

    let timeout = self.options.goodbye_timeout;
    match tokio::time::timeout(timeout, reply_rx).await {
      Ok(Ok(Message::Goodbye { reason, .. })) => CloseOutcome::Acknowledged { reason },
      Ok(Ok(other)) => {
        tracing::warn!(kind = other.code().name(), "Expected GOODBYE reply");
        CloseOutcome::Unacknowledged
      }
      Ok(Err(_)) => {
        tracing::debug!("Connection closed before GOODBYE reply");
        CloseOutcome::Unacknowledged
      }
      Err(_) => {
        tracing::warn!(timeout = ?timeout, "No GOODBYE reply from router");
        CloseOutcome::Unacknowledged
      }
    }
  }

  /// Closes the connection and resets all per-connection state.
  async fn teardown(&self) {
    let handle = self.listener.lock().take();
    if let Some(handle) = handle {
      handle.stop().await;
    }
    if let Err(e) = self.transport.disconnect().await {
      tracing::warn!(uri = %self.transport.url(), error = %e, "Transport disconnect failed");
    }
    self.control_waiter.lock().take();
    let failed = self.pending.fail_all(|| WampError::ConnectionClosed);
    let registrations = self.registrations.clear();
    let subscriptions = self.subscriptions.clear();
    *self.state.write() = SessionState::Disconnected;
    tracing::debug!(failed, registrations, subscriptions, "Session state cleared");
  }

  /// Local teardown of connection `epoch` without a GOODBYE exchange, after
  /// the router closed the session or the connection was lost.
  async fn close_locally(&self, epoch: u64, cause: &'static str) {
    let _lifecycle = self.lifecycle.lock().await;
    if !self.is_current(epoch) {
      return;
    }
    let session_id = {
      let mut state = self.state.write();
      match *state {
        SessionState::Established(id) => {
          *state = SessionState::Closing;
          id
        }
        _ => return,
      }
    };
    self.teardown().await;
    tracing::info!(session_id, cause, "Session closed");
  }

  /// Called by the listener of connection `epoch` when it stops. When the
  /// connection was `lost` rather than stopped on purpose, the session is
  /// torn down so that it reads as disconnected and can `begin()` again.
  fn on_listener_exit(self: &Arc<Self>, epoch: u64, lost: bool) {
    if !self.is_current(epoch) {
      return;
    }
    self.control_waiter.lock().take();
    let failed = self.pending.fail_all(|| WampError::ConnectionClosed);
    if failed > 0 {
      tracing::debug!(failed, "Failed pending requests after connection loss");
    }
    if lost {
      // Teardown joins the listener, so it cannot run on the listener task.
      let inner = self.clone();
      tokio::spawn(async move { inner.close_locally(epoch, "connection lost").await });
    }
  }

  fn is_current(&self, epoch: u64) -> bool {
    self.epoch.load(Ordering::SeqCst) == epoch
  }

  fn is_linked(&self) -> bool {
    self.listener.lock().as_ref().is_some_and(ListenerHandle::is_running)
  }

  fn ensure_established(&self) -> Result<(), WampError> {
    if !self.state.read().is_established() {
      return Err(WampError::InvalidState("session is not established"));
    }
    if !self.is_linked() {
      return Err(WampError::ConnectionClosed);
    }
    Ok(())
  }

  async fn transmit(&self, message: &Message) -> Result<(), WampError> {
    let frame = self.codec.encode(message)?;
    tracing::trace!(kind = message.code().name(), len = frame.len(), "Sending message");
    self.transport.send(frame).await
  }

  /// Sends the request built by `build` under a fresh request id and waits
  /// for its response. The pending entry is released on every exit path,
  /// including the caller dropping this future.
  async fn request<F>(
    &self,
    kind: RequestKind,
    timeout: Duration,
    on_resolved: Option<OnResolved>,
    build: F,
  ) -> Result<Message, WampError>
  where
    F: FnOnce(RequestId) -> Message,
  {
    self.ensure_established()?;
    let (ticket, reply_rx) = self.pending.insert(kind, on_resolved);
    let _guard = PendingGuard::new(&self.pending, ticket);
    if !self.is_linked() {
      return Err(WampError::ConnectionClosed);
    }

    let message = build(ticket.id);
    tracing::trace!(request_id = ticket.id, kind = message.code().name(), "Request sent");
    self.transmit(&message).await?;

    let reply = match tokio::time::timeout(timeout, reply_rx).await {
      Ok(Ok(reply)) => reply?,
      Ok(Err(_)) => return Err(WampError::ConnectionClosed),
      Err(_) => {
        tracing::debug!(request_id = ticket.id, timeout = ?timeout, "Request timed out");
        return Err(WampError::Timeout(timeout));
      }
    };

    match reply {
      Message::Error { error, args, kwargs, .. } => {
        tracing::debug!(request_id = ticket.id, uri = %error, "Router returned ERROR");
        Err(WampError::Remote {
          uri: error,
          args,
          kwargs,
        })
      }
      reply => Ok(reply),
    }
  }
}

impl Drop for SessionInner {
  fn drop(&mut self) {
    if let Some(handle) = self.listener.get_mut().take() {
      handle.cancel();
    }
  }
}

fn unexpected(kind: RequestKind, reply: &Message) -> WampError {
  WampError::ProtocolViolation(format!(
    "expected {} in reply to {:?}, got {}",
    kind.expected_response(),
    kind,
    reply.code()
  ))
}

/// Lets handlers and helpers hold a session without keeping it alive.
#[derive(Clone, Debug)]
pub struct WeakSession {
  inner: Weak<SessionInner>,
}

impl WeakSession {
  pub fn upgrade(&self) -> Option<Session> {
    self.inner.upgrade().map(|inner| Session { inner })
  }
}

impl Session {
  /// A handle that does not keep the session alive, for handlers that need
  /// to call back into the session that invokes them.
  pub fn downgrade(&self) -> WeakSession {
    WeakSession {
      inner: Arc::downgrade(&self.inner),
    }
  }
}
