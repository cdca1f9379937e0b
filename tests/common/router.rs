// tests/common/router.rs

//! A small in-process WAMP router: enough dealer and broker behaviour to
//! drive a client session end to end, including the registration meta API.

use parking_lot::Mutex;
use rwamp::message::{Dict, List, Message, MessageCode, RegistrationId, RequestId, SessionId, SubscriptionId};
use rwamp::protocol::{uri, Codec, JsonCodec};
use rwamp::transport::{bind_inproc, InprocConnection};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
pub struct RouterConfig {
  pub realm: String,
  /// When false, HELLO is swallowed and the client's handshake times out.
  pub answer_hello: bool,
  /// When false, a client GOODBYE is not answered before the router hangs up.
  pub answer_goodbye: bool,
}

impl Default for RouterConfig {
  fn default() -> Self {
    Self {
      realm: "realm1".into(),
      answer_hello: true,
      answer_goodbye: true,
    }
  }
}

struct RouterRegistration {
  uri: String,
  session: SessionId,
  created: String,
  invoke: String,
}

struct RouterSubscription {
  topic: String,
  session: SessionId,
}

struct Forwarded {
  caller: SessionId,
  request: RequestId,
}

#[derive(Default)]
struct RouterState {
  next_id: u64,
  sessions: HashMap<SessionId, mpsc::UnboundedSender<Message>>,
  connections: HashMap<SessionId, InprocConnection>,
  closing: HashSet<SessionId>,
  registrations: HashMap<RegistrationId, RouterRegistration>,
  subscriptions: HashMap<SubscriptionId, RouterSubscription>,
  invocations: HashMap<RequestId, Forwarded>,
  inbound: Vec<(SessionId, Message)>,
}

impl RouterState {
  fn next_id(&mut self) -> u64 {
    self.next_id += 1;
    self.next_id
  }

  fn send(&self, session: SessionId, message: Message) {
    if let Some(tx) = self.sessions.get(&session) {
      let _ = tx.send(message);
    }
  }

  fn publish(&mut self, topic: &str, exclude: Option<SessionId>, args: List, kwargs: Dict) -> u64 {
    let publication = self.next_id();
    let targets: Vec<(SubscriptionId, SessionId)> = self
      .subscriptions
      .iter()
      .filter(|(_, s)| s.topic == topic && Some(s.session) != exclude)
      .map(|(id, s)| (*id, s.session))
      .collect();
    for (subscription, session) in targets {
      self.send(
        session,
        Message::Event {
          subscription,
          publication,
          details: Dict::new(),
          args: args.clone(),
          kwargs: kwargs.clone(),
        },
      );
    }
    publication
  }

  fn registration_info(&self, id: RegistrationId) -> Option<Value> {
    self.registrations.get(&id).map(|r| {
      json!({
        "id": id,
        "created": r.created,
        "uri": r.uri,
        "match": "exact",
        "invoke": r.invoke,
      })
    })
  }

  fn drop_session(&mut self, session: SessionId) {
    self.sessions.remove(&session);
    self.connections.remove(&session);
    self.closing.remove(&session);
    let owned: Vec<RegistrationId> = self
      .registrations
      .iter()
      .filter(|(_, r)| r.session == session)
      .map(|(id, _)| *id)
      .collect();
    for id in owned {
      self.registrations.remove(&id);
      self.publish(
        uri::REGISTRATION_ON_UNREGISTER,
        None,
        vec![json!(session), json!(id)],
        Dict::new(),
      );
    }
    self.subscriptions.retain(|_, s| s.session != session);
  }
}

struct Shared {
  config: RouterConfig,
  state: Mutex<RouterState>,
}

/// A running mock router reachable at `inproc://<name>`.
pub struct MockRouter {
  endpoint: String,
  shared: Arc<Shared>,
  accept_task: JoinHandle<()>,
}

impl MockRouter {
  pub fn start(name: &str) -> MockRouter {
    Self::with_config(name, RouterConfig::default())
  }

  pub fn with_config(name: &str, config: RouterConfig) -> MockRouter {
    let listener = bind_inproc(name).expect("bind mock router");
    let shared = Arc::new(Shared {
      config,
      state: Mutex::new(RouterState::default()),
    });
    let accept_shared = shared.clone();
    let accept_task = tokio::spawn(async move {
      while let Some(connection) = listener.accept().await {
        tokio::spawn(serve(connection, accept_shared.clone()));
      }
    });
    MockRouter {
      endpoint: format!("inproc://{}", name),
      shared,
      accept_task,
    }
  }

  pub fn endpoint(&self) -> &str {
    &self.endpoint
  }

  pub fn session_count(&self) -> usize {
    self.shared.state.lock().sessions.len()
  }

  pub fn registration_count(&self) -> usize {
    self.shared.state.lock().registrations.len()
  }

  /// Closes `session` from the router side with a GOODBYE.
  pub fn kick(&self, session: SessionId, reason: &str) -> bool {
    let mut state = self.shared.state.lock();
    if !state.sessions.contains_key(&session) {
      return false;
    }
    state.closing.insert(session);
    state.send(session, Message::goodbye(reason));
    true
  }

  /// Drops the connection of `session` without any WAMP goodbye.
  pub fn sever(&self, session: SessionId) -> bool {
    let connection = self.shared.state.lock().connections.remove(&session);
    match connection {
      Some(connection) => {
        connection.close();
        true
      }
      None => false,
    }
  }

  /// Pushes an arbitrary message to `session`.
  pub fn push(&self, session: SessionId, message: Message) -> bool {
    let state = self.shared.state.lock();
    let known = state.sessions.contains_key(&session);
    state.send(session, message);
    known
  }

  /// Every message of kind `code` the router received so far, with its sender.
  pub fn received(&self, code: MessageCode) -> Vec<(SessionId, Message)> {
    self
      .shared
      .state
      .lock()
      .inbound
      .iter()
      .filter(|(_, m)| m.code() == code)
      .cloned()
      .collect()
  }
}

impl Drop for MockRouter {
  fn drop(&mut self) {
    self.accept_task.abort();
  }
}

async fn serve(connection: InprocConnection, shared: Arc<Shared>) {
  let codec = JsonCodec::new();
  let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
  let writer_connection = connection.clone();
  let writer = tokio::spawn(async move {
    while let Some(message) = rx.recv().await {
      let Ok(frame) = JsonCodec::new().encode(&message) else {
        continue;
      };
      if writer_connection.send(frame).await.is_err() {
        break;
      }
    }
  });

  let mut session: Option<SessionId> = None;
  while let Some(frame) = connection.recv().await {
    let Ok(message) = codec.decode(&frame) else {
      break;
    };
    match (session, message) {
      (None, Message::Hello { realm, .. }) => {
        if !shared.config.answer_hello {
          continue;
        }
        if realm != shared.config.realm {
          let mut details = Dict::new();
          details.insert("message".into(), json!(format!("no realm \"{}\" exists on this router", realm)));
          let _ = tx.send(Message::Abort {
            details,
            reason: uri::ERROR_NO_SUCH_REALM.into(),
          });
          break;
        }
        let mut state = shared.state.lock();
        let id = state.next_id();
        state.sessions.insert(id, tx.clone());
        state.connections.insert(id, connection.clone());
        let mut details = Dict::new();
        details.insert("roles".into(), json!({"dealer": {}, "broker": {}}));
        state.send(id, Message::Welcome { session: id, details });
        session = Some(id);
      }
      (None, _) => break,
      (Some(id), message @ Message::Goodbye { .. }) => {
        let mut state = shared.state.lock();
        state.inbound.push((id, message));
        let kicked = state.closing.contains(&id);
        if !kicked && shared.config.answer_goodbye {
          state.send(id, Message::goodbye(uri::CLOSE_GOODBYE_AND_OUT));
        }
        state.drop_session(id);
        session = None;
        break;
      }
      (Some(id), message) => {
        let mut state = shared.state.lock();
        state.inbound.push((id, message.clone()));
        handle(&mut state, id, message);
      }
    }
  }

  if let Some(id) = session {
    shared.state.lock().drop_session(id);
  }
  drop(tx);
  let _ = writer.await;
  connection.close();
}

fn error_reply(request_type: MessageCode, request: RequestId, error: &str, args: List) -> Message {
  Message::Error {
    request_type: request_type.as_u64(),
    request,
    details: Dict::new(),
    error: error.into(),
    args,
    kwargs: Dict::new(),
  }
}

fn result_reply(request: RequestId, value: Value) -> Message {
  Message::Result {
    request,
    details: Dict::new(),
    args: vec![value],
    kwargs: Dict::new(),
  }
}

fn handle(state: &mut RouterState, session: SessionId, message: Message) {
  match message {
    Message::Register {
      request,
      options,
      procedure,
    } => {
      if state.registrations.values().any(|r| r.uri == procedure) {
        let reply = error_reply(MessageCode::Register, request, uri::ERROR_PROCEDURE_ALREADY_EXISTS, vec![]);
        state.send(session, reply);
        return;
      }
      let id = state.next_id();
      let created = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_default();
      let invoke = options
        .get("invoke")
        .and_then(Value::as_str)
        .unwrap_or("single")
        .to_string();
      state.registrations.insert(
        id,
        RouterRegistration {
          uri: procedure,
          session,
          created,
          invoke,
        },
      );
      state.send(session, Message::Registered { request, registration: id });
      let info = state.registration_info(id).unwrap_or(Value::Null);
      state.publish(uri::REGISTRATION_ON_CREATE, None, vec![json!(session), info], Dict::new());
      state.publish(uri::REGISTRATION_ON_REGISTER, None, vec![json!(session), json!(id)], Dict::new());
    }
    Message::Unregister { request, registration } => {
      let owned = state
        .registrations
        .get(&registration)
        .is_some_and(|r| r.session == session);
      if !owned {
        let reply = error_reply(MessageCode::Unregister, request, uri::ERROR_NO_SUCH_REGISTRATION, vec![]);
        state.send(session, reply);
        return;
      }
      state.registrations.remove(&registration);
      state.send(session, Message::Unregistered { request });
      state.publish(
        uri::REGISTRATION_ON_UNREGISTER,
        None,
        vec![json!(session), json!(registration)],
        Dict::new(),
      );
    }
    Message::Call {
      request,
      procedure,
      args,
      kwargs,
      ..
    } => handle_call(state, session, request, procedure, args, kwargs),
    Message::Yield {
      request, args, kwargs, ..
    } => {
      if let Some(forwarded) = state.invocations.remove(&request) {
        let reply = Message::Result {
          request: forwarded.request,
          details: Dict::new(),
          args,
          kwargs,
        };
        state.send(forwarded.caller, reply);
      }
    }
    Message::Error {
      request_type,
      request,
      error,
      args,
      kwargs,
      ..
    } if request_type == MessageCode::Invocation.as_u64() => {
      if let Some(forwarded) = state.invocations.remove(&request) {
        let reply = Message::Error {
          request_type: MessageCode::Call.as_u64(),
          request: forwarded.request,
          details: Dict::new(),
          error,
          args,
          kwargs,
        };
        state.send(forwarded.caller, reply);
      }
    }
    Message::Subscribe { request, topic, .. } => {
      let id = state.next_id();
      state.subscriptions.insert(id, RouterSubscription { topic, session });
      state.send(session, Message::Subscribed { request, subscription: id });
    }
    Message::Unsubscribe { request, subscription } => {
      let owned = state
        .subscriptions
        .get(&subscription)
        .is_some_and(|s| s.session == session);
      if owned {
        state.subscriptions.remove(&subscription);
        state.send(session, Message::Unsubscribed { request });
      } else {
        let reply = error_reply(MessageCode::Unsubscribe, request, uri::ERROR_NO_SUCH_SUBSCRIPTION, vec![]);
        state.send(session, reply);
      }
    }
    Message::Publish {
      request,
      options,
      topic,
      args,
      kwargs,
    } => {
      let publication = state.publish(&topic, Some(session), args, kwargs);
      if options.get("acknowledge") == Some(&Value::Bool(true)) {
        state.send(session, Message::Published { request, publication });
      }
    }
    _ => {}
  }
}

fn handle_call(state: &mut RouterState, session: SessionId, request: RequestId, procedure: String, args: List, kwargs: Dict) {
  match procedure.as_str() {
    uri::REGISTRATION_LIST => {
      let mut exact: Vec<RegistrationId> = state.registrations.keys().copied().collect();
      exact.sort_unstable();
      let reply = result_reply(request, json!({"exact": exact, "prefix": [], "wildcard": []}));
      state.send(session, reply);
    }
    uri::REGISTRATION_LOOKUP => {
      let name = args.first().and_then(Value::as_str).unwrap_or_default();
      let found = state
        .registrations
        .iter()
        .find(|(_, r)| r.uri == name)
        .map(|(id, _)| json!(id))
        .unwrap_or(Value::Null);
      state.send(session, result_reply(request, found));
    }
    uri::REGISTRATION_GET => {
      let requested = args.first().cloned().unwrap_or(Value::Null);
      let info = requested.as_u64().and_then(|id| state.registration_info(id));
      let reply = match info {
        Some(info) => result_reply(request, info),
        None => {
          let shown = match &requested {
            Value::String(s) => s.clone(),
            other => other.to_string(),
          };
          error_reply(
            MessageCode::Call,
            request,
            uri::ERROR_NO_SUCH_REGISTRATION,
            vec![json!(format!("no registration with ID {} exists on this dealer", shown))],
          )
        }
      };
      state.send(session, reply);
    }
    _ => {
      let target = state
        .registrations
        .iter()
        .find(|(_, r)| r.uri == procedure)
        .map(|(id, r)| (*id, r.session));
      let Some((registration, callee)) = target else {
        let reply = error_reply(MessageCode::Call, request, uri::ERROR_NO_SUCH_PROCEDURE, vec![]);
        state.send(session, reply);
        return;
      };
      let invocation = state.next_id();
      state.invocations.insert(invocation, Forwarded { caller: session, request });
      state.send(
        callee,
        Message::Invocation {
          request: invocation,
          registration,
          details: Dict::new(),
          args,
          kwargs,
        },
      );
    }
  }
}
