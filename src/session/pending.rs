// src/session/pending.rs

use crate::error::WampError;
use crate::message::{Message, MessageCode, RequestId, MAX_ID};
use parking_lot::Mutex;
use std::collections::HashMap;
use tokio::sync::oneshot;

/// The request kinds that wait for a correlated response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
  Call,
  Register,
  Unregister,
  Subscribe,
  Unsubscribe,
  Publish,
}

impl RequestKind {
  /// The success response the router sends for this kind of request.
  pub fn expected_response(self) -> MessageCode {
    match self {
      RequestKind::Call => MessageCode::Result,
      RequestKind::Register => MessageCode::Registered,
      RequestKind::Unregister => MessageCode::Unregistered,
      RequestKind::Subscribe => MessageCode::Subscribed,
      RequestKind::Unsubscribe => MessageCode::Unsubscribed,
      RequestKind::Publish => MessageCode::Published,
    }
  }
}

pub(crate) type ReplyResult = Result<Message, WampError>;

/// Runs on the listener task when the expected success response arrives,
/// before the waiting caller is woken.
pub(crate) type OnResolved = Box<dyn FnOnce(&Message) + Send>;

struct PendingEntry {
  kind: RequestKind,
  ticket: u64,
  reply: oneshot::Sender<ReplyResult>,
  on_resolved: Option<OnResolved>,
}

struct PendingState {
  next_id: RequestId,
  next_ticket: u64,
  entries: HashMap<RequestId, PendingEntry>,
}

impl PendingState {
  fn allocate(&mut self) -> RequestId {
    loop {
      let candidate = self.next_id;
      self.next_id = if candidate >= MAX_ID { 1 } else { candidate + 1 };
      if !self.entries.contains_key(&candidate) {
        return candidate;
      }
    }
  }
}

/// Identifies one insertion into the table, so a stale owner can never
/// remove a later request that reuses the same id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PendingTicket {
  pub id: RequestId,
  ticket: u64,
}

/// Outstanding requests of one session, keyed by request id.
pub(crate) struct PendingRequests {
  state: Mutex<PendingState>,
}

impl std::fmt::Debug for PendingRequests {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("PendingRequests").field("outstanding", &self.len()).finish()
  }
}

impl PendingRequests {
  pub fn new() -> Self {
    Self {
      state: Mutex::new(PendingState {
        next_id: 1,
        next_ticket: 0,
        entries: HashMap::new(),
      }),
    }
  }

  /// Allocates a request id that no outstanding request uses and records
  /// the waiter for it.
  pub fn insert(
    &self,
    kind: RequestKind,
    on_resolved: Option<OnResolved>,
  ) -> (PendingTicket, oneshot::Receiver<ReplyResult>) {
    let (reply, rx) = oneshot::channel();
    let mut state = self.state.lock();
    let id = state.allocate();
    state.next_ticket += 1;
    let ticket = state.next_ticket;
    state.entries.insert(
      id,
      PendingEntry {
        kind,
        ticket,
        reply,
        on_resolved,
      },
    );
    (PendingTicket { id, ticket }, rx)
  }

  /// Allocates an id for a request that expects no response
  /// (an unacknowledged PUBLISH). Nothing is recorded.
  pub fn allocate_id(&self) -> RequestId {
    self.state.lock().allocate()
  }

  /// Hands `message` to the request it answers. Returns `false` when no
  /// request with that id is outstanding.
  pub fn resolve(&self, id: RequestId, message: Message) -> bool {
    let Some(entry) = self.state.lock().entries.remove(&id) else {
      return false;
    };
    if message.code() == entry.kind.expected_response() {
      if let Some(hook) = entry.on_resolved {
        hook(&message);
      }
    }
    // The waiter may have given up already; nothing to do then.
    let _ = entry.reply.send(Ok(message));
    true
  }

  /// Removes the entry owned by `ticket`, if it is still outstanding.
  pub fn cancel(&self, ticket: PendingTicket) -> bool {
    let mut state = self.state.lock();
    match state.entries.get(&ticket.id) {
      Some(entry) if entry.ticket == ticket.ticket => {
        state.entries.remove(&ticket.id);
        true
      }
      _ => false,
    }
  }

  /// Fails every outstanding request, e.g. when the connection is gone.
  pub fn fail_all(&self, make_error: impl Fn() -> WampError) -> usize {
    let drained: Vec<PendingEntry> = self.state.lock().entries.drain().map(|(_, e)| e).collect();
    let count = drained.len();
    for entry in drained {
      let _ = entry.reply.send(Err(make_error()));
    }
    count
  }

  #[cfg(test)]
  fn kind_of(&self, id: RequestId) -> Option<RequestKind> {
    self.state.lock().entries.get(&id).map(|e| e.kind)
  }

  #[cfg(test)]
  fn contains(&self, id: RequestId) -> bool {
    self.state.lock().entries.contains_key(&id)
  }

  pub fn len(&self) -> usize {
    self.state.lock().entries.len()
  }

  #[cfg(test)]
  fn set_next_id(&self, id: RequestId) {
    self.state.lock().next_id = id;
  }
}

/// Removes its pending entry when dropped, whatever way the wait ended.
pub(crate) struct PendingGuard<'a> {
  table: &'a PendingRequests,
  ticket: PendingTicket,
}

impl<'a> PendingGuard<'a> {
  pub fn new(table: &'a PendingRequests, ticket: PendingTicket) -> Self {
    Self { table, ticket }
  }
}

impl Drop for PendingGuard<'_> {
  fn drop(&mut self) {
    if self.table.cancel(self.ticket) {
      tracing::trace!(request_id = self.ticket.id, "Pending request released without a response");
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::message::Dict;
  use std::collections::HashSet;
  use std::sync::atomic::{AtomicBool, Ordering};
  use std::sync::Arc;

  fn result_for(request: RequestId) -> Message {
    Message::Result {
      request,
      details: Dict::new(),
      args: vec![],
      kwargs: Dict::new(),
    }
  }

  #[test]
  fn outstanding_ids_are_unique() {
    let table = PendingRequests::new();
    let mut seen = HashSet::new();
    let mut receivers = Vec::new();
    for _ in 0..1000 {
      let (ticket, rx) = table.insert(RequestKind::Call, None);
      assert!(seen.insert(ticket.id), "duplicate id {}", ticket.id);
      receivers.push(rx);
    }
    assert_eq!(table.len(), 1000);
  }

  #[test]
  fn allocation_skips_ids_still_outstanding_after_wrap() {
    let table = PendingRequests::new();
    let (first, _rx1) = table.insert(RequestKind::Call, None);
    assert_eq!(first.id, 1);
    table.set_next_id(MAX_ID);
    let (last, _rx2) = table.insert(RequestKind::Call, None);
    assert_eq!(last.id, MAX_ID);
    // Wraps to 1, which is still pending, so 2 is handed out.
    let (wrapped, _rx3) = table.insert(RequestKind::Call, None);
    assert_eq!(wrapped.id, 2);
    // Fire-and-forget ids advance the same counter without recording anything.
    assert_eq!(table.allocate_id(), 3);
    assert!(!table.contains(3));
  }

  #[tokio::test]
  async fn resolve_reaches_only_the_matching_request() {
    let table = PendingRequests::new();
    let (a, rx_a) = table.insert(RequestKind::Call, None);
    let (b, mut rx_b) = table.insert(RequestKind::Call, None);

    assert!(table.resolve(a.id, result_for(a.id)));
    let got = rx_a.await.unwrap().unwrap();
    assert_eq!(got.correlation_id(), Some(a.id));
    assert!(rx_b.try_recv().is_err());
    assert!(table.contains(b.id));
    assert!(!table.contains(a.id));
    assert!(!table.resolve(a.id, result_for(a.id)));
  }

  #[test]
  fn hooks_run_only_for_the_expected_response() {
    let table = PendingRequests::new();
    let fired = Arc::new(AtomicBool::new(false));
    let flag = fired.clone();
    let (ticket, _rx) = table.insert(
      RequestKind::Register,
      Some(Box::new(move |_| flag.store(true, Ordering::SeqCst))),
    );
    let error = Message::Error {
      request_type: MessageCode::Register.as_u64(),
      request: ticket.id,
      details: Dict::new(),
      error: "wamp.error.procedure_already_exists".into(),
      args: vec![],
      kwargs: Dict::new(),
    };
    table.resolve(ticket.id, error);
    assert!(!fired.load(Ordering::SeqCst));

    let flag = fired.clone();
    let (ticket, _rx) = table.insert(
      RequestKind::Register,
      Some(Box::new(move |_| flag.store(true, Ordering::SeqCst))),
    );
    table.resolve(
      ticket.id,
      Message::Registered {
        request: ticket.id,
        registration: 7,
      },
    );
    assert!(fired.load(Ordering::SeqCst));
  }

  #[test]
  fn guard_releases_the_entry_and_ignores_stale_tickets() {
    let table = PendingRequests::new();
    let (ticket, _rx) = table.insert(RequestKind::Subscribe, None);
    {
      let _guard = PendingGuard::new(&table, ticket);
      assert_eq!(table.kind_of(ticket.id), Some(RequestKind::Subscribe));
    }
    assert!(!table.contains(ticket.id));

    // A later request that reuses the id is untouched by the old ticket.
    table.set_next_id(ticket.id);
    let (reused, _rx2) = table.insert(RequestKind::Call, None);
    assert_eq!(reused.id, ticket.id);
    assert!(!table.cancel(ticket));
    assert!(table.contains(reused.id));
  }

  #[tokio::test]
  async fn fail_all_wakes_every_waiter() {
    let table = PendingRequests::new();
    let (_a, rx_a) = table.insert(RequestKind::Call, None);
    let (_b, rx_b) = table.insert(RequestKind::Unsubscribe, None);
    assert_eq!(table.fail_all(|| WampError::ConnectionClosed), 2);
    assert!(matches!(rx_a.await.unwrap(), Err(WampError::ConnectionClosed)));
    assert!(matches!(rx_b.await.unwrap(), Err(WampError::ConnectionClosed)));
    assert_eq!(table.len(), 0);
  }
}
