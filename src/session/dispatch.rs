// src/session/dispatch.rs

//! Receive-path routing: correlated responses go to the pending table,
//! pushed EVENT/INVOCATION messages run on their own tasks, and session
//! control traffic goes to whoever waits for it.

use super::SessionInner;
use crate::message::{Dict, List, Message, MessageCode, MessageShape, RegistrationId, RequestId, SubscriptionId};
use crate::protocol::uri;
use crate::roles::{Event, Invocation};

use futures::FutureExt;
use serde_json::Value;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

impl SessionInner {
  /// Called on the listener task for every decoded message. Never blocks:
  /// anything that may wait is spawned.
  pub(crate) fn route(self: &Arc<Self>, message: Message, epoch: u64) {
    let code = message.code();
    tracing::trace!(code = code.as_u64(), kind = code.name(), "Routing inbound message");

    match code.shape() {
      MessageShape::Response => {
        // Resolved on the listener task itself: `resolve` and its hooks only
        // take short locks and must never await.
        let Some(request_id) = message.correlation_id() else {
          return;
        };
        if !self.pending.resolve(request_id, message) {
          tracing::debug!(request_id, kind = code.name(), "Response for no outstanding request, dropped");
        }
      }
      MessageShape::Control => {
        let waiter = self.control_waiter.lock().take();
        match waiter {
          Some(waiter) => {
            if let Err(unclaimed) = waiter.send(message) {
              tracing::debug!(kind = unclaimed.code().name(), "Control waiter gone, message dropped");
            }
          }
          None => {
            let inner = self.clone();
            tokio::spawn(async move { inner.on_unsolicited_control(message, epoch).await });
          }
        }
      }
      MessageShape::Push => {
        let inner = self.clone();
        tokio::spawn(async move {
          match message {
            Message::Event {
              subscription,
              publication,
              details,
              args,
              kwargs,
            } => inner.dispatch_event(subscription, publication, details, args, kwargs).await,
            Message::Invocation {
              request,
              registration,
              details,
              args,
              kwargs,
            } => inner.dispatch_invocation(request, registration, details, args, kwargs).await,
            _ => {}
          }
        });
      }
      MessageShape::Outbound => {
        tracing::warn!(kind = code.name(), "Router sent a client-only message, dropped");
      }
    }
  }

  async fn dispatch_event(
    &self,
    subscription: SubscriptionId,
    publication: u64,
    details: Dict,
    args: List,
    kwargs: Dict,
  ) {
    let Some((topic, handler)) = self.subscriptions.handler_for(subscription) else {
      tracing::debug!(subscription, publication, "EVENT for unknown subscription, dropped");
      return;
    };
    tracing::trace!(subscription, publication, uri = %topic, "Delivering EVENT");
    let event = Event {
      subscription,
      publication,
      topic,
      details,
      args,
      kwargs,
    };
    if AssertUnwindSafe(handler.on_event(event)).catch_unwind().await.is_err() {
      tracing::error!(subscription, publication, "Event handler panicked");
    }
  }

  async fn dispatch_invocation(
    &self,
    request: RequestId,
    registration: RegistrationId,
    details: Dict,
    args: List,
    kwargs: Dict,
  ) {
    let Some((procedure, handler)) = self.registrations.handler_for(registration) else {
      tracing::debug!(request_id = request, registration, "INVOCATION for unknown registration");
      let reply = invocation_error(
        request,
        uri::ERROR_NO_SUCH_REGISTRATION.to_string(),
        vec![Value::from(format!(
          "no registration with ID {} exists on this callee",
          registration
        ))],
        Dict::new(),
      );
      self.send_reply(reply).await;
      return;
    };

    tracing::debug!(request_id = request, registration, uri = %procedure, "Invoking procedure");
    let invocation = Invocation {
      request,
      registration,
      procedure: procedure.clone(),
      details,
      args,
      kwargs,
    };
    let reply = match AssertUnwindSafe(handler.invoke(invocation)).catch_unwind().await {
      Ok(Ok(payload)) => Message::Yield {
        request,
        options: Dict::new(),
        args: payload.args,
        kwargs: payload.kwargs,
      },
      Ok(Err(call_error)) => {
        tracing::debug!(request_id = request, uri = %procedure, error = %call_error.uri, "Procedure returned an error");
        invocation_error(request, call_error.uri, call_error.args, call_error.kwargs)
      }
      Err(_) => {
        tracing::error!(request_id = request, uri = %procedure, "Procedure panicked");
        invocation_error(
          request,
          uri::ERROR_RUNTIME_ERROR.to_string(),
          vec![Value::from(format!("procedure {} panicked", procedure))],
          Dict::new(),
        )
      }
    };
    self.send_reply(reply).await;
  }

  async fn send_reply(&self, reply: Message) {
    if let Err(e) = self.transmit(&reply).await {
      tracing::warn!(kind = reply.code().name(), error = %e, "Could not answer INVOCATION");
    }
  }

  /// GOODBYE or ABORT from the router with nobody waiting for it.
  async fn on_unsolicited_control(self: Arc<Self>, message: Message, epoch: u64) {
    match message {
      Message::Goodbye { reason, .. } => {
        if !self.is_current(epoch) {
          return;
        }
        tracing::info!(uri = %reason, "Router closed the session");
        if let Err(e) = self.transmit(&Message::goodbye(uri::CLOSE_GOODBYE_AND_OUT)).await {
          tracing::warn!(error = %e, "Could not answer router GOODBYE");
        }
        self.close_locally(epoch, "router goodbye").await;
      }
      Message::Abort { reason, .. } => {
        tracing::warn!(uri = %reason, "Router aborted the session");
        self.close_locally(epoch, "router abort").await;
      }
      other => {
        tracing::warn!(kind = other.code().name(), "Unexpected session control message, dropped");
      }
    }
  }
}

fn invocation_error(request: RequestId, error: String, args: List, kwargs: Dict) -> Message {
  Message::Error {
    request_type: MessageCode::Invocation.as_u64(),
    request,
    details: Dict::new(),
    error,
    args,
    kwargs,
  }
}
