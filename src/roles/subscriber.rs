// src/roles/subscriber.rs

use crate::message::{Dict, List, PublicationId, SubscriptionId};
use async_trait::async_trait;
use std::fmt;
use std::future::Future;

/// An EVENT delivered to a local subscription.
#[derive(Debug, Clone)]
pub struct Event {
  pub subscription: SubscriptionId,
  pub publication: PublicationId,
  pub topic: String,
  pub details: Dict,
  pub args: List,
  pub kwargs: Dict,
}

/// Receives the events of one subscription.
#[async_trait]
pub trait EventHandler: Send + Sync + 'static {
  async fn on_event(&self, event: Event);
}

pub struct EventHandlerFn<F> {
  f: F,
}

/// Wraps an async closure so it can be passed to `Session::subscribe`.
pub fn event_handler_fn<F, Fut>(f: F) -> EventHandlerFn<F>
where
  F: Fn(Event) -> Fut + Send + Sync + 'static,
  Fut: Future<Output = ()> + Send + 'static,
{
  EventHandlerFn { f }
}

#[async_trait]
impl<F, Fut> EventHandler for EventHandlerFn<F>
where
  F: Fn(Event) -> Fut + Send + Sync + 'static,
  Fut: Future<Output = ()> + Send + 'static,
{
  async fn on_event(&self, event: Event) {
    (self.f)(event).await
  }
}

impl<F> fmt::Debug for EventHandlerFn<F> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("EventHandlerFn").finish_non_exhaustive()
  }
}
