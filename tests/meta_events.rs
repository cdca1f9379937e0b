// tests/meta_events.rs

use rwamp::message::Dict;
use rwamp::protocol::uri;
use rwamp::{event_handler_fn, procedure_fn, Event, Invocation, Payload, Session, WampError};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
mod common;

use common::{eventually, joined_session, test_router, MockRouter, LONG_TIMEOUT};

#[derive(Default)]
struct MetaCounts {
  on_create: AtomicUsize,
  on_register: AtomicUsize,
  on_unregister: AtomicUsize,
}

impl MetaCounts {
  fn get(&self, which: &AtomicUsize) -> usize {
    which.load(Ordering::SeqCst)
  }
}

/// A session subscribed to the three registration meta topics.
async fn meta_client(router: &MockRouter) -> Result<(Session, Arc<MetaCounts>), WampError> {
  let session = joined_session(router).await;
  let counts = Arc::new(MetaCounts::default());
  let topics = [
    uri::REGISTRATION_ON_CREATE,
    uri::REGISTRATION_ON_REGISTER,
    uri::REGISTRATION_ON_UNREGISTER,
  ];
  for topic in topics {
    let counts = counts.clone();
    session
      .subscribe(
        topic,
        event_handler_fn(move |event: Event| {
          let counts = counts.clone();
          async move {
            let counter = match event.topic.as_str() {
              uri::REGISTRATION_ON_CREATE => &counts.on_create,
              uri::REGISTRATION_ON_REGISTER => &counts.on_register,
              _ => &counts.on_unregister,
            };
            counter.fetch_add(1, Ordering::SeqCst);
          }
        }),
      )
      .await?;
  }
  Ok((session, counts))
}

fn foo() -> impl rwamp::Procedure {
  procedure_fn(|_inv: Invocation| async { Ok(Payload::new()) })
}

#[tokio::test]
async fn test_on_create() -> Result<(), WampError> {
  let router = test_router("meta_on_create");
  let (meta, counts) = meta_client(&router).await?;
  assert_eq!(counts.get(&counts.on_create), 0);

  let callee = joined_session(&router).await;
  callee.register("foo", foo()).await?;
  assert!(eventually(LONG_TIMEOUT, || counts.get(&counts.on_create) == 1).await);

  callee.end().await;
  meta.end().await;
  Ok(())
}

#[tokio::test]
async fn test_on_register() -> Result<(), WampError> {
  let router = test_router("meta_on_register");
  let (meta, counts) = meta_client(&router).await?;

  let callee = joined_session(&router).await;
  callee.register("foo", foo()).await?;
  let caller = joined_session(&router).await;
  caller.call("foo", vec![], Dict::new()).await?;
  caller.end().await;

  assert!(eventually(LONG_TIMEOUT, || counts.get(&counts.on_register) == 1).await);
  // Calls do not produce registration events.
  tokio::time::sleep(Duration::from_millis(100)).await;
  assert_eq!(counts.get(&counts.on_register), 1);

  callee.end().await;
  meta.end().await;
  Ok(())
}

#[tokio::test]
async fn test_on_unregister() -> Result<(), WampError> {
  let router = test_router("meta_on_unregister");
  let (meta, counts) = meta_client(&router).await?;
  assert_eq!(counts.get(&counts.on_unregister), 0);

  let callee = joined_session(&router).await;
  callee.register("foo", foo()).await?;
  callee.end().await;

  assert!(eventually(LONG_TIMEOUT, || counts.get(&counts.on_unregister) == 1).await);
  meta.end().await;
  Ok(())
}

#[tokio::test]
async fn test_meta_events_carry_the_callee_session() -> Result<(), WampError> {
  let router = test_router("meta_payload");
  let watcher = joined_session(&router).await;
  let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
  watcher
    .subscribe(
      uri::REGISTRATION_ON_REGISTER,
      event_handler_fn(move |event: Event| {
        let tx = tx.clone();
        async move {
          let _ = tx.send(event.args);
        }
      }),
    )
    .await?;

  let callee = joined_session(&router).await;
  let id = callee.register("foo", foo()).await?;
  let args = tokio::time::timeout(LONG_TIMEOUT, rx.recv()).await.ok().flatten().expect("on_register");
  assert_eq!(args, vec![json!(callee.id().unwrap()), json!(id)]);

  callee.end().await;
  watcher.end().await;
  Ok(())
}
