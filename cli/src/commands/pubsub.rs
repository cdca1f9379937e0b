use super::parse_args;
use crate::cli::{PublishArgs, SubscribeArgs};

use anyhow::Result;
use rwamp::{event_handler_fn, Dict, Event, Session};
use tokio::sync::mpsc;

pub async fn publish(session: &Session, args: &PublishArgs) -> Result<()> {
  let publication = session
    .publish(&args.topic, parse_args(&args.args), Dict::new(), args.acknowledge)
    .await?;
  if let Some(id) = publication {
    println!("published {}", id);
  }
  Ok(())
}

pub async fn subscribe(session: &Session, args: &SubscribeArgs) -> Result<()> {
  let (tx, mut rx) = mpsc::unbounded_channel::<Event>();
  let subscription = session
    .subscribe(
      &args.topic,
      event_handler_fn(move |event: Event| {
        let tx = tx.clone();
        async move {
          let _ = tx.send(event);
        }
      }),
    )
    .await?;
  eprintln!("subscribed to {} (subscription {})", args.topic, subscription);

  let mut seen = 0usize;
  loop {
    if args.count.is_some_and(|limit| seen >= limit) {
      break;
    }
    tokio::select! {
      event = rx.recv() => match event {
        Some(event) => {
          seen += 1;
          println!("{}", serde_json::json!({
            "publication": event.publication,
            "args": event.args,
            "kwargs": event.kwargs,
          }));
        }
        None => break,
      },
      _ = tokio::signal::ctrl_c() => break,
    }
  }

  if session.is_established() {
    session.unsubscribe(subscription).await?;
  }
  Ok(())
}
