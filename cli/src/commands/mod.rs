pub mod pubsub;
pub mod registrations;
pub mod rpc;

use crate::cli::Cli;

use anyhow::{Context as AnyhowContext, Result};
use rwamp::{List, Session, SessionOptions};
use serde_json::Value;
use std::time::Duration;

/// Connects to the router named on the command line and joins its realm.
pub async fn open_session(cli: &Cli) -> Result<Session> {
  let timeout = Duration::from_secs(cli.timeout);
  let options = SessionOptions::new(cli.realm.as_str())
    .with_agent(concat!("rwamp-cli/", env!("CARGO_PKG_VERSION")))
    .with_handshake_timeout(timeout)
    .with_call_timeout(timeout);
  let session = Session::connect_to(&cli.url, options).with_context(|| format!("invalid router URL {:?}", cli.url))?;
  let welcome = session
    .begin()
    .await
    .with_context(|| format!("cannot join realm {:?} on {}", cli.realm, cli.url))?;
  tracing::info!(session_id = welcome.session, realm = %cli.realm, "Joined realm");
  Ok(session)
}

/// Parses each argument as JSON; anything that is not valid JSON is sent as a string.
pub fn parse_args(raw: &[String]) -> List {
  raw
    .iter()
    .map(|arg| serde_json::from_str(arg).unwrap_or_else(|_| Value::String(arg.clone())))
    .collect()
}
