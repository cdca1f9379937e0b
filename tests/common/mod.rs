// tests/common/mod.rs
#![allow(dead_code)] // Not every test binary uses every helper

pub mod router;

pub use router::{MockRouter, RouterConfig};

use rwamp::{Session, SessionOptions};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Once;
use std::time::Duration;

static ROUTER_COUNTER: AtomicUsize = AtomicUsize::new(0);

static TRACING_INIT: Once = Once::new();

pub const SHORT_TIMEOUT: Duration = Duration::from_millis(300);
pub const LONG_TIMEOUT: Duration = Duration::from_secs(2);

pub fn setup_tracing() {
  TRACING_INIT.call_once(|| {
    // Can be overridden by RUST_LOG env variable
    let default_filter = "rwamp=debug,warn";
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let subscriber = FmtSubscriber::builder()
      .with_max_level(tracing::Level::TRACE)
      .with_env_filter(env_filter)
      .with_target(true)
      .with_line_number(true)
      .with_span_events(FmtSpan::CLOSE)
      .with_test_writer()
      .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set global tracing subscriber");
  });
}

/// A router name no other test in this process uses.
pub fn unique_router_name(prefix: &str) -> String {
  let count = ROUTER_COUNTER.fetch_add(1, Ordering::Relaxed);
  format!("rwamp_{}_{}_{}", prefix, std::process::id(), count)
}

/// Starts a mock router under a fresh name.
pub fn test_router(prefix: &str) -> MockRouter {
  setup_tracing();
  MockRouter::start(&unique_router_name(prefix))
}

/// Session options with timeouts short enough for tests.
pub fn test_options() -> SessionOptions {
  SessionOptions::default()
    .with_handshake_timeout(LONG_TIMEOUT)
    .with_call_timeout(LONG_TIMEOUT)
    .with_goodbye_timeout(SHORT_TIMEOUT)
}

/// A session that has already joined `realm1` on `router`.
pub async fn joined_session(router: &MockRouter) -> Session {
  let session = Session::connect_to(router.endpoint(), test_options()).expect("build session");
  session.begin().await.expect("join realm");
  session
}

/// Polls `check` until it holds or `within` elapses.
pub async fn eventually<F: Fn() -> bool>(within: Duration, check: F) -> bool {
  let deadline = tokio::time::Instant::now() + within;
  loop {
    if check() {
      return true;
    }
    if tokio::time::Instant::now() >= deadline {
      return false;
    }
    tokio::time::sleep(Duration::from_millis(10)).await;
  }
}
