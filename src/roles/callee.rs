// src/roles/callee.rs

use crate::message::{Dict, List, Payload, RegistrationId, RequestId};
use crate::protocol::uri;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use thiserror::Error;

/// How the router picks a callee when a procedure has several.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum InvocationPolicy {
  #[default]
  Single,
  RoundRobin,
  Random,
  First,
  Last,
}

impl InvocationPolicy {
  pub fn as_str(&self) -> &'static str {
    match self {
      InvocationPolicy::Single => "single",
      InvocationPolicy::RoundRobin => "roundrobin",
      InvocationPolicy::Random => "random",
      InvocationPolicy::First => "first",
      InvocationPolicy::Last => "last",
    }
  }
}

impl fmt::Display for InvocationPolicy {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// An INVOCATION routed to a local procedure.
#[derive(Debug, Clone)]
pub struct Invocation {
  pub request: RequestId,
  pub registration: RegistrationId,
  pub procedure: String,
  pub details: Dict,
  pub args: List,
  pub kwargs: Dict,
}

impl Invocation {
  pub fn arg(&self, index: usize) -> Option<&Value> {
    self.args.get(index)
  }
}

/// Failure reported back to the caller as an ERROR message.
#[derive(Debug, Clone, Error)]
#[error("{uri}")]
pub struct CallError {
  pub uri: String,
  pub args: List,
  pub kwargs: Dict,
}

impl CallError {
  pub fn new(uri: impl Into<String>) -> Self {
    Self {
      uri: uri.into(),
      args: List::new(),
      kwargs: Dict::new(),
    }
  }

  /// A `wamp.error.runtime_error` carrying a human-readable message.
  pub fn runtime(message: impl fmt::Display) -> Self {
    Self::new(uri::ERROR_RUNTIME_ERROR).with_arg(message.to_string())
  }

  pub fn with_arg(mut self, value: impl Into<Value>) -> Self {
    self.args.push(value.into());
    self
  }
}

/// A procedure this peer offers as a Callee.
#[async_trait]
pub trait Procedure: Send + Sync + 'static {
  async fn invoke(&self, invocation: Invocation) -> Result<Payload, CallError>;
}

/// Adapter turning an async closure into a [`Procedure`].
pub struct ProcedureFn<F> {
  f: F,
}

/// Wraps `f` so it can be registered as a procedure.
pub fn procedure_fn<F, Fut>(f: F) -> ProcedureFn<F>
where
  F: Fn(Invocation) -> Fut + Send + Sync + 'static,
  Fut: Future<Output = Result<Payload, CallError>> + Send + 'static,
{
  ProcedureFn { f }
}

#[async_trait]
impl<F, Fut> Procedure for ProcedureFn<F>
where
  F: Fn(Invocation) -> Fut + Send + Sync + 'static,
  Fut: Future<Output = Result<Payload, CallError>> + Send + 'static,
{
  async fn invoke(&self, invocation: Invocation) -> Result<Payload, CallError> {
    (self.f)(invocation).await
  }
}

impl<F> fmt::Debug for ProcedureFn<F> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ProcedureFn").finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[tokio::test]
  async fn closures_become_procedures() {
    let add = procedure_fn(|inv: Invocation| async move {
      let a = inv.arg(0).and_then(Value::as_i64).unwrap_or(0);
      let b = inv.arg(1).and_then(Value::as_i64).unwrap_or(0);
      Ok(Payload::new().arg(a + b))
    });
    let result = add
      .invoke(Invocation {
        request: 1,
        registration: 2,
        procedure: "com.example.add".into(),
        details: Dict::new(),
        args: vec![json!(2), json!(3)],
        kwargs: Dict::new(),
      })
      .await
      .unwrap();
    assert_eq!(result.args, vec![json!(5)]);
  }

  #[test]
  fn runtime_errors_carry_a_message() {
    let err = CallError::runtime("boom");
    assert_eq!(err.uri, "wamp.error.runtime_error");
    assert_eq!(err.args, vec![json!("boom")]);
    assert_eq!(InvocationPolicy::default().as_str(), "single");
  }
}
