// src/message/payload.rs

use serde_json::{Map, Value};

/// A WAMP dictionary (`details`, `options`, keyword arguments).
pub type Dict = Map<String, Value>;
/// A WAMP list (positional arguments).
pub type List = Vec<Value>;

/// Positional and keyword arguments carried by CALL, RESULT, EVENT,
/// INVOCATION, YIELD, PUBLISH and ERROR.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Payload {
  pub args: List,
  pub kwargs: Dict,
}

impl Payload {
  pub fn new() -> Self {
    Self::default()
  }

  /// A payload holding only positional arguments.
  pub fn from_args(args: List) -> Self {
    Self { args, kwargs: Dict::new() }
  }

  /// Appends one positional argument.
  pub fn arg(mut self, value: impl Into<Value>) -> Self {
    self.args.push(value.into());
    self
  }

  /// Sets one keyword argument.
  pub fn kwarg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
    self.kwargs.insert(key.into(), value.into());
    self
  }

  pub fn is_empty(&self) -> bool {
    self.args.is_empty() && self.kwargs.is_empty()
  }

  /// First positional argument, if present.
  pub fn first(&self) -> Option<&Value> {
    self.args.first()
  }
}

impl From<List> for Payload {
  fn from(args: List) -> Self {
    Payload::from_args(args)
  }
}
