// src/roles/mod.rs

//! Client roles announced in HELLO and the handler traits behind the
//! Callee and Subscriber roles.

pub mod callee;
pub mod subscriber;

pub use callee::{procedure_fn, CallError, InvocationPolicy, Invocation, Procedure, ProcedureFn};
pub use subscriber::{event_handler_fn, Event, EventHandler, EventHandlerFn};

use crate::message::Dict;
use bitflags::bitflags;
use serde_json::{json, Value};

bitflags! {
    /// WAMP client roles this peer announces when joining a realm.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Roles: u8 {
        const CALLER = 0b0001;
        const CALLEE = 0b0010;
        const PUBLISHER = 0b0100;
        const SUBSCRIBER = 0b1000;
    }
}

impl Default for Roles {
  fn default() -> Self {
    Roles::all()
  }
}

impl Roles {
  /// The `roles` dictionary of a HELLO message.
  pub fn to_details(&self) -> Dict {
    let mut roles = Dict::new();
    if self.contains(Roles::CALLER) {
      roles.insert("caller".into(), json!({ "features": {} }));
    }
    if self.contains(Roles::CALLEE) {
      roles.insert("callee".into(), json!({ "features": { "shared_registration": true } }));
    }
    if self.contains(Roles::PUBLISHER) {
      roles.insert("publisher".into(), json!({ "features": {} }));
    }
    if self.contains(Roles::SUBSCRIBER) {
      roles.insert("subscriber".into(), json!({ "features": {} }));
    }
    roles
  }

  /// Builds HELLO details: the roles plus an optional agent string.
  pub fn hello_details(&self, agent: Option<&str>) -> Dict {
    let mut details = Dict::new();
    details.insert("roles".into(), Value::Object(self.to_details()));
    if let Some(agent) = agent {
      details.insert("agent".into(), Value::from(agent));
    }
    details
  }
}
