// src/session/registry.rs

use crate::message::{RegistrationId, SubscriptionId};
use crate::roles::{EventHandler, InvocationPolicy, Procedure};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;

/// Snapshot of one procedure this peer has registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationRecord {
  pub id: RegistrationId,
  pub procedure: String,
  pub invoke: InvocationPolicy,
  pub created: SystemTime,
}

struct Registration {
  record: RegistrationRecord,
  handler: Arc<dyn Procedure>,
}

#[derive(Default)]
struct RegistrationMaps {
  by_id: HashMap<RegistrationId, Registration>,
  by_name: HashMap<String, RegistrationId>,
}

/// Procedures registered by this peer: name ↔ id ↔ metadata.
#[derive(Default)]
pub(crate) struct RegistrationRegistry {
  maps: RwLock<RegistrationMaps>,
}

impl RegistrationRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Records a registration confirmed by the router. A stale entry under
  /// the same procedure name is replaced.
  pub fn insert(&self, id: RegistrationId, procedure: String, invoke: InvocationPolicy, handler: Arc<dyn Procedure>) {
    let mut maps = self.maps.write();
    if let Some(old_id) = maps.by_name.insert(procedure.clone(), id) {
      if old_id != id {
        maps.by_id.remove(&old_id);
      }
    }
    maps.by_id.insert(
      id,
      Registration {
        record: RegistrationRecord {
          id,
          procedure,
          invoke,
          created: SystemTime::now(),
        },
        handler,
      },
    );
  }

  pub fn remove(&self, id: RegistrationId) -> Option<RegistrationRecord> {
    let mut maps = self.maps.write();
    let removed = maps.by_id.remove(&id)?;
    if maps.by_name.get(&removed.record.procedure) == Some(&id) {
      maps.by_name.remove(&removed.record.procedure);
    }
    Some(removed.record)
  }

  pub fn id_for(&self, procedure: &str) -> Option<RegistrationId> {
    self.maps.read().by_name.get(procedure).copied()
  }

  #[cfg(test)]
  fn get(&self, id: RegistrationId) -> Option<RegistrationRecord> {
    self.maps.read().by_id.get(&id).map(|r| r.record.clone())
  }

  /// Procedure name and handler for an INVOCATION.
  pub fn handler_for(&self, id: RegistrationId) -> Option<(String, Arc<dyn Procedure>)> {
    self
      .maps
      .read()
      .by_id
      .get(&id)
      .map(|r| (r.record.procedure.clone(), r.handler.clone()))
  }

  pub fn snapshot(&self) -> Vec<RegistrationRecord> {
    let mut records: Vec<_> = self.maps.read().by_id.values().map(|r| r.record.clone()).collect();
    records.sort_by_key(|r| r.id);
    records
  }

  pub fn clear(&self) -> usize {
    let mut maps = self.maps.write();
    let count = maps.by_id.len();
    maps.by_id.clear();
    maps.by_name.clear();
    count
  }

  #[cfg(test)]
  fn len(&self) -> usize {
    self.maps.read().by_id.len()
  }
}

/// Snapshot of one subscription held by this peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionRecord {
  pub id: SubscriptionId,
  pub topic: String,
}

struct Subscription {
  topic: String,
  handler: Arc<dyn EventHandler>,
}

/// Topics subscribed by this peer, indexed purely by subscription id.
#[derive(Default)]
pub(crate) struct SubscriptionRegistry {
  by_id: RwLock<HashMap<SubscriptionId, Subscription>>,
}

impl SubscriptionRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert(&self, id: SubscriptionId, topic: String, handler: Arc<dyn EventHandler>) {
    self.by_id.write().insert(id, Subscription { topic, handler });
  }

  pub fn remove(&self, id: SubscriptionId) -> Option<SubscriptionRecord> {
    self
      .by_id
      .write()
      .remove(&id)
      .map(|s| SubscriptionRecord { id, topic: s.topic })
  }

  /// Topic and handler for an EVENT.
  pub fn handler_for(&self, id: SubscriptionId) -> Option<(String, Arc<dyn EventHandler>)> {
    self.by_id.read().get(&id).map(|s| (s.topic.clone(), s.handler.clone()))
  }

  pub fn snapshot(&self) -> Vec<SubscriptionRecord> {
    let mut records: Vec<_> = self
      .by_id
      .read()
      .iter()
      .map(|(id, s)| SubscriptionRecord {
        id: *id,
        topic: s.topic.clone(),
      })
      .collect();
    records.sort_by_key(|r| r.id);
    records
  }

  pub fn clear(&self) -> usize {
    let mut by_id = self.by_id.write();
    let count = by_id.len();
    by_id.clear();
    count
  }

  #[cfg(test)]
  fn len(&self) -> usize {
    self.by_id.read().len()
  }
}
