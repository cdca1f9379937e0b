// src/session/meta.rs

//! Registration meta procedures (`wamp.registration.*`). These are ordinary
//! CALLs; this module only names the procedures and decodes their results.

use super::{CallResult, Session};
use crate::error::WampError;
use crate::message::{Dict, RegistrationId};
use crate::protocol::uri;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

/// Registration ids on the router, grouped by match policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RegistrationList {
  #[serde(default)]
  pub exact: Vec<RegistrationId>,
  #[serde(default)]
  pub prefix: Vec<RegistrationId>,
  #[serde(default)]
  pub wildcard: Vec<RegistrationId>,
}

impl RegistrationList {
  pub fn len(&self) -> usize {
    self.exact.len() + self.prefix.len() + self.wildcard.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn contains(&self, id: RegistrationId) -> bool {
    self.exact.contains(&id) || self.prefix.contains(&id) || self.wildcard.contains(&id)
  }
}

/// Router-side details of one registration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RegistrationInfo {
  pub id: RegistrationId,
  /// ISO 8601 creation time as reported by the router.
  pub created: String,
  pub uri: String,
  #[serde(rename = "match")]
  pub match_policy: String,
  pub invoke: String,
}

impl Session {
  /// Lists the registrations known to the router in this realm.
  pub async fn registration_list(&self) -> Result<RegistrationList, WampError> {
    let result = self.call(uri::REGISTRATION_LIST, vec![], Dict::new()).await?;
    decode_first(uri::REGISTRATION_LIST, &result)
  }

  /// Looks up the registration id of an exact-match procedure.
  pub async fn registration_lookup(&self, procedure: &str) -> Result<Option<RegistrationId>, WampError> {
    let result = self
      .call(uri::REGISTRATION_LOOKUP, vec![Value::from(procedure)], Dict::new())
      .await?;
    match result.first() {
      None | Some(Value::Null) => Ok(None),
      Some(_) => decode_first(uri::REGISTRATION_LOOKUP, &result).map(Some),
    }
  }

  /// Fetches the router's details for `registration`. An unknown id fails
  /// with [`WampError::Remote`] carrying `wamp.error.no_such_registration`.
  ///
  /// Registration ids are numeric, so a name such as `"spam"` cannot be
  /// passed here; resolve it with [`Session::registration_lookup`] first.
  pub async fn registration_info(&self, registration: RegistrationId) -> Result<RegistrationInfo, WampError> {
    let result = self
      .call(uri::REGISTRATION_GET, vec![Value::from(registration)], Dict::new())
      .await?;
    decode_first(uri::REGISTRATION_GET, &result)
  }
}

fn decode_first<T: DeserializeOwned>(procedure: &str, result: &CallResult) -> Result<T, WampError> {
  let value = result
    .first()
    .cloned()
    .ok_or_else(|| WampError::ProtocolViolation(format!("{} returned no result", procedure)))?;
  serde_json::from_value(value)
    .map_err(|e| WampError::ProtocolViolation(format!("{} returned an unexpected result: {}", procedure, e)))
}
