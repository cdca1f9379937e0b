// src/message/msg.rs

use crate::error::WampError;
use crate::message::code::MessageCode;
use crate::message::payload::{Dict, List, Payload};
use crate::message::{PublicationId, RegistrationId, RequestId, SessionId, SubscriptionId};
use serde_json::Value;

/// A WAMP protocol message.
///
/// Each variant corresponds to exactly one [`MessageCode`]; on the wire a
/// message is a list whose first element is that code. Payload-carrying
/// variants keep positional and keyword arguments separately so that the
/// trailing-element elision rules of WAMP can be applied when encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
  Hello {
    realm: String,
    details: Dict,
  },
  Welcome {
    session: SessionId,
    details: Dict,
  },
  Abort {
    details: Dict,
    reason: String,
  },
  Challenge {
    auth_method: String,
    extra: Dict,
  },
  Authenticate {
    signature: String,
    extra: Dict,
  },
  Goodbye {
    details: Dict,
    reason: String,
  },
  Error {
    request_type: u64,
    request: RequestId,
    details: Dict,
    error: String,
    args: List,
    kwargs: Dict,
  },
  Publish {
    request: RequestId,
    options: Dict,
    topic: String,
    args: List,
    kwargs: Dict,
  },
  Published {
    request: RequestId,
    publication: PublicationId,
  },
  Subscribe {
    request: RequestId,
    options: Dict,
    topic: String,
  },
  Subscribed {
    request: RequestId,
    subscription: SubscriptionId,
  },
  Unsubscribe {
    request: RequestId,
    subscription: SubscriptionId,
  },
  Unsubscribed {
    request: RequestId,
  },
  Event {
    subscription: SubscriptionId,
    publication: PublicationId,
    details: Dict,
    args: List,
    kwargs: Dict,
  },
  Call {
    request: RequestId,
    options: Dict,
    procedure: String,
    args: List,
    kwargs: Dict,
  },
  Result {
    request: RequestId,
    details: Dict,
    args: List,
    kwargs: Dict,
  },
  Register {
    request: RequestId,
    options: Dict,
    procedure: String,
  },
  Registered {
    request: RequestId,
    registration: RegistrationId,
  },
  Unregister {
    request: RequestId,
    registration: RegistrationId,
  },
  Unregistered {
    request: RequestId,
  },
  Invocation {
    request: RequestId,
    registration: RegistrationId,
    details: Dict,
    args: List,
    kwargs: Dict,
  },
  Yield {
    request: RequestId,
    options: Dict,
    args: List,
    kwargs: Dict,
  },
}

impl Message {
  pub fn code(&self) -> MessageCode {
    match self {
      Message::Hello { .. } => MessageCode::Hello,
      Message::Welcome { .. } => MessageCode::Welcome,
      Message::Abort { .. } => MessageCode::Abort,
      Message::Challenge { .. } => MessageCode::Challenge,
      Message::Authenticate { .. } => MessageCode::Authenticate,
      Message::Goodbye { .. } => MessageCode::Goodbye,
      Message::Error { .. } => MessageCode::Error,
      Message::Publish { .. } => MessageCode::Publish,
      Message::Published { .. } => MessageCode::Published,
      Message::Subscribe { .. } => MessageCode::Subscribe,
      Message::Subscribed { .. } => MessageCode::Subscribed,
      Message::Unsubscribe { .. } => MessageCode::Unsubscribe,
      Message::Unsubscribed { .. } => MessageCode::Unsubscribed,
      Message::Event { .. } => MessageCode::Event,
      Message::Call { .. } => MessageCode::Call,
      Message::Result { .. } => MessageCode::Result,
      Message::Register { .. } => MessageCode::Register,
      Message::Registered { .. } => MessageCode::Registered,
      Message::Unregister { .. } => MessageCode::Unregister,
      Message::Unregistered { .. } => MessageCode::Unregistered,
      Message::Invocation { .. } => MessageCode::Invocation,
      Message::Yield { .. } => MessageCode::Yield,
    }
  }

  /// The request id this message answers, for response-shaped kinds.
  pub fn correlation_id(&self) -> Option<RequestId> {
    match self {
      Message::Error { request, .. }
      | Message::Published { request, .. }
      | Message::Subscribed { request, .. }
      | Message::Unsubscribed { request }
      | Message::Result { request, .. }
      | Message::Registered { request, .. }
      | Message::Unregistered { request } => Some(*request),
      _ => None,
    }
  }

  /// The request id chosen by the sender, for request-shaped kinds.
  pub fn request_id(&self) -> Option<RequestId> {
    match self {
      Message::Publish { request, .. }
      | Message::Subscribe { request, .. }
      | Message::Unsubscribe { request, .. }
      | Message::Call { request, .. }
      | Message::Register { request, .. }
      | Message::Unregister { request, .. } => Some(*request),
      _ => None,
    }
  }

  /// Builds a GOODBYE with empty details.
  pub fn goodbye(reason: impl Into<String>) -> Self {
    Message::Goodbye {
      details: Dict::new(),
      reason: reason.into(),
    }
  }

  /// Converts the message into its list form, ready for serialization.
  pub fn to_array(&self) -> List {
    let mut out: List = vec![Value::from(self.code().as_u64())];
    match self {
      Message::Hello { realm, details } => {
        out.push(Value::from(realm.as_str()));
        out.push(Value::Object(details.clone()));
      }
      Message::Welcome { session, details } => {
        out.push(Value::from(*session));
        out.push(Value::Object(details.clone()));
      }
      Message::Abort { details, reason } | Message::Goodbye { details, reason } => {
        out.push(Value::Object(details.clone()));
        out.push(Value::from(reason.as_str()));
      }
      Message::Challenge { auth_method, extra } => {
        out.push(Value::from(auth_method.as_str()));
        out.push(Value::Object(extra.clone()));
      }
      Message::Authenticate { signature, extra } => {
        out.push(Value::from(signature.as_str()));
        out.push(Value::Object(extra.clone()));
      }
      Message::Error {
        request_type,
        request,
        details,
        error,
        args,
        kwargs,
      } => {
        out.push(Value::from(*request_type));
        out.push(Value::from(*request));
        out.push(Value::Object(details.clone()));
        out.push(Value::from(error.as_str()));
        push_arguments(&mut out, args, kwargs);
      }
      Message::Publish {
        request,
        options,
        topic,
        args,
        kwargs,
      } => {
        out.push(Value::from(*request));
        out.push(Value::Object(options.clone()));
        out.push(Value::from(topic.as_str()));
        push_arguments(&mut out, args, kwargs);
      }
      Message::Published { request, publication } => {
        out.push(Value::from(*request));
        out.push(Value::from(*publication));
      }
      Message::Subscribe { request, options, topic } => {
        out.push(Value::from(*request));
        out.push(Value::Object(options.clone()));
        out.push(Value::from(topic.as_str()));
      }
      Message::Subscribed { request, subscription } | Message::Unsubscribe { request, subscription } => {
        out.push(Value::from(*request));
        out.push(Value::from(*subscription));
      }
      Message::Unsubscribed { request } | Message::Unregistered { request } => {
        out.push(Value::from(*request));
      }
      Message::Event {
        subscription,
        publication,
        details,
        args,
        kwargs,
      } => {
        out.push(Value::from(*subscription));
        out.push(Value::from(*publication));
        out.push(Value::Object(details.clone()));
        push_arguments(&mut out, args, kwargs);
      }
      Message::Call {
        request,
        options,
        procedure,
        args,
        kwargs,
      } => {
        out.push(Value::from(*request));
        out.push(Value::Object(options.clone()));
        out.push(Value::from(procedure.as_str()));
        push_arguments(&mut out, args, kwargs);
      }
      Message::Result {
        request,
        details,
        args,
        kwargs,
      } => {
        out.push(Value::from(*request));
        out.push(Value::Object(details.clone()));
        push_arguments(&mut out, args, kwargs);
      }
      Message::Register {
        request,
        options,
        procedure,
      } => {
        out.push(Value::from(*request));
        out.push(Value::Object(options.clone()));
        out.push(Value::from(procedure.as_str()));
      }
      Message::Registered { request, registration } | Message::Unregister { request, registration } => {
        out.push(Value::from(*request));
        out.push(Value::from(*registration));
      }
      Message::Invocation {
        request,
        registration,
        details,
        args,
        kwargs,
      } => {
        out.push(Value::from(*request));
        out.push(Value::from(*registration));
        out.push(Value::Object(details.clone()));
        push_arguments(&mut out, args, kwargs);
      }
      Message::Yield {
        request,
        options,
        args,
        kwargs,
      } => {
        out.push(Value::from(*request));
        out.push(Value::Object(options.clone()));
        push_arguments(&mut out, args, kwargs);
      }
    }
    out
  }

  /// Parses the list form of a message.
  pub fn from_array(array: List) -> Result<Self, WampError> {
    let mut fields = Fields::new(array);
    let code = MessageCode::try_from(fields.id("code")?)?;
    let message = match code {
      MessageCode::Hello => Message::Hello {
        realm: fields.string("realm")?,
        details: fields.dict("details")?,
      },
      MessageCode::Welcome => Message::Welcome {
        session: fields.id("session")?,
        details: fields.dict("details")?,
      },
      MessageCode::Abort => Message::Abort {
        details: fields.dict("details")?,
        reason: fields.string("reason")?,
      },
      MessageCode::Challenge => Message::Challenge {
        auth_method: fields.string("auth_method")?,
        extra: fields.dict("extra")?,
      },
      MessageCode::Authenticate => Message::Authenticate {
        signature: fields.string("signature")?,
        extra: fields.dict("extra")?,
      },
      MessageCode::Goodbye => Message::Goodbye {
        details: fields.dict("details")?,
        reason: fields.string("reason")?,
      },
      MessageCode::Error => {
        let request_type = fields.id("request_type")?;
        let request = fields.id("request")?;
        let details = fields.dict("details")?;
        let error = fields.string("error")?;
        let Payload { args, kwargs } = fields.arguments()?;
        Message::Error {
          request_type,
          request,
          details,
          error,
          args,
          kwargs,
        }
      }
      MessageCode::Publish => {
        let request = fields.id("request")?;
        let options = fields.dict("options")?;
        let topic = fields.string("topic")?;
        let Payload { args, kwargs } = fields.arguments()?;
        Message::Publish {
          request,
          options,
          topic,
          args,
          kwargs,
        }
      }
      MessageCode::Published => Message::Published {
        request: fields.id("request")?,
        publication: fields.id("publication")?,
      },
      MessageCode::Subscribe => Message::Subscribe {
        request: fields.id("request")?,
        options: fields.dict("options")?,
        topic: fields.string("topic")?,
      },
      MessageCode::Subscribed => Message::Subscribed {
        request: fields.id("request")?,
        subscription: fields.id("subscription")?,
      },
      MessageCode::Unsubscribe => Message::Unsubscribe {
        request: fields.id("request")?,
        subscription: fields.id("subscription")?,
      },
      MessageCode::Unsubscribed => Message::Unsubscribed {
        request: fields.id("request")?,
      },
      MessageCode::Event => {
        let subscription = fields.id("subscription")?;
        let publication = fields.id("publication")?;
        let details = fields.dict("details")?;
        let Payload { args, kwargs } = fields.arguments()?;
        Message::Event {
          subscription,
          publication,
          details,
          args,
          kwargs,
        }
      }
      MessageCode::Call => {
        let request = fields.id("request")?;
        let options = fields.dict("options")?;
        let procedure = fields.string("procedure")?;
        let Payload { args, kwargs } = fields.arguments()?;
        Message::Call {
          request,
          options,
          procedure,
          args,
          kwargs,
        }
      }
      MessageCode::Result => {
        let request = fields.id("request")?;
        let details = fields.dict("details")?;
        let Payload { args, kwargs } = fields.arguments()?;
        Message::Result {
          request,
          details,
          args,
          kwargs,
        }
      }
      MessageCode::Register => Message::Register {
        request: fields.id("request")?,
        options: fields.dict("options")?,
        procedure: fields.string("procedure")?,
      },
      MessageCode::Registered => Message::Registered {
        request: fields.id("request")?,
        registration: fields.id("registration")?,
      },
      MessageCode::Unregister => Message::Unregister {
        request: fields.id("request")?,
        registration: fields.id("registration")?,
      },
      MessageCode::Unregistered => Message::Unregistered {
        request: fields.id("request")?,
      },
      MessageCode::Invocation => {
        let request = fields.id("request")?;
        let registration = fields.id("registration")?;
        let details = fields.dict("details")?;
        let Payload { args, kwargs } = fields.arguments()?;
        Message::Invocation {
          request,
          registration,
          details,
          args,
          kwargs,
        }
      }
      MessageCode::Yield => {
        let request = fields.id("request")?;
        let options = fields.dict("options")?;
        let Payload { args, kwargs } = fields.arguments()?;
        Message::Yield {
          request,
          options,
          args,
          kwargs,
        }
      }
    };
    Ok(message)
  }
}

// WAMP drops trailing empty argument containers, but a non-empty kwargs
// forces an (empty) args list in front of it.
fn push_arguments(out: &mut List, args: &List, kwargs: &Dict) {
  if !kwargs.is_empty() {
    out.push(Value::Array(args.clone()));
    out.push(Value::Object(kwargs.clone()));
  } else if !args.is_empty() {
    out.push(Value::Array(args.clone()));
  }
}

/// Sequential reader over the elements of a message list.
struct Fields {
  code_hint: String,
  items: std::vec::IntoIter<Value>,
}

impl Fields {
  fn new(array: List) -> Self {
    let code_hint = array.first().map(|v| v.to_string()).unwrap_or_default();
    Self {
      code_hint,
      items: array.into_iter(),
    }
  }

  fn missing(&self, field: &str) -> WampError {
    WampError::ProtocolViolation(format!("message {} is missing field '{}'", self.code_hint, field))
  }

  fn invalid(&self, field: &str, value: &Value) -> WampError {
    WampError::ProtocolViolation(format!(
      "message {} has invalid field '{}': {}",
      self.code_hint, field, value
    ))
  }

  fn next(&mut self, field: &str) -> Result<Value, WampError> {
    self.items.next().ok_or_else(|| self.missing(field))
  }

  fn id(&mut self, field: &str) -> Result<u64, WampError> {
    let value = self.next(field)?;
    value.as_u64().ok_or_else(|| self.invalid(field, &value))
  }

  fn string(&mut self, field: &str) -> Result<String, WampError> {
    match self.next(field)? {
      Value::String(s) => Ok(s),
      other => Err(self.invalid(field, &other)),
    }
  }

  fn dict(&mut self, field: &str) -> Result<Dict, WampError> {
    match self.next(field)? {
      Value::Object(map) => Ok(map),
      other => Err(self.invalid(field, &other)),
    }
  }

  fn arguments(&mut self) -> Result<Payload, WampError> {
    let args = match self.items.next() {
      None => List::new(),
      Some(Value::Array(list)) => list,
      Some(other) => return Err(self.invalid("args", &other)),
    };
    let kwargs = match self.items.next() {
      None => Dict::new(),
      Some(Value::Object(map)) => map,
      Some(other) => return Err(self.invalid("kwargs", &other)),
    };
    Ok(Payload { args, kwargs })
  }
}
