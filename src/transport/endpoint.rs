// src/transport/endpoint.rs

use crate::error::WampError;

/// A parsed and validated router address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Endpoint {
  /// RawSocket over TCP: `tcp://host:port`. Keeps `host:port` and the original string.
  Tcp(String, String),
  /// In-process peer bound under a name: `inproc://name`.
  #[cfg(feature = "inproc")]
  Inproc(String),
}

impl Endpoint {
  pub fn scheme(&self) -> &'static str {
    match self {
      Endpoint::Tcp(..) => "tcp",
      #[cfg(feature = "inproc")]
      Endpoint::Inproc(_) => "inproc",
    }
  }
}

/// Parses an endpoint string into a structured `Endpoint`.
pub fn parse_endpoint(endpoint_str: &str) -> Result<Endpoint, WampError> {
  let invalid_endpoint_err = || WampError::InvalidEndpoint(endpoint_str.to_string());

  let (scheme, address_part) = endpoint_str.split_once("://").ok_or_else(invalid_endpoint_err)?;

  match scheme {
    "tcp" => {
      let (host, port) = address_part.rsplit_once(':').ok_or_else(invalid_endpoint_err)?;
      if host.is_empty() || port.parse::<u16>().is_err() {
        tracing::debug!("Failed to parse TCP address: {}", address_part);
        return Err(invalid_endpoint_err());
      }
      Ok(Endpoint::Tcp(address_part.to_string(), endpoint_str.to_string()))
    }

    #[cfg(feature = "inproc")]
    "inproc" => {
      if address_part.is_empty() || address_part.contains('\0') {
        Err(invalid_endpoint_err())
      } else {
        Ok(Endpoint::Inproc(address_part.to_string()))
      }
    }

    // Handle schemes disabled by features or unknown schemes
    _ => Err(WampError::UnsupportedTransport(endpoint_str.to_string())),
  }
}
