//! Errors surfaced to the user by a client.

use thiserror::Error;

/// A failed round trip to the query service.
///
/// `Display` is what the UI shows. Service errors show the response body
/// verbatim, without reinterpretation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The service could not be reached.
    #[error("{0}")]
    Network(String),

    /// The service answered with a non-2xx status.
    #[error("{}", service_message(*status, body))]
    Service { status: u16, body: String },

    /// A 2xx response that is not a valid answer body.
    #[error("invalid response from service: {0}")]
    Decode(String),
}

impl ClientError {
    /// HTTP status, when the service responded at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Service { status, .. } => Some(*status),
            _ => None,
        }
    }
}

fn service_message(status: u16, body: &str) -> String {
    if body.trim().is_empty() {
        format!("HTTP {status}")
    } else {
        body.to_string()
    }
}
