//! Error types for backend calls and their presentation form.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

/// Every way a call to the LAYA backend can fail.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The request never completed (DNS, connection refused, reset...).
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered outside the 2xx range. `body` is the raw response text.
    #[error("HTTP {status} - {body}")]
    Http { status: u16, body: String },

    /// The body could not be parsed into the expected shape.
    #[error("Invalid response: {0}")]
    Decode(#[from] serde_json::Error),

    /// A local precondition failed; no request was sent.
    #[error("{0}")]
    Validation(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The background task running the request died before answering.
    #[error("Request task failed: {0}")]
    Task(String),
}

impl ClientError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ClientError::Validation(msg.into())
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Http { status, .. } => Some(*status),
            ClientError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Error as shown to the user: one readable message plus an optional cause.
///
/// Anything that reaches a render function goes through this type first, so
/// the UI never has to know which layer produced the failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayError {
    pub message: String,
    pub cause: Option<String>,
}

impl DisplayError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            cause: None,
        }
    }

    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.cause = Some(cause.into());
        self
    }
}

impl std::fmt::Display for DisplayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl From<&ClientError> for DisplayError {
    fn from(err: &ClientError) -> Self {
        match err {
            ClientError::Transport(e) => {
                let base = DisplayError::new("Could not reach the server");
                match std::error::Error::source(e) {
                    Some(src) => base.with_cause(src.to_string()),
                    None => base.with_cause(e.to_string()),
                }
            }
            ClientError::Http { status, body } => {
                let body = body.trim();
                let message = if body.is_empty() {
                    format!("HTTP {}", status)
                } else {
                    format!("HTTP {} - {}", status, body)
                };
                DisplayError::new(message)
            }
            ClientError::Decode(e) => {
                DisplayError::new("Unexpected response from the server").with_cause(e.to_string())
            }
            ClientError::Validation(msg) => DisplayError::new(msg.clone()),
            ClientError::Io(e) => DisplayError::new("Could not read local file").with_cause(e.to_string()),
            ClientError::Task(msg) => DisplayError::new("Request interrupted").with_cause(msg.clone()),
        }
    }
}

impl From<ClientError> for DisplayError {
    fn from(err: ClientError) -> Self {
        DisplayError::from(&err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_keeps_body() {
        let err = ClientError::Http {
            status: 502,
            body: "Echec Cohere: timeout".to_string(),
        };
        assert_eq!(err.status(), Some(502));
        assert_eq!(err.to_string(), "HTTP 502 - Echec Cohere: timeout");

        let shown = DisplayError::from(&err);
        assert_eq!(shown.message, "HTTP 502 - Echec Cohere: timeout");
        assert!(shown.cause.is_none());
    }

    #[test]
    fn test_http_error_with_empty_body() {
        let err = ClientError::Http {
            status: 404,
            body: "  ".to_string(),
        };
        assert_eq!(DisplayError::from(err).message, "HTTP 404");
    }

    #[test]
    fn test_validation_message_passes_through() {
        let err = ClientError::validation("slug is required");
        assert_eq!(err.status(), None);
        assert_eq!(DisplayError::from(err).to_string(), "slug is required");
    }

    #[test]
    fn test_decode_error_has_cause() {
        let parse = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let shown = DisplayError::from(ClientError::from(parse));
        assert_eq!(shown.message, "Unexpected response from the server");
        assert!(shown.cause.is_some());
    }
}
