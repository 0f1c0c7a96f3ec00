//! Gateway error types
//!
//! Every failure of a fetch or apply call surfaces as a [`GatewayError`]
//! carrying enough detail to print. Nothing here is retried.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::executor::BatchReport;

/// Errors returned by the remote permission gateway
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Network, DNS, TLS or timeout failure
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Remote answered with status >= 400
    #[error("http request error: {status} {reason}: {error}")]
    Http {
        status: u16,
        reason: String,
        error: RemoteError,
    },

    /// Response body did not match the expected schema
    #[error("failed to decode response from {context}: {source}")]
    Decode {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A no-op operation was handed to `apply`
    #[error("operation for '{object_id}' has nothing to apply")]
    NoOp { object_id: String },

    /// One or more requests of a concurrent batch failed
    #[error("{0}")]
    Batch(BatchReport),
}

impl GatewayError {
    /// Build an HTTP error from a status and the raw response body
    pub fn http(status: reqwest::StatusCode, body: &str) -> Self {
        Self::Http {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("").to_string(),
            error: RemoteError::from_body(body),
        }
    }

    pub(crate) fn decode(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Decode {
            context: context.into(),
            source,
        }
    }

    /// HTTP status of the failed response, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Error payload returned by the remote API
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RemoteError {
    #[serde(rename = "type", default)]
    pub kind: String,
    pub error: RemoteErrorDetail,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RemoteErrorDetail {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

impl RemoteError {
    /// Parse the remote error payload, keeping the raw body as the message
    /// when it is not the documented shape.
    pub fn from_body(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_else(|_| Self {
            kind: String::new(),
            error: RemoteErrorDetail {
                message: body.trim().to_string(),
                fields: BTreeMap::new(),
            },
        })
    }

    pub fn message(&self) -> &str {
        &self.error.message
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.error.message)?;
        for (field, message) in &self.error.fields {
            write!(f, "; {}: {}", field, message)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_error_parsed() {
        let body = r#"{"type":"error","error":{"message":"Bad request","fields":{"permission":"invalid value","user":"unknown"}}}"#;
        let err = RemoteError::from_body(body);

        assert_eq!(err.kind, "error");
        assert_eq!(err.message(), "Bad request");
        assert_eq!(
            err.to_string(),
            "Bad request; permission: invalid value; user: unknown"
        );
    }

    #[test]
    fn test_remote_error_raw_body_fallback() {
        let err = RemoteError::from_body("<html>Bad Gateway</html>\n");
        assert_eq!(err.message(), "<html>Bad Gateway</html>");
        assert!(err.kind.is_empty());
    }

    #[test]
    fn test_http_error_display() {
        let err = GatewayError::http(
            reqwest::StatusCode::NOT_FOUND,
            r#"{"type":"error","error":{"message":"Repository not found"}}"#,
        );
        assert_eq!(err.status(), Some(404));
        assert_eq!(
            err.to_string(),
            "http request error: 404 Not Found: Repository not found"
        );
    }
}
