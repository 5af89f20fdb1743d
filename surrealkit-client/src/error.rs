//! Client error types.

use surrealkit_protocol::RpcError;
use thiserror::Error;

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("protocol error: {0}")]
    Protocol(#[from] surrealkit_protocol::ProtocolError),

    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("not connected")]
    NotConnected,

    #[error("connection closed")]
    ConnectionClosed,

    #[error("request timeout")]
    Timeout,

    #[error("rpc error: {0}")]
    Rpc(RpcError),

    #[error("{code} {details}: {description}")]
    Surreal {
        code: i64,
        details: String,
        description: String,
    },

    #[error("unexpected response envelope: {0}")]
    InvalidEnvelope(String),
}

impl ClientError {
    /// Returns whether this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::WebSocket(_) => true,
            ClientError::Timeout => true,
            ClientError::ConnectionClosed => true,
            ClientError::NotConnected => true,
            ClientError::Http(e) => e.is_connect() || e.is_timeout(),
            ClientError::Rpc(e) => !e.is_critical(),
            _ => false,
        }
    }

    /// Returns the server-side error code, if the server reported one.
    pub fn code(&self) -> Option<i64> {
        match self {
            ClientError::Rpc(e) => Some(e.code),
            ClientError::Surreal { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl From<RpcError> for ClientError {
    fn from(error: RpcError) -> Self {
        ClientError::Rpc(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable() {
        assert!(ClientError::Timeout.is_retryable());
        assert!(ClientError::ConnectionClosed.is_retryable());
        assert!(!ClientError::Rpc(RpcError::new(-32601, "Method not found")).is_retryable());
        assert!(!ClientError::InvalidEnvelope("{}".into()).is_retryable());
    }

    #[test]
    fn test_code() {
        let err = ClientError::Rpc(RpcError::new(-32601, "Method not found"));
        assert_eq!(err.code(), Some(-32601));

        let err = ClientError::Surreal {
            code: 400,
            details: "Request problems detected".into(),
            description: "There is a problem with your request.".into(),
        };
        assert_eq!(err.code(), Some(400));
        assert_eq!(
            err.to_string(),
            "400 Request problems detected: There is a problem with your request."
        );

        assert_eq!(ClientError::Timeout.code(), None);
    }
}
