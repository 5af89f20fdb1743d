//! Protocol error types and RPC error codes.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Protocol-level errors that can occur while encoding or decoding messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid UTF-8 in payload")]
    InvalidUtf8,

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("invalid record id: {0:?} (expected \"table:key\")")]
    InvalidRecordId(String),
}

/// Error codes that do not abort the request they refer to.
///
/// `-32602` is "invalid params" and `-32000` the generic server error; both are
/// reported by the server while the request can still be answered later.
pub const SAFE_ERROR_CODES: [i64; 2] = [-32602, -32000];

/// Well-known JSON-RPC error codes.
pub mod codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
    pub const SERVER_ERROR: i64 = -32000;
}

/// An error returned by the server in place of a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{code}: {message}")]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

impl RpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Returns whether this error must be raised to the caller.
    ///
    /// Everything outside [`SAFE_ERROR_CODES`] is critical.
    pub fn is_critical(&self) -> bool {
        !SAFE_ERROR_CODES.contains(&self.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_codes_are_not_critical() {
        assert!(!RpcError::new(codes::INVALID_PARAMS, "bad params").is_critical());
        assert!(!RpcError::new(codes::SERVER_ERROR, "busy").is_critical());
    }

    #[test]
    fn test_other_codes_are_critical() {
        assert!(RpcError::new(codes::METHOD_NOT_FOUND, "method not found").is_critical());
        assert!(RpcError::new(codes::PARSE_ERROR, "parse error").is_critical());
        assert!(RpcError::new(codes::INTERNAL_ERROR, "boom").is_critical());
        assert!(RpcError::new(-1, "custom").is_critical());
        assert!(RpcError::new(0, "zero").is_critical());
    }

    #[test]
    fn test_rpc_error_display() {
        let err = RpcError::new(-32601, "Method not found");
        assert_eq!(err.to_string(), "-32601: Method not found");
    }

    #[test]
    fn test_rpc_error_deserialization() {
        let err: RpcError =
            serde_json::from_str(r#"{"code":-32000,"message":"There was a problem"}"#).unwrap();
        assert_eq!(err.code, -32000);
        assert_eq!(err.message, "There was a problem");
    }

    #[test]
    fn test_protocol_error_display() {
        let err = ProtocolError::InvalidUtf8;
        assert!(err.to_string().contains("UTF-8"));

        let err = ProtocolError::MissingField("id");
        assert!(err.to_string().contains("id"));

        let err = ProtocolError::InvalidRecordId("person".to_string());
        assert!(err.to_string().contains("person"));
    }
}
