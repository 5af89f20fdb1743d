//! Classification of inbound messages.

use serde_json::Value;
use surrealkit_protocol::{RpcError, RpcResponse};

/// What the receive loop should do with an inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Disposition {
    /// A successful result for `id`.
    Result { id: String, value: Value },
    /// An error that must abort the request it refers to.
    Fatal { id: Option<String>, error: RpcError },
    /// An error in the safe set: log it and keep the request pending.
    Recoverable { id: Option<String>, error: RpcError },
    /// Neither a result nor an error, or a result without an id.
    Malformed(String),
}

/// Classifies a decoded message.
///
/// An `error` field takes precedence over `result`.
pub fn classify(message: RpcResponse) -> Disposition {
    match message {
        RpcResponse {
            id,
            error: Some(error),
            ..
        } => {
            if error.is_critical() {
                Disposition::Fatal { id, error }
            } else {
                Disposition::Recoverable { id, error }
            }
        }
        RpcResponse {
            id: Some(id),
            result: Some(value),
            ..
        } => Disposition::Result { id, value },
        RpcResponse {
            id: None,
            result: Some(_),
            ..
        } => Disposition::Malformed("result without id".to_string()),
        RpcResponse { id, .. } => Disposition::Malformed(format!(
            "message for id {} carries neither result nor error",
            id.as_deref().unwrap_or("<none>")
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use surrealkit_protocol::Decoder;

    fn decode(raw: &str) -> RpcResponse {
        Decoder::decode_response(raw).unwrap()
    }

    #[test]
    fn test_result() {
        assert_eq!(
            classify(decode(r#"{"id":"1","result":[1,2]}"#)),
            Disposition::Result {
                id: "1".into(),
                value: json!([1, 2])
            }
        );
    }

    #[test]
    fn test_null_result_is_a_result() {
        assert_eq!(
            classify(decode(r#"{"id":"1","result":null}"#)),
            Disposition::Result {
                id: "1".into(),
                value: Value::Null
            }
        );
    }

    #[test]
    fn test_critical_error() {
        let disposition = classify(decode(
            r#"{"id":"7","error":{"code":-32601,"message":"Method not found"}}"#,
        ));
        assert_eq!(
            disposition,
            Disposition::Fatal {
                id: Some("7".into()),
                error: RpcError::new(-32601, "Method not found")
            }
        );
    }

    #[test]
    fn test_safe_errors_are_recoverable() {
        for code in [-32602, -32000] {
            let raw = format!(r#"{{"id":"3","error":{{"code":{},"message":"x"}}}}"#, code);
            assert!(matches!(
                classify(decode(&raw)),
                Disposition::Recoverable { .. }
            ));
        }
    }

    #[test]
    fn test_error_wins_over_result() {
        let disposition = classify(decode(
            r#"{"id":"5","result":"ignored","error":{"code":-32603,"message":"boom"}}"#,
        ));
        assert!(matches!(disposition, Disposition::Fatal { .. }));
    }

    #[test]
    fn test_malformed() {
        assert!(matches!(
            classify(decode(r#"{"id":"1"}"#)),
            Disposition::Malformed(_)
        ));
        assert!(matches!(
            classify(decode(r#"{"result":1}"#)),
            Disposition::Malformed(_)
        ));
    }
}
