//! JSON message types for the RPC and HTTP transports.

use crate::error::RpcError;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// RPC methods understood by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    // Session
    Signin,
    Use,

    // Queries
    Query,

    // Records
    Create,
    Select,
    Update,
    Modify,
    Delete,
}

impl Method {
    /// Every method, in wire order.
    pub const ALL: [Method; 8] = [
        Method::Signin,
        Method::Use,
        Method::Query,
        Method::Create,
        Method::Select,
        Method::Update,
        Method::Modify,
        Method::Delete,
    ];

    /// Returns the method name as sent on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Signin => "signin",
            Method::Use => "use",
            Method::Query => "query",
            Method::Create => "create",
            Method::Select => "select",
            Method::Update => "update",
            Method::Modify => "modify",
            Method::Delete => "delete",
        }
    }

    /// Returns the response view a reply to this method is shaped into.
    pub fn response_kind(&self) -> ResponseKind {
        match self {
            Method::Signin | Method::Use | Method::Query => ResponseKind::Query,
            Method::Create | Method::Select | Method::Update | Method::Delete => {
                ResponseKind::Crud
            }
            Method::Modify => ResponseKind::Patch,
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The typed view a raw result is turned into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseKind {
    /// Passed through unchanged.
    Query,
    /// Records with `table:key` ids decomposed.
    Crud,
    /// Per-record before/after diffs.
    Patch,
}

/// Outbound request envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    /// Request ID for correlation (decimal string).
    pub id: String,

    /// Method to invoke.
    pub method: Method,

    /// Positional parameters.
    #[serde(default)]
    pub params: Vec<Value>,
}

impl RpcRequest {
    pub fn new(id: impl Into<String>, method: Method) -> Self {
        Self {
            id: id.into(),
            method,
            params: Vec::new(),
        }
    }

    pub fn with_params(mut self, params: Vec<Value>) -> Self {
        self.params = params;
        self
    }
}

/// Inbound message envelope: `{id, result}` or `{id, error}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    /// Request ID this message answers (absent on some server-side parse errors).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Result payload. `Some(Value::Null)` is a JSON `null`, `None` an absent field.
    #[serde(
        default,
        deserialize_with = "present_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub result: Option<Value>,

    /// Error details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

/// Keeps an explicit `null` distinguishable from a missing field.
fn present_value<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl RpcResponse {
    pub fn ok(id: impl Into<String>, result: Value) -> Self {
        Self {
            id: Some(id.into()),
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: impl Into<String>, error: RpcError) -> Self {
        Self {
            id: Some(id.into()),
            result: None,
            error: Some(error),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

// ============================================================================
// Method-specific parameter types
// ============================================================================

/// Parameters for `signin`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigninParams {
    pub user: String,
    pub pass: String,
}

impl SigninParams {
    pub fn new(user: impl Into<String>, pass: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            pass: pass.into(),
        }
    }

    /// Positional parameters for the `signin` request.
    pub fn into_params(self) -> Vec<Value> {
        vec![serde_json::json!({ "user": self.user, "pass": self.pass })]
    }
}

// ============================================================================
// HTTP transport envelopes
// ============================================================================

/// One statement result as returned by the HTTP endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementResult {
    /// Statement status, `"OK"` on success.
    pub status: String,

    /// Server-side execution time, e.g. `"1.2ms"`.
    pub time: String,

    /// Statement output.
    pub result: Value,
}

impl StatementResult {
    pub fn is_ok(&self) -> bool {
        self.status.eq_ignore_ascii_case("OK")
    }
}

/// Error body returned by the HTTP endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpErrorBody {
    pub code: i64,
    #[serde(default)]
    pub details: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub information: Option<String>,
}
