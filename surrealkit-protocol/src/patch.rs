//! JSON-Patch operations for the `modify` method.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Patch operation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    Add,
    Replace,
    Remove,
}

/// A single JSON-Patch operation.
///
/// ```
/// use surrealkit_protocol::Patch;
/// use serde_json::json;
///
/// let patch = Patch::add("/tags", json!(["developer", "engineer"]));
/// assert_eq!(
///     serde_json::to_value(&patch).unwrap(),
///     json!({"op": "add", "path": "/tags", "value": ["developer", "engineer"]}),
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patch {
    pub op: PatchOp,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl Patch {
    /// Adds `value` at `path`, appending when the target is an array.
    pub fn add(path: impl Into<String>, value: Value) -> Self {
        Self {
            op: PatchOp::Add,
            path: path.into(),
            value: Some(value),
        }
    }

    /// Replaces whatever is at `path` with `value`.
    pub fn replace(path: impl Into<String>, value: Value) -> Self {
        Self {
            op: PatchOp::Replace,
            path: path.into(),
            value: Some(value),
        }
    }

    /// Removes `path`. Carries no value.
    pub fn remove(path: impl Into<String>) -> Self {
        Self {
            op: PatchOp::Remove,
            path: path.into(),
            value: None,
        }
    }
}
