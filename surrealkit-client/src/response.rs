//! Typed response views built from raw results.
//!
//! Each operation kind has its own view; [`shape`] picks one explicitly from a
//! [`ResponseKind`].

use crate::error::ClientError;
use serde::Serialize;
use serde_json::{Map, Value};
use surrealkit_protocol::{ProtocolError, RecordId, ResponseKind};

/// A record as returned by the server, with its `id` reduced to the bare key.
pub type Record = Map<String, Value>;

/// Zero, one or many items, preserving server order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Records<T> {
    Empty,
    One(T),
    Many(Vec<T>),
}

impl<T> Records<T> {
    /// Collapses a singleton list into `One`.
    pub fn from_vec(mut items: Vec<T>) -> Self {
        match items.len() {
            0 => Records::Empty,
            1 => Records::One(items.remove(0)),
            _ => Records::Many(items),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Records::Empty)
    }

    pub fn len(&self) -> usize {
        match self {
            Records::Empty => 0,
            Records::One(_) => 1,
            Records::Many(items) => items.len(),
        }
    }

    /// Returns the single item, if there is exactly one.
    pub fn one(&self) -> Option<&T> {
        match self {
            Records::One(item) => Some(item),
            _ => None,
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        match self {
            Records::Empty => std::slice::Iter::default(),
            Records::One(item) => std::slice::from_ref(item).iter(),
            Records::Many(items) => items.iter(),
        }
    }

    pub fn into_vec(self) -> Vec<T> {
        match self {
            Records::Empty => Vec::new(),
            Records::One(item) => vec![item],
            Records::Many(items) => items,
        }
    }
}

// ============================================================================
// Query
// ============================================================================

/// Result of a raw query, passed through unchanged.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResponse {
    result: Option<Value>,
}

impl QueryResponse {
    /// Wraps a raw result. `None` and `null` both mean nothing was computed.
    pub fn from_raw(raw: Option<Value>) -> Self {
        Self {
            result: raw.filter(|value| !value.is_null()),
        }
    }

    /// Returns whether the server produced any output.
    pub fn is_computed(&self) -> bool {
        self.result.is_some()
    }

    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    pub fn into_result(self) -> Option<Value> {
        self.result
    }
}

// ============================================================================
// CRUD
// ============================================================================

/// Records returned by create/select/update/delete.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrudResponse {
    table: Option<String>,
    data: Records<Record>,
}

impl CrudResponse {
    /// Shapes a raw result: an array of rows, a single row or `null`.
    pub fn from_raw(raw: Value) -> Result<Self, ClientError> {
        let rows = match raw {
            Value::Null => Vec::new(),
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::Object(row) => Ok(row),
                    other => Err(ClientError::InvalidEnvelope(format!(
                        "expected a record, got {}",
                        other
                    ))),
                })
                .collect::<Result<Vec<_>, _>>()?,
            Value::Object(row) => vec![row],
            other => {
                return Err(ClientError::InvalidEnvelope(format!(
                    "expected records, got {}",
                    other
                )))
            }
        };
        Self::from_rows(rows)
    }

    /// Splits every row's `table:key` id, keeping the bare key on the row and
    /// the table on the view. The table is taken from the first row.
    pub fn from_rows(rows: Vec<Record>) -> Result<Self, ClientError> {
        let mut table = None;
        let mut data = Vec::with_capacity(rows.len());

        for mut row in rows {
            let record_id = match row.get("id") {
                Some(Value::String(raw)) => RecordId::parse(raw)?,
                Some(other) => {
                    return Err(ProtocolError::InvalidRecordId(other.to_string()).into())
                }
                None => return Err(ProtocolError::MissingField("id").into()),
            };
            if table.is_none() {
                table = Some(record_id.table);
            }
            row.insert("id".to_string(), Value::String(record_id.key));
            data.push(row);
        }

        Ok(Self {
            table,
            data: Records::from_vec(data),
        })
    }

    /// Table the records belong to; `None` when there are no records.
    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    pub fn data(&self) -> &Records<Record> {
        &self.data
    }

    pub fn into_data(self) -> Records<Record> {
        self.data
    }

    pub fn no_data(&self) -> bool {
        self.data.is_empty()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

// ============================================================================
// Patch
// ============================================================================

/// Diffs returned by `modify`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatchResponse {
    diffs: Records<Value>,
}

impl PatchResponse {
    /// Shapes a raw result whose elements each wrap one diff in a
    /// one-element array.
    pub fn from_raw(raw: Value) -> Self {
        let diffs = match raw {
            Value::Null => Vec::new(),
            Value::Array(items) => items.into_iter().map(unwrap_diff).collect(),
            other => vec![other],
        };
        Self {
            diffs: Records::from_vec(diffs),
        }
    }

    pub fn diffs(&self) -> &Records<Value> {
        &self.diffs
    }

    pub fn into_diffs(self) -> Records<Value> {
        self.diffs
    }

    /// Returns whether the patch changed nothing: no diffs, or only null or
    /// empty ones.
    pub fn is_unchanged(&self) -> bool {
        self.diffs.iter().all(|diff| match diff {
            Value::Null => true,
            Value::Array(ops) => ops.is_empty(),
            _ => false,
        })
    }
}

fn unwrap_diff(item: Value) -> Value {
    match item {
        Value::Array(mut inner) if inner.len() == 1 => inner.remove(0),
        other => other,
    }
}

// ============================================================================
// Dispatch
// ============================================================================

/// A shaped response of any kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TypedResponse {
    Query(QueryResponse),
    Crud(CrudResponse),
    Patch(PatchResponse),
}

impl TypedResponse {
    pub fn kind(&self) -> ResponseKind {
        match self {
            TypedResponse::Query(_) => ResponseKind::Query,
            TypedResponse::Crud(_) => ResponseKind::Crud,
            TypedResponse::Patch(_) => ResponseKind::Patch,
        }
    }
}

/// Shapes a raw result into the view for `kind`.
pub fn shape(kind: ResponseKind, raw: Option<Value>) -> Result<TypedResponse, ClientError> {
    Ok(match kind {
        ResponseKind::Query => TypedResponse::Query(QueryResponse::from_raw(raw)),
        ResponseKind::Crud => TypedResponse::Crud(CrudResponse::from_raw(raw.unwrap_or_default())?),
        ResponseKind::Patch => TypedResponse::Patch(PatchResponse::from_raw(raw.unwrap_or_default())),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_query_passthrough() {
        let raw = json!([{"status": "OK", "time": "1ms", "result": [1]}]);
        let response = QueryResponse::from_raw(Some(raw.clone()));
        assert!(response.is_computed());
        assert_eq!(response.result(), Some(&raw));
    }

    #[test]
    fn test_query_absent_is_not_computed() {
        assert!(!QueryResponse::from_raw(None).is_computed());
        assert!(!QueryResponse::from_raw(Some(Value::Null)).is_computed());
    }

    #[test]
    fn test_crud_single_row() {
        let response =
            CrudResponse::from_raw(json!([{"id": "person:tobie", "name": "Tobie"}])).unwrap();
        assert_eq!(response.table(), Some("person"));
        assert_eq!(
            response.data(),
            &Records::One(record(json!({"id": "tobie", "name": "Tobie"})))
        );
    }

    #[test]
    fn test_crud_many_rows_keep_order() {
        let response = CrudResponse::from_raw(json!([
            {"id": "person:c"},
            {"id": "person:a"},
            {"id": "person:b"},
        ]))
        .unwrap();
        assert_eq!(response.table(), Some("person"));
        assert_eq!(response.len(), 3);

        let keys: Vec<_> = response
            .data()
            .iter()
            .map(|row| row["id"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(keys, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_crud_empty_has_no_table() {
        for raw in [json!([]), Value::Null] {
            let response = CrudResponse::from_raw(raw).unwrap();
            assert!(response.no_data());
            assert_eq!(response.table(), None);
            assert_eq!(response.data(), &Records::Empty);
        }
    }

    #[test]
    fn test_crud_object_is_one_row() {
        let response = CrudResponse::from_raw(json!({"id": "hospital:main", "beds": 4})).unwrap();
        assert_eq!(response.table(), Some("hospital"));
        assert_eq!(response.data().one().unwrap()["id"], json!("main"));
    }

    #[test]
    fn test_crud_key_splits_on_first_colon() {
        let response = CrudResponse::from_raw(json!([{"id": "log:2024:01"}])).unwrap();
        assert_eq!(response.table(), Some("log"));
        assert_eq!(response.data().one().unwrap()["id"], json!("2024:01"));
    }

    #[test]
    fn test_crud_rejects_bad_ids() {
        assert!(matches!(
            CrudResponse::from_raw(json!([{"id": "noseparator"}])),
            Err(ClientError::Protocol(ProtocolError::InvalidRecordId(_)))
        ));
        assert!(matches!(
            CrudResponse::from_raw(json!([{"name": "anonymous"}])),
            Err(ClientError::Protocol(ProtocolError::MissingField("id")))
        ));
        assert!(matches!(
            CrudResponse::from_raw(json!([42])),
            Err(ClientError::InvalidEnvelope(_))
        ));
        assert!(matches!(
            CrudResponse::from_raw(json!("text")),
            Err(ClientError::InvalidEnvelope(_))
        ));
    }

    #[test]
    fn test_patch_unwraps_one_level() {
        let response = PatchResponse::from_raw(json!([[{"a": 1}], [{"a": 2}]]));
        assert_eq!(
            response.diffs(),
            &Records::Many(vec![json!({"a": 1}), json!({"a": 2})])
        );
        assert!(!response.is_unchanged());
    }

    #[test]
    fn test_patch_single_diff() {
        let response = PatchResponse::from_raw(json!([[{"op": "replace", "path": "/a", "value": 2}]]));
        assert_eq!(
            response.diffs(),
            &Records::One(json!({"op": "replace", "path": "/a", "value": 2}))
        );
    }

    #[test]
    fn test_patch_null_is_unchanged() {
        let response = PatchResponse::from_raw(json!([[null]]));
        assert_eq!(response.diffs(), &Records::One(Value::Null));
        assert!(response.is_unchanged());

        assert!(PatchResponse::from_raw(json!([])).is_unchanged());
        assert!(PatchResponse::from_raw(Value::Null).is_unchanged());
        assert!(PatchResponse::from_raw(json!([[null], [null]])).is_unchanged());
        assert!(!PatchResponse::from_raw(json!([[null], [{"a": 1}]])).is_unchanged());
    }

    #[test]
    fn test_shape_dispatch() {
        let shaped = shape(ResponseKind::Crud, Some(json!([{"id": "t:1"}]))).unwrap();
        assert_eq!(shaped.kind(), ResponseKind::Crud);

        let shaped = shape(ResponseKind::Patch, Some(json!([[null]]))).unwrap();
        assert_eq!(shaped.kind(), ResponseKind::Patch);

        let shaped = shape(ResponseKind::Query, None).unwrap();
        match shaped {
            TypedResponse::Query(q) => assert!(!q.is_computed()),
            other => panic!("unexpected: {:?}", other),
        }

        let shaped = shape(ResponseKind::Crud, None).unwrap();
        match shaped {
            TypedResponse::Crud(c) => assert!(c.no_data()),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_records_serialize() {
        assert_eq!(serde_json::to_value(Records::<Value>::Empty).unwrap(), Value::Null);
        assert_eq!(serde_json::to_value(Records::One(json!(1))).unwrap(), json!(1));
        assert_eq!(
            serde_json::to_value(Records::Many(vec![json!(1), json!(2)])).unwrap(),
            json!([1, 2])
        );
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn crud_shape_preserves_count_and_order(
                table in "[a-z][a-z0-9_]{0,10}",
                keys in proptest::collection::vec("[a-z0-9]{1,8}", 0..20),
            ) {
                let rows: Vec<Value> = keys
                    .iter()
                    .map(|key| json!({"id": format!("{}:{}", table, key)}))
                    .collect();
                let response = CrudResponse::from_raw(Value::Array(rows)).unwrap();

                prop_assert_eq!(response.len(), keys.len());
                prop_assert_eq!(response.no_data(), keys.is_empty());
                if keys.is_empty() {
                    prop_assert_eq!(response.table(), None);
                } else {
                    prop_assert_eq!(response.table(), Some(table.as_str()));
                }
                let shaped: Vec<Value> = response.data().iter().map(|row| row["id"].clone()).collect();
                let expected: Vec<Value> = keys.iter().map(|key| json!(key)).collect();
                prop_assert_eq!(shaped, expected);
            }
        }
    }
}
