//! Record addressing.
//!
//! Records are addressed on the wire by a composite `table:key` string. A bare
//! `table` addresses every record in that table.

use crate::error::ProtocolError;
use std::fmt;

/// Builds the wire target for a table and an optional record key.
///
/// Returns `table` when the key is absent or empty, `table:key` otherwise.
pub fn target(table: &str, key: Option<&str>) -> String {
    match key {
        Some(key) if !key.is_empty() => format!("{}:{}", table, key),
        _ => table.to_string(),
    }
}

/// A composite record identifier split into its table and key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordId {
    pub table: String,
    pub key: String,
}

impl RecordId {
    pub fn new(table: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            key: key.into(),
        }
    }

    /// Splits a `table:key` string at the first `:`.
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        raw.split_once(':')
            .map(|(table, key)| Self::new(table, key))
            .ok_or_else(|| ProtocolError::InvalidRecordId(raw.to_string()))
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.table, self.key)
    }
}

impl std::str::FromStr for RecordId {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_target_without_key() {
        assert_eq!(target("person", None), "person");
        assert_eq!(target("person", Some("")), "person");
    }

    #[test]
    fn test_target_with_key() {
        assert_eq!(target("person", Some("tobie")), "person:tobie");
    }

    #[test]
    fn test_parse_splits_on_first_colon() {
        let id = RecordId::parse("event:2024:01").unwrap();
        assert_eq!(id.table, "event");
        assert_eq!(id.key, "2024:01");
    }

    #[test]
    fn test_parse_rejects_bare_table() {
        assert!(matches!(
            RecordId::parse("person"),
            Err(ProtocolError::InvalidRecordId(_))
        ));
    }

    #[test]
    fn test_display() {
        assert_eq!(RecordId::new("person", "jaime").to_string(), "person:jaime");
    }

    proptest! {
        #[test]
        fn target_then_parse_recovers_pair(
            table in "[a-z_][a-z0-9_]{0,15}",
            key in "[a-zA-Z0-9:_⟨⟩-]{1,20}",
        ) {
            let composite = target(&table, Some(&key));
            prop_assert_eq!(&composite, &format!("{}:{}", table, key));

            let id: RecordId = composite.parse().unwrap();
            prop_assert_eq!(id.table, table);
            prop_assert_eq!(id.key, key);
        }

        #[test]
        fn empty_key_targets_table(table in "[a-z_][a-z0-9_]{0,15}") {
            prop_assert_eq!(target(&table, Some("")), table.clone());
            prop_assert_eq!(target(&table, None), table);
        }
    }
}
