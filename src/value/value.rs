use std::collections::BTreeMap;

use crate::value::{ArrayValue, MapValue};

#[derive(Clone, Debug, PartialEq)]
pub struct FirestoreValue {
    kind: ValueKind,
}

/// Markers standing in for an effect the write compiler resolves before
/// encoding: a server-side timestamp transform or a field deletion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SentinelValue {
    ServerTimestamp,
    Delete,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ValueKind {
    Boolean(bool),
    Integer(i64),
    String(String),
    Array(ArrayValue),
    Map(MapValue),
    Sentinel(SentinelValue),
}

impl FirestoreValue {
    pub fn from_bool(value: bool) -> Self {
        Self {
            kind: ValueKind::Boolean(value),
        }
    }

    pub fn from_integer(value: i64) -> Self {
        Self {
            kind: ValueKind::Integer(value),
        }
    }

    pub fn from_string(value: impl Into<String>) -> Self {
        Self {
            kind: ValueKind::String(value.into()),
        }
    }

    pub fn from_array(values: Vec<FirestoreValue>) -> Self {
        Self {
            kind: ValueKind::Array(ArrayValue::new(values)),
        }
    }

    pub fn from_map(map: BTreeMap<String, FirestoreValue>) -> Self {
        Self {
            kind: ValueKind::Map(MapValue::new(map)),
        }
    }

    /// Returns a sentinel that instructs Firestore to populate the field with
    /// the time the request is processed.
    pub fn server_timestamp() -> Self {
        Self {
            kind: ValueKind::Sentinel(SentinelValue::ServerTimestamp),
        }
    }

    /// Returns a sentinel that removes the field from the document. Only
    /// valid for updates and merging sets.
    pub fn delete() -> Self {
        Self {
            kind: ValueKind::Sentinel(SentinelValue::Delete),
        }
    }

    pub fn kind(&self) -> &ValueKind {
        &self.kind
    }

    pub fn sentinel(&self) -> Option<SentinelValue> {
        match self.kind {
            ValueKind::Sentinel(sentinel) => Some(sentinel),
            _ => None,
        }
    }

    pub fn is_sentinel(&self, sentinel: SentinelValue) -> bool {
        self.sentinel() == Some(sentinel)
    }

    /// Returns `true` when a sentinel appears anywhere in this value.
    pub fn contains_sentinel(&self) -> bool {
        match &self.kind {
            ValueKind::Sentinel(_) => true,
            ValueKind::Array(array) => array.contains_sentinel(),
            ValueKind::Map(map) => map.contains_sentinel(),
            ValueKind::Boolean(_) | ValueKind::Integer(_) | ValueKind::String(_) => false,
        }
    }
}

impl From<bool> for FirestoreValue {
    fn from(value: bool) -> Self {
        Self::from_bool(value)
    }
}

impl From<i64> for FirestoreValue {
    fn from(value: i64) -> Self {
        Self::from_integer(value)
    }
}

impl From<&str> for FirestoreValue {
    fn from(value: &str) -> Self {
        Self::from_string(value)
    }
}

impl From<BTreeMap<String, FirestoreValue>> for FirestoreValue {
    fn from(value: BTreeMap<String, FirestoreValue>) -> Self {
        Self::from_map(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_basic_values() {
        let v = FirestoreValue::from_string("hello");
        match v.kind() {
            ValueKind::String(value) => assert_eq!(value, "hello"),
            _ => panic!("unexpected kind"),
        }
    }

    #[test]
    fn string_marker_is_not_a_sentinel() {
        assert_eq!(FirestoreValue::from_string("Delete").sentinel(), None);
        assert!(FirestoreValue::delete().is_sentinel(SentinelValue::Delete));
    }

    #[test]
    fn finds_deep_sentinels() {
        let nested = FirestoreValue::from_array(vec![FirestoreValue::from_map(BTreeMap::from([(
            "t".to_string(),
            FirestoreValue::server_timestamp(),
        )]))]);
        assert!(nested.contains_sentinel());
        assert!(!FirestoreValue::from_array(vec![1i64.into()]).contains_sentinel());
    }
}
