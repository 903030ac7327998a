use std::collections::BTreeMap;

use crate::value::{FirestoreValue, ValueKind};

/// Field map of a document or of a nested map value, ordered by key.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MapValue {
    fields: BTreeMap<String, FirestoreValue>,
}

impl MapValue {
    pub fn new(fields: BTreeMap<String, FirestoreValue>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &BTreeMap<String, FirestoreValue> {
        &self.fields
    }

    pub fn into_fields(self) -> BTreeMap<String, FirestoreValue> {
        self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn contains_sentinel(&self) -> bool {
        self.fields.values().any(FirestoreValue::contains_sentinel)
    }

    /// Follows `segments` through nested maps.
    pub fn get_path(&self, segments: &[String]) -> Option<&FirestoreValue> {
        let (first, rest) = segments.split_first()?;
        let value = self.fields.get(first)?;
        if rest.is_empty() {
            return Some(value);
        }
        match value.kind() {
            ValueKind::Map(child) => child.get_path(rest),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segments(path: &[&str]) -> Vec<String> {
        path.iter().map(|segment| segment.to_string()).collect()
    }

    #[test]
    fn resolves_nested_paths() {
        let inner = BTreeMap::from([("g".to_string(), FirestoreValue::from_integer(4))]);
        let map = MapValue::new(BTreeMap::from([
            ("h".to_string(), FirestoreValue::from_map(inner)),
            ("e".to_string(), FirestoreValue::from_integer(7)),
        ]));
        assert_eq!(
            map.get_path(&segments(&["h", "g"])),
            Some(&FirestoreValue::from_integer(4))
        );
        assert!(map.get_path(&segments(&["e", "x"])).is_none());
        assert!(map.get_path(&[]).is_none());
        assert!(!map.contains_sentinel());
        assert!(MapValue::default().is_empty());
    }
}
