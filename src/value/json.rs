//! Conversion of loosely-typed JSON input into [`FirestoreValue`] trees.

use std::collections::BTreeMap;

use serde_json::Value as JsonValue;

use crate::constants::{DELETE_MARKER, SERVER_TIMESTAMP_MARKER};
use crate::error::{invalid_argument, unsupported_type, FirestoreResult};
use crate::value::FirestoreValue;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct JsonDecodeOptions {
    /// Treat the exact strings `"ServerTimestamp"` and `"Delete"` as sentinel
    /// values. Off by default so ordinary strings are never reinterpreted.
    pub recognize_sentinel_markers: bool,
}

impl JsonDecodeOptions {
    pub fn with_sentinel_markers() -> Self {
        Self {
            recognize_sentinel_markers: true,
        }
    }
}

/// Parses a JSON object into document data.
pub fn decode_json_data(
    text: &str,
    options: JsonDecodeOptions,
) -> FirestoreResult<BTreeMap<String, FirestoreValue>> {
    let parsed: JsonValue = serde_json::from_str(text)
        .map_err(|err| invalid_argument(format!("Invalid JSON document data: {err}")))?;
    match parsed {
        JsonValue::Object(entries) => entries
            .iter()
            .map(|(key, value)| Ok((key.clone(), decode_json_value(value, options)?)))
            .collect(),
        other => Err(unsupported_type(
            "Document data must be a JSON object",
            other.to_string(),
        )),
    }
}

pub fn decode_json_value(
    value: &JsonValue,
    options: JsonDecodeOptions,
) -> FirestoreResult<FirestoreValue> {
    match value {
        JsonValue::Bool(boolean) => Ok(FirestoreValue::from_bool(*boolean)),
        JsonValue::Number(number) => number.as_i64().map(FirestoreValue::from_integer).ok_or_else(
            || unsupported_type("Only 64-bit integer numbers are supported", number.to_string()),
        ),
        JsonValue::String(string) if options.recognize_sentinel_markers => {
            Ok(match string.as_str() {
                SERVER_TIMESTAMP_MARKER => FirestoreValue::server_timestamp(),
                DELETE_MARKER => FirestoreValue::delete(),
                _ => FirestoreValue::from_string(string.as_str()),
            })
        }
        JsonValue::String(string) => Ok(FirestoreValue::from_string(string.as_str())),
        JsonValue::Array(values) => values
            .iter()
            .map(|value| decode_json_value(value, options))
            .collect::<FirestoreResult<Vec<_>>>()
            .map(FirestoreValue::from_array),
        JsonValue::Object(entries) => entries
            .iter()
            .map(|(key, value)| Ok((key.clone(), decode_json_value(value, options)?)))
            .collect::<FirestoreResult<BTreeMap<_, _>>>()
            .map(FirestoreValue::from_map),
        JsonValue::Null => Err(unsupported_type("null values are not supported", "null")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{SentinelValue, ValueKind};
    use serde_json::json;

    #[test]
    fn decodes_nested_objects() {
        let data = decode_json_data(
            r#"{"a": 1, "b": {"c": true, "d": ["x"]}}"#,
            JsonDecodeOptions::default(),
        )
        .unwrap();
        assert_eq!(data.get("a"), Some(&FirestoreValue::from_integer(1)));
        match data.get("b").map(FirestoreValue::kind) {
            Some(ValueKind::Map(map)) => {
                assert_eq!(map.fields().get("c"), Some(&FirestoreValue::from_bool(true)));
                assert!(matches!(
                    map.fields().get("d").map(FirestoreValue::kind),
                    Some(ValueKind::Array(_))
                ));
            }
            other => panic!("unexpected value {other:?}"),
        }
    }

    #[test]
    fn markers_only_with_option() {
        let plain = decode_json_value(&json!("Delete"), JsonDecodeOptions::default()).unwrap();
        assert_eq!(plain, FirestoreValue::from_string("Delete"));
        let marked =
            decode_json_value(&json!("Delete"), JsonDecodeOptions::with_sentinel_markers())
                .unwrap();
        assert!(marked.is_sentinel(SentinelValue::Delete));
        let marked = decode_json_value(
            &json!(["ServerTimestamp"]),
            JsonDecodeOptions::with_sentinel_markers(),
        )
        .unwrap();
        assert!(marked.contains_sentinel());
    }

    #[test]
    fn rejects_unsupported_types() {
        for value in [json!(null), json!(1.5), json!(u64::MAX)] {
            let err = decode_json_value(&value, JsonDecodeOptions::default()).unwrap_err();
            assert_eq!(err.code_str(), "firestore/unsupported-type", "{value}");
        }
        let err = decode_json_data("[1]", JsonDecodeOptions::default()).unwrap_err();
        assert_eq!(err.code_str(), "firestore/unsupported-type");
        let err = decode_json_data("{", JsonDecodeOptions::default()).unwrap_err();
        assert_eq!(err.code_str(), "firestore/invalid-argument");
    }
}
