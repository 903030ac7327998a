use std::collections::BTreeMap;
use std::str::FromStr;

use serde_json::{json, Value as JsonValue};

use crate::api::operations::{FieldTransform, Precondition, TransformOperation};
use crate::error::{invalid_argument, unsupported_type, FirestoreResult};
use crate::model::{DocumentName, FieldPath};
use crate::remote::mutation::{CommitRequest, Write};
use crate::value::{FirestoreValue, MapValue, ValueKind};

/// Encodes write plans into the Firestore v1 JSON request shapes.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonProtoSerializer;

impl JsonProtoSerializer {
    pub fn new() -> Self {
        Self
    }

    pub fn encode_commit_request(&self, request: &CommitRequest) -> JsonValue {
        json!({
            "database": request.database().database_name(),
            "writes": request
                .writes()
                .iter()
                .map(|write| self.encode_write(write))
                .collect::<Vec<_>>()
        })
    }

    pub fn encode_get_request(&self, name: &DocumentName) -> JsonValue {
        json!({ "name": name.canonical_string() })
    }

    pub fn encode_write(&self, write: &Write) -> JsonValue {
        let mut encoded = serde_json::Map::new();
        let precondition = match write {
            Write::Update {
                name,
                fields,
                mask,
                precondition,
            } => {
                encoded.insert(
                    "update".to_string(),
                    json!({
                        "name": name.canonical_string(),
                        "fields": encode_map_fields(fields)
                    }),
                );
                if let Some(mask) = mask {
                    let field_paths: Vec<String> =
                        mask.iter().map(FieldPath::canonical_string).collect();
                    encoded.insert(
                        "updateMask".to_string(),
                        json!({ "fieldPaths": field_paths }),
                    );
                }
                precondition
            }
            Write::Transform {
                document,
                field_transforms,
                precondition,
            } => {
                encoded.insert(
                    "transform".to_string(),
                    json!({
                        "document": document.canonical_string(),
                        "fieldTransforms": self.encode_field_transforms(field_transforms)
                    }),
                );
                precondition
            }
            Write::Delete { name, precondition } => {
                encoded.insert("delete".to_string(), json!(name.canonical_string()));
                precondition
            }
        };
        if let Some(current_document) = self.encode_precondition(precondition) {
            encoded.insert("currentDocument".to_string(), current_document);
        }
        JsonValue::Object(encoded)
    }

    pub fn encode_precondition(&self, precondition: &Precondition) -> Option<JsonValue> {
        match precondition {
            Precondition::None => None,
            Precondition::MustExist => Some(json!({ "exists": true })),
            Precondition::MustNotExist => Some(json!({ "exists": false })),
            Precondition::MustHaveUpdateTime(timestamp) => {
                Some(json!({ "updateTime": timestamp.to_rfc3339() }))
            }
        }
    }

    fn encode_field_transforms(&self, transforms: &[FieldTransform]) -> Vec<JsonValue> {
        transforms
            .iter()
            .map(|transform| {
                let field_path = transform.field_path().canonical_string();
                match transform.operation() {
                    TransformOperation::ServerTimestamp => json!({
                        "fieldPath": field_path,
                        "setToServerValue": "REQUEST_TIME"
                    }),
                }
            })
            .collect()
    }

    pub fn encode_document_fields(&self, map: &MapValue) -> JsonValue {
        json!({ "fields": encode_map_fields(map) })
    }

    pub fn decode_map_value(&self, value: &JsonValue) -> FirestoreResult<MapValue> {
        decode_map_value(value)
    }

    pub fn encode_value(&self, value: &FirestoreValue) -> JsonValue {
        encode_value(value)
    }

    pub fn decode_value(&self, value: &JsonValue) -> FirestoreResult<FirestoreValue> {
        decode_value(value)
    }
}

fn encode_map_fields(map: &MapValue) -> JsonValue {
    JsonValue::Object(
        map.fields()
            .iter()
            .map(|(key, value)| (key.clone(), encode_value(value)))
            .collect(),
    )
}

fn encode_value(value: &FirestoreValue) -> JsonValue {
    match value.kind() {
        ValueKind::Boolean(boolean) => json!({ "booleanValue": boolean }),
        ValueKind::Integer(integer) => json!({ "integerValue": integer.to_string() }),
        ValueKind::String(string) => json!({ "stringValue": string }),
        ValueKind::Array(array) => {
            let values = array.values().iter().map(encode_value).collect::<Vec<_>>();
            json!({ "arrayValue": { "values": values } })
        }
        ValueKind::Map(map) => json!({
            "mapValue": {
                "fields": encode_map_fields(map)
            }
        }),
        ValueKind::Sentinel(_) => panic!("sentinel values must be handled as field transforms"),
    }
}

/// Decodes an object of the form `{"fields": {...}}`; a missing `fields`
/// entry is an empty map.
fn decode_map_value(value: &JsonValue) -> FirestoreResult<MapValue> {
    match value.get("fields") {
        None if value.is_object() => Ok(MapValue::default()),
        Some(JsonValue::Object(entries)) => entries
            .iter()
            .map(|(key, entry)| Ok((key.clone(), decode_value(entry)?)))
            .collect::<FirestoreResult<BTreeMap<_, _>>>()
            .map(MapValue::new),
        _ => Err(invalid_argument(format!(
            "Expected a map value with an object 'fields' entry, got {value}"
        ))),
    }
}

/// Decodes one typed wire value. Exactly one `*Value` key is expected.
fn decode_value(value: &JsonValue) -> FirestoreResult<FirestoreValue> {
    let entry = match value.as_object() {
        Some(object) if object.len() == 1 => object.iter().next(),
        _ => None,
    };
    let Some((type_key, inner)) = entry else {
        return Err(invalid_argument(format!(
            "Expected a single-key typed value, got {value}"
        )));
    };
    match type_key.as_str() {
        "booleanValue" => inner
            .as_bool()
            .map(FirestoreValue::from_bool)
            .ok_or_else(|| invalid_argument("booleanValue must be a bool")),
        "integerValue" => decode_integer(inner).map(FirestoreValue::from_integer),
        "stringValue" => inner
            .as_str()
            .map(FirestoreValue::from_string)
            .ok_or_else(|| invalid_argument("stringValue must be a string")),
        "arrayValue" => {
            let values = match inner.get("values") {
                None => Vec::new(),
                Some(JsonValue::Array(entries)) => entries
                    .iter()
                    .map(decode_value)
                    .collect::<FirestoreResult<Vec<_>>>()?,
                Some(_) => return Err(invalid_argument("arrayValue.values must be an array")),
            };
            Ok(FirestoreValue::from_array(values))
        }
        "mapValue" => Ok(FirestoreValue::from_map(
            decode_map_value(inner)?.into_fields(),
        )),
        _ => Err(unsupported_type(
            format!("Unsupported wire value type '{type_key}'"),
            value.to_string(),
        )),
    }
}

/// Proto3 JSON renders int64 as a string; plain numbers are accepted too.
fn decode_integer(value: &JsonValue) -> FirestoreResult<i64> {
    match value {
        JsonValue::String(text) => i64::from_str(text)
            .map_err(|err| invalid_argument(format!("Invalid integerValue '{text}': {err}"))),
        JsonValue::Number(number) => number
            .as_i64()
            .ok_or_else(|| invalid_argument(format!("integerValue {number} is out of range"))),
        _ => Err(invalid_argument("integerValue must be a string or number")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Timestamp;

    fn document() -> DocumentName {
        DocumentName::parse("projects/projectID/databases/(default)/documents/C/d").unwrap()
    }

    #[test]
    fn encode_decode_roundtrip() {
        let mut map = BTreeMap::new();
        map.insert("name".to_string(), FirestoreValue::from_string("Ada"));
        map.insert("age".to_string(), FirestoreValue::from_integer(42));
        map.insert(
            "nested".to_string(),
            FirestoreValue::from_map({
                let mut inner = BTreeMap::new();
                inner.insert("flag".to_string(), FirestoreValue::from_bool(true));
                inner.insert(
                    "list".to_string(),
                    FirestoreValue::from_array(vec![FirestoreValue::from_integer(-3)]),
                );
                inner
            }),
        );
        let map = MapValue::new(map);
        let serializer = JsonProtoSerializer::new();
        let encoded = serializer.encode_document_fields(&map);
        let decoded = serializer.decode_map_value(&encoded).unwrap();
        assert_eq!(decoded, map);
    }

    #[test]
    fn encodes_update_and_transform_writes() {
        let serializer = JsonProtoSerializer::new();
        let mut fields = BTreeMap::new();
        fields.insert("a".to_string(), FirestoreValue::from_integer(1));
        let update = Write::Update {
            name: document(),
            fields: MapValue::new(fields),
            mask: Some(vec![FieldPath::new(["*", "~"]).unwrap()]),
            precondition: Precondition::MustExist,
        };
        assert_eq!(
            serializer.encode_write(&update),
            json!({
                "update": {
                    "name": "projects/projectID/databases/(default)/documents/C/d",
                    "fields": { "a": { "integerValue": "1" } }
                },
                "updateMask": { "fieldPaths": ["`*`.`~`"] },
                "currentDocument": { "exists": true }
            })
        );

        let transform = Write::Transform {
            document: document(),
            field_transforms: vec![FieldTransform::new(
                FieldPath::new(["b"]).unwrap(),
                TransformOperation::ServerTimestamp,
            )],
            precondition: Precondition::None,
        };
        assert_eq!(
            serializer.encode_write(&transform),
            json!({
                "transform": {
                    "document": "projects/projectID/databases/(default)/documents/C/d",
                    "fieldTransforms": [
                        { "fieldPath": "b", "setToServerValue": "REQUEST_TIME" }
                    ]
                }
            })
        );
    }

    #[test]
    fn encodes_preconditions() {
        let serializer = JsonProtoSerializer::new();
        assert_eq!(serializer.encode_precondition(&Precondition::None), None);
        assert_eq!(
            serializer.encode_precondition(&Precondition::MustNotExist),
            Some(json!({ "exists": false }))
        );
        let update_time = Timestamp::new(1_483_326_245, 6).unwrap();
        assert_eq!(
            serializer.encode_precondition(&Precondition::MustHaveUpdateTime(update_time)),
            Some(json!({ "updateTime": "2017-01-02T03:04:05.000000006Z" }))
        );
    }

    #[test]
    fn rejects_unknown_value_types() {
        let err = decode_value(&json!({ "doubleValue": 1.5 })).unwrap_err();
        assert_eq!(err.code_str(), "firestore/unsupported-type");
    }

    #[test]
    #[should_panic(expected = "sentinel values must be handled as field transforms")]
    fn sentinel_reaching_encoder_is_a_bug() {
        encode_value(&FirestoreValue::server_timestamp());
    }
}
