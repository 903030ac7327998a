//! Fixture tables: one row per client call with its expected commit request.

use chrono::NaiveDate;
use serde_json::{json, Value as JsonValue};

use crate::api::operations::Precondition;
use crate::conformance::{
    ConformanceTest, CreateTest, DeleteTest, FixtureFieldPath, GetTest, Outcome, SetOption,
    SetTest, TestKind, UpdatePathsTest, UpdateTest,
};
use crate::error::FirestoreErrorCode::{
    self, DeleteNotAllowed, DuplicatePath, InvalidPath, InvalidPrecondition, MergeFieldNotFound,
    NestedDelete, NoPaths, PrefixCollision, SentinelInArray,
};
use crate::error::{internal_error, FirestoreResult};
use crate::model::Timestamp;
use crate::remote::serializer::JsonProtoSerializer;
use crate::value::{decode_json_value, JsonDecodeOptions};

pub const DATABASE: &str = "projects/projectID/databases/(default)";
pub const DOC_PATH: &str = "projects/projectID/databases/(default)/documents/C/d";

/// Every fixture, in generation order.
pub fn all_tests() -> FirestoreResult<Vec<ConformanceTest>> {
    let update_time = Precondition::MustHaveUpdateTime(fixture_update_time()?);
    let mut tests = vec![get_test()];
    tests.extend(create_tests()?);
    tests.extend(set_tests()?);
    tests.extend(update_tests(update_time)?);
    tests.extend(update_paths_tests(update_time)?);
    tests.extend(delete_tests(update_time));
    Ok(tests)
}

/// 2017-01-02T03:04:05.000000006Z
fn fixture_update_time() -> FirestoreResult<Timestamp> {
    let datetime = NaiveDate::from_ymd_opt(2017, 1, 2)
        .and_then(|date| date.and_hms_nano_opt(3, 4, 5, 6))
        .ok_or_else(|| internal_error("fixture update time is out of range"))?;
    Timestamp::from_datetime(datetime.and_utc())
}

/// One row of a write table.
#[derive(Clone, Debug)]
struct Case {
    description: &'static str,
    data: &'static str,
    option: Option<SetOption>,
    precondition: Precondition,
    paths: Vec<FixtureFieldPath>,
    values: Vec<&'static str>,
    fields: Option<JsonValue>,
    mask: Option<Vec<&'static str>>,
    transforms: Vec<&'static str>,
    error: Option<FirestoreErrorCode>,
}

impl Case {
    fn new(description: &'static str, data: &'static str) -> Self {
        Self {
            description,
            data,
            option: None,
            precondition: Precondition::None,
            paths: Vec::new(),
            values: Vec::new(),
            fields: None,
            mask: None,
            transforms: Vec::new(),
            error: None,
        }
    }

    /// Update-paths row; each path is a literal segment list.
    fn paths(description: &'static str, paths: &[&[&str]], values: &[&'static str]) -> Self {
        Self {
            paths: paths
                .iter()
                .map(|segments| FixtureFieldPath::new(segments.iter().copied()))
                .collect(),
            values: values.to_vec(),
            ..Self::new(description, "")
        }
    }

    fn option(mut self, option: SetOption) -> Self {
        self.option = Some(option);
        self
    }

    fn precondition(mut self, precondition: Precondition) -> Self {
        self.precondition = precondition;
        self
    }

    /// Expected update fields, written as plain JSON.
    fn writes(mut self, fields: JsonValue) -> Self {
        self.fields = Some(fields);
        self
    }

    fn mask(mut self, paths: &[&'static str]) -> Self {
        self.mask = Some(paths.to_vec());
        self
    }

    fn transforms(mut self, paths: &[&'static str]) -> Self {
        self.transforms = paths.to_vec();
        self
    }

    fn fails(mut self, code: FirestoreErrorCode) -> Self {
        self.error = Some(code);
        self
    }

    /// Expected outcome; `current_document` goes on the first write.
    fn outcome(&self, current_document: Option<JsonValue>) -> FirestoreResult<Outcome> {
        if let Some(code) = self.error {
            return Ok(Outcome::failure(code));
        }
        let mut writes = Vec::new();
        if self.fields.is_some() || self.mask.is_some() {
            let fields = match &self.fields {
                Some(fields) => wire_fields(fields)?,
                None => json!({}),
            };
            let mut write = json!({ "update": { "name": DOC_PATH, "fields": fields } });
            if let Some(mask) = &self.mask {
                write["updateMask"] = json!({ "fieldPaths": mask });
            }
            writes.push(write);
        }
        if !self.transforms.is_empty() {
            let field_transforms: Vec<JsonValue> = self
                .transforms
                .iter()
                .map(|path| json!({ "fieldPath": path, "setToServerValue": "REQUEST_TIME" }))
                .collect();
            writes.push(json!({
                "transform": { "document": DOC_PATH, "fieldTransforms": field_transforms }
            }));
        }
        if let (Some(current_document), Some(first)) = (current_document, writes.first_mut()) {
            first["currentDocument"] = current_document;
        }
        Ok(Outcome::success(json!({ "database": DATABASE, "writes": writes })))
    }
}

fn wire_fields(fields: &JsonValue) -> FirestoreResult<JsonValue> {
    let serializer = JsonProtoSerializer::new();
    let entries = fields
        .as_object()
        .ok_or_else(|| internal_error("expected fields must be a JSON object"))?;
    let mut encoded = serde_json::Map::new();
    for (key, value) in entries {
        let value = decode_json_value(value, JsonDecodeOptions::default())?;
        encoded.insert(key.clone(), serializer.encode_value(&value));
    }
    Ok(JsonValue::Object(encoded))
}

fn precondition_json(precondition: &Precondition) -> Option<JsonValue> {
    JsonProtoSerializer::new().encode_precondition(precondition)
}

fn named(prefix: &str, index: usize, description: &str, test: TestKind) -> ConformanceTest {
    ConformanceTest {
        name: format!("{prefix}-{}", index + 1),
        description: description.to_string(),
        test,
    }
}

fn get_test() -> ConformanceTest {
    ConformanceTest {
        name: "get-1".to_string(),
        description: "Get a document".to_string(),
        test: TestKind::Get(GetTest {
            doc_ref_path: DOC_PATH.to_string(),
            request: json!({ "name": DOC_PATH }),
        }),
    }
}

fn create_tests() -> FirestoreResult<Vec<ConformanceTest>> {
    let cases = [
        Case::new("basic create", r#"{"a": 1}"#).writes(json!({"a": 1})),
        Case::new("don't split on dots", r#"{ "a.b": { "c.d": 1 }, "e": 2 }"#)
            .writes(json!({"a.b": {"c.d": 1}, "e": 2})),
        Case::new(
            "a ServerTimestamp field becomes a transform",
            r#"{"a": 1, "b": "ServerTimestamp"}"#,
        )
        .writes(json!({"a": 1}))
        .transforms(&["b"]),
        Case::new(
            "nested ServerTimestamp field",
            r#"{"a": 1, "b": {"c": "ServerTimestamp"}}"#,
        )
        .writes(json!({"a": 1}))
        .transforms(&["b.c"]),
        Case::new(
            "multiple ServerTimestamp fields",
            r#"{"a": 1, "b": "ServerTimestamp", "c": {"d": "ServerTimestamp"}}"#,
        )
        .writes(json!({"a": 1}))
        .transforms(&["b", "c.d"]),
        Case::new(
            "ServerTimestamp cannot be in an array value",
            r#"{"a": ["ServerTimestamp"]}"#,
        )
        .fails(SentinelInArray),
        Case::new("Delete cannot appear in data", r#"{"a": 1, "b": "Delete"}"#)
            .fails(DeleteNotAllowed),
    ];
    let must_not_exist = precondition_json(&Precondition::MustNotExist);
    cases
        .iter()
        .enumerate()
        .map(|(index, case)| {
            let test = TestKind::Create(CreateTest {
                doc_ref_path: DOC_PATH.to_string(),
                json_data: case.data.to_string(),
                outcome: case.outcome(must_not_exist.clone())?,
            });
            Ok(named("create", index, case.description, test))
        })
        .collect()
}

fn set_tests() -> FirestoreResult<Vec<ConformanceTest>> {
    let cases = [
        Case::new("Set with no options", r#"{"a": 1}"#).writes(json!({"a": 1})),
        Case::new("Don't split on dots", r#"{ "a.b": { "f.g": 2 }, "h": { "g": 3 } }"#)
            .writes(json!({"a.b": {"f.g": 2}, "h": {"g": 3}})),
        Case::new("MergeAll", r#"{"a": 1, "b": 2}"#)
            .option(SetOption::merge_all())
            .writes(json!({"a": 1, "b": 2}))
            .mask(&["a", "b"]),
        Case::new("MergeAll with nested fields", r#"{"h": { "g": 3, "f": 4 }}"#)
            .option(SetOption::merge_all())
            .writes(json!({"h": {"g": 3, "f": 4}}))
            .mask(&["h.f", "h.g"]),
        Case::new("Merge with a field", r#"{"a": 1, "b": 2}"#)
            .option(SetOption::merge(&["a"]))
            .writes(json!({"a": 1}))
            .mask(&["a"]),
        Case::new("Merge with a nested field", r#"{"h": {"g": 4, "f": 5}}"#)
            .option(SetOption::merge(&["h.g"]))
            .writes(json!({"h": {"g": 4}}))
            .mask(&["h.g"]),
        Case::new("Merge field is not a leaf", r#"{"h": {"g": 5, "f": 6}, "e": 7}"#)
            .option(SetOption::merge(&["h"]))
            .writes(json!({"h": {"g": 5, "f": 6}}))
            .mask(&["h"]),
        Case::new("Merge with FieldPaths", r#"{"*": {"~": true}}"#)
            .option(SetOption::merge_paths(vec![FixtureFieldPath::new(["*", "~"])]))
            .writes(json!({"*": {"~": true}}))
            .mask(&["`*`.`~`"]),
        Case::new(
            "a ServerTimestamp field becomes a transform",
            r#"{"a": 1, "b": "ServerTimestamp"}"#,
        )
        .writes(json!({"a": 1}))
        .transforms(&["b"]),
        Case::new(
            "nested ServerTimestamp field",
            r#"{"a": 1, "b": {"c": "ServerTimestamp"}}"#,
        )
        .writes(json!({"a": 1}))
        .transforms(&["b.c"]),
        Case::new(
            "multiple ServerTimestamp fields",
            r#"{"a": 1, "b": "ServerTimestamp", "c": {"d": "ServerTimestamp"}}"#,
        )
        .writes(json!({"a": 1}))
        .transforms(&["b", "c.d"]),
        Case::new(
            "ServerTimestamp with MergeAll",
            r#"{"a": 1, "b": "ServerTimestamp"}"#,
        )
        .option(SetOption::merge_all())
        .writes(json!({"a": 1}))
        .mask(&["a"])
        .transforms(&["b"]),
        Case::new(
            "ServerTimestamp with Merge of both fields",
            r#"{"a": 1, "b": "ServerTimestamp"}"#,
        )
        .option(SetOption::merge(&["a", "b"]))
        .writes(json!({"a": 1}))
        .mask(&["a"])
        .transforms(&["b"]),
        Case::new(
            "If is ServerTimestamp not in Merge, no transform",
            r#"{"a": 1, "b": "ServerTimestamp"}"#,
        )
        .option(SetOption::merge(&["a"]))
        .writes(json!({"a": 1}))
        .mask(&["a"]),
        Case::new(
            "If no ordinary values in Merge, no write",
            r#"{"a": 1, "b": "ServerTimestamp"}"#,
        )
        .option(SetOption::merge(&["b"]))
        .transforms(&["b"]),
        Case::new("Delete with MergeAll", r#"{"a": 1, "b": "Delete"}"#)
            .option(SetOption::merge_all())
            .writes(json!({"a": 1}))
            .mask(&["a", "b"]),
        Case::new("Delete with Merge of both fields", r#"{"a": 1, "b": "Delete"}"#)
            .option(SetOption::merge(&["a", "b"]))
            .writes(json!({"a": 1}))
            .mask(&["a", "b"]),
        Case::new("Delete in an unmerged field is dropped", r#"{"a": 1, "b": "Delete"}"#)
            .option(SetOption::merge(&["a"]))
            .writes(json!({"a": 1}))
            .mask(&["a"]),
        // Errors:
        Case::new("Merge fields must all be present in data", r#"{"a": 1}"#)
            .option(SetOption::merge(&["b", "a"]))
            .fails(MergeFieldNotFound),
        Case::new(
            "ServerTimestamp cannot be in an array value",
            r#"{"a": ["ServerTimestamp"]}"#,
        )
        .fails(SentinelInArray),
        Case::new("Delete cannot appear in data", r#"{"a": 1, "b": "Delete"}"#)
            .fails(DeleteNotAllowed),
        Case::new("Delete cannot be nested, even with MergeAll", r#"{"a": {"b": "Delete"}}"#)
            .option(SetOption::merge_all())
            .fails(NestedDelete),
    ];
    cases
        .iter()
        .enumerate()
        .map(|(index, case)| {
            let test = TestKind::Set(SetTest {
                doc_ref_path: DOC_PATH.to_string(),
                option: case.option.clone(),
                json_data: case.data.to_string(),
                outcome: case.outcome(None)?,
            });
            Ok(named("set", index, case.description, test))
        })
        .collect()
}

fn update_tests(update_time: Precondition) -> FirestoreResult<Vec<ConformanceTest>> {
    let cases = [
        Case::new("basic update", r#"{"a": 1, "b": 2}"#)
            .writes(json!({"a": 1, "b": 2}))
            .mask(&["a", "b"]),
        Case::new("nested paths", r#"{"a": 1, "b": {"c": 2}}"#)
            .writes(json!({"a": 1, "b": {"c": 2}}))
            .mask(&["a", "b"]),
        Case::new("split on dots", r#"{"a.b.c": 1}"#)
            .writes(json!({"a": {"b": {"c": 1}}}))
            .mask(&["a.b.c"]),
        Case::new("Split on dots for top-level keys only", r#"{"h.g": {"j.k": 6}}"#)
            .writes(json!({"h": {"g": {"j.k": 6}}}))
            .mask(&["h.g"]),
        Case::new("Delete", r#"{"a": 1, "b": "Delete"}"#)
            .writes(json!({"a": 1}))
            .mask(&["a", "b"]),
        Case::new("Delete alone", r#"{"a": "Delete"}"#)
            .writes(json!({}))
            .mask(&["a"]),
        Case::new("Delete with a dotted field", r#"{"a": 1, "b.c": "Delete"}"#)
            .writes(json!({"a": 1}))
            .mask(&["a", "b.c"]),
        Case::new("last-update-time precondition", r#"{"a": 1}"#)
            .precondition(update_time)
            .writes(json!({"a": 1}))
            .mask(&["a"]),
        Case::new(
            "a ServerTimestamp field becomes a transform",
            r#"{"a": 1, "b": "ServerTimestamp"}"#,
        )
        .writes(json!({"a": 1}))
        .mask(&["a"])
        .transforms(&["b"]),
        Case::new(
            "nested ServerTimestamp field",
            r#"{"a": 1, "b": {"c": "ServerTimestamp"}}"#,
        )
        .writes(json!({"a": 1}))
        .mask(&["a", "b"])
        .transforms(&["b.c"]),
        // b is set only by the transform; c is replaced entirely by the update.
        Case::new(
            "multiple ServerTimestamp fields",
            r#"{"a": 1, "b": "ServerTimestamp", "c": {"d": "ServerTimestamp"}}"#,
        )
        .writes(json!({"a": 1}))
        .mask(&["a", "c"])
        .transforms(&["b", "c.d"]),
        // The empty update carries the precondition.
        Case::new("ServerTimestamp with dotted field", r#"{"a.b.c": "ServerTimestamp"}"#)
            .mask(&[])
            .transforms(&["a.b.c"]),
        // Errors
        Case::new("no paths", "{}").fails(NoPaths),
        Case::new("invalid character", r#"{"a~b": 1}"#).fails(InvalidPath),
        Case::new("a path component cannot be empty", r#"{"a..b": 1}"#).fails(InvalidPath),
        Case::new("one field cannot be a prefix of another", r#"{"a.b": 1, "a": 2}"#)
            .fails(PrefixCollision),
        Case::new("Delete cannot be in an array value", r#"{"a": [2, 3, "Delete"]}"#)
            .fails(SentinelInArray),
        Case::new("Delete cannot be nested", r#"{"a": {"b": "Delete"}}"#).fails(NestedDelete),
        Case::new("Exists precondition is invalid", r#"{"a": 1}"#)
            .precondition(Precondition::MustExist)
            .fails(InvalidPrecondition),
        Case::new(
            "ServerTimestamp cannot be in an array value",
            r#"{"a": ["ServerTimestamp"]}"#,
        )
        .fails(SentinelInArray),
        Case::new(
            "prefix collision is reported before a Delete in an array",
            r#"{"a.b": 1, "a": [2, 3, "Delete"]}"#,
        )
        .fails(PrefixCollision),
    ];
    cases
        .iter()
        .enumerate()
        .map(|(index, case)| {
            let test = TestKind::Update(UpdateTest {
                doc_ref_path: DOC_PATH.to_string(),
                precondition: case.precondition,
                json_data: case.data.to_string(),
                outcome: case.outcome(update_current_document(&case.precondition))?,
            });
            Ok(named("update", index, case.description, test))
        })
        .collect()
}

fn update_paths_tests(update_time: Precondition) -> FirestoreResult<Vec<ConformanceTest>> {
    let cases = [
        Case::paths("basic call", &[&["a"], &["b", "c"]], &["1", "2"])
            .writes(json!({"a": 1, "b": {"c": 2}}))
            .mask(&["a", "b.c"]),
        Case::paths(
            "FieldPath elements are not split on dots",
            &[&["a.b", "f.g"]],
            &[r#"{"n.o": 7}"#],
        )
        .writes(json!({"a.b": {"f.g": {"n.o": 7}}}))
        .mask(&["`a.b`.`f.g`"]),
        Case::paths("special characters", &[&["*", "~"], &["*", "/"]], &["1", "2"])
            .writes(json!({"*": {"~": 1, "/": 2}}))
            .mask(&["`*`.`/`", "`*`.`~`"]),
        Case::paths("last-update-time precondition", &[&["a"]], &["1"])
            .precondition(update_time)
            .writes(json!({"a": 1}))
            .mask(&["a"]),
        Case::paths("Delete", &[&["a", "b"], &["b", "c"]], &["1", r#""Delete""#])
            .writes(json!({"a": {"b": 1}}))
            .mask(&["a.b", "b.c"]),
        Case::paths("Delete alone", &[&["a", "b"]], &[r#""Delete""#])
            .writes(json!({}))
            .mask(&["a.b"]),
        Case::paths(
            "ServerTimestamp",
            &[&["a", "b"], &["c"]],
            &[r#""ServerTimestamp""#, "1"],
        )
        .writes(json!({"c": 1}))
        .mask(&["c"])
        .transforms(&["a.b"]),
        Case::paths("ServerTimestamp alone", &[&["a", "b"]], &[r#""ServerTimestamp""#])
            .mask(&[])
            .transforms(&["a.b"]),
        // Errors
        Case::paths("no updates", &[], &[]).fails(NoPaths),
        Case::paths("empty field path", &[&[]], &["1"]).fails(InvalidPath),
        Case::paths("empty field path component", &[&["*", ""]], &["1"]).fails(InvalidPath),
        Case::paths(
            "the same field cannot occur more than once",
            &[&["a"], &["b"], &["a"]],
            &["1", "2", "3"],
        )
        .fails(DuplicatePath),
        Case::paths(
            "one field cannot be a prefix of another",
            &[&["*", "a"], &["b"], &["*", "a", "b"]],
            &["1", "2", "3"],
        )
        .fails(PrefixCollision),
        Case::paths("Exists precondition is invalid", &[&["a"]], &["1"])
            .precondition(Precondition::MustExist)
            .fails(InvalidPrecondition),
        Case::paths("Delete cannot be in an array value", &[&["a"]], &[r#"["Delete"]"#])
            .fails(SentinelInArray),
        Case::paths("Delete cannot be nested", &[&["a"]], &[r#"{"b": "Delete"}"#])
            .fails(NestedDelete),
        Case::paths(
            "ServerTimestamp cannot be in an array value",
            &[&["a"]],
            &[r#"["ServerTimestamp"]"#],
        )
        .fails(SentinelInArray),
    ];
    cases
        .iter()
        .enumerate()
        .map(|(index, case)| {
            let test = TestKind::UpdatePaths(UpdatePathsTest {
                doc_ref_path: DOC_PATH.to_string(),
                precondition: case.precondition,
                field_paths: case.paths.clone(),
                json_values: case.values.iter().map(|value| value.to_string()).collect(),
                outcome: case.outcome(update_current_document(&case.precondition))?,
            });
            Ok(named("update-paths", index, case.description, test))
        })
        .collect()
}

fn delete_tests(update_time: Precondition) -> Vec<ConformanceTest> {
    let cases = [
        ("delete without precondition", Precondition::None),
        ("delete with last-update-time precondition", update_time),
        ("delete with exists precondition", Precondition::MustExist),
    ];
    cases
        .iter()
        .enumerate()
        .map(|(index, (description, precondition))| {
            let mut write = json!({ "delete": DOC_PATH });
            if let Some(current_document) = precondition_json(precondition) {
                write["currentDocument"] = current_document;
            }
            let test = TestKind::Delete(DeleteTest {
                doc_ref_path: DOC_PATH.to_string(),
                precondition: *precondition,
                outcome: Outcome::success(json!({ "database": DATABASE, "writes": [write] })),
            });
            named("delete", index, description, test)
        })
        .collect()
}

/// Updates default to requiring an existing document.
fn update_current_document(precondition: &Precondition) -> Option<JsonValue> {
    match precondition {
        Precondition::None => precondition_json(&Precondition::MustExist),
        other => precondition_json(other),
    }
}
