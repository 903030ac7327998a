//! Replays fixtures through the compiler.

use serde_json::Value as JsonValue;

use crate::api::operations::SetOptions;
use crate::api::DocumentReference;
use crate::conformance::{ConformanceTest, SetOption, TestKind};
use crate::error::{internal_error, invalid_argument, FirestoreResult};
use crate::model::FieldPath;
use crate::remote::mutation::{CommitRequest, WritePlan};
use crate::remote::serializer::JsonProtoSerializer;
use crate::value::{decode_json_data, decode_json_value, FirestoreValue, JsonDecodeOptions};

/// Runs the fixture's inputs and returns the request the compiler produces.
pub fn run(test: &ConformanceTest) -> FirestoreResult<JsonValue> {
    let options = JsonDecodeOptions::with_sentinel_markers();
    let plan = match &test.test {
        TestKind::Get(get) => {
            return Ok(DocumentReference::parse(&get.doc_ref_path)?.get_request());
        }
        TestKind::Create(create) => DocumentReference::parse(&create.doc_ref_path)?
            .create(decode_json_data(&create.json_data, options)?)?,
        TestKind::Set(set) => DocumentReference::parse(&set.doc_ref_path)?.set(
            decode_json_data(&set.json_data, options)?,
            set_options(set.option.as_ref())?,
        )?,
        TestKind::Update(update) => DocumentReference::parse(&update.doc_ref_path)?.update(
            decode_json_data(&update.json_data, options)?,
            update.precondition,
        )?,
        TestKind::UpdatePaths(update) => {
            let reference = DocumentReference::parse(&update.doc_ref_path)?;
            if update.field_paths.len() != update.json_values.len() {
                return Err(invalid_argument(format!(
                    "{} field paths but {} values",
                    update.field_paths.len(),
                    update.json_values.len()
                )));
            }
            let updates = update
                .field_paths
                .iter()
                .zip(&update.json_values)
                .map(|(path, value)| {
                    Ok((FieldPath::new(path.field.iter().cloned())?, decode_value(value)?))
                })
                .collect::<FirestoreResult<Vec<(FieldPath, FirestoreValue)>>>()?;
            reference.update_paths(updates, update.precondition)?
        }
        TestKind::Delete(delete) => {
            DocumentReference::parse(&delete.doc_ref_path)?.delete(delete.precondition)?
        }
    };
    Ok(encode_plan(plan))
}

/// Runs the fixture and checks the result against its expectation.
pub fn verify(test: &ConformanceTest) -> FirestoreResult<()> {
    match (run(test), test.expected_request(), test.expected_error()) {
        (Ok(actual), Some(expected), _) if &actual == expected => Ok(()),
        (Err(err), None, Some(code)) if err.code == code => Ok(()),
        (Ok(actual), _, _) => Err(internal_error(format!(
            "{}: unexpected request {actual}",
            test.name
        ))),
        (Err(err), _, _) => Err(internal_error(format!("{}: unexpected error {err}", test.name))),
    }
}

fn set_options(option: Option<&SetOption>) -> FirestoreResult<SetOptions> {
    match option {
        None => Ok(SetOptions::default()),
        Some(option) if option.all => Ok(SetOptions::merge_all()),
        Some(option) => {
            let fields = option
                .fields
                .iter()
                .map(|path| FieldPath::new(path.field.iter().cloned()))
                .collect::<FirestoreResult<Vec<_>>>()?;
            SetOptions::merge_fields(fields)
        }
    }
}

fn decode_value(text: &str) -> FirestoreResult<FirestoreValue> {
    let parsed: JsonValue = serde_json::from_str(text)
        .map_err(|err| invalid_argument(format!("Invalid JSON value '{text}': {err}")))?;
    decode_json_value(&parsed, JsonDecodeOptions::with_sentinel_markers())
}

fn encode_plan(plan: WritePlan) -> JsonValue {
    JsonProtoSerializer::new().encode_commit_request(&CommitRequest::from_plan(plan))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conformance::all_tests;

    fn find(name: &str) -> ConformanceTest {
        all_tests()
            .unwrap()
            .into_iter()
            .find(|test| test.name == name)
            .unwrap()
    }

    #[test]
    fn get_returns_document_name() {
        let request = run(&find("get-1")).unwrap();
        assert_eq!(request["name"], "projects/projectID/databases/(default)/documents/C/d");
    }

    #[test]
    fn error_fixture_verifies() {
        let test = find("update-13");
        assert_eq!(test.description, "no paths");
        verify(&test).unwrap();
    }

    #[test]
    fn prefix_collision_wins_over_array_delete() {
        let test = find("update-21");
        let err = run(&test).unwrap_err();
        assert_eq!(err.code_str(), "firestore/prefix-collision");
        verify(&test).unwrap();
    }

    #[test]
    fn mismatched_value_count_is_rejected() {
        let mut test = find("update-paths-1");
        if let TestKind::UpdatePaths(update) = &mut test.test {
            update.json_values.pop();
        }
        let err = run(&test).unwrap_err();
        assert_eq!(err.code_str(), "firestore/invalid-argument");
    }
}
