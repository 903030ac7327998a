//! Cross-client conformance fixtures for the write compiler.
//!
//! Each fixture names a document, carries the raw inputs of one client call
//! and either the commit request that call must produce or the error code it
//! must fail with. [`cases::all_tests`] builds the tables,
//! [`fixture::FixtureWriter`] persists them as JSON and [`runner::run`]
//! replays them through the compiler.

pub mod cases;
pub mod fixture;
pub mod runner;

use serde::{Serialize, Serializer};
use serde_json::Value as JsonValue;

use crate::api::operations::Precondition;
use crate::error::FirestoreErrorCode;
use crate::remote::serializer::JsonProtoSerializer;

pub use cases::all_tests;
pub use fixture::{generate_all, FixtureWriter};
pub use runner::{run, verify};

#[derive(Clone, Debug, Serialize)]
pub struct ConformanceTest {
    /// File stem, e.g. `update-paths-3`.
    #[serde(skip)]
    pub name: String,
    pub description: String,
    #[serde(flatten)]
    pub test: TestKind,
}

impl ConformanceTest {
    pub fn expected_request(&self) -> Option<&JsonValue> {
        match &self.test {
            TestKind::Get(test) => Some(&test.request),
            TestKind::Create(test) => test.outcome.request.as_ref(),
            TestKind::Set(test) => test.outcome.request.as_ref(),
            TestKind::Update(test) => test.outcome.request.as_ref(),
            TestKind::UpdatePaths(test) => test.outcome.request.as_ref(),
            TestKind::Delete(test) => test.outcome.request.as_ref(),
        }
    }

    pub fn expected_error(&self) -> Option<FirestoreErrorCode> {
        match &self.test {
            TestKind::Get(_) => None,
            TestKind::Create(test) => test.outcome.error_code,
            TestKind::Set(test) => test.outcome.error_code,
            TestKind::Update(test) => test.outcome.error_code,
            TestKind::UpdatePaths(test) => test.outcome.error_code,
            TestKind::Delete(test) => test.outcome.error_code,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TestKind {
    Get(GetTest),
    Create(CreateTest),
    Set(SetTest),
    Update(UpdateTest),
    UpdatePaths(UpdatePathsTest),
    Delete(DeleteTest),
}

/// Expected result shared by every write fixture.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Outcome {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<JsonValue>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<FirestoreErrorCode>,
}

impl Outcome {
    pub fn success(request: JsonValue) -> Self {
        Self {
            request: Some(request),
            ..Self::default()
        }
    }

    pub fn failure(code: FirestoreErrorCode) -> Self {
        Self {
            request: None,
            is_error: true,
            error_code: Some(code),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetTest {
    pub doc_ref_path: String,
    pub request: JsonValue,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTest {
    pub doc_ref_path: String,
    pub json_data: String,
    #[serde(flatten)]
    pub outcome: Outcome,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetTest {
    pub doc_ref_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub option: Option<SetOption>,
    pub json_data: String,
    #[serde(flatten)]
    pub outcome: Outcome,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTest {
    pub doc_ref_path: String,
    #[serde(
        skip_serializing_if = "Precondition::is_none",
        serialize_with = "serialize_precondition"
    )]
    pub precondition: Precondition,
    pub json_data: String,
    #[serde(flatten)]
    pub outcome: Outcome,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePathsTest {
    pub doc_ref_path: String,
    #[serde(
        skip_serializing_if = "Precondition::is_none",
        serialize_with = "serialize_precondition"
    )]
    pub precondition: Precondition,
    pub field_paths: Vec<FixtureFieldPath>,
    /// One JSON document per entry of `field_paths`.
    pub json_values: Vec<String>,
    #[serde(flatten)]
    pub outcome: Outcome,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteTest {
    pub doc_ref_path: String,
    #[serde(
        skip_serializing_if = "Precondition::is_none",
        serialize_with = "serialize_precondition"
    )]
    pub precondition: Precondition,
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// Merge option of a set fixture: either `all` or a list of literal paths.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SetOption {
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub all: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FixtureFieldPath>,
}

impl SetOption {
    pub fn merge_all() -> Self {
        Self {
            all: true,
            fields: Vec::new(),
        }
    }

    /// Dotted shorthand; each argument is split on `.` without quoting rules.
    pub fn merge(paths: &[&str]) -> Self {
        Self {
            all: false,
            fields: paths
                .iter()
                .map(|path| FixtureFieldPath::new(path.split('.')))
                .collect(),
        }
    }

    pub fn merge_paths(paths: Vec<FixtureFieldPath>) -> Self {
        Self {
            all: false,
            fields: paths,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FixtureFieldPath {
    pub field: Vec<String>,
}

impl FixtureFieldPath {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            field: segments.into_iter().map(Into::into).collect(),
        }
    }
}

fn serialize_precondition<S: Serializer>(
    precondition: &Precondition,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    JsonProtoSerializer::new()
        .encode_precondition(precondition)
        .serialize(serializer)
}
