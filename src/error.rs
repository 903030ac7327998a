use std::error::Error;
use std::fmt::{Display, Formatter};

use serde::{Serialize, Serializer};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FirestoreErrorCode {
    InvalidArgument,
    InvalidPath,
    NoPaths,
    DuplicatePath,
    PrefixCollision,
    SentinelInArray,
    NestedDelete,
    DeleteNotAllowed,
    MergeFieldNotFound,
    InvalidPrecondition,
    UnsupportedType,
    ResourceExhausted,
    Internal,
}

impl FirestoreErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FirestoreErrorCode::InvalidArgument => "firestore/invalid-argument",
            FirestoreErrorCode::InvalidPath => "firestore/invalid-path",
            FirestoreErrorCode::NoPaths => "firestore/no-paths",
            FirestoreErrorCode::DuplicatePath => "firestore/duplicate-path",
            FirestoreErrorCode::PrefixCollision => "firestore/prefix-collision",
            FirestoreErrorCode::SentinelInArray => "firestore/sentinel-in-array",
            FirestoreErrorCode::NestedDelete => "firestore/nested-delete",
            FirestoreErrorCode::DeleteNotAllowed => "firestore/delete-not-allowed",
            FirestoreErrorCode::MergeFieldNotFound => "firestore/merge-field-not-found",
            FirestoreErrorCode::InvalidPrecondition => "firestore/invalid-precondition",
            FirestoreErrorCode::UnsupportedType => "firestore/unsupported-type",
            FirestoreErrorCode::ResourceExhausted => "firestore/resource-exhausted",
            FirestoreErrorCode::Internal => "firestore/internal",
        }
    }
}

impl Serialize for FirestoreErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Failure of a single compile call.
///
/// `subject` carries the offending field path or value when there is one, so
/// callers can report it without parsing the message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FirestoreError {
    pub code: FirestoreErrorCode,
    message: String,
    subject: Option<String>,
}

impl FirestoreError {
    pub fn new(code: FirestoreErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            subject: None,
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }
}

impl Display for FirestoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.subject {
            Some(subject) => write!(f, "{} '{}' ({})", self.message, subject, self.code_str()),
            None => write!(f, "{} ({})", self.message, self.code_str()),
        }
    }
}

impl Error for FirestoreError {}

pub type FirestoreResult<T> = Result<T, FirestoreError>;

pub fn invalid_argument(message: impl Into<String>) -> FirestoreError {
    FirestoreError::new(FirestoreErrorCode::InvalidArgument, message)
}

pub fn invalid_path(message: impl Into<String>, path: impl Into<String>) -> FirestoreError {
    FirestoreError::new(FirestoreErrorCode::InvalidPath, message).with_subject(path)
}

pub fn no_paths(message: impl Into<String>) -> FirestoreError {
    FirestoreError::new(FirestoreErrorCode::NoPaths, message)
}

pub fn duplicate_path(path: impl Into<String>) -> FirestoreError {
    FirestoreError::new(
        FirestoreErrorCode::DuplicatePath,
        "Field path appears more than once in the update",
    )
    .with_subject(path)
}

pub fn prefix_collision(prefix: &str, path: &str) -> FirestoreError {
    FirestoreError::new(
        FirestoreErrorCode::PrefixCollision,
        format!("Field path '{prefix}' is a prefix of another updated field"),
    )
    .with_subject(path)
}

pub fn sentinel_in_array(path: impl Into<String>) -> FirestoreError {
    FirestoreError::new(
        FirestoreErrorCode::SentinelInArray,
        "Invalid data. Sentinel values cannot be used inside arrays",
    )
    .with_subject(path)
}

pub fn nested_delete(path: impl Into<String>) -> FirestoreError {
    FirestoreError::new(
        FirestoreErrorCode::NestedDelete,
        "Invalid data. Delete can only appear at the top level of the written data",
    )
    .with_subject(path)
}

pub fn delete_not_allowed(path: impl Into<String>) -> FirestoreError {
    FirestoreError::new(
        FirestoreErrorCode::DeleteNotAllowed,
        "Invalid data. Delete can only be used with update or a merging set",
    )
    .with_subject(path)
}

pub fn merge_field_not_found(path: impl Into<String>) -> FirestoreError {
    FirestoreError::new(
        FirestoreErrorCode::MergeFieldNotFound,
        "Field is specified in merge fields but missing from the provided data",
    )
    .with_subject(path)
}

pub fn invalid_precondition(message: impl Into<String>) -> FirestoreError {
    FirestoreError::new(FirestoreErrorCode::InvalidPrecondition, message)
}

pub fn unsupported_type(message: impl Into<String>, value: impl Into<String>) -> FirestoreError {
    FirestoreError::new(FirestoreErrorCode::UnsupportedType, message).with_subject(value)
}

pub fn resource_exhausted(message: impl Into<String>) -> FirestoreError {
    FirestoreError::new(FirestoreErrorCode::ResourceExhausted, message)
}

pub fn internal_error(message: impl Into<String>) -> FirestoreError {
    FirestoreError::new(FirestoreErrorCode::Internal, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_subject_and_code() {
        let err = nested_delete("a.b");
        assert_eq!(err.code_str(), "firestore/nested-delete");
        assert_eq!(err.subject(), Some("a.b"));
        assert!(err.to_string().ends_with("'a.b' (firestore/nested-delete)"));
    }

    #[test]
    fn display_without_subject() {
        let err = no_paths("update requires at least one field");
        assert_eq!(
            err.to_string(),
            "update requires at least one field (firestore/no-paths)"
        );
    }
}
