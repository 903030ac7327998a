//! Compiles Firestore document mutations into wire-level commit requests.
//!
//! A client call (`create`, `set` with optional merge, `update`, update by
//! field paths, `delete`) is validated and lowered into at most two writes:
//! an update carrying the field values and mask, followed by a transform
//! write for server timestamps. The precondition rides on the first write.
//!
//! ```
//! use std::collections::BTreeMap;
//! use firestore_write_compiler::{DocumentReference, FirestoreValue, SetOptions};
//! use firestore_write_compiler::remote::{CommitRequest, JsonProtoSerializer};
//!
//! let doc = DocumentReference::parse("projects/p/databases/(default)/documents/C/d")?;
//! let mut data = BTreeMap::new();
//! data.insert("a".to_string(), FirestoreValue::from_integer(1));
//! data.insert("b".to_string(), FirestoreValue::server_timestamp());
//!
//! let plan = doc.set(data, SetOptions::merge_all())?;
//! assert_eq!(plan.writes().len(), 2);
//! let request = JsonProtoSerializer::new().encode_commit_request(&CommitRequest::from_plan(plan));
//! assert_eq!(request["writes"][0]["updateMask"]["fieldPaths"][0], "a");
//! # Ok::<(), firestore_write_compiler::FirestoreError>(())
//! ```

pub mod api;
pub mod conformance;
mod constants;
pub mod error;
pub mod model;
pub mod remote;
pub mod value;

pub use api::{
    DocumentReference, MergeSpec, Mutation, PlannedMutation, Precondition, SetOptions, WriteBatch,
};
pub use constants::MAX_BATCH_WRITES;
pub use error::{FirestoreError, FirestoreErrorCode, FirestoreResult};
pub use model::{DatabaseId, DocumentName, FieldPath, IntoFieldPath, Timestamp};
pub use remote::{CommitRequest, Write, WritePlan};
pub use value::{FirestoreValue, SentinelValue};
