use std::collections::BTreeMap;

use crate::api::operations::{Mutation, Precondition, SetOptions};
use crate::api::reference::DocumentReference;
use crate::constants::MAX_BATCH_WRITES;
use crate::error::{invalid_argument, resource_exhausted, FirestoreResult};
use crate::model::{DatabaseId, FieldPath};
use crate::remote::mutation::{CommitRequest, Write};
use crate::value::FirestoreValue;

/// Aggregates the write plans of several mutations into one atomic commit.
#[derive(Clone, Debug)]
pub struct WriteBatch {
    database_id: DatabaseId,
    writes: Vec<Write>,
}

impl WriteBatch {
    pub fn new(database_id: DatabaseId) -> Self {
        Self {
            database_id,
            writes: Vec::new(),
        }
    }

    pub fn create(
        &mut self,
        reference: &DocumentReference,
        data: BTreeMap<String, FirestoreValue>,
    ) -> FirestoreResult<&mut Self> {
        self.push(reference, Mutation::Create { data })
    }

    pub fn set(
        &mut self,
        reference: &DocumentReference,
        data: BTreeMap<String, FirestoreValue>,
        options: Option<SetOptions>,
    ) -> FirestoreResult<&mut Self> {
        let options = options.unwrap_or_default();
        self.push(reference, Mutation::Set { data, options })
    }

    pub fn update(
        &mut self,
        reference: &DocumentReference,
        data: BTreeMap<String, FirestoreValue>,
        precondition: Precondition,
    ) -> FirestoreResult<&mut Self> {
        self.push(reference, Mutation::Update { data, precondition })
    }

    pub fn update_paths(
        &mut self,
        reference: &DocumentReference,
        updates: Vec<(FieldPath, FirestoreValue)>,
        precondition: Precondition,
    ) -> FirestoreResult<&mut Self> {
        self.push(
            reference,
            Mutation::UpdatePaths {
                updates,
                precondition,
            },
        )
    }

    pub fn delete(
        &mut self,
        reference: &DocumentReference,
        precondition: Precondition,
    ) -> FirestoreResult<&mut Self> {
        self.push(reference, Mutation::Delete { precondition })
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    /// The commit carrying every queued write, in insertion order.
    pub fn commit_request(&self) -> CommitRequest {
        CommitRequest::new(self.database_id.clone(), self.writes.clone())
    }

    fn push(
        &mut self,
        reference: &DocumentReference,
        mutation: Mutation,
    ) -> FirestoreResult<&mut Self> {
        self.ensure_same_database(reference.database_id())?;
        let plan = reference.compile(mutation)?;
        self.ensure_capacity(plan.writes().len())?;
        self.writes.extend(plan.into_writes());
        Ok(self)
    }

    fn ensure_same_database(&self, other: &DatabaseId) -> FirestoreResult<()> {
        if &self.database_id != other {
            return Err(invalid_argument(format!(
                "WriteBatch targets {} but the document belongs to {}",
                self.database_id, other
            )));
        }
        Ok(())
    }

    fn ensure_capacity(&self, additional: usize) -> FirestoreResult<()> {
        if self.writes.len() + additional > MAX_BATCH_WRITES {
            return Err(resource_exhausted(format!(
                "WriteBatch cannot contain more than {MAX_BATCH_WRITES} writes"
            )));
        }
        Ok(())
    }
}
