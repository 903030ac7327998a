use crate::api::operations::{DocumentUpdate, FieldTransform, PlannedMutation, Precondition};
use crate::model::{DatabaseId, DocumentName, FieldPath};
use crate::value::MapValue;

/// A single entry of a commit request.
#[derive(Clone, Debug, PartialEq)]
pub enum Write {
    Update {
        name: DocumentName,
        fields: MapValue,
        mask: Option<Vec<FieldPath>>,
        precondition: Precondition,
    },
    Transform {
        document: DocumentName,
        field_transforms: Vec<FieldTransform>,
        precondition: Precondition,
    },
    Delete {
        name: DocumentName,
        precondition: Precondition,
    },
}

impl Write {
    pub fn precondition(&self) -> &Precondition {
        match self {
            Write::Update { precondition, .. }
            | Write::Transform { precondition, .. }
            | Write::Delete { precondition, .. } => precondition,
        }
    }
}

/// Ordered writes for one logical mutation of one document.
///
/// At most an update write followed by a transform write, or a single delete.
/// Only the first write carries the precondition.
#[derive(Clone, Debug, PartialEq)]
pub struct WritePlan {
    document: DocumentName,
    writes: Vec<Write>,
}

impl WritePlan {
    pub fn assemble(document: DocumentName, planned: PlannedMutation) -> Self {
        let mut writes = Vec::with_capacity(2);
        match planned {
            PlannedMutation::Delete { precondition } => writes.push(Write::Delete {
                name: document.clone(),
                precondition,
            }),
            PlannedMutation::Write {
                update,
                transforms,
                precondition,
            } => {
                let mut pending = precondition;
                if let Some(DocumentUpdate { fields, mask }) = update {
                    writes.push(Write::Update {
                        name: document.clone(),
                        fields,
                        mask,
                        precondition: std::mem::take(&mut pending),
                    });
                }
                if !transforms.is_empty() {
                    writes.push(Write::Transform {
                        document: document.clone(),
                        field_transforms: transforms,
                        precondition: pending,
                    });
                }
            }
        }
        Self { document, writes }
    }

    pub fn document(&self) -> &DocumentName {
        &self.document
    }

    pub fn writes(&self) -> &[Write] {
        &self.writes
    }

    pub fn into_writes(self) -> Vec<Write> {
        self.writes
    }
}

/// Writes committed atomically against one database.
#[derive(Clone, Debug, PartialEq)]
pub struct CommitRequest {
    database: DatabaseId,
    writes: Vec<Write>,
}

impl CommitRequest {
    pub fn new(database: DatabaseId, writes: Vec<Write>) -> Self {
        Self { database, writes }
    }

    pub fn from_plan(plan: WritePlan) -> Self {
        let database = plan.document().database_id().clone();
        Self::new(database, plan.into_writes())
    }

    pub fn database(&self) -> &DatabaseId {
        &self.database
    }

    pub fn writes(&self) -> &[Write] {
        &self.writes
    }
}
