use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use serde_json::Value as JsonValue;

use crate::api::operations::{plan_mutation, Mutation, Precondition, SetOptions};
use crate::error::FirestoreResult;
use crate::model::{DatabaseId, DocumentName, IntoFieldPath, ResourcePath};
use crate::remote::mutation::WritePlan;
use crate::remote::serializer::JsonProtoSerializer;
use crate::value::FirestoreValue;

/// Target of a write: one document in one database.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentReference {
    name: DocumentName,
}

impl DocumentReference {
    /// Builds a reference from a database and a `collection/document` path.
    pub fn new(database_id: DatabaseId, path: &str) -> FirestoreResult<Self> {
        let path = ResourcePath::from_string(path)?;
        Ok(Self {
            name: DocumentName::new(database_id, path)?,
        })
    }

    /// Parses a full `projects/<p>/databases/<d>/documents/...` name.
    pub fn parse(name: &str) -> FirestoreResult<Self> {
        Ok(Self {
            name: DocumentName::parse(name)?,
        })
    }

    pub fn name(&self) -> &DocumentName {
        &self.name
    }

    /// The document identifier (the last segment of its path).
    pub fn id(&self) -> &str {
        self.name.id()
    }

    pub fn database_id(&self) -> &DatabaseId {
        self.name.database_id()
    }

    pub fn create(&self, data: BTreeMap<String, FirestoreValue>) -> FirestoreResult<WritePlan> {
        self.compile(Mutation::Create { data })
    }

    pub fn set(
        &self,
        data: BTreeMap<String, FirestoreValue>,
        options: SetOptions,
    ) -> FirestoreResult<WritePlan> {
        self.compile(Mutation::Set { data, options })
    }

    /// Updates fields named by the top-level keys of `data`, which are read
    /// as dot-separated paths.
    pub fn update(
        &self,
        data: BTreeMap<String, FirestoreValue>,
        precondition: Precondition,
    ) -> FirestoreResult<WritePlan> {
        self.compile(Mutation::Update { data, precondition })
    }

    pub fn update_paths<I, P>(
        &self,
        updates: I,
        precondition: Precondition,
    ) -> FirestoreResult<WritePlan>
    where
        I: IntoIterator<Item = (P, FirestoreValue)>,
        P: IntoFieldPath,
    {
        let updates = updates
            .into_iter()
            .map(|(path, value)| Ok((path.into_field_path()?, value)))
            .collect::<FirestoreResult<Vec<_>>>()?;
        self.compile(Mutation::UpdatePaths {
            updates,
            precondition,
        })
    }

    pub fn delete(&self, precondition: Precondition) -> FirestoreResult<WritePlan> {
        self.compile(Mutation::Delete { precondition })
    }

    /// Compiles any mutation against this document.
    pub fn compile(&self, mutation: Mutation) -> FirestoreResult<WritePlan> {
        log::debug!("compiling {} for {}", mutation.kind_name(), self.name);
        let planned = plan_mutation(mutation)?;
        Ok(WritePlan::assemble(self.name.clone(), planned))
    }

    /// The read request for this document.
    pub fn get_request(&self) -> JsonValue {
        JsonProtoSerializer::new().encode_get_request(&self.name)
    }
}

impl Display for DocumentReference {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "DocumentReference({})", self.name.path())
    }
}
