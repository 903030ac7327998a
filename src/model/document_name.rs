use std::fmt::{Display, Formatter};

use crate::error::{invalid_argument, FirestoreResult};
use crate::model::{DatabaseId, ResourcePath};

/// Fully qualified document identity:
/// `projects/<project>/databases/<database>/documents/<collection>/<document>`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DocumentName {
    database_id: DatabaseId,
    path: ResourcePath,
}

impl DocumentName {
    /// Names the document at `path` (relative to the `documents` root) in
    /// `database_id`. The path must alternate collection and document ids.
    pub fn new(database_id: DatabaseId, path: ResourcePath) -> FirestoreResult<Self> {
        if path.is_empty() || path.len() % 2 != 0 {
            return Err(invalid_argument(format!(
                "'{path}' is not a document path: it needs an even, non-zero number of segments"
            )));
        }
        Ok(Self { database_id, path })
    }

    pub fn parse(name: &str) -> FirestoreResult<Self> {
        let path = ResourcePath::from_string(name)?;
        let well_formed = path.segment(0) == Some("projects")
            && path.segment(2) == Some("databases")
            && path.segment(4) == Some("documents");
        if !well_formed {
            return Err(invalid_argument(format!(
                "'{name}' is not a document name of the form \
                 projects/<project>/databases/<database>/documents/<path>"
            )));
        }
        // Both lookups succeed once the markers at 2 and 4 are present.
        let database_id = DatabaseId::new(
            path.segment(1).unwrap_or_default(),
            path.segment(3).unwrap_or_default(),
        );
        Self::new(database_id, path.pop_first_n(5))
    }

    pub fn database_id(&self) -> &DatabaseId {
        &self.database_id
    }

    /// Path below the `documents` root, e.g. `C/d`.
    pub fn path(&self) -> &ResourcePath {
        &self.path
    }

    pub fn id(&self) -> &str {
        self.path
            .last_segment()
            .expect("document paths are never empty")
    }

    pub fn canonical_string(&self) -> String {
        format!(
            "{}/documents/{}",
            self.database_id.database_name(),
            self.path.canonical_string()
        )
    }
}

impl Display for DocumentName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.canonical_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "projects/projectID/databases/(default)/documents/C/d";

    #[test]
    fn parses_and_renders() {
        let name = DocumentName::parse(DOC).unwrap();
        assert_eq!(name.database_id().project_id(), "projectID");
        assert_eq!(name.database_id().database(), "(default)");
        assert_eq!(name.id(), "d");
        assert_eq!(name.path().canonical_string(), "C/d");
        assert_eq!(name.to_string(), DOC);
    }

    #[test]
    fn accepts_nested_documents() {
        let name = DocumentName::parse(
            "projects/p/databases/(default)/documents/rooms/eros/messages/m1",
        )
        .unwrap();
        assert_eq!(name.id(), "m1");
        assert_eq!(name.path().len(), 4);
    }

    #[test]
    fn new_checks_the_document_path() {
        let database = DatabaseId::new("p", "(default)");
        let path = ResourcePath::from_string("rooms/eros").unwrap();
        let name = DocumentName::new(database.clone(), path).unwrap();
        assert_eq!(name.to_string(), "projects/p/databases/(default)/documents/rooms/eros");

        for bad in ["", "rooms", "rooms/eros/messages"] {
            let path = ResourcePath::from_string(bad).unwrap();
            let err = DocumentName::new(database.clone(), path).unwrap_err();
            assert_eq!(err.code_str(), "firestore/invalid-argument", "{bad}");
        }
    }

    #[test]
    fn rejects_collection_and_garbage() {
        for bad in [
            "projects/p/databases/(default)/documents/C",
            "projects/p/databases/(default)/documents",
            "C/d",
            "projects/p/dbs/(default)/documents/C/d",
        ] {
            let err = DocumentName::parse(bad).unwrap_err();
            assert_eq!(err.code_str(), "firestore/invalid-argument", "{bad}");
        }
    }
}
