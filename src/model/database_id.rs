use std::fmt::{Display, Formatter};

use crate::constants::DEFAULT_DATABASE_ID;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DatabaseId {
    project_id: String,
    database: String,
}

impl DatabaseId {
    pub fn new(project_id: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            database: database.into(),
        }
    }

    pub fn default(project_id: impl Into<String>) -> Self {
        Self::new(project_id, DEFAULT_DATABASE_ID)
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// Resource name of the database, e.g. `projects/p/databases/(default)`.
    pub fn database_name(&self) -> String {
        format!("projects/{}/databases/{}", self.project_id, self.database)
    }
}

impl Display for DatabaseId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.database_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_database_name() {
        let db = DatabaseId::default("projectID");
        assert_eq!(db.database(), DEFAULT_DATABASE_ID);
        assert_eq!(db.database_name(), "projects/projectID/databases/(default)");
    }
}
