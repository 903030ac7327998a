mod database_id;
mod document_name;
mod field_path;
mod resource_path;
mod timestamp;

pub use database_id::DatabaseId;
pub use document_name::DocumentName;
pub use field_path::{FieldPath, IntoFieldPath};
pub use resource_path::ResourcePath;
pub use timestamp::Timestamp;
