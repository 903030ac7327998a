pub mod operations;
mod reference;
pub mod sentinels;
mod write_batch;

pub use operations::{
    plan_mutation, DocumentUpdate, FieldTransform, MergeSpec, Mutation, PlannedMutation,
    Precondition, SetOptions, TransformOperation,
};
pub use reference::DocumentReference;
pub use sentinels::{extract_sentinels, ExtractedData};
pub use write_batch::WriteBatch;
