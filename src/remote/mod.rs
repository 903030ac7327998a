pub mod mutation;
pub mod serializer;

pub use mutation::{CommitRequest, Write, WritePlan};
pub use serializer::JsonProtoSerializer;
