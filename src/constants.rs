pub const DEFAULT_DATABASE_ID: &str = "(default)";

/// Maximum number of writes a single commit may carry.
pub const MAX_BATCH_WRITES: usize = 500;

/// JSON string markers the conformance fixtures use for sentinel values.
pub const SERVER_TIMESTAMP_MARKER: &str = "ServerTimestamp";
pub const DELETE_MARKER: &str = "Delete";
