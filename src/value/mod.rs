mod array_value;
pub mod json;
mod map_value;
mod value;

pub use array_value::ArrayValue;
pub use json::{decode_json_data, decode_json_value, JsonDecodeOptions};
pub use map_value::MapValue;
pub use value::{FirestoreValue, SentinelValue, ValueKind};
