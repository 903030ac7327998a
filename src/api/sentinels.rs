use std::collections::BTreeMap;

use crate::error::{nested_delete, sentinel_in_array, FirestoreResult};
use crate::model::FieldPath;
use crate::value::{FirestoreValue, SentinelValue, ValueKind};

/// Document data with every sentinel pulled out.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExtractedData {
    /// Input data minus sentinel fields. Maps emptied only by extraction are
    /// dropped; maps that were empty in the input are kept.
    pub residual: BTreeMap<String, FirestoreValue>,
    /// Paths that held `ServerTimestamp`, sorted by rendered path.
    pub transforms: Vec<FieldPath>,
    /// Paths that held `Delete`, sorted by rendered path.
    pub deletes: Vec<FieldPath>,
}

/// Extracts sentinels from whole-document data. Top-level keys are literal
/// field names.
pub fn extract_sentinels(
    data: &BTreeMap<String, FirestoreValue>,
) -> FirestoreResult<ExtractedData> {
    let mut extractor = SentinelExtractor::default();
    let mut residual = BTreeMap::new();
    for (key, value) in data {
        let segments = [key.clone()];
        if let Some(kept) = extractor.walk_value(&segments, value, false)? {
            residual.insert(key.clone(), kept);
        }
    }
    let (transforms, deletes) = extractor.finish();
    Ok(ExtractedData {
        residual,
        transforms,
        deletes,
    })
}

/// Depth-first walker collecting sentinel paths.
///
/// The value handed to [`SentinelExtractor::extract_field`] counts as top
/// level, so it may be a `Delete`; anything below it may not.
#[derive(Debug, Default)]
pub(crate) struct SentinelExtractor {
    transforms: Vec<FieldPath>,
    deletes: Vec<FieldPath>,
}

impl SentinelExtractor {
    /// Walks the value written at `path` and returns what is left of it, or
    /// `None` when nothing ordinary remains.
    pub(crate) fn extract_field(
        &mut self,
        path: &FieldPath,
        value: &FirestoreValue,
    ) -> FirestoreResult<Option<FirestoreValue>> {
        self.walk_value(path.segments(), value, false)
    }

    pub(crate) fn finish(mut self) -> (Vec<FieldPath>, Vec<FieldPath>) {
        self.transforms.sort_by_key(FieldPath::canonical_string);
        self.deletes.sort_by_key(FieldPath::canonical_string);
        if !self.transforms.is_empty() || !self.deletes.is_empty() {
            log::trace!(
                "extracted {} server timestamp(s) and {} delete(s)",
                self.transforms.len(),
                self.deletes.len()
            );
        }
        (self.transforms, self.deletes)
    }

    fn walk_value(
        &mut self,
        segments: &[String],
        value: &FirestoreValue,
        nested: bool,
    ) -> FirestoreResult<Option<FirestoreValue>> {
        match value.kind() {
            ValueKind::Sentinel(SentinelValue::ServerTimestamp) => {
                self.transforms.push(FieldPath::new(segments.iter().cloned())?);
                Ok(None)
            }
            ValueKind::Sentinel(SentinelValue::Delete) => {
                let path = FieldPath::new(segments.iter().cloned())?;
                if nested {
                    return Err(nested_delete(path.canonical_string()));
                }
                self.deletes.push(path);
                Ok(None)
            }
            ValueKind::Map(map) => {
                let mut cleaned = BTreeMap::new();
                for (key, child) in map.fields() {
                    let mut child_segments = segments.to_vec();
                    child_segments.push(key.clone());
                    if let Some(kept) = self.walk_value(&child_segments, child, true)? {
                        cleaned.insert(key.clone(), kept);
                    }
                }
                if cleaned.is_empty() && !map.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(FirestoreValue::from_map(cleaned)))
                }
            }
            ValueKind::Array(_) => {
                if value.contains_sentinel() {
                    let path = FieldPath::new(segments.iter().cloned())?;
                    return Err(sentinel_in_array(path.canonical_string()));
                }
                Ok(Some(value.clone()))
            }
            ValueKind::Boolean(_) | ValueKind::Integer(_) | ValueKind::String(_) => {
                Ok(Some(value.clone()))
            }
        }
    }
}
