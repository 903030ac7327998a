use std::collections::{BTreeMap, HashSet};

use crate::api::sentinels::{extract_sentinels, SentinelExtractor};
use crate::error::{
    delete_not_allowed, duplicate_path, invalid_argument, invalid_precondition,
    merge_field_not_found, no_paths, prefix_collision, FirestoreResult,
};
use crate::model::{FieldPath, Timestamp};
use crate::value::{FirestoreValue, MapValue, SentinelValue, ValueKind};

/// How a `set` combines the provided data with the stored document.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum MergeSpec {
    /// Overwrite the whole document.
    #[default]
    None,
    /// Merge every leaf field present in the data.
    All,
    /// Merge exactly these fields; everything else in the data is ignored.
    Fields(Vec<FieldPath>),
}

/// Options that configure the behaviour of `set` writes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SetOptions {
    pub merge: MergeSpec,
    pub precondition: Precondition,
}

impl SetOptions {
    /// Builds set options that merge every field present in the provided data.
    pub fn merge_all() -> Self {
        Self {
            merge: MergeSpec::All,
            ..Self::default()
        }
    }

    /// Builds set options that merge only the specified field paths.
    /// Duplicates are dropped; an empty list is rejected.
    pub fn merge_fields<I>(fields: I) -> FirestoreResult<Self>
    where
        I: IntoIterator<Item = FieldPath>,
    {
        let mut unique = Vec::new();
        let mut seen = HashSet::new();
        for field in fields {
            if seen.insert(field.canonical_string()) {
                unique.push(field);
            }
        }
        if unique.is_empty() {
            return Err(invalid_argument(
                "merge_fields requires at least one field path",
            ));
        }
        Ok(Self {
            merge: MergeSpec::Fields(unique),
            ..Self::default()
        })
    }

    pub fn with_precondition(mut self, precondition: Precondition) -> Self {
        self.precondition = precondition;
        self
    }
}

/// Condition on the stored document that must hold for a write to apply.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Precondition {
    #[default]
    None,
    MustExist,
    MustNotExist,
    MustHaveUpdateTime(Timestamp),
}

impl Precondition {
    pub fn is_none(&self) -> bool {
        matches!(self, Precondition::None)
    }
}

/// Describes a single field transform applied after the field writes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldTransform {
    field_path: FieldPath,
    operation: TransformOperation,
}

impl FieldTransform {
    pub fn new(field_path: FieldPath, operation: TransformOperation) -> Self {
        Self {
            field_path,
            operation,
        }
    }

    pub fn field_path(&self) -> &FieldPath {
        &self.field_path
    }

    pub fn operation(&self) -> &TransformOperation {
        &self.operation
    }
}

/// Server-computed values a transform can write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransformOperation {
    /// Set the field to the time the server processes the request.
    ServerTimestamp,
}

/// A client-side document write, before compilation.
#[derive(Clone, Debug, PartialEq)]
pub enum Mutation {
    Create {
        data: BTreeMap<String, FirestoreValue>,
    },
    Set {
        data: BTreeMap<String, FirestoreValue>,
        options: SetOptions,
    },
    /// Top-level keys are dot-separated field paths.
    Update {
        data: BTreeMap<String, FirestoreValue>,
        precondition: Precondition,
    },
    UpdatePaths {
        updates: Vec<(FieldPath, FirestoreValue)>,
        precondition: Precondition,
    },
    Delete {
        precondition: Precondition,
    },
}

impl Mutation {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Mutation::Create { .. } => "create",
            Mutation::Set { options, .. } => match options.merge {
                MergeSpec::None => "set",
                MergeSpec::All | MergeSpec::Fields(_) => "set-merge",
            },
            Mutation::Update { .. } => "update",
            Mutation::UpdatePaths { .. } => "update-paths",
            Mutation::Delete { .. } => "delete",
        }
    }
}

/// Field values plus the optional mask restricting which fields they touch.
#[derive(Clone, Debug, PartialEq)]
pub struct DocumentUpdate {
    pub fields: MapValue,
    /// `None` replaces the whole document. `Some` with no entries still
    /// forces a write, which lets it carry a precondition.
    pub mask: Option<Vec<FieldPath>>,
}

/// Output of the planner: what to write, in wire-independent form.
#[derive(Clone, Debug, PartialEq)]
pub enum PlannedMutation {
    Write {
        update: Option<DocumentUpdate>,
        transforms: Vec<FieldTransform>,
        precondition: Precondition,
    },
    Delete {
        precondition: Precondition,
    },
}

pub fn plan_mutation(mutation: Mutation) -> FirestoreResult<PlannedMutation> {
    log::debug!("planning {} mutation", mutation.kind_name());
    match mutation {
        Mutation::Create { data } => encode_create_data(data),
        Mutation::Set { data, options } => encode_set_data(data, &options),
        Mutation::Update { data, precondition } => encode_update_data(data, precondition),
        Mutation::UpdatePaths {
            updates,
            precondition,
        } => encode_update_paths(updates, precondition),
        Mutation::Delete { precondition } => Ok(PlannedMutation::Delete { precondition }),
    }
}

pub fn encode_create_data(
    data: BTreeMap<String, FirestoreValue>,
) -> FirestoreResult<PlannedMutation> {
    let extracted = extract_sentinels(&data)?;
    reject_deletes(&extracted.deletes)?;
    Ok(PlannedMutation::Write {
        update: Some(DocumentUpdate {
            fields: MapValue::new(extracted.residual),
            mask: None,
        }),
        transforms: server_timestamps(extracted.transforms),
        precondition: Precondition::MustNotExist,
    })
}

pub fn encode_set_data(
    data: BTreeMap<String, FirestoreValue>,
    options: &SetOptions,
) -> FirestoreResult<PlannedMutation> {
    let data = MapValue::new(data);
    if let MergeSpec::Fields(merge_fields) = &options.merge {
        for field in merge_fields {
            if data.get_path(field.segments()).is_none() {
                return Err(merge_field_not_found(field.canonical_string()));
            }
        }
    }

    let extracted = extract_sentinels(data.fields())?;
    match &options.merge {
        MergeSpec::None => {
            reject_deletes(&extracted.deletes)?;
            Ok(PlannedMutation::Write {
                update: Some(DocumentUpdate {
                    fields: MapValue::new(extracted.residual),
                    mask: None,
                }),
                transforms: server_timestamps(extracted.transforms),
                precondition: options.precondition,
            })
        }
        MergeSpec::All => {
            let mut mask = collect_leaf_paths(&extracted.residual)?;
            mask.extend(extracted.deletes);
            Ok(merge_write(
                extracted.residual,
                mask,
                extracted.transforms,
                options.precondition,
            ))
        }
        MergeSpec::Fields(merge_fields) => {
            let covered =
                |path: &FieldPath| merge_fields.iter().any(|field| field.is_prefix_of(path));

            let residual = MapValue::new(extracted.residual);
            let mut fields = BTreeMap::new();
            for field in merge_fields {
                if let Some(value) = residual.get_path(field.segments()) {
                    set_value_at_field_path(&mut fields, field, value.clone());
                }
            }

            let (transforms, ignored): (Vec<FieldPath>, Vec<FieldPath>) =
                extracted.transforms.into_iter().partition(|path| covered(path));
            let dropped_deletes = extracted
                .deletes
                .iter()
                .filter(|path| !covered(path))
                .count();
            if !ignored.is_empty() || dropped_deletes > 0 {
                log::debug!(
                    "merge set ignores {} server timestamp(s) and {} delete(s) outside its fields",
                    ignored.len(),
                    dropped_deletes
                );
            }

            let mask = merge_fields
                .iter()
                .filter(|field| !transforms.contains(*field))
                .cloned()
                .collect();
            Ok(merge_write(fields, mask, transforms, options.precondition))
        }
    }
}

/// Encodes an update whose top-level keys are dot-separated field paths.
/// Nested keys below them are literal.
pub fn encode_update_data(
    data: BTreeMap<String, FirestoreValue>,
    precondition: Precondition,
) -> FirestoreResult<PlannedMutation> {
    let precondition = update_precondition(precondition)?;
    if data.is_empty() {
        return Err(no_paths("update requires at least one field/value pair"));
    }
    let updates = data
        .into_iter()
        .map(|(key, value)| Ok((FieldPath::from_dot_separated(&key)?, value)))
        .collect::<FirestoreResult<Vec<_>>>()?;
    plan_field_updates(updates, precondition)
}

pub fn encode_update_paths(
    updates: Vec<(FieldPath, FirestoreValue)>,
    precondition: Precondition,
) -> FirestoreResult<PlannedMutation> {
    let precondition = update_precondition(precondition)?;
    if updates.is_empty() {
        return Err(no_paths("update requires at least one field path"));
    }
    plan_field_updates(updates, precondition)
}

fn update_precondition(precondition: Precondition) -> FirestoreResult<Precondition> {
    match precondition {
        Precondition::None => Ok(Precondition::MustExist),
        Precondition::MustHaveUpdateTime(_) => Ok(precondition),
        Precondition::MustExist | Precondition::MustNotExist => Err(invalid_precondition(
            "update only accepts a last-update-time precondition",
        )),
    }
}

fn plan_field_updates(
    updates: Vec<(FieldPath, FirestoreValue)>,
    precondition: Precondition,
) -> FirestoreResult<PlannedMutation> {
    validate_distinct_paths(&updates)?;

    let mut extractor = SentinelExtractor::default();
    let mut fields = BTreeMap::new();
    let mut mask = Vec::with_capacity(updates.len());
    for (path, value) in &updates {
        if let Some(kept) = extractor.extract_field(path, value)? {
            set_value_at_field_path(&mut fields, path, kept);
        }
        // A path written only by a transform stays out of the mask; a map
        // holding a transform is still replaced by the update.
        if !value.is_sentinel(SentinelValue::ServerTimestamp) {
            mask.push(path.clone());
        }
    }
    let (transforms, _deletes) = extractor.finish();
    sort_mask(&mut mask);

    Ok(PlannedMutation::Write {
        update: Some(DocumentUpdate {
            fields: MapValue::new(fields),
            mask: Some(mask),
        }),
        transforms: server_timestamps(transforms),
        precondition,
    })
}

fn validate_distinct_paths(updates: &[(FieldPath, FirestoreValue)]) -> FirestoreResult<()> {
    let mut paths: Vec<&FieldPath> = updates.iter().map(|(path, _)| path).collect();
    paths.sort();
    // After sorting, any path that has a prefix among the others sits
    // directly behind one.
    for pair in paths.windows(2) {
        let (previous, current) = (pair[0], pair[1]);
        if previous == current {
            return Err(duplicate_path(current.canonical_string()));
        }
        if previous.is_prefix_of(current) {
            return Err(prefix_collision(
                &previous.canonical_string(),
                &current.canonical_string(),
            ));
        }
    }
    Ok(())
}

fn merge_write(
    fields: BTreeMap<String, FirestoreValue>,
    mut mask: Vec<FieldPath>,
    transforms: Vec<FieldPath>,
    precondition: Precondition,
) -> PlannedMutation {
    sort_mask(&mut mask);
    let update = if mask.is_empty() && !transforms.is_empty() {
        None
    } else {
        Some(DocumentUpdate {
            fields: MapValue::new(fields),
            mask: Some(mask),
        })
    };
    PlannedMutation::Write {
        update,
        transforms: server_timestamps(transforms),
        precondition,
    }
}

fn reject_deletes(deletes: &[FieldPath]) -> FirestoreResult<()> {
    match deletes.first() {
        Some(path) => Err(delete_not_allowed(path.canonical_string())),
        None => Ok(()),
    }
}

fn server_timestamps(paths: Vec<FieldPath>) -> Vec<FieldTransform> {
    paths
        .into_iter()
        .map(|path| FieldTransform::new(path, TransformOperation::ServerTimestamp))
        .collect()
}

fn sort_mask(mask: &mut Vec<FieldPath>) {
    mask.sort_by_key(FieldPath::canonical_string);
    mask.dedup();
}

fn collect_leaf_paths(
    data: &BTreeMap<String, FirestoreValue>,
) -> FirestoreResult<Vec<FieldPath>> {
    let mut paths = Vec::new();
    for (key, value) in data {
        collect_paths_from_value(&mut paths, vec![key.clone()], value)?;
    }
    Ok(paths)
}

fn collect_paths_from_value(
    acc: &mut Vec<FieldPath>,
    segments: Vec<String>,
    value: &FirestoreValue,
) -> FirestoreResult<()> {
    match value.kind() {
        ValueKind::Map(map) if !map.is_empty() => {
            for (child_key, child_value) in map.fields() {
                let mut child_segments = segments.clone();
                child_segments.push(child_key.clone());
                collect_paths_from_value(acc, child_segments, child_value)?;
            }
            Ok(())
        }
        _ => {
            acc.push(FieldPath::new(segments)?);
            Ok(())
        }
    }
}

pub(crate) fn set_value_at_field_path(
    fields: &mut BTreeMap<String, FirestoreValue>,
    path: &FieldPath,
    value: FirestoreValue,
) {
    set_value_at_segments(fields, path.segments(), value);
}

fn set_value_at_segments(
    fields: &mut BTreeMap<String, FirestoreValue>,
    segments: &[String],
    value: FirestoreValue,
) {
    let Some((first, rest)) = segments.split_first() else {
        return;
    };
    if rest.is_empty() {
        fields.insert(first.clone(), value);
        return;
    }

    let entry = fields
        .entry(first.clone())
        .or_insert_with(|| FirestoreValue::from_map(BTreeMap::new()));

    let mut child_fields = match entry.kind() {
        ValueKind::Map(map) => map.fields().clone(),
        _ => BTreeMap::new(),
    };

    set_value_at_segments(&mut child_fields, rest, value);
    *entry = FirestoreValue::from_map(child_fields);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map<const N: usize>(entries: [(&str, FirestoreValue); N]) -> BTreeMap<String, FirestoreValue> {
        entries
            .into_iter()
            .map(|(key, value)| (key.to_string(), value))
            .collect()
    }

    fn int(value: i64) -> FirestoreValue {
        FirestoreValue::from_integer(value)
    }

    fn path(dotted: &str) -> FieldPath {
        FieldPath::from_dot_separated(dotted).unwrap()
    }

    fn unpack(
        planned: PlannedMutation,
    ) -> (Option<DocumentUpdate>, Vec<String>, Precondition) {
        match planned {
            PlannedMutation::Write {
                update,
                transforms,
                precondition,
            } => (
                update,
                transforms
                    .iter()
                    .map(|transform| transform.field_path().canonical_string())
                    .collect(),
                precondition,
            ),
            PlannedMutation::Delete { .. } => panic!("expected a write"),
        }
    }

    fn mask_of(update: &DocumentUpdate) -> Vec<String> {
        update
            .mask
            .as_ref()
            .expect("mask")
            .iter()
            .map(FieldPath::canonical_string)
            .collect()
    }

    #[test]
    fn create_forces_must_not_exist() {
        let (update, transforms, precondition) =
            unpack(encode_create_data(map([("a", int(1))])).unwrap());
        let update = update.unwrap();
        assert_eq!(update.fields.fields(), &map([("a", int(1))]));
        assert!(update.mask.is_none());
        assert!(transforms.is_empty());
        assert_eq!(precondition, Precondition::MustNotExist);
    }

    #[test]
    fn create_rejects_delete() {
        let err = encode_create_data(map([("a", int(1)), ("b", FirestoreValue::delete())]))
            .unwrap_err();
        assert_eq!(err.code_str(), "firestore/delete-not-allowed");
        assert_eq!(err.subject(), Some("b"));
    }

    #[test]
    fn merge_all_masks_leaves_and_deletes() {
        let data = map([
            ("h", FirestoreValue::from_map(map([("g", int(3)), ("f", int(4))]))),
            ("d", FirestoreValue::delete()),
            ("t", FirestoreValue::server_timestamp()),
        ]);
        let (update, transforms, _) =
            unpack(encode_set_data(data, &SetOptions::merge_all()).unwrap());
        assert_eq!(mask_of(&update.unwrap()), vec!["d", "h.f", "h.g"]);
        assert_eq!(transforms, vec!["t"]);
    }

    #[test]
    fn kind_names_separate_merge_sets() {
        let set = |options| Mutation::Set {
            data: map([]),
            options,
        };
        assert_eq!(set(SetOptions::default()).kind_name(), "set");
        assert_eq!(set(SetOptions::merge_all()).kind_name(), "set-merge");
        let fields = SetOptions::merge_fields([path("a")]).unwrap();
        assert_eq!(set(fields).kind_name(), "set-merge");
    }

    #[test]
    fn merge_all_with_only_timestamps_skips_update() {
        let data = map([("t", FirestoreValue::server_timestamp())]);
        let (update, transforms, _) =
            unpack(encode_set_data(data, &SetOptions::merge_all()).unwrap());
        assert!(update.is_none());
        assert_eq!(transforms, vec!["t"]);
    }

    #[test]
    fn merge_fields_filters_data() {
        let data = map([
            ("h", FirestoreValue::from_map(map([("g", int(4)), ("f", int(5))]))),
            ("e", int(7)),
        ]);
        let options = SetOptions::merge_fields([path("h.g")]).unwrap();
        let (update, _, _) = unpack(encode_set_data(data, &options).unwrap());
        let update = update.unwrap();
        assert_eq!(
            update.fields.fields(),
            &map([("h", FirestoreValue::from_map(map([("g", int(4))])))])
        );
        assert_eq!(mask_of(&update), vec!["h.g"]);
    }

    #[test]
    fn merge_fields_must_exist_in_data() {
        let options = SetOptions::merge_fields([path("b"), path("a")]).unwrap();
        let err = encode_set_data(map([("a", int(1))]), &options).unwrap_err();
        assert_eq!(err.code_str(), "firestore/merge-field-not-found");
        assert_eq!(err.subject(), Some("b"));
    }

    #[test]
    fn merge_fields_drop_unmerged_delete() {
        let options = SetOptions::merge_fields([path("a")]).unwrap();
        let data = map([("a", int(1)), ("b", FirestoreValue::delete())]);
        let (update, transforms, _) = unpack(encode_set_data(data, &options).unwrap());
        assert_eq!(mask_of(&update.unwrap()), vec!["a"]);
        assert!(transforms.is_empty());
    }

    #[test]
    fn merge_fields_requires_a_field() {
        let err = SetOptions::merge_fields(Vec::new()).unwrap_err();
        assert_eq!(err.code_str(), "firestore/invalid-argument");
        let options = SetOptions::merge_fields([path("a"), path("a")]).unwrap();
        assert_eq!(options.merge, MergeSpec::Fields(vec![path("a")]));
    }

    #[test]
    fn update_splits_top_level_keys_only() {
        let data = map([(
            "h.g",
            FirestoreValue::from_map(map([("j.k", int(6))])),
        )]);
        let (update, _, precondition) =
            unpack(encode_update_data(data, Precondition::None).unwrap());
        let update = update.unwrap();
        assert_eq!(mask_of(&update), vec!["h.g"]);
        let expected = map([(
            "h",
            FirestoreValue::from_map(map([(
                "g",
                FirestoreValue::from_map(map([("j.k", int(6))])),
            )])),
        )]);
        assert_eq!(update.fields.fields(), &expected);
        assert_eq!(precondition, Precondition::MustExist);
    }

    #[test]
    fn update_keeps_maps_replaced_by_transforms_in_mask() {
        let data = map([
            ("a", int(1)),
            ("b", FirestoreValue::server_timestamp()),
            (
                "c",
                FirestoreValue::from_map(map([("d", FirestoreValue::server_timestamp())])),
            ),
        ]);
        let (update, transforms, _) =
            unpack(encode_update_data(data, Precondition::None).unwrap());
        let update = update.unwrap();
        assert_eq!(mask_of(&update), vec!["a", "c"]);
        assert_eq!(update.fields.fields(), &map([("a", int(1))]));
        assert_eq!(transforms, vec!["b", "c.d"]);
    }

    #[test]
    fn update_with_only_transform_keeps_empty_mask() {
        let data = map([("a.b.c", FirestoreValue::server_timestamp())]);
        let (update, transforms, _) =
            unpack(encode_update_data(data, Precondition::None).unwrap());
        let update = update.unwrap();
        assert!(update.fields.is_empty());
        assert_eq!(update.mask, Some(Vec::new()));
        assert_eq!(transforms, vec!["a.b.c"]);
    }

    #[test]
    fn update_rejects_exists_preconditions() {
        for precondition in [Precondition::MustExist, Precondition::MustNotExist] {
            let err = encode_update_data(map([("a", int(1))]), precondition).unwrap_err();
            assert_eq!(err.code_str(), "firestore/invalid-precondition");
        }
        let time = Precondition::MustHaveUpdateTime(Timestamp::new(10, 0).unwrap());
        let (_, _, precondition) =
            unpack(encode_update_data(map([("a", int(1))]), time).unwrap());
        assert_eq!(precondition, time);
    }

    #[test]
    fn update_path_errors() {
        let err = encode_update_data(BTreeMap::new(), Precondition::None).unwrap_err();
        assert_eq!(err.code_str(), "firestore/no-paths");
        let err = encode_update_data(map([("a.b", int(1)), ("a", int(2))]), Precondition::None)
            .unwrap_err();
        assert_eq!(err.code_str(), "firestore/prefix-collision");
        let err = encode_update_paths(
            vec![(path("a"), int(1)), (path("b"), int(2)), (path("a"), int(3))],
            Precondition::None,
        )
        .unwrap_err();
        assert_eq!(err.code_str(), "firestore/duplicate-path");
        assert_eq!(err.subject(), Some("a"));
    }

    #[test]
    fn prefix_detection_skips_unrelated_neighbours() {
        let updates = vec![
            (FieldPath::new(["*", "a"]).unwrap(), int(1)),
            (FieldPath::new(["b"]).unwrap(), int(2)),
            (FieldPath::new(["*", "a", "b"]).unwrap(), int(3)),
        ];
        let err = encode_update_paths(updates, Precondition::None).unwrap_err();
        assert_eq!(err.code_str(), "firestore/prefix-collision");
        let ok = vec![(path("ab"), int(1)), (path("a.c"), int(2))];
        assert!(encode_update_paths(ok, Precondition::None).is_ok());
    }

    #[test]
    fn delete_passes_precondition_through() {
        let planned = plan_mutation(Mutation::Delete {
            precondition: Precondition::MustExist,
        })
        .unwrap();
        assert_eq!(
            planned,
            PlannedMutation::Delete {
                precondition: Precondition::MustExist
            }
        );
    }
}
