use crate::value::FirestoreValue;

/// Ordered list value. Sentinels are never legal inside one, at any depth.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ArrayValue {
    values: Vec<FirestoreValue>,
}

impl ArrayValue {
    pub fn new(values: Vec<FirestoreValue>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[FirestoreValue] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn contains_sentinel(&self) -> bool {
        self.values.iter().any(FirestoreValue::contains_sentinel)
    }
}

impl FromIterator<FirestoreValue> for ArrayValue {
    fn from_iter<I: IntoIterator<Item = FirestoreValue>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_sentinels_through_nested_maps() {
        let plain: ArrayValue = [1i64, 2].into_iter().map(FirestoreValue::from).collect();
        assert_eq!(plain.len(), 2);
        assert!(!plain.contains_sentinel());

        let nested = ArrayValue::new(vec![FirestoreValue::from_map(
            [("t".to_string(), FirestoreValue::delete())].into(),
        )]);
        assert!(nested.contains_sentinel());
    }
}
