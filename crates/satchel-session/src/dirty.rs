//! Dirty checking by snapshot comparison.
//!
//! A managed record's fields are compared against the snapshot taken when
//! it became managed. The comparison is value equality, not identity, so a
//! field mutated and then reverted before the flush produces no diff and
//! therefore no update -- the no-op update avoidance guarantee.

use satchel_core::{FieldMap, FieldValue};

/// Returns the fields whose current value differs from the snapshot,
/// mapped to their current values.
///
/// A field present on only one side is compared as if the other side held
/// [`FieldValue::Null`]. The result is exactly the change set an implicit
/// update must carry; empty means no write.
pub fn diff(current: &FieldMap, snapshot: &FieldMap) -> FieldMap {
    let mut changed = FieldMap::new();

    for (field, value) in current {
        let before = snapshot.get(field).unwrap_or(&FieldValue::Null);
        if value != before {
            changed.insert(field.clone(), value.clone());
        }
    }
    // Fields that existed in the snapshot but were dropped from the record
    // read back as Null.
    for (field, before) in snapshot {
        if !current.contains_key(field) && !before.is_null() {
            changed.insert(field.clone(), FieldValue::Null);
        }
    }

    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn fields(pairs: &[(&str, FieldValue)]) -> FieldMap {
        pairs
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn identical_maps_are_clean() {
        let snapshot = fields(&[("name", "test".into()), ("email", "test@naver.com".into())]);
        assert!(diff(&snapshot, &snapshot).is_empty());
    }

    #[test]
    fn changed_field_is_reported_with_current_value() {
        let snapshot = fields(&[("name", "test".into()), ("deleted", false.into())]);
        let current = fields(&[("name", "update-test".into()), ("deleted", false.into())]);

        let changed = diff(&current, &snapshot);
        assert_eq!(changed, fields(&[("name", "update-test".into())]));
    }

    #[test]
    fn added_field_counts_as_changed() {
        let snapshot = fields(&[("name", "test".into())]);
        let current = fields(&[("name", "test".into()), ("email", "test@naver.com".into())]);

        let changed = diff(&current, &snapshot);
        assert_eq!(changed, fields(&[("email", "test@naver.com".into())]));
    }

    #[test]
    fn dropped_field_reads_back_as_null() {
        let snapshot = fields(&[("name", "test".into()), ("email", "test@naver.com".into())]);
        let current = fields(&[("name", "test".into())]);

        let changed = diff(&current, &snapshot);
        assert_eq!(changed, fields(&[("email", FieldValue::Null)]));
    }

    #[test]
    fn null_and_absent_compare_equal() {
        let snapshot = fields(&[("email", FieldValue::Null)]);
        let current = FieldMap::new();
        assert!(diff(&current, &snapshot).is_empty());

        let snapshot = FieldMap::new();
        let current = fields(&[("email", FieldValue::Null)]);
        assert!(diff(&current, &snapshot).is_empty());
    }

    #[test]
    fn mutate_then_revert_is_clean() {
        let snapshot = fields(&[("name", "test".into())]);
        let mut current = snapshot.clone();

        current.insert("name".into(), FieldValue::Text("changed".into()));
        current.insert("name".into(), FieldValue::Text("test".into()));

        assert!(diff(&current, &snapshot).is_empty());
    }

    // Property tests: the diff algebra the flush path relies on.

    fn value_strategy() -> impl Strategy<Value = FieldValue> {
        prop_oneof![
            Just(FieldValue::Null),
            any::<bool>().prop_map(FieldValue::Bool),
            any::<i64>().prop_map(FieldValue::Int),
            proptest::num::f64::NORMAL.prop_map(FieldValue::Real),
            "[a-z]{0,12}".prop_map(FieldValue::Text),
        ]
    }

    fn map_strategy() -> impl Strategy<Value = FieldMap> {
        proptest::collection::btree_map("[a-z]{1,6}", value_strategy(), 0..8)
    }

    proptest! {
        #[test]
        fn diff_against_self_is_empty(map in map_strategy()) {
            prop_assert!(diff(&map, &map).is_empty());
        }

        #[test]
        fn diff_names_only_touched_fields(
            snapshot in map_strategy(),
            name in "[a-z]{1,6}",
            value in value_strategy(),
        ) {
            let mut current = snapshot.clone();
            current.insert(name.clone(), value.clone());

            let changed = diff(&current, &snapshot);
            let before = snapshot.get(&name).unwrap_or(&FieldValue::Null);
            if *before == value {
                prop_assert!(changed.is_empty());
            } else {
                prop_assert_eq!(changed.len(), 1);
                prop_assert_eq!(changed.get(&name), Some(&value));
            }
        }

        #[test]
        fn applying_the_diff_reconciles_the_snapshot(
            snapshot in map_strategy(),
            current in map_strategy(),
        ) {
            let changed = diff(&current, &snapshot);
            let mut patched = snapshot.clone();
            for (field, value) in &changed {
                patched.insert(field.clone(), value.clone());
            }
            // After applying the diff, nothing is left to report.
            prop_assert!(diff(&current, &patched).is_empty());
        }
    }
}
