//! Property-based tests for cursor ordering and operator semantics.
//!
//! Every series is checked against a `BTreeMap` model built from the same
//! writes; keys stay small so lookups hit both present and absent keys.

use alopex_skein::container::ContainerCursor;
use alopex_skein::{Cursor, Lookup, Series, SortedMap};
use proptest::prelude::*;
use std::collections::BTreeMap;

/// Strategy for arbitrary unordered writes, duplicates included.
fn writes_strategy() -> impl Strategy<Value = Vec<(i64, i64)>> {
    prop::collection::vec((-200i64..200, -1000i64..1000), 0..80)
}

fn build(writes: &[(i64, i64)]) -> (Series<ContainerCursor<i64, i64>>, BTreeMap<i64, i64>) {
    let mut writer = SortedMap::<i64, i64>::writer();
    let mut model = BTreeMap::new();
    for &(k, v) in writes {
        writer.set(k, v).unwrap();
        model.insert(k, v);
    }
    let series = writer.series();
    writer.complete();
    (series, model)
}

fn model_find(model: &BTreeMap<i64, i64>, key: i64, direction: Lookup) -> Option<(i64, i64)> {
    let found = match direction {
        Lookup::Eq => model.get_key_value(&key),
        Lookup::Lt => model.range(..key).next_back(),
        Lookup::Le => model.range(..=key).next_back(),
        Lookup::Gt => model.range(key + 1..).next(),
        Lookup::Ge => model.range(key..).next(),
    };
    found.map(|(k, v)| (*k, *v))
}

fn lookup_strategy() -> impl Strategy<Value = Lookup> {
    prop_oneof![
        Just(Lookup::Eq),
        Just(Lookup::Lt),
        Just(Lookup::Le),
        Just(Lookup::Gt),
        Just(Lookup::Ge),
    ]
}

proptest! {
    /// Forward keys strictly increase and backward iteration mirrors them.
    #[test]
    fn test_iteration_matches_model(writes in writes_strategy()) {
        let (series, model) = build(&writes);
        let forward: Vec<_> = series.iter().collect();
        let expected: Vec<_> = model.iter().map(|(k, v)| (*k, *v)).collect();
        prop_assert_eq!(&forward, &expected);

        let mut backward: Vec<_> = series.iter_rev().collect();
        backward.reverse();
        prop_assert_eq!(backward, forward);
    }

    /// Directional lookups agree with the ordered model.
    #[test]
    fn test_move_at_matches_model(
        writes in writes_strategy(),
        key in -220i64..220,
        direction in lookup_strategy(),
    ) {
        let (series, model) = build(&writes);
        prop_assert_eq!(series.try_find(&key, direction), model_find(&model, key, direction));
    }

    /// After a seek, stepping continues from the found key in both directions.
    #[test]
    fn test_steps_after_seek(writes in writes_strategy(), key in -220i64..220) {
        let (series, model) = build(&writes);
        let mut cursor = series.cursor();
        if cursor.move_at(&key, Lookup::Ge) {
            let found = *cursor.current_key();
            let next = cursor.move_next().then(|| cursor.current());
            prop_assert_eq!(next, model_find(&model, found, Lookup::Gt));
            if next.is_some() {
                prop_assert!(cursor.move_previous());
                prop_assert_eq!(*cursor.current_key(), found);
            }
        } else {
            prop_assert!(model.range(key..).next().is_none());
        }
    }

    /// Filtering keeps exactly the accepted pairs.
    #[test]
    fn test_filter_matches_model(writes in writes_strategy(), modulus in 1i64..7) {
        let (series, model) = build(&writes);
        let filtered: Vec<_> = series.filter_values(move |v| v.rem_euclid(modulus) == 0).iter().collect();
        let expected: Vec<_> = model
            .iter()
            .filter(|(_, v)| v.rem_euclid(modulus) == 0)
            .map(|(k, v)| (*k, *v))
            .collect();
        prop_assert_eq!(filtered, expected);
    }

    /// Zip of two discrete series visits the key intersection.
    #[test]
    fn test_zip_is_intersection(left in writes_strategy(), right in writes_strategy()) {
        let (left_series, left_model) = build(&left);
        let (right_series, right_model) = build(&right);
        let zipped: Vec<_> = left_series.zip(&right_series).iter().collect();
        let expected: Vec<_> = left_model
            .iter()
            .filter_map(|(k, l)| right_model.get(k).map(|r| (*k, (*l, *r))))
            .collect();
        prop_assert_eq!(&zipped, &expected);

        let mut reversed: Vec<_> = left_series.zip(&right_series).iter_rev().collect();
        reversed.reverse();
        prop_assert_eq!(reversed, zipped);
    }

    /// Lag pairs each element with the one `width` positions earlier.
    #[test]
    fn test_lag_pairs_model(writes in writes_strategy(), width in 1usize..5) {
        let (series, model) = build(&writes);
        let pairs: Vec<_> = series.lag(width, 1).iter().collect();
        let entries: Vec<_> = model.iter().map(|(k, v)| (*k, *v)).collect();
        let expected: Vec<_> = entries
            .iter()
            .enumerate()
            .skip(width)
            .map(|(i, (k, v))| (*k, (*v, entries[i - width])))
            .collect();
        prop_assert_eq!(pairs, expected);
    }

    /// Moving averages agree with a naive mean over each complete window.
    #[test]
    fn test_sma_matches_naive_mean(writes in writes_strategy(), width in 1usize..6) {
        let (series, model) = build(&writes);
        let averages: Vec<_> = series.sma(width).iter().collect();
        let values: Vec<_> = model.values().map(|v| *v as f64).collect();
        let keys: Vec<_> = model.keys().copied().collect();
        prop_assert_eq!(averages.len(), values.len().saturating_sub(width - 1));
        for (i, (key, mean)) in averages.iter().enumerate() {
            let end = i + width;
            let naive = values[i..end].iter().sum::<f64>() / width as f64;
            prop_assert_eq!(*key, keys[end - 1]);
            prop_assert!((mean - naive).abs() < 1e-9);
        }

        let mut backward: Vec<_> = series.sma(width).iter_rev().collect();
        backward.reverse();
        prop_assert_eq!(backward.len(), averages.len());
        for ((k1, a), (k2, b)) in backward.iter().zip(averages.iter()) {
            prop_assert_eq!(k1, k2);
            prop_assert!((a - b).abs() < 1e-9);
        }
    }

    /// A bounded range yields the model's range, whatever the inclusivity.
    #[test]
    fn test_range_matches_model(
        writes in writes_strategy(),
        start in -220i64..220,
        span in 0i64..200,
        start_inclusive in any::<bool>(),
        end_inclusive in any::<bool>(),
    ) {
        let (series, model) = build(&writes);
        let end = start + span;
        let ranged: Vec<_> = series
            .range(Some(start), Some(end), start_inclusive, end_inclusive)
            .iter()
            .collect();
        let expected: Vec<_> = model
            .iter()
            .filter(|(k, _)| {
                let k = **k;
                (if start_inclusive { k >= start } else { k > start })
                    && (if end_inclusive { k <= end } else { k < end })
            })
            .map(|(k, v)| (*k, *v))
            .collect();
        prop_assert_eq!(ranged, expected);
    }
}
