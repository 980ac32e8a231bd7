//! Integration tests for operator pipelines over completed and live series.
//!
//! These tests exercise the public surface only:
//! - The reference scenarios for map, filter, zip, sma and range
//! - Operators composed over each other
//! - Pipelines observing a container while its writer appends

use alopex_skein::container::ContainerCursor;
use alopex_skein::online::SpanWidth;
use alopex_skein::ops::RangeCursor;
use alopex_skein::{Cursor, Lookup, Series, SortedMap};

fn series_of(pairs: &[(i64, i64)]) -> Series<ContainerCursor<i64, i64>> {
    pairs.iter().copied().collect()
}

// ============================================================================
// Reference Scenarios
// ============================================================================

#[test]
fn test_scenario_map_doubles_values() {
    let source = series_of(&[(1, 10), (2, 20), (3, 30)]);
    let mapped: Vec<_> = source.map_values(|v| v * 2).iter().collect();
    assert_eq!(mapped, vec![(1, 20), (2, 40), (3, 60)]);
}

#[test]
fn test_scenario_filter_and_seek() {
    let source = series_of(&[(1, 10), (2, 20), (3, 30), (4, 40)]);
    let filtered = source.filter_values(|v| *v > 15);
    let pairs: Vec<_> = filtered.iter().collect();
    assert_eq!(pairs, vec![(2, 20), (3, 30), (4, 40)]);

    let mut cursor = filtered.cursor();
    assert!(cursor.move_at(&1, Lookup::Ge));
    assert_eq!(*cursor.current_key(), 2);
}

#[test]
fn test_scenario_zip_intersects_keys() {
    let left: Series<_> = vec![(1, "a"), (2, "b"), (4, "d")].into_iter().collect();
    let right = series_of(&[(1, 1), (3, 3), (4, 4)]);
    let zipped: Vec<_> = left.zip(&right).iter().collect();
    assert_eq!(zipped, vec![(1, ("a", 1)), (4, ("d", 4))]);
}

#[test]
fn test_scenario_sma_complete_windows() {
    let source = series_of(&[(1, 1), (2, 2), (3, 3), (4, 4), (5, 5)]);
    let averages: Vec<_> = source.sma(3).iter().collect();
    assert_eq!(averages, vec![(3, 2.0), (4, 3.0), (5, 4.0)]);
}

#[test]
fn test_scenario_range_end_is_sticky() {
    let source = series_of(&[(1, 1), (2, 2), (3, 3), (4, 4), (5, 5)]);
    let range = source.range(Some(2), Some(4), true, true);
    let keys: Vec<_> = range.iter().map(|(k, _)| k).collect();
    assert_eq!(keys, vec![2, 3, 4]);

    let mut cursor = range.cursor();
    while cursor.move_next() {}
    for _ in 0..3 {
        assert!(!cursor.move_next());
        assert_eq!(*cursor.current_key(), 4);
    }
}

// ============================================================================
// Composition
// ============================================================================

#[test]
fn test_nested_operators() {
    let source: Series<_> = (1..=20).map(|k| (k, k)).collect();
    let pipeline = source
        .filter_keys(|k| k % 2 == 0)
        .map(|k, v| k * 100 + v)
        .after(10)
        .before(16);
    let pairs: Vec<_> = pipeline.iter().collect();
    assert_eq!(pairs, vec![(10, 1010), (12, 1212), (14, 1414), (16, 1616)]);
    let reversed: Vec<_> = pipeline.iter_rev().map(|(k, _)| k).collect();
    assert_eq!(reversed, vec![16, 14, 12, 10]);
}

#[test]
fn test_window_sums_match_moving_sum() {
    let source: Series<_> = (1..=10).map(|k| (k, k * k)).collect();
    let from_windows: Vec<(i64, i64)> = source
        .window(4, 1)
        .iter()
        .map(|(k, window): (i64, Series<RangeCursor<_>>)| {
            (k, window.iter().map(|(_, v)| v).sum())
        })
        .collect();
    let from_sums: Vec<_> = source.moving_sum(4).iter().collect();
    assert_eq!(from_windows, from_sums);
}

#[test]
fn test_lag_differences() {
    let source = series_of(&[(1, 5), (2, 8), (3, 6), (4, 10)]);
    let deltas: Vec<_> = source
        .lag(1, 1)
        .map_values(|(current, (_, previous))| current - previous)
        .iter()
        .collect();
    assert_eq!(deltas, vec![(2, 3), (3, -2), (4, 4)]);
}

#[test]
fn test_zip_with_repeat_aligns_step_values() {
    let prices = series_of(&[(1, 100), (2, 101), (3, 103), (5, 99)]);
    let rates = series_of(&[(0, 2), (3, 3)]);
    let converted: Vec<_> = prices
        .zip_with(&rates.repeat(), |price, rate| price * rate)
        .iter()
        .collect();
    assert_eq!(converted, vec![(1, 200), (2, 202), (3, 309), (5, 297)]);
}

#[test]
fn test_fill_zip_over_union() {
    let left = series_of(&[(1, 1), (3, 3)]);
    let right = series_of(&[(2, 20), (3, 30)]);
    let zipped = left.fill(0).zip(&right.fill(0));
    assert!(zipped.is_continuous());
    let pairs: Vec<_> = zipped.iter().collect();
    assert_eq!(pairs, vec![(1, (1, 0)), (2, (0, 20)), (3, (3, 30))]);
    assert_eq!(zipped.try_get_value(&7), Some((0, 0)));
}

#[test]
fn test_stat2_and_distance_span() {
    let source: Series<_> = vec![(0, 1.0), (1, 2.0), (2, 3.0), (10, 4.0)].into_iter().collect();
    let stats = source.stat2(3).last().unwrap().1;
    assert_eq!(stats.count, 3);
    assert!((stats.mean - 3.0).abs() < 1e-12);
    assert!((stats.std_dev() - 1.0).abs() < 1e-12);

    let recent: Vec<_> = source
        .span(alopex_skein::online::MovingSum::new(), SpanWidth::Distance(5), true)
        .iter()
        .collect();
    assert_eq!(recent, vec![(0, 1.0), (1, 3.0), (2, 6.0), (10, 4.0)]);
}

// ============================================================================
// Live Containers
// ============================================================================

#[test]
fn test_pipeline_observes_appends() {
    let mut writer = SortedMap::<i64, i64>::writer();
    let evens = writer.series().filter_values(|v| v % 2 == 0);
    let mut cursor = evens.cursor();

    writer.append(1, 1).unwrap();
    writer.append(2, 2).unwrap();
    assert!(cursor.move_next());
    assert_eq!(*cursor.current_key(), 2);
    assert!(!cursor.move_next());

    writer.append(3, 3).unwrap();
    writer.append(4, 4).unwrap();
    assert!(cursor.move_next());
    assert_eq!(cursor.current(), (4, 4));
    assert!(!evens.is_completed());

    writer.complete();
    assert!(evens.is_completed());
    assert!(!cursor.move_next());
}

#[test]
fn test_cursor_survives_writes_before_position() {
    let mut writer = SortedMap::<i64, &str>::writer();
    writer.append(10, "ten").unwrap();
    writer.append(20, "twenty").unwrap();
    let mut cursor = writer.cursor();
    assert!(cursor.move_at(&20, Lookup::Eq));

    writer.set(15, "fifteen").unwrap();
    writer.remove(&10).unwrap();
    assert!(cursor.move_previous());
    assert_eq!(cursor.current(), (15, "fifteen"));
    assert!(!cursor.move_previous());
}

#[test]
fn test_pipeline_survives_removal_of_current_key() {
    let mut writer = SortedMap::<i64, i64>::writer();
    for k in 1..=4 {
        writer.append(k, k).unwrap();
    }
    let evens = writer.series().before(3).filter_values(|v| v % 2 == 0);
    let mut cursor = evens.cursor();
    assert!(cursor.move_at(&2, Lookup::Eq));

    writer.remove(&2).unwrap();
    assert!(!cursor.move_next());
    assert!(!cursor.move_previous());
    assert_eq!(*cursor.current_key(), 2);

    writer.set(3, 6).unwrap();
    assert!(cursor.move_next());
    assert_eq!(cursor.current(), (3, 6));
    assert!(!cursor.move_next());
}
