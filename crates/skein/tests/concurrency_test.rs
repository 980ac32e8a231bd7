//! Concurrency tests: readers observing a container while its writer runs.
//!
//! Covers:
//! - Reader threads polling cursors during appends
//! - Async consumption through `Series::updates`
//! - Subscriber notification and unsubscription

use alopex_skein::{
    AsyncSubscriber, ContainerConfig, Cursor, KeyComparer, SeriesWriter, SortedMap,
};
use futures::StreamExt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const APPENDS: i64 = 5_000;

/// Writer whose readers tolerate a descheduled thread on a loaded machine.
fn patient_writer() -> SeriesWriter<i64, i64> {
    let config = ContainerConfig::default().with_lock_timeout(Duration::from_secs(30));
    SortedMap::writer_with(KeyComparer::natural(), config)
}

#[derive(Default)]
struct CountingSubscriber {
    updates: AtomicUsize,
    finals: AtomicUsize,
}

impl AsyncSubscriber for CountingSubscriber {
    fn try_complete(&self, is_final: bool) -> bool {
        if is_final {
            self.finals.fetch_add(1, Ordering::SeqCst);
        } else {
            self.updates.fetch_add(1, Ordering::SeqCst);
        }
        true
    }
}

// ============================================================================
// Threads
// ============================================================================

#[test]
fn test_readers_see_ordered_prefixes_during_appends() {
    let mut writer = patient_writer();
    let series = writer.series();

    let readers: Vec<_> = (0..3)
        .map(|_| {
            let series = series.clone();
            thread::spawn(move || {
                let mut cursor = series.cursor();
                let mut seen = Vec::new();
                loop {
                    if cursor.move_next() {
                        let (key, value) = cursor.current();
                        assert_eq!(value, key * 2);
                        seen.push(key);
                    } else if cursor.is_completed() {
                        if !cursor.move_next() {
                            break;
                        }
                        seen.push(*cursor.current_key());
                    } else {
                        thread::yield_now();
                    }
                }
                seen
            })
        })
        .collect();

    let appender = thread::spawn(move || {
        for k in 0..APPENDS {
            writer.append(k, k * 2).unwrap();
        }
        writer.complete();
    });

    appender.join().unwrap();
    for reader in readers {
        let seen = reader.join().unwrap();
        assert_eq!(seen.len(), APPENDS as usize);
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
    }
}

#[test]
fn test_snapshot_queries_during_inserts() {
    let mut writer = patient_writer();
    let map = writer.map().clone();

    let reader = thread::spawn(move || {
        let mut last_len = 0;
        while !map.is_completed() {
            let keys: Vec<_> = map.series().iter().map(|(k, _)| k).collect();
            assert!(keys.windows(2).all(|w| w[0] < w[1]));
            assert!(keys.len() >= last_len);
            last_len = keys.len();
        }
        map.len()
    });

    // Out-of-order inserts through `set` shift existing elements.
    for k in (0..1_000).rev() {
        writer.set(k * 2, k).unwrap();
        writer.set(k * 2 + 1, k).unwrap();
    }
    writer.complete();

    assert_eq!(reader.join().unwrap(), 2_000);
}

// ============================================================================
// Async Updates
// ============================================================================

#[tokio::test]
async fn test_updates_stream_follows_writer() {
    let mut writer = SortedMap::<i64, i64>::writer();
    writer.append(1, 10).unwrap();
    writer.append(2, 20).unwrap();
    let series = writer.series().map_values(|v| v + 1);

    let producer = tokio::spawn(async move {
        for k in 3..=6 {
            tokio::time::sleep(Duration::from_millis(5)).await;
            writer.append(k, k * 10).unwrap();
        }
        writer.complete();
    });

    let received: Vec<_> = series.updates().collect().await;
    producer.await.unwrap();

    assert_eq!(
        received,
        vec![(1, 11), (2, 21), (3, 31), (4, 41), (5, 51), (6, 61)]
    );
}

#[tokio::test]
async fn test_updates_stream_on_completed_series() {
    let series: alopex_skein::Series<_> = vec![(1, 1), (2, 2)].into_iter().collect();
    let mut updates = series.filter_keys(|k| *k > 1).updates();
    assert_eq!(updates.next().await, Some((2, 2)));
    assert_eq!(updates.next().await, None);
    assert_eq!(updates.next().await, None);
}

#[tokio::test]
async fn test_updates_stream_ends_on_empty_completion() {
    let writer = SortedMap::<i64, i64>::writer();
    let series = writer.series();
    let consumer = tokio::spawn(async move { series.updates().count().await });

    tokio::time::sleep(Duration::from_millis(10)).await;
    writer.complete();

    let count = tokio::time::timeout(Duration::from_secs(5), consumer)
        .await
        .expect("stream should end after completion")
        .unwrap();
    assert_eq!(count, 0);
}

// ============================================================================
// Subscribers
// ============================================================================

#[test]
fn test_subscriber_counts_writes_and_completion() {
    let mut writer = SortedMap::<i64, i64>::writer();
    let subscriber = Arc::new(CountingSubscriber::default());
    let subscription = writer.map().subscribe(subscriber.clone());

    writer.append(1, 1).unwrap();
    writer.set(1, 2).unwrap();
    writer.remove(&7).unwrap();
    assert_eq!(subscriber.updates.load(Ordering::SeqCst), 2);

    writer.complete();
    assert_eq!(subscriber.finals.load(Ordering::SeqCst), 1);
    drop(subscription);
}

#[test]
fn test_dropped_subscription_stops_notifications() {
    let mut writer = SortedMap::<i64, i64>::writer();
    let subscriber = Arc::new(CountingSubscriber::default());
    let subscription = writer.map().subscribe(subscriber.clone());

    writer.append(1, 1).unwrap();
    drop(subscription);
    writer.append(2, 2).unwrap();
    assert_eq!(subscriber.updates.load(Ordering::SeqCst), 1);
    assert_eq!(writer.map().subscriber_count(), 0);
}

#[test]
fn test_subscribe_after_completion_is_immediate() {
    let writer = SortedMap::<i64, i64>::writer();
    let map = writer.map().clone();
    writer.complete();

    let subscriber = Arc::new(CountingSubscriber::default());
    let _subscription = map.subscribe(subscriber.clone());
    assert_eq!(subscriber.finals.load(Ordering::SeqCst), 1);
    assert_eq!(map.subscriber_count(), 0);
}
