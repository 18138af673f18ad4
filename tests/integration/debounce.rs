//! Integration tests for debounced persistence

use dotstore::{CoalescePolicy, ManualTimer, Store, StoreError, StoreOptions, ThreadTimer};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use crate::integration::CountingFilesystem;

fn on_disk(store: &Store) -> Value {
    serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap()
}

struct Harness {
    _temp_dir: TempDir,
    fs: Arc<CountingFilesystem>,
    timer: Arc<ManualTimer>,
    store: Store,
}

fn harness(debounce_ms: u64, policy: CoalescePolicy) -> Harness {
    let temp_dir = TempDir::new().unwrap();
    let fs = Arc::new(CountingFilesystem::default());
    let timer = Arc::new(ManualTimer::new());
    let store = Store::new(
        StoreOptions::new("debounced")
            .base_dir(temp_dir.path())
            .debounce_ms(debounce_ms)
            .coalesce(policy)
            .filesystem(fs.clone())
            .timer(timer.clone()),
    )
    .unwrap();
    Harness {
        _temp_dir: temp_dir,
        fs,
        timer,
        store,
    }
}

#[test]
fn test_burst_coalesces_into_one_write() {
    let h = harness(50, CoalescePolicy::ResetOnSave);

    for i in 0..5 {
        h.store.set("counter", json!(i)).unwrap();
        h.timer.advance(Duration::from_millis(10));
    }
    assert_eq!(h.fs.writes(), 0);
    assert!(h.store.is_write_pending());
    assert_eq!(h.store.get("counter").unwrap(), Some(json!(4)));

    h.timer.advance(Duration::from_millis(50));
    assert_eq!(h.fs.writes(), 1);
    assert!(!h.store.is_write_pending());
    assert_eq!(on_disk(&h.store), json!({"counter": 4}));
}

#[test]
fn test_reset_policy_postpones_deadline() {
    let h = harness(50, CoalescePolicy::ResetOnSave);

    h.store.set("a", json!(1)).unwrap();
    h.timer.advance(Duration::from_millis(40));
    h.store.set("a", json!(2)).unwrap();
    h.timer.advance(Duration::from_millis(40));
    assert_eq!(h.fs.writes(), 0);

    h.timer.advance(Duration::from_millis(10));
    assert_eq!(h.fs.writes(), 1);
    assert_eq!(on_disk(&h.store), json!({"a": 2}));
}

#[test]
fn test_keep_first_policy_fires_on_original_deadline() {
    let h = harness(50, CoalescePolicy::KeepFirst);

    h.store.set("a", json!(1)).unwrap();
    h.timer.advance(Duration::from_millis(40));
    h.store.set("a", json!(2)).unwrap();
    h.timer.advance(Duration::from_millis(10));
    assert_eq!(h.fs.writes(), 1);
    assert_eq!(on_disk(&h.store), json!({"a": 2}));
}

#[test]
fn test_write_file_cancels_pending_write() {
    let h = harness(50, CoalescePolicy::ResetOnSave);

    h.store.set("a", json!(1)).unwrap();
    h.store.write_file().unwrap();
    assert_eq!(h.fs.writes(), 1);
    assert!(!h.store.is_write_pending());

    h.timer.advance(Duration::from_millis(100));
    assert_eq!(h.fs.writes(), 1);
}

#[test]
fn test_flush_reports_pending_state() {
    let h = harness(50, CoalescePolicy::ResetOnSave);

    assert!(!h.store.flush().unwrap());
    h.store.set("a", json!(1)).unwrap();
    assert!(h.store.flush().unwrap());
    assert_eq!(h.fs.writes(), 1);
    assert!(!h.store.flush().unwrap());
}

#[test]
fn test_unlink_cancels_pending_write() {
    let h = harness(50, CoalescePolicy::ResetOnSave);

    h.store.set("a", json!(1)).unwrap();
    h.store.unlink().unwrap();
    h.timer.advance(Duration::from_millis(100));
    assert_eq!(h.fs.writes(), 0);
    assert!(!h.store.path().exists());
}

#[test]
fn test_drop_flushes_pending_write() {
    let h = harness(50, CoalescePolicy::ResetOnSave);
    let path = h.store.path().to_path_buf();

    h.store.set("kept", json!(true)).unwrap();
    drop(h.store);
    assert_eq!(h.fs.writes(), 1);

    let contents: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(contents, json!({"kept": true}));

    // The orphaned task must not write again
    h.timer.advance(Duration::from_millis(100));
    assert_eq!(h.fs.writes(), 1);
}

#[test]
fn test_deferred_write_failure_reaches_hook() {
    let temp_dir = TempDir::new().unwrap();
    let blocker = temp_dir.path().join("blocker");
    std::fs::write(&blocker, "not a directory").unwrap();

    let timer = Arc::new(ManualTimer::new());
    let failures = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&failures);
    let store = Store::new(
        StoreOptions::new("broken")
            .path(blocker.join("store.json"))
            .debounce_ms(20)
            .timer(timer.clone())
            .on_write_error(move |e| {
                assert!(matches!(e, StoreError::Write { .. }));
                seen.fetch_add(1, Ordering::SeqCst);
            }),
    )
    .unwrap();

    // Deferred mutations report success
    store.set("a", json!(1)).unwrap();
    timer.advance(Duration::from_millis(20));
    assert_eq!(failures.load(Ordering::SeqCst), 1);
    assert!(!store.is_write_pending());
    assert_eq!(store.get("a").unwrap(), Some(json!(1)));
}

#[test]
fn test_zero_debounce_never_schedules() {
    let h = harness(0, CoalescePolicy::ResetOnSave);

    h.store.set("a", json!(1)).unwrap();
    h.store.set("b", json!(2)).unwrap();
    assert_eq!(h.fs.writes(), 2);
    assert_eq!(h.timer.pending(), 0);
}

#[test]
fn test_thread_timer_coalesces_burst() {
    let temp_dir = TempDir::new().unwrap();
    let fs = Arc::new(CountingFilesystem::default());
    let store = Store::new(
        StoreOptions::new("wallclock")
            .base_dir(temp_dir.path())
            .debounce_ms(50)
            .filesystem(fs.clone())
            .timer(Arc::new(ThreadTimer::new())),
    )
    .unwrap();

    for i in 0..5 {
        store.set("n", json!(i)).unwrap();
    }
    assert_eq!(fs.writes(), 0);

    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    while store.is_write_pending() && std::time::Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
    }
    assert!(!store.is_write_pending());
    assert_eq!(fs.writes(), 1);
    assert_eq!(on_disk(&store), json!({"n": 4}));
}
