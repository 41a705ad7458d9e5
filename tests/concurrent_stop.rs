//! Integration tests for cancelling many blocked subscriptions at once.

use regwatch::backend::MemoryNamespace;
use regwatch::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Generous bound on how long a raised cancellation takes to be observed.
const LATENCY: Duration = Duration::from_secs(1);

fn wait_for(what: &str, mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(Instant::now() < deadline, "timed out waiting for {}", what);
        thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn test_stop_all_wakes_subscriptions_on_different_paths() {
    let ns = MemoryNamespace::new();
    ns.create_key("HKLM\\Software\\One").unwrap();
    ns.create_key("HKCU\\Software\\Two").unwrap();
    let watcher = ChangeWatcher::with_namespace(ns.clone()).unwrap();

    let stopped = AtomicBool::new(false);
    let late_calls = AtomicUsize::new(0);
    let calls = AtomicUsize::new(0);

    let on_change = || {
        calls.fetch_add(1, Ordering::SeqCst);
        if stopped.load(Ordering::SeqCst) {
            late_calls.fetch_add(1, Ordering::SeqCst);
        }
    };

    thread::scope(|s| {
        let first = s.spawn(|| watcher.subscribe("HKLM\\Software\\One", on_change, SubscribeOptions::default()));
        let second = s.spawn(|| watcher.subscribe("HKCU\\Software\\Two", on_change, SubscribeOptions::default()));

        wait_for("both armed", || ns.armed_count() == 2);
        ns.set_value("HKLM\\Software\\One", "v", "1").unwrap();
        ns.set_value("HKCU\\Software\\Two", "v", "1").unwrap();
        wait_for("both callbacks", || calls.load(Ordering::SeqCst) == 2);
        wait_for("both re-armed", || ns.armed_count() == 2);

        let stop_at = Instant::now();
        stopped.store(true, Ordering::SeqCst);
        watcher.stop_all().unwrap();

        // Changes after the stop must not reach either callback.
        let _ = ns.set_value("HKLM\\Software\\One", "v", "2");
        let _ = ns.set_value("HKCU\\Software\\Two", "v", "2");

        assert_eq!(first.join().unwrap().unwrap(), WatchExit::Cancelled);
        assert_eq!(second.join().unwrap().unwrap(), WatchExit::Cancelled);
        assert!(stop_at.elapsed() < LATENCY);
    });

    assert_eq!(late_calls.load(Ordering::SeqCst), 0);
    assert_eq!(ns.live_nodes(), 0);
    assert_eq!(ns.live_signals(), 1);
}

#[test]
fn test_stop_all_wakes_many_subscribers() {
    let ns = MemoryNamespace::new();
    for i in 0..16 {
        ns.create_key(&format!("HKCU\\Software\\K{}", i)).unwrap();
    }
    let watcher = Arc::new(ChangeWatcher::with_namespace(ns.clone()).unwrap());

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let watcher = Arc::clone(&watcher);
            thread::spawn(move || {
                watcher.subscribe(&format!("HKCU\\Software\\K{}", i), || {}, SubscribeOptions::default())
            })
        })
        .collect();

    wait_for("all armed", || ns.armed_count() == 16);
    assert_eq!(watcher.active_subscriptions().len(), 16);

    let stop_at = Instant::now();
    watcher.stop_all().unwrap();
    watcher.stop_all().unwrap();

    for handle in handles {
        assert_eq!(handle.join().unwrap().unwrap(), WatchExit::Cancelled);
    }
    assert!(stop_at.elapsed() < LATENCY);
    assert!(watcher.active_subscriptions().is_empty());
}

#[test]
fn test_zero_duration_blocks_until_cancelled() {
    let ns = MemoryNamespace::new();
    ns.create_key("HKCU\\Idle").unwrap();
    let watcher = Arc::new(ChangeWatcher::with_namespace(ns.clone()).unwrap());

    let subscriber = {
        let watcher = Arc::clone(&watcher);
        thread::spawn(move || watcher.subscribe("HKCU\\Idle", || {}, SubscribeOptions::default()))
    };

    wait_for("arm", || ns.armed_count() == 1);
    thread::sleep(Duration::from_millis(300));
    assert!(!subscriber.is_finished(), "unbounded subscription returned on its own");

    let canceller = {
        let watcher = Arc::clone(&watcher);
        thread::spawn(move || watcher.stop_all())
    };
    canceller.join().unwrap().unwrap();

    assert_eq!(subscriber.join().unwrap().unwrap(), WatchExit::Cancelled);
}

#[test]
fn test_watchers_cancel_independently() {
    let ns = MemoryNamespace::new();
    ns.create_key("HKCU\\A").unwrap();
    ns.create_key("HKCU\\B").unwrap();
    let stopped_watcher = ChangeWatcher::with_namespace(ns.clone()).unwrap();
    let running_watcher = ChangeWatcher::with_namespace(ns.clone()).unwrap();

    thread::scope(|s| {
        let stopped = s.spawn(|| stopped_watcher.subscribe("HKCU\\A", || {}, SubscribeOptions::default()));
        let running = s.spawn(|| {
            running_watcher.subscribe(
                "HKCU\\B",
                || {},
                SubscribeOptions::new().with_duration(Duration::from_millis(400)),
            )
        });

        wait_for("both armed", || ns.armed_count() == 2);
        stopped_watcher.stop_all().unwrap();

        assert_eq!(stopped.join().unwrap().unwrap(), WatchExit::Cancelled);
        assert!(!running_watcher.is_stopped());
        assert_eq!(running.join().unwrap().unwrap(), WatchExit::TimedOut);
    });
}

#[test]
fn test_concurrent_stop_calls_all_succeed() {
    let ns = MemoryNamespace::new();
    ns.create_key("HKCU\\App").unwrap();
    let watcher = ChangeWatcher::with_namespace(ns.clone()).unwrap();

    thread::scope(|s| {
        let subscriber = s.spawn(|| watcher.subscribe("HKCU\\App", || {}, SubscribeOptions::default()));
        wait_for("arm", || ns.armed_count() == 1);

        let stoppers: Vec<_> = (0..4).map(|_| s.spawn(|| watcher.stop_all())).collect();
        for stopper in stoppers {
            stopper.join().unwrap().unwrap();
        }

        assert_eq!(subscriber.join().unwrap().unwrap(), WatchExit::Cancelled);
    });
}

#[test]
fn test_callbacks_within_one_subscription_never_overlap() {
    let ns = MemoryNamespace::new();
    ns.create_key("HKCU\\Busy").unwrap();
    let watcher = ChangeWatcher::with_namespace(ns.clone()).unwrap();

    let in_callback = AtomicBool::new(false);
    let overlaps = AtomicUsize::new(0);
    let calls = AtomicUsize::new(0);
    let writing = AtomicBool::new(true);

    thread::scope(|s| {
        let subscriber = s.spawn(|| {
            watcher.subscribe(
                "HKCU\\Busy",
                || {
                    if in_callback.swap(true, Ordering::SeqCst) {
                        overlaps.fetch_add(1, Ordering::SeqCst);
                    }
                    calls.fetch_add(1, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(2));
                    in_callback.store(false, Ordering::SeqCst);
                },
                SubscribeOptions::default(),
            )
        });

        wait_for("arm", || ns.armed_count() == 1);
        let writer = s.spawn(|| {
            let mut i = 0u32;
            while writing.load(Ordering::SeqCst) {
                ns.set_value("HKCU\\Busy", "tick", i.to_string()).unwrap();
                i += 1;
                thread::sleep(Duration::from_micros(200));
            }
            i
        });

        wait_for("several callbacks", || calls.load(Ordering::SeqCst) >= 5);
        writing.store(false, Ordering::SeqCst);
        let writes = writer.join().unwrap();
        watcher.stop_all().unwrap();
        subscriber.join().unwrap().unwrap();

        // Coalescing: never more callbacks than writes.
        assert!(calls.load(Ordering::SeqCst) as u32 <= writes);
    });

    assert_eq!(overlaps.load(Ordering::SeqCst), 0);
}
