use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use crate::{CapacityExhausted, KeyedMutex};

#[test]
fn locked_runs_the_action_and_returns_its_value() {
    let mutex = KeyedMutex::<&str>::builder().build();

    let value = mutex.locked("k", || 42).expect("wait mode cannot fail");

    assert_eq!(value, 42);
}

#[test]
fn same_key_actions_are_mutually_exclusive() {
    let mutex = Arc::new(KeyedMutex::<&str>::builder().build());
    let counter = Arc::new(AtomicUsize::new(0));

    let threads: Vec<_> = (0..4)
        .map(|_| {
            let mutex = mutex.clone();
            let counter = counter.clone();

            thread::spawn(move || {
                for _ in 0..10 {
                    mutex
                        .locked("shared", || {
                            // Unprotected read-sleep-write; lost updates would
                            // show up as a short count.
                            let seen = counter.load(Ordering::Relaxed);
                            thread::sleep(Duration::from_millis(1));
                            counter.store(seen + 1, Ordering::Relaxed);
                        })
                        .expect("wait mode cannot fail");
                }
            })
        })
        .collect();

    for t in threads {
        t.join().expect("thread panicked");
    }

    assert_eq!(counter.load(Ordering::Relaxed), 40);
}

#[test]
fn different_keys_proceed_in_parallel() {
    let mutex = Arc::new(KeyedMutex::<String>::builder().build());

    let started = Instant::now();
    let threads: Vec<_> = (0..2)
        .map(|i| {
            let mutex = mutex.clone();

            thread::spawn(move || {
                mutex
                    .locked(format!("key-{i}"), || {
                        thread::sleep(Duration::from_millis(150));
                    })
                    .expect("wait mode cannot fail");
            })
        })
        .collect();

    for t in threads {
        t.join().expect("thread panicked");
    }

    // Serialized execution would need at least 300ms.
    assert!(started.elapsed() < Duration::from_millis(280));
}

#[test]
fn nested_locking_of_the_same_key_is_reentrant() {
    let mutex = KeyedMutex::<&str>::builder().build();

    let value = mutex
        .locked("k", || mutex.locked("k", || 7).expect("reentrant"))
        .expect("wait mode cannot fail");

    assert_eq!(value, 7);
}

#[test]
fn fail_fast_mode_reports_exhausted_capacity() {
    let mutex = Arc::new(
        KeyedMutex::<&str>::builder()
            .with_max_in_flight(1)
            .with_wait_on_overload(false)
            .build(),
    );

    let holder = {
        let mutex = mutex.clone();
        thread::spawn(move || {
            mutex
                .locked("a", || thread::sleep(Duration::from_millis(300)))
                .expect("first permit")
        })
    };

    // Let the holder take the only permit.
    thread::sleep(Duration::from_millis(100));
    let result = mutex.locked("b", || ());

    assert_eq!(result, Err(CapacityExhausted));
    holder.join().expect("thread panicked");
}

#[test]
fn wait_mode_blocks_until_capacity_frees_up() {
    let mutex = Arc::new(
        KeyedMutex::<&str>::builder()
            .with_max_in_flight(1)
            .build(),
    );

    let holder = {
        let mutex = mutex.clone();
        thread::spawn(move || {
            mutex
                .locked("a", || thread::sleep(Duration::from_millis(200)))
                .expect("first permit")
        })
    };

    thread::sleep(Duration::from_millis(50));
    let started = Instant::now();
    mutex.locked("b", || ()).expect("wait mode cannot fail");

    assert!(started.elapsed() >= Duration::from_millis(100));
    holder.join().expect("thread panicked");
}

#[test]
fn idle_key_slots_are_evicted_on_release() {
    let mutex = KeyedMutex::<String>::builder().build();

    for i in 0..16 {
        mutex
            .locked(format!("key-{i}"), || ())
            .expect("wait mode cannot fail");
    }

    assert_eq!(mutex.slot_count(), 0);
}

#[test]
fn slot_survives_while_another_thread_waits_on_it() {
    let mutex = Arc::new(KeyedMutex::<&str>::builder().build());
    let witness = Arc::new(AtomicUsize::new(0));

    let first = {
        let mutex = mutex.clone();
        let witness = witness.clone();
        thread::spawn(move || {
            mutex
                .locked("k", || {
                    witness.fetch_add(1, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(150));
                })
                .expect("wait mode cannot fail");
        })
    };

    thread::sleep(Duration::from_millis(50));
    mutex
        .locked("k", || {
            witness.fetch_add(1, Ordering::SeqCst);
        })
        .expect("wait mode cannot fail");

    first.join().expect("thread panicked");
    assert_eq!(witness.load(Ordering::SeqCst), 2);
    assert_eq!(mutex.slot_count(), 0);
}
