mod common;

use common::GateClock;
use sessionstat_engine::{mean, median};
use sessionstat_runtime::{ManualClock, RegistrarService, ServiceConfig, SubmitError};
use sessionstat_types::CompletedSession;
use std::sync::Arc;
use std::time::{Duration, Instant};

const NOW: i64 = 1_700_000_000_000;
const W: i64 = 60_000;

fn config(capacity: usize) -> ServiceConfig {
    ServiceConfig {
        retention_ms: W,
        buffer_capacity: capacity,
    }
}

#[test]
fn test_alice_scenario_through_service() {
    let service = RegistrarService::start(config(16), Arc::new(ManualClock::new(NOW))).unwrap();
    let handle = service.handle();

    for (offset, duration) in [(300, 10), (200, 20), (100, 30)] {
        handle
            .submit(CompletedSession::new("alice", NOW - offset, duration))
            .unwrap();
    }

    let mut durations = handle.query("alice").unwrap();
    durations.sort_unstable();
    assert_eq!(durations, vec![10, 20, 30]);
    assert_eq!(mean(&durations), 20);
    assert_eq!(median(&durations), 20);
}

#[test]
fn test_expired_bob_is_absent_from_all_users() {
    let service = RegistrarService::start(config(16), Arc::new(ManualClock::new(NOW))).unwrap();
    let handle = service.handle();

    handle
        .submit(CompletedSession::new("bob", NOW - W - 1, 42))
        .unwrap();
    handle.submit(CompletedSession::new("alice", NOW, 7)).unwrap();

    assert!(handle.query("bob").unwrap().is_empty());
    assert_eq!(handle.query("").unwrap(), vec![7]);
}

#[test]
fn test_submit_fails_fast_when_buffer_full() {
    let clock = Arc::new(GateClock::new(NOW));
    let service = RegistrarService::start(config(2), clock.clone()).unwrap();
    let handle = service.handle();

    // The worker takes the first session and parks inside the clock.
    handle.submit(CompletedSession::new("alice", NOW, 1)).unwrap();
    clock.wait_entered();

    handle.submit(CompletedSession::new("alice", NOW, 2)).unwrap();
    handle.submit(CompletedSession::new("alice", NOW, 3)).unwrap();
    assert_eq!(handle.pending(), 2);

    let started = Instant::now();
    let rejected = handle.submit(CompletedSession::new("alice", NOW, 4));
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(
        rejected,
        Err(SubmitError::Full(CompletedSession::new("alice", NOW, 4)))
    );

    clock.open();
    assert_eq!(handle.query("alice").unwrap(), vec![1, 2, 3]);
    service.shutdown().unwrap();
}

#[test]
fn test_concurrent_callers_get_their_own_answers() {
    let service = RegistrarService::start(config(64), Arc::new(ManualClock::new(NOW))).unwrap();

    let workers: Vec<_> = (0..8i64)
        .map(|i| {
            let handle = service.handle();
            std::thread::spawn(move || {
                let user = format!("user-{}", i);
                for d in 1..=3 {
                    let session = CompletedSession::new(user.clone(), NOW, i * 100 + d);
                    let mut pending = Some(session);
                    while let Some(session) = pending.take() {
                        if let Err(SubmitError::Full(session)) = handle.submit(session) {
                            std::thread::yield_now();
                            pending = Some(session);
                        }
                    }
                }
                (i, handle.query(&user).unwrap())
            })
        })
        .collect();

    for worker in workers {
        let (i, durations) = worker.join().unwrap();
        assert_eq!(durations, vec![i * 100 + 1, i * 100 + 2, i * 100 + 3]);
    }

    assert_eq!(service.handle().query("").unwrap().len(), 24);
}

#[test]
fn test_submit_after_shutdown_is_closed() {
    let service = RegistrarService::start(config(4), Arc::new(ManualClock::new(NOW))).unwrap();
    let handle = service.handle();
    service.shutdown().unwrap();

    assert!(matches!(
        handle.submit(CompletedSession::new("alice", NOW, 1)),
        Err(SubmitError::Closed(_))
    ));
    assert!(handle.query("alice").is_err());
}
