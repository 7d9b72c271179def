mod common;

use common::{GateClock, wait_until};
use sessionstat_runtime::{
    ManualClock, Pipeline, PipelineConfig, PublishError, RegistrarService, ServiceConfig,
};
use sessionstat_types::{SessionEvent, SessionEventKind};
use std::sync::Arc;

const NOW: i64 = 1_700_000_000_000;

fn start_service(clock: Arc<dyn sessionstat_runtime::Clock>, capacity: usize) -> RegistrarService {
    RegistrarService::start(
        ServiceConfig {
            retention_ms: 60_000,
            buffer_capacity: capacity,
        },
        clock,
    )
    .unwrap()
}

fn publish_session(
    pipeline: &sessionstat_runtime::PipelineHandle,
    user: &str,
    session: &str,
    start: i64,
    end: i64,
) {
    pipeline
        .publish(SessionEventKind::Started, SessionEvent::new(user, session, start))
        .unwrap();
    pipeline
        .publish(SessionEventKind::Ended, SessionEvent::new(user, session, end))
        .unwrap();
}

#[test]
fn test_events_become_queryable_sessions() {
    let service = start_service(Arc::new(ManualClock::new(NOW)), 16);
    let pipeline = Pipeline::start(PipelineConfig { buffer_capacity: 16 }, service.handle()).unwrap();
    let events = pipeline.handle();

    publish_session(&events, "alice", "a1", NOW - 1_000, NOW - 990);
    publish_session(&events, "alice", "a2", NOW - 900, NOW - 880);
    publish_session(&events, "bob", "b1", NOW - 500, NOW - 470);

    assert!(wait_until(|| events.stats().sessions_registered == 3));

    let registrar = service.handle();
    assert_eq!(registrar.query("alice").unwrap(), vec![10, 20]);
    assert_eq!(registrar.query("").unwrap(), vec![10, 20, 30]);

    let stats = events.stats();
    assert_eq!(stats.events_accepted, 6);
    assert_eq!(stats.open_sessions, 0);
}

#[test]
fn test_anomalies_are_counted_not_registered() {
    let service = start_service(Arc::new(ManualClock::new(NOW)), 16);
    let pipeline = Pipeline::start(PipelineConfig { buffer_capacity: 16 }, service.handle()).unwrap();
    let events = pipeline.handle();

    events
        .publish(SessionEventKind::Ended, SessionEvent::new("carol", "x", NOW))
        .unwrap();
    publish_session(&events, "carol", "y", NOW, NOW);
    events
        .publish(SessionEventKind::Started, SessionEvent::new("carol", "z", NOW))
        .unwrap();

    assert!(wait_until(|| {
        let stats = events.stats();
        stats.unmatched_ends == 1 && stats.non_positive_durations == 1 && stats.open_sessions == 1
    }));
    assert_eq!(events.stats().sessions_registered, 0);
    assert!(service.handle().query("carol").unwrap().is_empty());
}

#[test]
fn test_registrar_backpressure_drops_sessions() {
    let clock = Arc::new(GateClock::new(NOW));
    let service = start_service(clock.clone(), 1);
    let pipeline = Pipeline::start(PipelineConfig { buffer_capacity: 16 }, service.handle()).unwrap();
    let events = pipeline.handle();

    publish_session(&events, "alice", "s1", NOW - 10, NOW - 9);
    clock.wait_entered();

    publish_session(&events, "alice", "s2", NOW - 10, NOW - 8);
    publish_session(&events, "alice", "s3", NOW - 10, NOW - 7);

    assert!(wait_until(|| events.stats().sessions_dropped == 1));
    assert_eq!(events.stats().sessions_registered, 2);

    clock.open();
    assert_eq!(service.handle().query("alice").unwrap(), vec![1, 2]);
}

#[test]
fn test_publish_after_shutdown_is_closed() {
    let service = start_service(Arc::new(ManualClock::new(NOW)), 4);
    let pipeline = Pipeline::start(PipelineConfig { buffer_capacity: 4 }, service.handle()).unwrap();
    let events = pipeline.handle();
    pipeline.shutdown().unwrap();

    let result = events.publish(SessionEventKind::Started, SessionEvent::new("a", "s", 1));
    assert_eq!(result, Err(PublishError::Closed));
}
