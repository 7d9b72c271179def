//! Event ingestion: transport -> bounded event channel -> correlator worker
//! -> registrar.
//!
//! The worker pairs start/end events and submits completed sessions without
//! blocking. When the registrar buffer is full the session is dropped and
//! counted in `sessions_dropped`.

use crate::service::{RegistrarHandle, SubmitError};
use crate::{Error, Result};
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded, select};
use serde::Serialize;
use sessionstat_engine::{Correlation, SessionCorrelator};
use sessionstat_types::{SessionEvent, SessionEventKind};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::JoinHandle;

const WORKER_NAME: &str = "sessionstat-correlator";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    pub buffer_capacity: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishError {
    /// The event buffer is full
    Full,
    /// The correlator has stopped
    Closed,
}

impl fmt::Display for PublishError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublishError::Full => write!(f, "event buffer is full"),
            PublishError::Closed => write!(f, "event pipeline has stopped"),
        }
    }
}

impl std::error::Error for PublishError {}

#[derive(Debug, Default)]
struct PipelineStats {
    events_accepted: AtomicU64,
    events_rejected: AtomicU64,
    sessions_registered: AtomicU64,
    sessions_dropped: AtomicU64,
    unmatched_ends: AtomicU64,
    non_positive_durations: AtomicU64,
    open_sessions: AtomicU64,
}

impl PipelineStats {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            events_accepted: self.events_accepted.load(Ordering::Relaxed),
            events_rejected: self.events_rejected.load(Ordering::Relaxed),
            sessions_registered: self.sessions_registered.load(Ordering::Relaxed),
            sessions_dropped: self.sessions_dropped.load(Ordering::Relaxed),
            unmatched_ends: self.unmatched_ends.load(Ordering::Relaxed),
            non_positive_durations: self.non_positive_durations.load(Ordering::Relaxed),
            open_sessions: self.open_sessions.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the pipeline counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Events taken into the buffer
    pub events_accepted: u64,
    /// Events refused because the buffer was full
    pub events_rejected: u64,
    /// Completed sessions handed to the registrar
    pub sessions_registered: u64,
    /// Completed sessions lost to registrar backpressure
    pub sessions_dropped: u64,
    /// End events with no recorded start
    pub unmatched_ends: u64,
    /// Start/end pairs whose end was not after the start
    pub non_positive_durations: u64,
    /// Sessions started but not yet ended
    pub open_sessions: u64,
}

#[derive(Clone)]
pub struct PipelineHandle {
    events: Sender<(SessionEventKind, SessionEvent)>,
    stats: Arc<PipelineStats>,
}

impl PipelineHandle {
    /// Enqueues an event without blocking.
    pub fn publish(
        &self,
        kind: SessionEventKind,
        event: SessionEvent,
    ) -> std::result::Result<(), PublishError> {
        match self.events.try_send((kind, event)) {
            Ok(()) => {
                PipelineStats::bump(&self.stats.events_accepted);
                Ok(())
            }
            Err(TrySendError::Full(_)) => {
                PipelineStats::bump(&self.stats.events_rejected);
                Err(PublishError::Full)
            }
            Err(TrySendError::Disconnected(_)) => Err(PublishError::Closed),
        }
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}

pub struct Pipeline {
    handle: PipelineHandle,
    stop: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl Pipeline {
    pub fn start(config: PipelineConfig, registrar: RegistrarHandle) -> Result<Self> {
        if config.buffer_capacity == 0 {
            return Err(Error::Config(
                "event buffer capacity must be positive".to_string(),
            ));
        }

        let (events_tx, events_rx) = bounded(config.buffer_capacity);
        let (stop_tx, stop_rx) = bounded(0);
        let stats = Arc::new(PipelineStats::default());
        let worker_stats = Arc::clone(&stats);

        let worker = std::thread::Builder::new()
            .name(WORKER_NAME.to_string())
            .spawn(move || run_correlator(events_rx, stop_rx, registrar, worker_stats))?;

        Ok(Self {
            handle: PipelineHandle {
                events: events_tx,
                stats,
            },
            stop: Some(stop_tx),
            worker: Some(worker),
        })
    }

    pub fn handle(&self) -> PipelineHandle {
        self.handle.clone()
    }

    /// Stops the correlator and waits for it to exit. Buffered events and
    /// open sessions are discarded.
    pub fn shutdown(mut self) -> Result<()> {
        self.stop_worker()
    }

    fn stop_worker(&mut self) -> Result<()> {
        drop(self.stop.take());
        if let Some(worker) = self.worker.take() {
            worker
                .join()
                .map_err(|_| Error::Stopped(format!("{} panicked", WORKER_NAME)))?;
        }
        Ok(())
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        let _ = self.stop_worker();
    }
}

fn run_correlator(
    events: Receiver<(SessionEventKind, SessionEvent)>,
    stop: Receiver<()>,
    registrar: RegistrarHandle,
    stats: Arc<PipelineStats>,
) {
    tracing::info!("correlator worker started");
    let mut correlator = SessionCorrelator::new();

    loop {
        select! {
            recv(events) -> msg => match msg {
                Ok((kind, event)) => {
                    if !handle_event(&mut correlator, kind, event, &registrar, &stats) {
                        break;
                    }
                }
                Err(_) => break,
            },
            recv(stop) -> _ => break,
        }
    }

    tracing::info!(
        open_sessions = correlator.open_sessions(),
        "correlator worker stopped"
    );
}

/// Returns `false` once the registrar is gone and the worker should exit.
fn handle_event(
    correlator: &mut SessionCorrelator,
    kind: SessionEventKind,
    event: SessionEvent,
    registrar: &RegistrarHandle,
    stats: &PipelineStats,
) -> bool {
    // Ids are only copied when the debug/trace events below can fire.
    let ids = tracing::enabled!(tracing::Level::DEBUG)
        .then(|| (event.user_id.clone(), event.session_id.clone()));
    let outcome = correlator.observe(kind, event);
    stats
        .open_sessions
        .store(correlator.open_sessions() as u64, Ordering::Relaxed);

    match outcome {
        Correlation::Opened => {
            if let Some((user_id, session_id)) = &ids {
                tracing::trace!(%user_id, %session_id, "session opened");
            }
        }
        Correlation::Completed(session) => match registrar.submit(session) {
            Ok(()) => PipelineStats::bump(&stats.sessions_registered),
            Err(SubmitError::Full(session)) => {
                PipelineStats::bump(&stats.sessions_dropped);
                tracing::warn!(
                    user_id = %session.user_id,
                    duration = session.duration,
                    "registrar buffer full, dropping completed session"
                );
            }
            Err(SubmitError::Closed(_)) => {
                tracing::error!("registrar stopped, correlator exiting");
                return false;
            }
        },
        Correlation::Unmatched => {
            PipelineStats::bump(&stats.unmatched_ends);
            if let Some((user_id, session_id)) = &ids {
                tracing::debug!(%user_id, %session_id, "end event without matching start");
            }
        }
        Correlation::NonPositive { duration } => {
            PipelineStats::bump(&stats.non_positive_durations);
            if let Some((user_id, session_id)) = &ids {
                tracing::debug!(
                    %user_id,
                    %session_id,
                    duration,
                    "ignoring session with non-positive duration"
                );
            }
        }
    }
    true
}
