//! Single-owner worker around the sliding-window registrar.
//!
//! One thread owns the `Registrar`; everything else talks to it through a
//! cloneable `RegistrarHandle`. Insertions travel over a bounded channel and
//! are never blocked on; queries are a synchronous round trip with a private
//! reply channel per request.
//!
//! Scheduling favours ingestion: the worker drains every buffered insertion
//! before it waits on either channel, and drains again before answering a
//! query, so a query observes every session submitted before it was sent.
//! Under sustained insertion load queries can starve.

use crate::clock::Clock;
use crate::{Error, Result};
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded, select};
use sessionstat_engine::Registrar;
use sessionstat_types::{CompletedSession, QueryScope};
use std::fmt;
use std::sync::Arc;
use std::thread::JoinHandle;

const WORKER_NAME: &str = "sessionstat-registrar";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceConfig {
    pub retention_ms: i64,
    pub buffer_capacity: usize,
}

/// Why a session was not accepted. The session is handed back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    /// The insertion buffer is full
    Full(CompletedSession),
    /// The worker has stopped
    Closed(CompletedSession),
}

impl SubmitError {
    pub fn into_session(self) -> CompletedSession {
        match self {
            SubmitError::Full(session) | SubmitError::Closed(session) => session,
        }
    }
}

impl fmt::Display for SubmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitError::Full(_) => write!(f, "registrar buffer is full"),
            SubmitError::Closed(_) => write!(f, "registrar has stopped"),
        }
    }
}

impl std::error::Error for SubmitError {}

struct DurationsRequest {
    scope: QueryScope,
    reply: Sender<Vec<i64>>,
}

#[derive(Clone)]
pub struct RegistrarHandle {
    sessions: Sender<CompletedSession>,
    queries: Sender<DurationsRequest>,
}

impl RegistrarHandle {
    /// Enqueues a session without blocking.
    pub fn submit(&self, session: CompletedSession) -> std::result::Result<(), SubmitError> {
        self.sessions.try_send(session).map_err(|err| match err {
            TrySendError::Full(session) => SubmitError::Full(session),
            TrySendError::Disconnected(session) => SubmitError::Closed(session),
        })
    }

    /// Durations of live sessions for `user_id`; an empty id means all users.
    /// Blocks until the worker answers.
    pub fn query(&self, user_id: &str) -> Result<Vec<i64>> {
        self.query_scope(QueryScope::from_user_id(user_id))
    }

    pub fn query_scope(&self, scope: QueryScope) -> Result<Vec<i64>> {
        let (reply, response) = bounded(1);
        self.queries
            .send(DurationsRequest { scope, reply })
            .map_err(|_| Error::Stopped(WORKER_NAME.to_string()))?;
        response
            .recv()
            .map_err(|_| Error::Stopped(WORKER_NAME.to_string()))
    }

    /// Sessions buffered but not yet registered.
    pub fn pending(&self) -> usize {
        self.sessions.len()
    }
}

pub struct RegistrarService {
    handle: RegistrarHandle,
    stop: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl RegistrarService {
    pub fn start(config: ServiceConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        if config.buffer_capacity == 0 {
            return Err(Error::Config(
                "registrar buffer capacity must be positive".to_string(),
            ));
        }

        let (sessions_tx, sessions_rx) = bounded(config.buffer_capacity);
        let (queries_tx, queries_rx) = bounded(0);
        let (stop_tx, stop_rx) = bounded(0);
        let registrar = Registrar::new(config.retention_ms);

        let worker = std::thread::Builder::new()
            .name(WORKER_NAME.to_string())
            .spawn(move || {
                let worker = Worker { registrar, clock };
                worker.run(sessions_rx, queries_rx, stop_rx);
            })?;

        Ok(Self {
            handle: RegistrarHandle {
                sessions: sessions_tx,
                queries: queries_tx,
            },
            stop: Some(stop_tx),
            worker: Some(worker),
        })
    }

    pub fn handle(&self) -> RegistrarHandle {
        self.handle.clone()
    }

    /// Stops the worker and waits for it to exit. Buffered sessions are
    /// discarded; outstanding and later queries fail with `Error::Stopped`.
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

impl Drop for RegistrarService {
    fn drop(&mut self) {
        let _ = self.stop_worker();
    }
}

struct Worker {
    registrar: Registrar,
    clock: Arc<dyn Clock>,
}

impl Worker {
    fn run(
        mut self,
        sessions: Receiver<CompletedSession>,
        queries: Receiver<DurationsRequest>,
        stop: Receiver<()>,
    ) {
        tracing::info!(
            retention_ms = self.registrar.retention_ms(),
            "registrar worker started"
        );

        loop {
            self.drain(&sessions);

            select! {
                recv(sessions) -> msg => match msg {
                    Ok(session) => self.register(session),
                    Err(_) => break,
                },
                recv(queries) -> msg => match msg {
                    Ok(request) => {
                        // Insertions that became ready alongside the query go first.
                        self.drain(&sessions);
                        self.answer(request);
                    }
                    Err(_) => break,
                },
                recv(stop) -> _ => break,
            }
        }

        tracing::info!(
            live_sessions = self.registrar.len(),
            "registrar worker stopped"
        );
    }

    fn drain(&mut self, sessions: &Receiver<CompletedSession>) {
        while let Ok(session) = sessions.try_recv() {
            self.register(session);
        }
    }

    fn register(&mut self, session: CompletedSession) {
        let now = self.clock.now_millis();
        tracing::trace!(
            user_id = %session.user_id,
            duration = session.duration,
            "registering session"
        );
        self.registrar.insert(session, now);
    }

    fn answer(&mut self, request: DurationsRequest) {
        let now = self.clock.now_millis();
        let durations = self.registrar.durations(&request.scope, now);
        tracing::debug!(
            scope = ?request.scope,
            count = durations.len(),
            live_sessions = self.registrar.len(),
            users = self.registrar.user_count(),
            "answering duration query"
        );
        // The caller may have given up waiting; nothing to do then.
        let _ = request.reply.send(durations);
    }
}
