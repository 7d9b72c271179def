//! Pairs session start events with their end events.
//!
//! A user may have several sessions open at once; sessions are keyed by
//! `(user_id, session_id)`. A repeated start replaces the earlier one and an
//! end without a recorded start is ignored.

use sessionstat_types::{CompletedSession, SessionEvent, SessionEventKind};
use std::collections::HashMap;

/// Outcome of feeding one event to the correlator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Correlation {
    /// A start was recorded (or replaced an earlier one)
    Opened,
    /// End matched a start and yielded a positive duration
    Completed(CompletedSession),
    /// End arrived for a session that was never opened
    Unmatched,
    /// End matched a start but was not after it
    NonPositive { duration: i64 },
}

#[derive(Debug, Default)]
pub struct SessionCorrelator {
    open: HashMap<(String, String), i64>,
}

impl SessionCorrelator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, kind: SessionEventKind, event: SessionEvent) -> Correlation {
        let SessionEvent {
            user_id,
            session_id,
            timestamp,
        } = event;

        match kind {
            SessionEventKind::Started => {
                self.open.insert((user_id, session_id), timestamp);
                Correlation::Opened
            }
            SessionEventKind::Ended => {
                let key = (user_id, session_id);
                let Some(started_at) = self.open.remove(&key) else {
                    return Correlation::Unmatched;
                };
                let duration = timestamp.saturating_sub(started_at);
                if duration <= 0 {
                    return Correlation::NonPositive { duration };
                }
                let (user_id, _) = key;
                Correlation::Completed(CompletedSession::new(user_id, timestamp, duration))
            }
        }
    }

    /// Sessions started but not yet ended.
    pub fn open_sessions(&self) -> usize {
        self.open.len()
    }
}
