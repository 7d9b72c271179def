//! Sliding-window registry of completed sessions.
//!
//! Each live entry sits on two circular rings at once: the global ring in
//! insertion order (used for expiry and "all users" queries) and the ring of
//! its user's bucket (used for per-user queries). Expiry is lazy: every
//! insert and query first purges entries older than the retention window,
//! scanning from the oldest end of the global ring and stopping at the first
//! fresh entry. Timestamps are expected to arrive roughly in order; an entry
//! that is older than one inserted before it stays linked until everything
//! ahead of it has expired, but queries never report it once it is outside
//! the window.

mod arena;

use arena::{Arena, GLOBAL_HEAD, NodeId, Payload, Ring};
use sessionstat_types::{CompletedSession, QueryScope};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

#[derive(Debug)]
pub struct Registrar {
    arena: Arena,
    /// User id -> sentinel of that user's ring
    users: HashMap<Arc<str>, NodeId>,
    retention_ms: i64,
    live: usize,
}

impl Registrar {
    /// Creates an empty registrar. Entries with `now - end_timestamp > retention_ms`
    /// are considered expired; a negative retention is treated as zero.
    pub fn new(retention_ms: i64) -> Self {
        Self {
            arena: Arena::new(),
            users: HashMap::new(),
            retention_ms: retention_ms.max(0),
            live: 0,
        }
    }

    pub fn retention_ms(&self) -> i64 {
        self.retention_ms
    }

    /// Number of live entries (as of the last sweep).
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Number of users with at least one live entry (as of the last sweep).
    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn contains_user(&self, user_id: &str) -> bool {
        self.users.contains_key(user_id)
    }

    /// Records a session at the newest end of both rings, then sweeps.
    pub fn insert(&mut self, session: CompletedSession, now: i64) {
        let head = self.bucket_for(&session.user_id);
        let id = self.arena.alloc(Payload::Entry {
            end_timestamp: session.end_timestamp,
            duration: session.duration,
            bucket: head,
        });
        self.arena.push_back(Ring::Global, GLOBAL_HEAD, id);
        self.arena.push_back(Ring::User, head, id);
        self.live += 1;

        self.sweep_expired(now);
    }

    /// Durations of every live session, oldest first.
    pub fn all_durations(&mut self, now: i64) -> Vec<i64> {
        self.sweep_expired(now);
        self.collect_durations(GLOBAL_HEAD, Ring::Global, now)
    }

    /// Durations of one user's live sessions, oldest first. Unknown users
    /// yield an empty list.
    pub fn user_durations(&mut self, user_id: &str, now: i64) -> Vec<i64> {
        self.sweep_expired(now);
        match self.users.get(user_id) {
            Some(&head) => self.collect_durations(head, Ring::User, now),
            None => Vec::new(),
        }
    }

    pub fn durations(&mut self, scope: &QueryScope, now: i64) -> Vec<i64> {
        match scope {
            QueryScope::All => self.all_durations(now),
            QueryScope::User(user_id) => self.user_durations(user_id, now),
        }
    }

    /// Drops expired entries from the oldest end of the global ring and
    /// returns how many were removed. Buckets left empty are deleted.
    pub fn sweep_expired(&mut self, now: i64) -> usize {
        let threshold = self.threshold(now);
        let mut purged = 0;

        while let Some(oldest) = self.arena.first(Ring::Global, GLOBAL_HEAD) {
            let (end_timestamp, bucket) = match self.arena.payload(oldest) {
                Payload::Entry {
                    end_timestamp,
                    bucket,
                    ..
                } => (*end_timestamp, *bucket),
                other => unreachable!("global ring holds a non-entry node: {:?}", other),
            };
            if end_timestamp >= threshold {
                break;
            }

            self.arena.unlink(Ring::Global, oldest);
            self.arena.unlink(Ring::User, oldest);
            self.arena.release(oldest);
            self.live -= 1;
            purged += 1;

            if self.arena.is_ring_empty(Ring::User, bucket) {
                self.remove_bucket(bucket);
            }
        }

        purged
    }

    /// Asserts the dual-ring invariants:
    /// - both kinds of ring are well formed,
    /// - the global ring holds exactly the entries of all user rings,
    /// - every bucket in the map is non-empty and owns its entries,
    /// - no slot is leaked.
    ///
    /// Panics on violation; a failure here is a bug in the registrar.
    pub fn check_consistency(&self) {
        assert!(
            self.arena.ring_is_well_formed(Ring::Global, GLOBAL_HEAD),
            "global ring is corrupted"
        );

        let global: HashSet<NodeId> = self.arena.iter(Ring::Global, GLOBAL_HEAD).collect();
        assert_eq!(global.len(), self.live, "live count disagrees with global ring");

        let heads: HashSet<NodeId> = self.users.values().copied().collect();
        for &id in &global {
            match self.arena.payload(id) {
                Payload::Entry { bucket, .. } => assert!(
                    heads.contains(bucket),
                    "entry {:?} points at an unregistered bucket",
                    id
                ),
                other => panic!("global ring holds a non-entry node: {:?}", other),
            }
        }

        let mut in_user_rings = 0;
        for (user_id, &head) in &self.users {
            match self.arena.payload(head) {
                Payload::UserHead { user_id: owner } => {
                    assert_eq!(owner, user_id, "bucket sentinel owned by another user")
                }
                other => panic!("bucket of {:?} is not a sentinel: {:?}", user_id, other),
            }
            assert!(
                self.arena.ring_is_well_formed(Ring::User, head),
                "ring of {:?} is corrupted",
                user_id
            );
            assert!(
                !self.arena.is_ring_empty(Ring::User, head),
                "empty bucket kept for {:?}",
                user_id
            );

            for id in self.arena.iter(Ring::User, head) {
                assert!(global.contains(&id), "entry {:?} missing from global ring", id);
                match self.arena.payload(id) {
                    Payload::Entry { bucket, .. } => assert_eq!(
                        *bucket, head,
                        "entry {:?} is linked into a foreign bucket",
                        id
                    ),
                    other => panic!("user ring holds a non-entry node: {:?}", other),
                }
                in_user_rings += 1;
            }
        }
        assert_eq!(in_user_rings, self.live, "user rings disagree with global ring");

        assert_eq!(
            self.arena.slots(),
            1 + self.users.len() + self.live + self.arena.vacant_slots(),
            "arena slots leaked"
        );
    }

    fn bucket_for(&mut self, user_id: &str) -> NodeId {
        if let Some(&head) = self.users.get(user_id) {
            return head;
        }
        let user_id: Arc<str> = Arc::from(user_id);
        let head = self.arena.alloc(Payload::UserHead {
            user_id: Arc::clone(&user_id),
        });
        self.users.insert(user_id, head);
        head
    }

    fn remove_bucket(&mut self, head: NodeId) {
        match self.arena.release(head) {
            Payload::UserHead { user_id } => {
                self.users.remove(&user_id);
            }
            other => unreachable!("bucket sentinel holds {:?}", other),
        }
    }

    /// Oldest end timestamp still inside the window at `now`.
    fn threshold(&self, now: i64) -> i64 {
        now.saturating_sub(self.retention_ms)
    }

    /// Skips entries that are outside the window but still linked behind a
    /// fresher one that arrived earlier.
    fn collect_durations(&self, head: NodeId, ring: Ring, now: i64) -> Vec<i64> {
        let threshold = self.threshold(now);
        self.arena
            .iter(ring, head)
            .filter_map(|id| match self.arena.payload(id) {
                Payload::Entry {
                    end_timestamp,
                    duration,
                    ..
                } if *end_timestamp >= threshold => Some(*duration),
                _ => None,
            })
            .collect()
    }
}
