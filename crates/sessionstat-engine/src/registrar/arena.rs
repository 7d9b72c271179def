//! Slot storage for the registrar's two circular orderings.
//!
//! Every node carries one `Links` pair per ring. Sentinels are ordinary nodes
//! whose unused ring points back at themselves, so splicing never has to
//! special-case an empty list.

use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct NodeId(usize);

/// Slot 0 anchors the global ring for the lifetime of the arena.
pub(crate) const GLOBAL_HEAD: NodeId = NodeId(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Ring {
    /// Insertion order across all users
    Global,
    /// Insertion order within one user's bucket
    User,
}

#[derive(Debug, Clone, Copy)]
struct Links {
    prev: NodeId,
    next: NodeId,
}

impl Links {
    fn to_self(id: NodeId) -> Self {
        Self { prev: id, next: id }
    }
}

#[derive(Debug)]
pub(crate) enum Payload {
    GlobalHead,
    UserHead {
        user_id: Arc<str>,
    },
    Entry {
        end_timestamp: i64,
        duration: i64,
        /// Sentinel of the owning user bucket
        bucket: NodeId,
    },
    Vacant,
}

#[derive(Debug)]
struct Node {
    global: Links,
    user: Links,
    payload: Payload,
}

#[derive(Debug)]
pub(crate) struct Arena {
    nodes: Vec<Node>,
    free: Vec<NodeId>,
}

impl Arena {
    pub(crate) fn new() -> Self {
        Self {
            nodes: vec![Node {
                global: Links::to_self(GLOBAL_HEAD),
                user: Links::to_self(GLOBAL_HEAD),
                payload: Payload::GlobalHead,
            }],
            free: Vec::new(),
        }
    }

    /// Allocates a detached node: both rings point at the node itself.
    pub(crate) fn alloc(&mut self, payload: Payload) -> NodeId {
        match self.free.pop() {
            Some(id) => {
                let node = &mut self.nodes[id.0];
                node.global = Links::to_self(id);
                node.user = Links::to_self(id);
                node.payload = payload;
                id
            }
            None => {
                let id = NodeId(self.nodes.len());
                self.nodes.push(Node {
                    global: Links::to_self(id),
                    user: Links::to_self(id),
                    payload,
                });
                id
            }
        }
    }

    /// Returns a detached node's slot to the free list.
    pub(crate) fn release(&mut self, id: NodeId) -> Payload {
        debug_assert_ne!(id, GLOBAL_HEAD, "global sentinel is never released");
        debug_assert!(self.is_detached(id), "released node is still linked");
        self.free.push(id);
        std::mem::replace(&mut self.nodes[id.0].payload, Payload::Vacant)
    }

    pub(crate) fn payload(&self, id: NodeId) -> &Payload {
        &self.nodes[id.0].payload
    }

    /// Links `id` just before `head`, i.e. at the newest end of the ring.
    pub(crate) fn push_back(&mut self, ring: Ring, head: NodeId, id: NodeId) {
        let last = self.links(ring, head).prev;
        *self.links_mut(ring, id) = Links {
            prev: last,
            next: head,
        };
        self.links_mut(ring, last).next = id;
        self.links_mut(ring, head).prev = id;
    }

    /// Splices `id` out of `ring` and leaves it pointing at itself.
    pub(crate) fn unlink(&mut self, ring: Ring, id: NodeId) {
        let Links { prev, next } = self.links(ring, id);
        self.links_mut(ring, prev).next = next;
        self.links_mut(ring, next).prev = prev;
        *self.links_mut(ring, id) = Links::to_self(id);
    }

    /// Oldest node of the ring anchored at `head`, if any.
    pub(crate) fn first(&self, ring: Ring, head: NodeId) -> Option<NodeId> {
        let next = self.links(ring, head).next;
        (next != head).then_some(next)
    }

    pub(crate) fn is_ring_empty(&self, ring: Ring, head: NodeId) -> bool {
        self.first(ring, head).is_none()
    }

    /// Walks the ring anchored at `head` from oldest to newest.
    pub(crate) fn iter(&self, ring: Ring, head: NodeId) -> RingIter<'_> {
        RingIter {
            arena: self,
            ring,
            head,
            cursor: self.links(ring, head).next,
        }
    }

    /// Verifies that `prev`/`next` agree in both directions around a ring.
    pub(crate) fn ring_is_well_formed(&self, ring: Ring, head: NodeId) -> bool {
        let mut cursor = head;
        for _ in 0..=self.nodes.len() {
            let next = self.links(ring, cursor).next;
            if self.links(ring, next).prev != cursor {
                return false;
            }
            cursor = next;
            if cursor == head {
                return true;
            }
        }
        false
    }

    pub(crate) fn slots(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn vacant_slots(&self) -> usize {
        self.free.len()
    }

    fn is_detached(&self, id: NodeId) -> bool {
        let node = &self.nodes[id.0];
        node.global.next == id && node.global.prev == id && node.user.next == id && node.user.prev == id
    }

    fn links(&self, ring: Ring, id: NodeId) -> Links {
        let node = &self.nodes[id.0];
        match ring {
            Ring::Global => node.global,
            Ring::User => node.user,
        }
    }

    fn links_mut(&mut self, ring: Ring, id: NodeId) -> &mut Links {
        let node = &mut self.nodes[id.0];
        match ring {
            Ring::Global => &mut node.global,
            Ring::User => &mut node.user,
        }
    }
}

pub(crate) struct RingIter<'a> {
    arena: &'a Arena,
    ring: Ring,
    head: NodeId,
    cursor: NodeId,
}

impl Iterator for RingIter<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor == self.head {
            return None;
        }
        let current = self.cursor;
        self.cursor = self.arena.links(self.ring, current).next;
        Some(current)
    }
}
