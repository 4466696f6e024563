//! Process-local id allocation.

use std::sync::atomic::{AtomicU64, Ordering};

use aciport_core::AggregateId;

/// Monotonic numeric id allocator.
///
/// Certificate numbers embed the zero-padded request id, so aggregate ids are
/// plain sequential numbers rather than UUIDs. A durable backend would read
/// its seed from storage; the in-memory platform starts wherever it is told.
#[derive(Debug)]
pub struct IdSequence {
    next: AtomicU64,
}

impl IdSequence {
    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }

    pub fn next_id(&self) -> AggregateId {
        AggregateId::new(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for IdSequence {
    fn default() -> Self {
        Self::starting_at(1)
    }
}
