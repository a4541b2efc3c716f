//! Event queue keys with deterministic ordering.

use millrace_types::{Entity, ModuleId};
use std::cmp::Ordering;
use std::time::Duration;

/// Key for ordering events in the queue.
///
/// Events are ordered by:
/// 1. Time (earlier first)
/// 2. Sequence number (FIFO for the same time)
///
/// The sequence number is assigned at scheduling time and strictly
/// increases, so ties in time always resolve in scheduling order. That is
/// what keeps replications reproducible under a fixed seed.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct EventKey {
    /// When this event should be processed.
    pub time: Duration,
    /// Sequence number for deterministic FIFO ordering.
    pub sequence: u64,
}

impl Ord for EventKey {
    fn cmp(&self, other: &Self) -> Ordering {
        // Order by time first
        match self.time.cmp(&other.time) {
            Ordering::Equal => {}
            ord => return ord,
        }

        // Then by sequence (FIFO)
        self.sequence.cmp(&other.sequence)
    }
}

impl PartialOrd for EventKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// An event bound to a module, carried in the queue.
#[derive(Debug)]
pub enum SimEvent {
    /// An arrival module fires: create entities, then self-reschedule.
    Arrival {
        /// The arrival module.
        module: ModuleId,
    },
    /// A process module finishes serving an entity: release the resource
    /// (handing the freed unit to the queue head) and forward downstream.
    ServiceDone {
        /// The process module.
        module: ModuleId,
        /// The entity whose service completed.
        entity: Entity,
    },
}
