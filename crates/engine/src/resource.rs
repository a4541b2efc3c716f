//! Resource pools: finite capacity, FIFO waiting, busy-time accounting.

use crate::error::SimError;
use crate::network::ResourceSpec;
use millrace_types::{Entity, ModuleId};
use std::collections::VecDeque;
use std::time::Duration;

/// An entity blocked on a full pool, with the continuation it resumes at.
#[derive(Debug)]
pub struct Waiter {
    /// The blocked entity.
    pub entity: Entity,
    /// The process module the entity was trying to seize for.
    pub module: ModuleId,
    /// When the entity joined the queue.
    pub enqueued_at: Duration,
}

/// Summary statistics for one pool over a finished replication.
#[derive(Debug, Clone, Copy)]
pub struct ResourceStats {
    /// Busy-unit-time integral normalized by capacity and elapsed time.
    pub utilization: f64,
    /// Time-average number of busy units.
    pub busy_avg: f64,
    /// Time-average queue length.
    pub queue_avg: f64,
    /// Peak queue length.
    pub queue_peak: usize,
    /// Mean wait of entities that got through the queue.
    pub wait_avg: f64,
    /// Successful seizes.
    pub seizes: u64,
}

/// Runtime state of one resource pool within a replication.
///
/// Invariants: `0 <= seized <= capacity` at every instant, and the wait
/// queue is non-empty only while `seized == capacity`. Violations surface
/// as [`SimError`]s, never as silent clamps.
#[derive(Debug)]
pub struct ResourcePool {
    name: String,
    capacity: u32,
    seized: u32,
    waiting: VecDeque<Waiter>,

    // Time-weighted accumulators, advanced before every state change.
    last_change: Duration,
    busy_seconds: f64,
    queue_seconds: f64,

    queue_peak: usize,
    seizes: u64,
    waits_served: u64,
    wait_seconds: f64,
}

impl ResourcePool {
    /// Create an idle pool from its declaration.
    pub fn new(spec: &ResourceSpec) -> Self {
        Self {
            name: spec.name.clone(),
            capacity: spec.capacity,
            seized: 0,
            waiting: VecDeque::new(),
            last_change: Duration::ZERO,
            busy_seconds: 0.0,
            queue_seconds: 0.0,
            queue_peak: 0,
            seizes: 0,
            waits_served: 0,
            wait_seconds: 0.0,
        }
    }

    /// Pool name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Units currently seized.
    pub fn seized(&self) -> u32 {
        self.seized
    }

    /// Total capacity.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Entities currently waiting.
    pub fn queue_len(&self) -> usize {
        self.waiting.len()
    }

    /// Seize one unit if capacity is available.
    ///
    /// Returns `Ok(true)` on success, `Ok(false)` if the pool is full and
    /// the caller must enqueue instead.
    pub fn try_seize(&mut self, now: Duration) -> Result<bool, SimError> {
        self.check_invariant()?;
        if self.seized == self.capacity {
            return Ok(false);
        }
        self.advance(now);
        self.seized += 1;
        self.seizes += 1;
        Ok(true)
    }

    /// Append a blocked entity to the FIFO wait queue.
    ///
    /// Callers only enqueue after `try_seize` returned false, so the queue
    /// is non-empty only at full capacity.
    pub fn enqueue(&mut self, waiter: Waiter, now: Duration) {
        self.advance(now);
        self.waiting.push_back(waiter);
        self.queue_peak = self.queue_peak.max(self.waiting.len());
    }

    /// Release one unit and, if anyone is waiting, seize it again on
    /// behalf of the queue head within this same call.
    ///
    /// The handoff is indivisible with respect to simulated time: no event
    /// can observe the freed unit between the release and the head's
    /// seize, so FIFO order cannot be jumped.
    pub fn release(&mut self, now: Duration) -> Result<Option<Waiter>, SimError> {
        if self.seized == 0 {
            return Err(SimError::ReleaseUnderflow {
                resource: self.name.clone(),
            });
        }
        self.advance(now);
        self.seized -= 1;

        let Some(waiter) = self.waiting.pop_front() else {
            return Ok(None);
        };
        self.seized += 1;
        self.seizes += 1;
        self.waits_served += 1;
        self.wait_seconds += now.saturating_sub(waiter.enqueued_at).as_secs_f64();
        Ok(Some(waiter))
    }

    /// Close the integrals at `end` and summarize.
    pub fn finalize(&mut self, end: Duration) -> ResourceStats {
        self.advance(end);
        let elapsed = end.as_secs_f64();
        let (busy_avg, queue_avg, utilization) = if elapsed > 0.0 {
            let busy_avg = self.busy_seconds / elapsed;
            (
                busy_avg,
                self.queue_seconds / elapsed,
                busy_avg / self.capacity as f64,
            )
        } else {
            (0.0, 0.0, 0.0)
        };
        ResourceStats {
            utilization,
            busy_avg,
            queue_avg,
            queue_peak: self.queue_peak,
            wait_avg: if self.waits_served > 0 {
                self.wait_seconds / self.waits_served as f64
            } else {
                0.0
            },
            seizes: self.seizes,
        }
    }

    fn advance(&mut self, now: Duration) {
        let dt = now.saturating_sub(self.last_change).as_secs_f64();
        self.busy_seconds += self.seized as f64 * dt;
        self.queue_seconds += self.waiting.len() as f64 * dt;
        self.last_change = now;
    }

    fn check_invariant(&self) -> Result<(), SimError> {
        if self.seized > self.capacity {
            return Err(SimError::SeizeOverflow {
                resource: self.name.clone(),
                seized: self.seized,
                capacity: self.capacity,
            });
        }
        Ok(())
    }
}
