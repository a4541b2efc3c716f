//! Replication runner.
//!
//! The [`Environment`] owns the immutable network topology and the base
//! seed. Each replication builds fresh mutable state (event queue, resource
//! pools, batch buffers, collector), seeds the arrival events, and drains
//! the queue in deterministic (time, sequence) order until the configured
//! duration. Given the same seed, a replication produces identical results
//! every run.

use crate::error::SimError;
use crate::event_queue::{EventKey, SimEvent};
use crate::generators::Distribution;
use crate::module::{BatchKey, DecideRule, ModuleKind};
use crate::network::Network;
use crate::resource::{ResourcePool, Waiter};
use crate::stats::Collector;
use indexmap::IndexMap;
use millrace_types::{Entity, EntityId, EntityRecord, ModuleId};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info, trace};

/// Counters collected while a replication runs.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct RunStats {
    /// Total events processed.
    pub events_processed: u64,
    /// Arrival firings.
    pub arrivals_fired: u64,
    /// Entities created by arrivals.
    pub entities_created: u64,
    /// Entities frozen into metrics rows.
    pub entities_disposed: u64,
    /// Successful resource seizes (immediate or via handoff).
    pub seizes: u64,
    /// Entities that had to join a wait queue.
    pub waits_queued: u64,
    /// Resource releases.
    pub releases: u64,
    /// Batch aggregates formed.
    pub batches_formed: u64,
    /// Decide branch selections.
    pub branch_draws: u64,
}

/// Result of one replication.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    /// System variables: counters plus time-weighted averages and peaks.
    pub system_variables: BTreeMap<String, f64>,
    /// One frozen row per disposed entity.
    pub entity_metrics: Vec<EntityRecord>,
    /// Raw engine counters.
    pub stats: RunStats,
}

/// A configured simulation: immutable topology plus a base seed.
///
/// `run_simulation` and `run_replication` may be called any number of
/// times; replications share nothing but the topology and the seed
/// derivation, so each is statistically independent and individually
/// reproducible.
#[derive(Debug, Clone)]
pub struct Environment {
    network: Network,
    seed: u64,
}

impl Environment {
    /// Create an environment from a validated network.
    pub fn new(network: Network, seed: u64) -> Self {
        Self { network, seed }
    }

    /// The network topology.
    pub fn network(&self) -> &Network {
        &self.network
    }

    /// Run one replication over `[0, duration)` using the base seed.
    ///
    /// Calling this twice yields bit-identical reports. For independent
    /// replications use [`Environment::run_replication`].
    pub fn run_simulation(&self, duration: Duration) -> Result<RunReport, SimError> {
        self.run_replication(duration, 0)
    }

    /// Run the replication with the given index.
    ///
    /// Replication 0 uses the base seed directly; higher indices derive an
    /// independent seed, so the same (seed, index) pair always reproduces
    /// the same report.
    pub fn run_replication(
        &self,
        duration: Duration,
        replication: u64,
    ) -> Result<RunReport, SimError> {
        let seed = derive_seed(self.seed, replication);
        info!(
            modules = self.network.modules().len(),
            resources = self.network.resources().len(),
            seed,
            replication,
            duration_secs = duration.as_secs_f64(),
            "Starting replication"
        );

        let mut run = Replication::new(&self.network, seed);
        run.seed_arrivals();
        run.drain(duration)?;
        Ok(run.finalize(duration))
    }
}

/// Derive the seed for a replication index.
fn derive_seed(base: u64, replication: u64) -> u64 {
    if replication == 0 {
        base
    } else {
        base.wrapping_add(replication)
            .wrapping_mul(0x517cc1b727220a95)
    }
}

/// Per-batch-module accumulation buffers, one per group key.
#[derive(Debug, Default)]
struct BatchBuffer {
    groups: IndexMap<String, Vec<Entity>>,
}

/// All mutable state of one replication.
struct Replication<'a> {
    net: &'a Network,
    queue: BTreeMap<EventKey, SimEvent>,
    sequence: u64,
    now: Duration,
    rng: ChaCha8Rng,
    pools: Vec<ResourcePool>,
    batches: Vec<BatchBuffer>,
    collector: Collector,
    stats: RunStats,
    next_entity: EntityId,
    arrivals_fired: Vec<u64>,
}

impl<'a> Replication<'a> {
    fn new(net: &'a Network, seed: u64) -> Self {
        Self {
            net,
            queue: BTreeMap::new(),
            sequence: 0,
            now: Duration::ZERO,
            rng: ChaCha8Rng::seed_from_u64(seed),
            pools: net.resources().iter().map(ResourcePool::new).collect(),
            batches: net.modules().iter().map(|_| BatchBuffer::default()).collect(),
            collector: Collector::new(),
            stats: RunStats::default(),
            next_entity: EntityId::FIRST,
            arrivals_fired: vec![0; net.modules().len()],
        }
    }

    /// Schedule each arrival module's first firing.
    ///
    /// Roots are seeded in declaration order, so simultaneous first
    /// arrivals resolve deterministically.
    fn seed_arrivals(&mut self) {
        let net = self.net;
        for &root in net.roots() {
            let ModuleKind::Arrival { spec, .. } = &net.module(root).kind else {
                continue;
            };
            if spec.max_arrivals == Some(0) {
                continue;
            }
            self.schedule(spec.first_arrival, SimEvent::Arrival { module: root });
        }
    }

    /// Drain events in (time, sequence) order until `duration`.
    ///
    /// Events at or beyond `duration` are discarded unprocessed: entities
    /// still in flight at the cut-off are abandoned, not disposed.
    fn drain(&mut self, duration: Duration) -> Result<(), SimError> {
        while let Some((&key, _)) = self.queue.first_key_value() {
            if key.time >= duration {
                debug!(
                    remaining_events = self.queue.len(),
                    "Duration reached; discarding pending events"
                );
                break;
            }
            let Some((key, event)) = self.queue.pop_first() else {
                break;
            };
            if key.time < self.now {
                return Err(SimError::ClockWentBackwards {
                    now_secs: self.now.as_secs_f64(),
                    event_secs: key.time.as_secs_f64(),
                });
            }
            self.now = key.time;
            self.stats.events_processed += 1;
            trace!(time_secs = self.now.as_secs_f64(), "Processing event");

            match event {
                SimEvent::Arrival { module } => self.fire_arrival(module)?,
                SimEvent::ServiceDone { module, entity } => self.finish_service(module, entity)?,
            }
        }
        Ok(())
    }

    fn fire_arrival(&mut self, module: ModuleId) -> Result<(), SimError> {
        let net = self.net;
        let ModuleKind::Arrival { spec, next } = &net.module(module).kind else {
            return Err(SimError::StrayArrival {
                module: net.module(module).name.clone(),
            });
        };
        let next = *next;

        for _ in 0..spec.entities_per_arrival {
            let entity = Entity::new(self.next_entity, spec.entity_type.clone(), self.now);
            self.next_entity = self.next_entity.next();
            self.stats.entities_created += 1;
            self.collector.increment("entities.created", 1.0);
            self.collector.adjust_level("in_system", 1.0, self.now);
            self.deliver(entity, next)?;
        }

        self.stats.arrivals_fired += 1;
        self.arrivals_fired[module.index()] += 1;
        let exhausted = spec
            .max_arrivals
            .is_some_and(|max| self.arrivals_fired[module.index()] >= max);
        if !exhausted {
            let name = &net.module(module).name;
            let delay = self.sample_delay(name, &spec.interarrival)?;
            self.schedule(delay, SimEvent::Arrival { module });
        }
        Ok(())
    }

    fn finish_service(&mut self, module: ModuleId, entity: Entity) -> Result<(), SimError> {
        let net = self.net;
        let ModuleKind::Process { resource, next, .. } = &net.module(module).kind else {
            return Err(SimError::StrayServiceCompletion {
                module: net.module(module).name.clone(),
            });
        };
        let next = *next;

        // Release with atomic handoff: the queue head seizes the freed
        // unit before the finished entity moves on, so a downstream seize
        // of the same pool cannot jump the queue.
        self.stats.releases += 1;
        if let Some(waiter) = self.pools[resource.index()].release(self.now)? {
            self.stats.seizes += 1;
            self.start_service(waiter.module, waiter.entity)?;
        }

        self.deliver(entity, next)
    }

    /// Schedule the service completion for an entity that just seized.
    fn start_service(&mut self, module: ModuleId, entity: Entity) -> Result<(), SimError> {
        let net = self.net;
        let ModuleKind::Process { service, .. } = &net.module(module).kind else {
            return Err(SimError::StrayServiceCompletion {
                module: net.module(module).name.clone(),
            });
        };
        let delay = self.sample_delay(&net.module(module).name, service)?;
        self.schedule(delay, SimEvent::ServiceDone { module, entity });
        Ok(())
    }

    /// Walk an entity through modules until it parks (service hold, wait
    /// queue, batch buffer) or is disposed.
    fn deliver(&mut self, mut entity: Entity, mut target: ModuleId) -> Result<(), SimError> {
        let net = self.net;
        loop {
            let module = net.module(target);
            entity.record_visit(&module.name, self.now);

            match &module.kind {
                ModuleKind::Arrival { .. } => {
                    return Err(SimError::RoutedToArrival {
                        module: module.name.clone(),
                    });
                }
                ModuleKind::Process { resource, .. } => {
                    if self.pools[resource.index()].try_seize(self.now)? {
                        self.stats.seizes += 1;
                        self.start_service(target, entity)?;
                    } else {
                        self.stats.waits_queued += 1;
                        self.pools[resource.index()].enqueue(
                            Waiter {
                                entity,
                                module: target,
                                enqueued_at: self.now,
                            },
                            self.now,
                        );
                    }
                    return Ok(());
                }
                ModuleKind::Decide { rule } => {
                    self.stats.branch_draws += 1;
                    target = self.route(rule, &entity);
                }
                ModuleKind::Batch { size, key, next } => {
                    let group = match key {
                        BatchKey::None => String::new(),
                        BatchKey::EntityType => entity.entity_type.clone(),
                    };
                    let buffer = self.batches[target.index()]
                        .groups
                        .entry(group)
                        .or_default();
                    buffer.push(entity);
                    if buffer.len() < *size {
                        return Ok(());
                    }
                    let members = std::mem::take(buffer);
                    entity = self.form_aggregate(&module.name, members);
                    target = *next;
                }
                ModuleKind::Dispose => {
                    self.stats.entities_disposed += 1;
                    self.collector.record_disposal(entity, self.now);
                    return Ok(());
                }
            }
        }
    }

    /// Merge a full batch into one aggregate entity.
    ///
    /// The aggregate gets a fresh id, the first member's type label, and
    /// the members' attributes merged first-wins in arrival order.
    fn form_aggregate(&mut self, module_name: &str, members: Vec<Entity>) -> Entity {
        let size = members.len() as f64;
        let mut aggregate = Entity::new(
            self.next_entity,
            members[0].entity_type.clone(),
            self.now,
        );
        self.next_entity = self.next_entity.next();
        aggregate.record_visit(module_name, self.now);
        for member in members {
            aggregate.members.push(member.id);
            for (key, value) in member.attributes {
                aggregate.attributes.entry(key).or_insert(value);
            }
        }

        self.stats.batches_formed += 1;
        self.collector.increment("batches.formed", 1.0);
        self.collector.increment("entities.batched", size);
        // The members leave the system as individuals; the aggregate enters.
        self.collector.adjust_level("in_system", 1.0 - size, self.now);
        aggregate
    }

    /// Pick the branch for one entity.
    fn route(&mut self, rule: &DecideRule, entity: &Entity) -> ModuleId {
        match rule {
            DecideRule::Chance(branches) => {
                let total: f64 = branches.iter().map(|b| b.weight).sum();
                let draw = self.rng.gen::<f64>() * total;
                let mut acc = 0.0;
                let mut chosen = branches[0].next;
                for branch in branches {
                    if branch.weight <= 0.0 {
                        continue;
                    }
                    chosen = branch.next;
                    acc += branch.weight;
                    if draw < acc {
                        break;
                    }
                }
                chosen
            }
            DecideRule::Condition { cases, otherwise } => cases
                .iter()
                .find(|(condition, _)| condition.matches(entity))
                .map(|(_, next)| *next)
                .unwrap_or(*otherwise),
        }
    }

    fn sample_delay(&mut self, module: &str, dist: &Distribution) -> Result<Duration, SimError> {
        let seconds = dist.sample(&mut self.rng);
        // Rejects NaN, infinities, negatives, and values beyond Duration's
        // range, so the replication aborts instead of panicking on a
        // pathological sample.
        Duration::try_from_secs_f64(seconds).map_err(|_| SimError::InvalidDelay {
            module: module.to_owned(),
            seconds,
        })
    }

    fn schedule(&mut self, delay: Duration, event: SimEvent) -> EventKey {
        self.sequence += 1;
        let key = EventKey {
            time: self.now + delay,
            sequence: self.sequence,
        };
        self.queue.insert(key, event);
        key
    }

    /// Close all statistics at exactly `duration` and assemble the report.
    fn finalize(mut self, duration: Duration) -> RunReport {
        let (mut vars, records) = self.collector.finalize(duration);
        for pool in &mut self.pools {
            let stats = pool.finalize(duration);
            let name = pool.name().to_owned();
            vars.insert(format!("resource.{name}.utilization"), stats.utilization);
            vars.insert(format!("resource.{name}.busy.average"), stats.busy_avg);
            vars.insert(format!("resource.{name}.queue.average"), stats.queue_avg);
            vars.insert(
                format!("resource.{name}.queue.peak"),
                stats.queue_peak as f64,
            );
            vars.insert(format!("resource.{name}.wait.average"), stats.wait_avg);
            vars.insert(format!("resource.{name}.seizes"), stats.seizes as f64);
        }

        info!(
            events = self.stats.events_processed,
            created = self.stats.entities_created,
            disposed = self.stats.entities_disposed,
            "Replication complete"
        );

        RunReport {
            system_variables: vars,
            entity_metrics: records,
            stats: self.stats,
        }
    }
}
