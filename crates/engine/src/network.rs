//! Declarative network construction and eager validation.
//!
//! Chains are built downstream-first: a module names its downstream
//! target(s) at construction time. Cycles (decide loop-backs) use
//! [`NetworkBuilder::reserve`] to obtain an id before the module body is
//! defined. `build()` validates the whole graph before anything runs.

use crate::error::BuildError;
use crate::generators::Distribution;
use crate::module::{ArrivalSpec, BatchKey, Branch, Condition, DecideRule, Module, ModuleKind};
use millrace_types::{ModuleId, ResourceId};
use std::collections::HashSet;

/// Declared resource pool: a name and a positive capacity.
#[derive(Debug, Clone)]
pub struct ResourceSpec {
    /// Pool name, unique within the network.
    pub name: String,
    /// Number of identical capacity units.
    pub capacity: u32,
}

/// A validated, immutable module network.
///
/// The topology is shared by every replication; all mutable run state
/// (pools, buffers, collector) is rebuilt per replication.
#[derive(Debug, Clone)]
pub struct Network {
    modules: Vec<Module>,
    resources: Vec<ResourceSpec>,
    roots: Vec<ModuleId>,
}

impl Network {
    /// All modules, indexed by [`ModuleId`].
    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    /// Look up a module.
    pub fn module(&self, id: ModuleId) -> &Module {
        &self.modules[id.index()]
    }

    /// All declared resources, indexed by [`ResourceId`].
    pub fn resources(&self) -> &[ResourceSpec] {
        &self.resources
    }

    /// Arrival modules, in declaration order.
    pub fn roots(&self) -> &[ModuleId] {
        &self.roots
    }
}

/// Builder for a [`Network`].
#[derive(Debug, Default)]
pub struct NetworkBuilder {
    slots: Vec<(String, Option<ModuleKind>)>,
    resources: Vec<ResourceSpec>,
}

impl NetworkBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a resource pool.
    pub fn resource(&mut self, name: impl Into<String>, capacity: u32) -> ResourceId {
        let id = ResourceId(self.resources.len() as u32);
        self.resources.push(ResourceSpec {
            name: name.into(),
            capacity,
        });
        id
    }

    /// Reserve a module id without defining its behavior yet.
    ///
    /// Needed for loop-backs, where a decide branch targets a module that
    /// is defined later. Every reserved slot must be filled via
    /// [`NetworkBuilder::define`] before `build()`.
    pub fn reserve(&mut self, name: impl Into<String>) -> ModuleId {
        let id = ModuleId(self.slots.len() as u32);
        self.slots.push((name.into(), None));
        id
    }

    /// Fill a reserved slot with its behavior.
    pub fn define(&mut self, id: ModuleId, kind: ModuleKind) {
        self.slots[id.index()].1 = Some(kind);
    }

    fn add(&mut self, name: impl Into<String>, kind: ModuleKind) -> ModuleId {
        let id = self.reserve(name);
        self.define(id, kind);
        id
    }

    /// Add an arrival module.
    pub fn arrival(&mut self, name: impl Into<String>, spec: ArrivalSpec, next: ModuleId) -> ModuleId {
        self.add(name, ModuleKind::Arrival { spec, next })
    }

    /// Add a process module backed by a resource.
    pub fn process(
        &mut self,
        name: impl Into<String>,
        resource: ResourceId,
        service: Distribution,
        next: ModuleId,
    ) -> ModuleId {
        self.add(
            name,
            ModuleKind::Process {
                resource,
                service,
                next,
            },
        )
    }

    /// Add a decide module with weighted random branches.
    pub fn decide_by_chance(&mut self, name: impl Into<String>, branches: Vec<Branch>) -> ModuleId {
        self.add(
            name,
            ModuleKind::Decide {
                rule: DecideRule::Chance(branches),
            },
        )
    }

    /// Add a decide module routing on entity conditions.
    ///
    /// `otherwise` is mandatory, so routing is total by construction.
    pub fn decide_by_condition(
        &mut self,
        name: impl Into<String>,
        cases: Vec<(Condition, ModuleId)>,
        otherwise: ModuleId,
    ) -> ModuleId {
        self.add(
            name,
            ModuleKind::Decide {
                rule: DecideRule::Condition { cases, otherwise },
            },
        )
    }

    /// Add a batch module.
    pub fn batch(
        &mut self,
        name: impl Into<String>,
        size: usize,
        key: BatchKey,
        next: ModuleId,
    ) -> ModuleId {
        self.add(name, ModuleKind::Batch { size, key, next })
    }

    /// Add a terminal dispose module.
    pub fn dispose(&mut self, name: impl Into<String>) -> ModuleId {
        self.add(name, ModuleKind::Dispose)
    }

    /// Validate the graph and produce an immutable [`Network`].
    pub fn build(self) -> Result<Network, BuildError> {
        let mut modules = Vec::with_capacity(self.slots.len());
        for (name, kind) in self.slots {
            let kind = kind.ok_or_else(|| BuildError::UndefinedModule(name.clone()))?;
            modules.push(Module { name, kind });
        }

        let mut seen = HashSet::new();
        for module in &modules {
            if !seen.insert(module.name.as_str()) {
                return Err(BuildError::DuplicateModule(module.name.clone()));
            }
        }
        let mut seen = HashSet::new();
        for resource in &self.resources {
            if !seen.insert(resource.name.as_str()) {
                return Err(BuildError::DuplicateResource(resource.name.clone()));
            }
            if resource.capacity == 0 {
                return Err(BuildError::NonPositiveCapacity {
                    resource: resource.name.clone(),
                });
            }
        }

        for module in &modules {
            validate_module(module, &modules, &self.resources)?;
        }

        let roots: Vec<ModuleId> = modules
            .iter()
            .enumerate()
            .filter(|(_, m)| matches!(m.kind, ModuleKind::Arrival { .. }))
            .map(|(i, _)| ModuleId(i as u32))
            .collect();
        if roots.is_empty() {
            return Err(BuildError::NoArrivals);
        }

        // Arrivals are roots: nothing may route into them.
        for module in &modules {
            for target in module.kind.downstream() {
                if matches!(modules[target.index()].kind, ModuleKind::Arrival { .. }) {
                    return Err(BuildError::ArrivalHasUpstream {
                        module: modules[target.index()].name.clone(),
                    });
                }
            }
        }

        // Every module must be reachable from some arrival.
        let reachable = reach_forward(&modules, &roots);
        if let Some(orphan) = (0..modules.len()).find(|i| !reachable.contains(i)) {
            return Err(BuildError::UnreachableModule {
                module: modules[orphan].name.clone(),
            });
        }

        // Every module must have a path to a dispose module.
        let draining = reach_backward(&modules);
        if let Some(stuck) = (0..modules.len()).find(|i| !draining.contains(i)) {
            return Err(BuildError::NoDisposeReachable {
                module: modules[stuck].name.clone(),
            });
        }

        Ok(Network {
            modules,
            resources: self.resources,
            roots,
        })
    }
}

fn validate_module(
    module: &Module,
    modules: &[Module],
    resources: &[ResourceSpec],
) -> Result<(), BuildError> {
    for target in module.kind.downstream() {
        if target.index() >= modules.len() {
            return Err(BuildError::UnknownModule {
                module: module.name.clone(),
                target,
            });
        }
    }

    match &module.kind {
        ModuleKind::Arrival { spec, .. } => {
            if spec.entities_per_arrival == 0 {
                return Err(BuildError::ZeroEntitiesPerArrival {
                    module: module.name.clone(),
                });
            }
            spec.interarrival
                .validate()
                .map_err(|reason| BuildError::InvalidDistribution {
                    module: module.name.clone(),
                    reason,
                })?;
        }
        ModuleKind::Process {
            resource, service, ..
        } => {
            if resource.index() >= resources.len() {
                return Err(BuildError::UnknownResource {
                    module: module.name.clone(),
                    resource: resource.to_string(),
                });
            }
            service
                .validate()
                .map_err(|reason| BuildError::InvalidDistribution {
                    module: module.name.clone(),
                    reason,
                })?;
        }
        ModuleKind::Decide {
            rule: DecideRule::Chance(branches),
        } => {
            if branches.is_empty() {
                return Err(BuildError::NoBranches {
                    module: module.name.clone(),
                });
            }
            let mut total = 0.0;
            for branch in branches {
                if !branch.weight.is_finite() || branch.weight < 0.0 {
                    return Err(BuildError::InvalidBranchWeights {
                        module: module.name.clone(),
                        reason: format!("weight {} is not a finite non-negative number", branch.weight),
                    });
                }
                total += branch.weight;
            }
            if total <= 0.0 {
                return Err(BuildError::InvalidBranchWeights {
                    module: module.name.clone(),
                    reason: "weights sum to zero".into(),
                });
            }
        }
        ModuleKind::Decide {
            rule: DecideRule::Condition { .. },
        } => {
            // Totality is guaranteed by the mandatory `otherwise` branch.
        }
        ModuleKind::Batch { size, .. } => {
            if *size == 0 {
                return Err(BuildError::ZeroBatchSize {
                    module: module.name.clone(),
                });
            }
        }
        ModuleKind::Dispose => {}
    }
    Ok(())
}

/// Indices reachable from the roots following downstream edges.
fn reach_forward(modules: &[Module], roots: &[ModuleId]) -> HashSet<usize> {
    let mut visited = HashSet::new();
    let mut stack: Vec<usize> = roots.iter().map(|r| r.index()).collect();
    while let Some(i) = stack.pop() {
        if !visited.insert(i) {
            continue;
        }
        for target in modules[i].kind.downstream() {
            stack.push(target.index());
        }
    }
    visited
}

/// Indices from which some dispose module is reachable.
fn reach_backward(modules: &[Module]) -> HashSet<usize> {
    let mut upstream: Vec<Vec<usize>> = vec![Vec::new(); modules.len()];
    for (i, module) in modules.iter().enumerate() {
        for target in module.kind.downstream() {
            upstream[target.index()].push(i);
        }
    }
    let mut visited = HashSet::new();
    let mut stack: Vec<usize> = modules
        .iter()
        .enumerate()
        .filter(|(_, m)| matches!(m.kind, ModuleKind::Dispose))
        .map(|(i, _)| i)
        .collect();
    while let Some(i) = stack.pop() {
        if !visited.insert(i) {
            continue;
        }
        for &source in &upstream[i] {
            stack.push(source);
        }
    }
    visited
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant(value: f64) -> Distribution {
        Distribution::Constant(value)
    }

    #[test]
    fn test_straight_chain_builds() {
        let mut net = NetworkBuilder::new();
        let server = net.resource("server", 2);
        let done = net.dispose("done");
        let station = net.process("station", server, constant(1.0), done);
        net.arrival("orders", ArrivalSpec::new("order", constant(1.0)), station);

        let network = net.build().unwrap();
        assert_eq!(network.modules().len(), 3);
        assert_eq!(network.roots().len(), 1);
    }

    #[test]
    fn test_loop_back_via_reserved_slot() {
        let mut net = NetworkBuilder::new();
        let server = net.resource("server", 1);
        let done = net.dispose("done");
        let station = net.reserve("station");
        let check = net.decide_by_chance(
            "check",
            vec![Branch::new(0.2, station), Branch::new(0.8, done)],
        );
        net.define(
            station,
            ModuleKind::Process {
                resource: server,
                service: constant(1.0),
                next: check,
            },
        );
        net.arrival("orders", ArrivalSpec::new("order", constant(1.0)), station);

        assert!(net.build().is_ok());
    }

    #[test]
    fn test_undefined_slot_rejected() {
        let mut net = NetworkBuilder::new();
        let hole = net.reserve("hole");
        net.arrival("orders", ArrivalSpec::new("order", constant(1.0)), hole);
        assert!(matches!(net.build(), Err(BuildError::UndefinedModule(_))));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let mut net = NetworkBuilder::new();
        let server = net.resource("server", 0);
        let done = net.dispose("done");
        let station = net.process("station", server, constant(1.0), done);
        net.arrival("orders", ArrivalSpec::new("order", constant(1.0)), station);
        assert!(matches!(
            net.build(),
            Err(BuildError::NonPositiveCapacity { .. })
        ));
    }

    #[test]
    fn test_negative_constant_interarrival_rejected_at_build() {
        let mut net = NetworkBuilder::new();
        let done = net.dispose("done");
        net.arrival("orders", ArrivalSpec::new("order", constant(-1.0)), done);
        assert!(matches!(
            net.build(),
            Err(BuildError::InvalidDistribution { .. })
        ));
    }

    #[test]
    fn test_negative_service_bound_rejected_at_build() {
        let mut net = NetworkBuilder::new();
        let server = net.resource("server", 1);
        let done = net.dispose("done");
        let station = net.process(
            "station",
            server,
            Distribution::Uniform {
                low: -0.5,
                high: 1.0,
            },
            done,
        );
        net.arrival("orders", ArrivalSpec::new("order", constant(1.0)), station);
        assert!(matches!(
            net.build(),
            Err(BuildError::InvalidDistribution { .. })
        ));
    }

    #[test]
    fn test_no_arrival_rejected() {
        let mut net = NetworkBuilder::new();
        net.dispose("done");
        assert!(matches!(net.build(), Err(BuildError::NoArrivals)));
    }

    #[test]
    fn test_orphan_module_rejected() {
        let mut net = NetworkBuilder::new();
        let done = net.dispose("done");
        net.arrival("orders", ArrivalSpec::new("order", constant(1.0)), done);
        // Declared but connected to nothing upstream.
        let lonely_done = net.dispose("lonely-done");
        net.batch("lonely", 2, BatchKey::None, lonely_done);
        assert!(matches!(
            net.build(),
            Err(BuildError::UnreachableModule { .. })
        ));
    }

    #[test]
    fn test_cycle_without_dispose_rejected() {
        let mut net = NetworkBuilder::new();
        let server = net.resource("server", 1);
        let station = net.reserve("station");
        let check = net.decide_by_chance("check", vec![Branch::new(1.0, station)]);
        net.define(
            station,
            ModuleKind::Process {
                resource: server,
                service: constant(1.0),
                next: check,
            },
        );
        net.arrival("orders", ArrivalSpec::new("order", constant(1.0)), station);
        assert!(matches!(
            net.build(),
            Err(BuildError::NoDisposeReachable { .. })
        ));
    }

    #[test]
    fn test_bad_branch_weights_rejected() {
        let mut net = NetworkBuilder::new();
        let done = net.dispose("done");
        let check = net.decide_by_chance(
            "check",
            vec![Branch::new(0.0, done), Branch::new(0.0, done)],
        );
        net.arrival("orders", ArrivalSpec::new("order", constant(1.0)), check);
        assert!(matches!(
            net.build(),
            Err(BuildError::InvalidBranchWeights { .. })
        ));
    }

    #[test]
    fn test_edge_into_arrival_rejected() {
        let mut net = NetworkBuilder::new();
        let done = net.dispose("done");
        let orders = net.arrival("orders", ArrivalSpec::new("order", constant(1.0)), done);
        net.arrival("more-orders", ArrivalSpec::new("order", constant(1.0)), orders);
        assert!(matches!(
            net.build(),
            Err(BuildError::ArrivalHasUpstream { .. })
        ));
    }

    #[test]
    fn test_shared_dispose_is_allowed() {
        let mut net = NetworkBuilder::new();
        let done = net.dispose("done");
        let check = net.decide_by_chance(
            "check",
            vec![Branch::new(0.5, done), Branch::new(0.5, done)],
        );
        net.arrival("a", ArrivalSpec::new("order", constant(1.0)), check);
        net.arrival("b", ArrivalSpec::new("part", constant(2.0)), done);
        assert!(net.build().is_ok());
    }
}
