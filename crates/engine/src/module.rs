//! Module variants making up a processing network.
//!
//! The variants form a closed set behind one dispatch point in the
//! environment, so chain validation can be exhaustive at build time.

use crate::generators::Distribution;
use millrace_types::{AttrValue, Entity, ModuleId, ResourceId};
use std::time::Duration;

/// A named network node.
#[derive(Debug, Clone)]
pub struct Module {
    /// Name, unique within the network.
    pub name: String,
    /// Behavior variant.
    pub kind: ModuleKind,
}

/// Behavior of a module.
#[derive(Debug, Clone)]
pub enum ModuleKind {
    /// Generates entities and keeps the run alive by self-rescheduling.
    Arrival {
        /// Arrival configuration.
        spec: ArrivalSpec,
        /// Downstream module.
        next: ModuleId,
    },
    /// Seizes one unit of a resource, holds for a sampled service time,
    /// then releases and forwards.
    Process {
        /// Resource pool backing this station.
        resource: ResourceId,
        /// Service-time source.
        service: Distribution,
        /// Downstream module.
        next: ModuleId,
    },
    /// Routes each entity to exactly one downstream branch.
    Decide {
        /// Branch-selection rule.
        rule: DecideRule,
    },
    /// Accumulates entities and forwards one aggregate per full batch.
    Batch {
        /// Entities per aggregate.
        size: usize,
        /// Grouping key for separate accumulation buffers.
        key: BatchKey,
        /// Downstream module.
        next: ModuleId,
    },
    /// Terminal sink: freezes the entity into a metrics row.
    Dispose,
}

impl ModuleKind {
    /// Downstream edges of this module, for graph validation.
    pub fn downstream(&self) -> Vec<ModuleId> {
        match self {
            ModuleKind::Arrival { next, .. }
            | ModuleKind::Process { next, .. }
            | ModuleKind::Batch { next, .. } => vec![*next],
            ModuleKind::Decide { rule } => rule.targets(),
            ModuleKind::Dispose => Vec::new(),
        }
    }
}

/// Configuration for an arrival module.
#[derive(Debug, Clone)]
pub struct ArrivalSpec {
    /// Type label stamped on generated entities.
    pub entity_type: String,
    /// Interarrival-time source.
    pub interarrival: Distribution,
    /// Offset of the first arrival from the start of the replication.
    pub first_arrival: Duration,
    /// Entities created per firing.
    pub entities_per_arrival: u32,
    /// Cap on the number of firings, `None` for unbounded.
    pub max_arrivals: Option<u64>,
}

impl ArrivalSpec {
    /// Create an arrival spec with one entity per firing, starting at time
    /// zero, unbounded.
    pub fn new(entity_type: impl Into<String>, interarrival: Distribution) -> Self {
        Self {
            entity_type: entity_type.into(),
            interarrival,
            first_arrival: Duration::ZERO,
            entities_per_arrival: 1,
            max_arrivals: None,
        }
    }

    /// Set the offset of the first arrival.
    pub fn with_first_arrival(mut self, at: Duration) -> Self {
        self.first_arrival = at;
        self
    }

    /// Set the number of entities created per firing.
    pub fn with_entities_per_arrival(mut self, n: u32) -> Self {
        self.entities_per_arrival = n;
        self
    }

    /// Cap the number of firings.
    pub fn with_max_arrivals(mut self, n: u64) -> Self {
        self.max_arrivals = Some(n);
        self
    }
}

/// How a decide module selects a branch.
#[derive(Debug, Clone)]
pub enum DecideRule {
    /// Weighted random selection, one draw per entity.
    Chance(Vec<Branch>),
    /// First matching condition wins; `otherwise` catches the rest, so
    /// every entity routes somewhere by construction.
    Condition {
        /// Ordered condition cases.
        cases: Vec<(Condition, ModuleId)>,
        /// Fallback branch.
        otherwise: ModuleId,
    },
}

impl DecideRule {
    /// All branch targets.
    pub fn targets(&self) -> Vec<ModuleId> {
        match self {
            DecideRule::Chance(branches) => branches.iter().map(|b| b.next).collect(),
            DecideRule::Condition { cases, otherwise } => {
                let mut targets: Vec<ModuleId> = cases.iter().map(|(_, next)| *next).collect();
                targets.push(*otherwise);
                targets
            }
        }
    }
}

/// One weighted branch of a chance decide.
#[derive(Debug, Clone)]
pub struct Branch {
    /// Relative weight; weights need not sum to one.
    pub weight: f64,
    /// Branch target.
    pub next: ModuleId,
}

impl Branch {
    /// Create a branch.
    pub fn new(weight: f64, next: ModuleId) -> Self {
        Self { weight, next }
    }
}

/// A boolean test against an entity.
#[derive(Debug, Clone)]
pub enum Condition {
    /// Attribute equals the given value. Missing attribute: no match.
    AttrEquals {
        /// Attribute key.
        key: String,
        /// Expected value.
        value: AttrValue,
    },
    /// Numeric attribute is at least the threshold. Missing or
    /// non-numeric attribute: no match.
    AttrAtLeast {
        /// Attribute key.
        key: String,
        /// Inclusive lower bound.
        threshold: f64,
    },
    /// Entity type equals the given label.
    TypeIs(String),
}

impl Condition {
    /// Evaluate the condition against an entity.
    pub fn matches(&self, entity: &Entity) -> bool {
        match self {
            Condition::AttrEquals { key, value } => entity.attr(key) == Some(value),
            Condition::AttrAtLeast { key, threshold } => entity
                .attr(key)
                .and_then(AttrValue::as_real)
                .is_some_and(|v| v >= *threshold),
            Condition::TypeIs(label) => entity.entity_type == *label,
        }
    }
}

/// Grouping key for batch accumulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchKey {
    /// One shared buffer for all entities.
    None,
    /// One buffer per entity type.
    EntityType,
}
