//! Entities and their frozen disposal records.

use crate::{AttrMap, AttrValue, EntityId};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One stop on an entity's path through the network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visit {
    /// Name of the module the entity entered.
    pub module: String,
    /// Simulated time of entry.
    pub at: Duration,
}

/// A unit of flow moving through a processing network.
///
/// Entities are owned by the network while in transit and mutated only by
/// the module currently handling them. Disposal converts an entity into an
/// immutable [`EntityRecord`]; after that it cannot reenter the network.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    /// Unique id within the replication.
    pub id: EntityId,
    /// Scenario-defined type label (e.g. "order", "part").
    pub entity_type: String,
    /// Simulated time the entity entered the network.
    pub created_at: Duration,
    /// Open attribute map for scenario-defined fields.
    pub attributes: AttrMap,
    /// Modules visited, in order, with entry timestamps.
    ///
    /// A decide loop-back appends the revisited modules again, so the log
    /// is the full path, not a set.
    pub visits: Vec<Visit>,
    /// Ids of member entities, when this entity is a batch aggregate.
    pub members: Vec<EntityId>,
}

impl Entity {
    /// Create a fresh entity.
    pub fn new(id: EntityId, entity_type: impl Into<String>, created_at: Duration) -> Self {
        Self {
            id,
            entity_type: entity_type.into(),
            created_at,
            attributes: AttrMap::new(),
            visits: Vec::new(),
            members: Vec::new(),
        }
    }

    /// Set an attribute, overwriting any previous value under the key.
    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<AttrValue>) {
        self.attributes.insert(key.into(), value.into());
    }

    /// Look up an attribute.
    pub fn attr(&self, key: &str) -> Option<&AttrValue> {
        self.attributes.get(key)
    }

    /// Append a module entry to the visit log.
    pub fn record_visit(&mut self, module: &str, at: Duration) {
        self.visits.push(Visit {
            module: module.to_owned(),
            at,
        });
    }

    /// Freeze this entity into its disposal record.
    pub fn into_record(self, disposed_at: Duration) -> EntityRecord {
        EntityRecord {
            id: self.id,
            entity_type: self.entity_type,
            created_at: self.created_at,
            disposed_at,
            attributes: self.attributes,
            visits: self.visits,
            members: self.members,
        }
    }
}

/// Immutable per-entity metrics row, produced at disposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    /// Entity id.
    pub id: EntityId,
    /// Entity type label.
    pub entity_type: String,
    /// Creation timestamp.
    pub created_at: Duration,
    /// Disposal timestamp.
    pub disposed_at: Duration,
    /// Attributes accumulated along the way.
    pub attributes: AttrMap,
    /// Full visit log.
    pub visits: Vec<Visit>,
    /// Member ids, when the record is a batch aggregate.
    pub members: Vec<EntityId>,
}

impl EntityRecord {
    /// Total time the entity spent in the network.
    pub fn cycle_time(&self) -> Duration {
        self.disposed_at.saturating_sub(self.created_at)
    }

    /// Whether the record's path includes the named module.
    pub fn visited(&self, module: &str) -> bool {
        self.visits.iter().any(|v| v.module == module)
    }
}
