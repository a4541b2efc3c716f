//! Discrete-event simulation engine for processing networks.
//!
//! A network is a directed structure of typed modules (arrival, process,
//! decide, batch, dispose) validated eagerly at build time. The engine
//! advances simulated time by draining a deterministically ordered event
//! queue. Given the same seed, a replication produces identical results
//! every run.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                     Environment                         │
//! │                                                         │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │     Event Queue (BTreeMap<EventKey, SimEvent>)     │ │
//! │  │     Ordered by: time, then scheduling sequence     │ │
//! │  └────────────────────────┬───────────────────────────┘ │
//! │                           │                             │
//! │                           ▼                             │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │     Module arena (arrival/process/decide/...)      │ │
//! │  │     Entities walk modules until they park          │ │
//! │  └────────────────────────┬───────────────────────────┘ │
//! │                           │                             │
//! │              ┌────────────┴────────────┐                │
//! │              ▼                         ▼                │
//! │  ┌─────────────────────┐   ┌─────────────────────────┐  │
//! │  │  Resource pools     │   │  Statistics collector   │  │
//! │  │  seize / release    │   │  counters, levels, rows │  │
//! │  └─────────────────────┘   └─────────────────────────┘  │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! Waiting is never expressed as suspension: a blocked entity is stored as
//! an explicit continuation (entity + process module) in its resource's
//! FIFO queue and resumed by the release that frees a unit.

mod environment;
mod error;
mod event_queue;
mod generators;
mod module;
mod network;
mod resource;
mod stats;

pub use environment::{Environment, RunReport, RunStats};
pub use error::{BuildError, SimError};
pub use event_queue::{EventKey, SimEvent};
pub use generators::Distribution;
pub use module::{ArrivalSpec, BatchKey, Branch, Condition, DecideRule, Module, ModuleKind};
pub use network::{Network, NetworkBuilder, ResourceSpec};
pub use resource::{ResourcePool, ResourceStats, Waiter};
pub use stats::{Collector, TimeWeighted};

pub use millrace_types::{AttrMap, AttrValue, Entity, EntityId, EntityRecord, ModuleId, ResourceId, Visit};
