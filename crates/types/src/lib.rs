//! Core types for the millrace processing-network simulator.
//!
//! This crate holds the vocabulary shared by the engine and the CLI:
//! identifiers, typed entity attributes, the [`Entity`] token that flows
//! through a network, and the frozen [`EntityRecord`] produced when an
//! entity is disposed.

mod attributes;
mod entity;
mod identifiers;

pub use attributes::{AttrMap, AttrValue};
pub use entity::{Entity, EntityRecord, Visit};
pub use identifiers::{EntityId, ModuleId, ResourceId};
