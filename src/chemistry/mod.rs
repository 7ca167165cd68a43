//! Chemical entities and their registry.

mod entity;

pub use entity::{ChemicalEntity, EntityId, EntityRegistry};
