//! Chemical entity definitions.
//!
//! An entity is anything whose concentration the simulation tracks: a small
//! molecule, a protein, a complex. Each entity carries the reference
//! diffusivity used by the transport modules.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// Identifier of a chemical entity, unique within one simulation
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A chemical species tracked by the simulation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChemicalEntity {
    /// Unique identifier
    pub id: EntityId,
    /// Human-readable name
    pub name: String,
    /// Diffusivity at reference conditions (µm²/s)
    /// Reference: ~400 µm²/s for small solutes in cytoplasm
    /// Source: Milo & Phillips, Cell Biology by the Numbers, 2015
    pub diffusivity_um2_per_s: f64,
}

impl ChemicalEntity {
    /// Create an entity with the small-solute default diffusivity
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: EntityId::new(id),
            name: name.into(),
            diffusivity_um2_per_s: 400.0,
        }
    }

    /// Override the reference diffusivity (µm²/s)
    pub fn with_diffusivity(mut self, diffusivity_um2_per_s: f64) -> Self {
        self.diffusivity_um2_per_s = diffusivity_um2_per_s;
        self
    }
}

/// Registry of all entities known to one simulation
///
/// Iteration order is the id order, which keeps module computations
/// deterministic across runs.
#[derive(Debug, Clone, Default)]
pub struct EntityRegistry {
    entities: BTreeMap<EntityId, ChemicalEntity>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity. Registering the same id twice is an error.
    pub fn register(&mut self, entity: ChemicalEntity) -> Result<(), ConfigurationError> {
        if self.entities.contains_key(&entity.id) {
            return Err(ConfigurationError::DuplicateEntity(entity.id));
        }
        log::info!("Registered chemical entity '{}' ({})", entity.id, entity.name);
        self.entities.insert(entity.id.clone(), entity);
        Ok(())
    }

    pub fn get(&self, id: &EntityId) -> Option<&ChemicalEntity> {
        self.entities.get(id)
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.entities.contains_key(id)
    }

    /// All registered entities in id order
    pub fn iter(&self) -> impl Iterator<Item = &ChemicalEntity> {
        self.entities.values()
    }

    /// All registered ids in order
    pub fn ids(&self) -> impl Iterator<Item = &EntityId> {
        self.entities.keys()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_lookup() {
        let mut registry = EntityRegistry::new();
        registry
            .register(ChemicalEntity::new("glc", "Glucose").with_diffusivity(600.0))
            .unwrap();

        let entity = registry.get(&EntityId::new("glc")).unwrap();
        assert_eq!(entity.name, "Glucose");
        assert!((entity.diffusivity_um2_per_s - 600.0).abs() < 1e-12);
    }

    #[test]
    fn test_duplicate_entity_rejected() {
        let mut registry = EntityRegistry::new();
        registry.register(ChemicalEntity::new("atp", "ATP")).unwrap();
        let err = registry.register(ChemicalEntity::new("atp", "ATP again"));
        assert!(matches!(err, Err(ConfigurationError::DuplicateEntity(_))));
    }

    #[test]
    fn test_iteration_is_ordered() {
        let mut registry = EntityRegistry::new();
        registry.register(ChemicalEntity::new("b", "B")).unwrap();
        registry.register(ChemicalEntity::new("a", "A")).unwrap();
        let ids: Vec<_> = registry.ids().map(|id| id.as_str().to_string()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
