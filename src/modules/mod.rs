//! Update module pipeline.
//!
//! Modules are independently pluggable computations (diffusion, reaction,
//! membrane transport) invoked once per epoch in registration order. A
//! module reads the current concentrations and the topology and returns
//! per-node deltas; it never mutates containers itself. The simulation sums
//! deltas across modules and applies them exactly once per epoch, so no
//! module observes a sibling's same-epoch writes.

mod diffusion;
mod reaction;
mod transport;

pub use diffusion::{FreeDiffusion, FreeDiffusionConfig};
pub use reaction::{Reaction, ReactionConfig, ReactionStoichiometry};
pub use transport::{MembraneTransport, MembraneTransportConfig};

use std::collections::BTreeMap;

use crate::chemistry::{EntityId, EntityRegistry};
use crate::config::EnvironmentParameters;
use crate::error::{ConfigurationError, SimulationError};
use crate::model::{AutomatonGraph, MolarConcentration, NodeId, SectionId};

/// Which entities a module applies to
#[derive(Debug, Clone, Default)]
pub enum EntityFilter {
    /// Every entity registered with the simulation
    #[default]
    All,
    /// Only the listed entities
    Only(Vec<EntityId>),
}

impl EntityFilter {
    /// The entity ids this filter selects, in registry order
    pub fn resolve(&self, registry: &EntityRegistry) -> Vec<EntityId> {
        match self {
            Self::All => registry.ids().cloned().collect(),
            Self::Only(ids) => ids.clone(),
        }
    }

    /// Check that every explicitly listed entity is registered.
    ///
    /// Called by module factories at build time.
    pub fn validate(
        &self,
        module: &'static str,
        registry: &EntityRegistry,
    ) -> Result<(), ConfigurationError> {
        if let Self::Only(ids) = self {
            for id in ids {
                if !registry.contains(id) {
                    return Err(ConfigurationError::UnknownEntity {
                        module,
                        entity: id.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Per-epoch state handed to every module computation
#[derive(Debug, Clone)]
pub struct EpochContext {
    /// Epoch about to be applied (0-based)
    pub epoch: u64,
    /// Simulated seconds elapsed before this epoch
    pub elapsed_sec: f64,
    /// Environmental parameters, passed explicitly (never ambient state)
    pub environment: EnvironmentParameters,
}

/// Accumulated concentration deltas keyed by (node, entity, section)
///
/// Deltas for the same key sum; the simulation applies the final map once
/// per epoch.
#[derive(Debug, Clone, Default)]
pub struct DeltaMap {
    deltas: BTreeMap<(NodeId, EntityId, SectionId), MolarConcentration>,
}

impl DeltaMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a delta, summing with any delta already recorded for the key
    pub fn add(
        &mut self,
        node: NodeId,
        entity: EntityId,
        section: SectionId,
        delta: MolarConcentration,
    ) {
        *self
            .deltas
            .entry((node, entity, section))
            .or_insert(MolarConcentration::ZERO) += delta;
    }

    /// Fold another module's deltas into this map
    pub fn merge(&mut self, other: DeltaMap) {
        for ((node, entity, section), delta) in other.deltas {
            self.add(node, entity, section, delta);
        }
    }

    pub fn iter(
        &self,
    ) -> impl Iterator<Item = (&(NodeId, EntityId, SectionId), MolarConcentration)> {
        self.deltas.iter().map(|(k, v)| (k, *v))
    }

    pub fn len(&self) -> usize {
        self.deltas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }
}

/// A pluggable per-epoch computation
///
/// Implementations must be pure with respect to the containers: they may
/// read every concentration in the graph but return their writes as deltas.
pub trait UpdateModule: Send {
    /// Stable module name used in logs and errors
    fn name(&self) -> &'static str;

    /// Entities this module applies to
    fn filter(&self) -> &EntityFilter;

    /// Compute this epoch's deltas from a consistent snapshot of the graph
    fn compute_deltas(
        &self,
        graph: &AutomatonGraph,
        entities: &EntityRegistry,
        ctx: &EpochContext,
    ) -> Result<DeltaMap, SimulationError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chemistry::ChemicalEntity;

    #[test]
    fn test_delta_map_sums_same_key() {
        let mut deltas = DeltaMap::new();
        let key = (NodeId(0), EntityId::new("atp"), SectionId::new("cyt"));
        deltas.add(key.0, key.1.clone(), key.2.clone(), MolarConcentration::new(0.25));
        deltas.add(key.0, key.1.clone(), key.2.clone(), MolarConcentration::new(-0.1));

        assert_eq!(deltas.len(), 1);
        let (_, total) = deltas.iter().next().unwrap();
        assert!((total.mol_per_l() - 0.15).abs() < 1e-12);
    }

    #[test]
    fn test_filter_validation() {
        let mut registry = EntityRegistry::new();
        registry.register(ChemicalEntity::new("atp", "ATP")).unwrap();

        let ok = EntityFilter::Only(vec![EntityId::new("atp")]);
        assert!(ok.validate("test", &registry).is_ok());

        let missing = EntityFilter::Only(vec![EntityId::new("gtp")]);
        assert!(matches!(
            missing.validate("test", &registry),
            Err(ConfigurationError::UnknownEntity { .. })
        ));
    }
}
