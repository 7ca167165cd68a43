//! Free diffusion between adjacent nodes.
//!
//! For every edge whose endpoints can see a common section, the module moves
//! concentration down the gradient:
//!
//! ```text
//! flux     = D · (C_A − C_B) · Δt / d²
//! transfer = flux / 2            (applied −transfer to A, +transfer to B)
//! ```
//!
//! The symmetric split conserves the pair total and keeps the gradient from
//! reversing sign for `D·Δt/d² ≤ 1`. `D` is the entity diffusivity rescaled
//! to the configured environment (see `EnvironmentParameters`).
//!
//! Membrane-to-membrane edges are excluded here by policy; lateral movement
//! along a membrane is the transport module's business.

use crate::chemistry::EntityRegistry;
use crate::error::{ConfigurationError, SimulationError};
use crate::model::{AutomatonGraph, AutomatonNode, NodeState, SectionId};
use crate::modules::{DeltaMap, EntityFilter, EpochContext, UpdateModule};
use crate::simulation::Simulation;

/// Configuration for [`FreeDiffusion`]
#[derive(Debug, Clone, Default)]
pub struct FreeDiffusionConfig {
    /// Entities to diffuse; defaults to all registered entities
    pub filter: EntityFilter,
}

/// Ordinary gradient-driven diffusion along non-membrane edges
#[derive(Debug)]
pub struct FreeDiffusion {
    filter: EntityFilter,
}

impl FreeDiffusion {
    pub const NAME: &'static str = "free-diffusion";

    /// Validating factory: every explicitly filtered entity must already be
    /// registered with the simulation.
    pub fn from_config(
        config: FreeDiffusionConfig,
        simulation: &Simulation,
    ) -> Result<Self, ConfigurationError> {
        config.filter.validate(Self::NAME, simulation.entities())?;
        Ok(Self { filter: config.filter })
    }

    /// The section through which two endpoint nodes exchange, if any.
    ///
    /// Same section: that section. One membrane endpoint: the side of the
    /// membrane facing the neighbour's compartment, provided the membrane
    /// actually borders it. Disjoint compartments without a membrane: none.
    fn shared_section<'a>(a: &'a AutomatonNode, b: &'a AutomatonNode) -> Option<&'a SectionId> {
        if a.section == b.section {
            return Some(&a.section);
        }
        match (a.state, b.state) {
            (NodeState::Membrane, _) => {
                if a.container.side_section(crate::model::MembraneSide::Outer) == Some(&b.section)
                    || a.container.side_section(crate::model::MembraneSide::Inner)
                        == Some(&b.section)
                {
                    Some(&b.section)
                } else {
                    None
                }
            }
            (_, NodeState::Membrane) => {
                if b.container.side_section(crate::model::MembraneSide::Outer) == Some(&a.section)
                    || b.container.side_section(crate::model::MembraneSide::Inner)
                        == Some(&a.section)
                {
                    Some(&a.section)
                } else {
                    None
                }
            }
            _ => None,
        }
    }
}

impl UpdateModule for FreeDiffusion {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn filter(&self) -> &EntityFilter {
        &self.filter
    }

    fn compute_deltas(
        &self,
        graph: &AutomatonGraph,
        entities: &EntityRegistry,
        ctx: &EpochContext,
    ) -> Result<DeltaMap, SimulationError> {
        let mut deltas = DeltaMap::new();
        let selected = self.filter.resolve(entities);

        for edge in graph.edges() {
            // Required policy: membrane-to-membrane edges are not ordinary
            // diffusion paths.
            if edge.both_membrane {
                continue;
            }
            let (node_a, node_b) = match (graph.node(edge.a), graph.node(edge.b)) {
                (Some(a), Some(b)) => (a, b),
                _ => continue,
            };
            let section = match Self::shared_section(node_a, node_b) {
                Some(section) => section.clone(),
                None => continue,
            };

            for entity_id in &selected {
                let entity = entities.get(entity_id).ok_or_else(|| {
                    SimulationError::ModuleComputation {
                        module: Self::NAME,
                        epoch: ctx.epoch,
                        reason: format!("entity '{}' vanished from the registry", entity_id),
                    }
                })?;
                let k = ctx.environment.scaled_diffusivity(entity.diffusivity_um2_per_s);
                let c_a = node_a.container.available_concentration(entity_id, &section);
                let c_b = node_b.container.available_concentration(entity_id, &section);
                let transfer = (c_a - c_b) * (0.5 * k);
                if transfer.mol_per_l() == 0.0 {
                    continue;
                }
                deltas.add(edge.a, entity_id.clone(), section.clone(), -transfer);
                deltas.add(edge.b, entity_id.clone(), section.clone(), transfer);
            }
        }
        Ok(deltas)
    }
}
