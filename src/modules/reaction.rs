//! Chemical reactions with mass-action kinetics.
//!
//! A reaction runs independently in every node and is blind to topology.
//! The rate law is mass action: `rate = k · Π [substrate]^coeff`, with the
//! stoichiometric coefficients applied to substrates (consumed) and products
//! (produced) over one time step.

use crate::chemistry::{EntityId, EntityRegistry};
use crate::error::{ConfigurationError, SimulationError};
use crate::model::{ConcentrationContainer, MolarConcentration, SectionId};
use crate::model::AutomatonGraph;
use crate::modules::{DeltaMap, EntityFilter, EpochContext, UpdateModule};
use crate::simulation::Simulation;

/// Stoichiometry of one reaction
#[derive(Debug, Clone)]
pub struct ReactionStoichiometry {
    /// Substrates consumed (entity, stoichiometric coefficient)
    pub substrates: Vec<(EntityId, f64)>,
    /// Products produced (entity, stoichiometric coefficient)
    pub products: Vec<(EntityId, f64)>,
}

impl ReactionStoichiometry {
    pub fn new(substrates: Vec<(EntityId, f64)>, products: Vec<(EntityId, f64)>) -> Self {
        Self { substrates, products }
    }

    /// Every entity the reaction touches
    fn entities(&self) -> impl Iterator<Item = &EntityId> {
        self.substrates
            .iter()
            .map(|(e, _)| e)
            .chain(self.products.iter().map(|(e, _)| e))
    }
}

/// Configuration for [`Reaction`]
#[derive(Debug, Clone)]
pub struct ReactionConfig {
    pub stoichiometry: ReactionStoichiometry,
    /// Mass-action rate constant (per second, concentration units mol/L)
    pub rate_constant_per_sec: f64,
}

/// A user-declared kinetic law applied per node
#[derive(Debug)]
pub struct Reaction {
    stoichiometry: ReactionStoichiometry,
    rate_constant_per_sec: f64,
    filter: EntityFilter,
}

impl Reaction {
    pub const NAME: &'static str = "reaction";

    /// Validating factory: every entity named by the stoichiometry must be
    /// registered, and the rate constant must be non-negative.
    pub fn from_config(
        config: ReactionConfig,
        simulation: &Simulation,
    ) -> Result<Self, ConfigurationError> {
        for entity in config.stoichiometry.entities() {
            if !simulation.entities().contains(entity) {
                return Err(ConfigurationError::UnknownEntity {
                    module: Self::NAME,
                    entity: entity.clone(),
                });
            }
        }
        if config.rate_constant_per_sec < 0.0 {
            return Err(ConfigurationError::InvalidParameter {
                module: Self::NAME,
                reason: format!(
                    "rate constant must be non-negative, got {}",
                    config.rate_constant_per_sec
                ),
            });
        }
        let filter = EntityFilter::Only(config.stoichiometry.entities().cloned().collect());
        Ok(Self {
            stoichiometry: config.stoichiometry,
            rate_constant_per_sec: config.rate_constant_per_sec,
            filter,
        })
    }

    /// Mass-action rate in one section of one node (mol/L per second)
    fn rate(&self, container: &ConcentrationContainer, section: &SectionId) -> f64 {
        let mut rate = self.rate_constant_per_sec;
        for (entity, coeff) in &self.stoichiometry.substrates {
            let c = container.available_concentration(entity, section).mol_per_l();
            rate *= c.powf(*coeff);
        }
        rate
    }
}

impl UpdateModule for Reaction {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn filter(&self) -> &EntityFilter {
        &self.filter
    }

    fn compute_deltas(
        &self,
        graph: &AutomatonGraph,
        _entities: &EntityRegistry,
        ctx: &EpochContext,
    ) -> Result<DeltaMap, SimulationError> {
        let dt = ctx.environment.time_step_sec();
        if !dt.is_finite() || dt <= 0.0 {
            return Err(SimulationError::ModuleComputation {
                module: Self::NAME,
                epoch: ctx.epoch,
                reason: format!("invalid time step {} s", dt),
            });
        }
        let mut deltas = DeltaMap::new();

        for node in graph.nodes() {
            // Membrane nodes react in each enclosed side independently; the
            // membrane surface is not a reaction volume.
            let scopes: Vec<SectionId> = match &node.container {
                ConcentrationContainer::Simple { .. } => vec![node.section.clone()],
                ConcentrationContainer::Membrane {
                    outer_section,
                    inner_section,
                    ..
                } => vec![outer_section.clone(), inner_section.clone()],
            };
            for section in scopes {
                let rate = self.rate(&node.container, &section);
                if rate == 0.0 {
                    continue;
                }
                let extent = MolarConcentration::new(rate * dt);
                for (entity, coeff) in &self.stoichiometry.substrates {
                    deltas.add(node.id, entity.clone(), section.clone(), -(extent * *coeff));
                }
                for (entity, coeff) in &self.stoichiometry.products {
                    deltas.add(node.id, entity.clone(), section.clone(), extent * *coeff);
                }
            }
        }
        Ok(deltas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chemistry::ChemicalEntity;

    fn reaction_simulation() -> Simulation {
        let mut simulation = Simulation::new();
        simulation.register_entity(ChemicalEntity::new("a", "A")).unwrap();
        simulation.register_entity(ChemicalEntity::new("b", "B")).unwrap();
        simulation.set_graph(AutomatonGraph::rectangular(1, 1));
        simulation
    }

    fn a_to_b(rate_constant_per_sec: f64) -> ReactionConfig {
        ReactionConfig {
            stoichiometry: ReactionStoichiometry::new(
                vec![(EntityId::new("a"), 1.0)],
                vec![(EntityId::new("b"), 1.0)],
            ),
            rate_constant_per_sec,
        }
    }

    #[test]
    fn test_mass_action_extent() {
        let mut simulation = reaction_simulation();
        // Make the per-epoch extent easy to read: Δt = 1 s.
        simulation.environment_mut().time_step_us = 1e6;
        let node = simulation.graph().node_at(0, 0).unwrap().id;
        simulation
            .graph_mut()
            .node_mut(node)
            .unwrap()
            .set_concentration(EntityId::new("a"), MolarConcentration::new(2.0));

        let reaction = Reaction::from_config(a_to_b(0.1), &simulation).unwrap();
        let ctx = simulation.epoch_context();
        let deltas = reaction
            .compute_deltas(simulation.graph(), simulation.entities(), &ctx)
            .unwrap();

        // rate = 0.1 · [A] = 0.2 mol/L/s, extent over 1 s = 0.2
        let values: Vec<f64> = deltas.iter().map(|(_, d)| d.mol_per_l()).collect();
        assert!(values.iter().any(|d| (*d + 0.2).abs() < 1e-12));
        assert!(values.iter().any(|d| (*d - 0.2).abs() < 1e-12));
    }

    #[test]
    fn test_unknown_entity_in_stoichiometry() {
        let simulation = reaction_simulation();
        let config = ReactionConfig {
            stoichiometry: ReactionStoichiometry::new(
                vec![(EntityId::new("nope"), 1.0)],
                vec![],
            ),
            rate_constant_per_sec: 1.0,
        };
        let err = Reaction::from_config(config, &simulation);
        assert!(matches!(err, Err(ConfigurationError::UnknownEntity { .. })));
    }

    #[test]
    fn test_negative_rate_constant_rejected() {
        let simulation = reaction_simulation();
        let err = Reaction::from_config(a_to_b(-1.0), &simulation);
        assert!(matches!(err, Err(ConfigurationError::InvalidParameter { .. })));
    }
}
