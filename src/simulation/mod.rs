//! The simulation aggregate and its epoch scheduler.

mod events;
mod manager;

pub use events::{GraphUpdatedEvent, GraphUpdateListener, NodeUpdatedEvent, NodeUpdateListener};
pub use manager::{SimulationHandle, SimulationManager, DEFAULT_TICKS_PER_SECOND};

use crate::chemistry::{ChemicalEntity, EntityRegistry};
use crate::config::EnvironmentParameters;
use crate::error::{ConfigurationError, SimulationError};
use crate::model::{AutomatonGraph, NodeId};
use crate::modules::{DeltaMap, EpochContext, UpdateModule};

/// Lifecycle of a simulation
///
/// The state machine is advisory to callers: [`Simulation::next_epoch`] is
/// valid in every state except [`Terminated`](SimulationState::Terminated).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationState {
    /// Graph, entities, and modules are being assembled; no epoch has run
    Configuring,
    /// The epoch loop is active
    Running,
    /// The loop is halted; state is retained and may resume
    Paused,
    /// The loop is stopped permanently
    Terminated,
}

/// Aggregate root: one graph, the registered entities, the ordered module
/// pipeline, and the simulated clock.
pub struct Simulation {
    graph: AutomatonGraph,
    entities: EntityRegistry,
    modules: Vec<Box<dyn UpdateModule>>,
    environment: EnvironmentParameters,
    epoch: u64,
    elapsed_sec: f64,
    state: SimulationState,
}

impl Simulation {
    /// Empty simulation with default environment parameters
    pub fn new() -> Self {
        Self {
            graph: AutomatonGraph::new(),
            entities: EntityRegistry::new(),
            modules: Vec::new(),
            environment: EnvironmentParameters::default(),
            epoch: 0,
            elapsed_sec: 0.0,
            state: SimulationState::Configuring,
        }
    }

    pub fn set_graph(&mut self, graph: AutomatonGraph) {
        self.graph = graph;
    }

    pub fn graph(&self) -> &AutomatonGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut AutomatonGraph {
        &mut self.graph
    }

    pub fn register_entity(&mut self, entity: ChemicalEntity) -> Result<(), ConfigurationError> {
        self.entities.register(entity)
    }

    pub fn entities(&self) -> &EntityRegistry {
        &self.entities
    }

    /// Append a module to the pipeline; modules run in registration order
    pub fn add_module(&mut self, module: Box<dyn UpdateModule>) {
        log::info!("Added update module '{}' to the pipeline", module.name());
        self.modules.push(module);
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    pub fn environment(&self) -> &EnvironmentParameters {
        &self.environment
    }

    pub fn environment_mut(&mut self) -> &mut EnvironmentParameters {
        &mut self.environment
    }

    pub fn set_environment(&mut self, environment: EnvironmentParameters) {
        self.environment = environment;
    }

    /// Epochs computed so far
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Simulated seconds elapsed so far
    pub fn elapsed_sec(&self) -> f64 {
        self.elapsed_sec
    }

    pub fn state(&self) -> SimulationState {
        self.state
    }

    pub fn set_state(&mut self, state: SimulationState) {
        self.state = state;
    }

    /// Nodes currently flagged for observation
    pub fn observed_nodes(&self) -> Vec<NodeId> {
        self.graph.observed_nodes()
    }

    /// Toggle a node's observed flag; no-op for unknown nodes
    pub fn set_observed(&mut self, node_id: NodeId, observed: bool) {
        if let Some(node) = self.graph.node_mut(node_id) {
            node.observed = observed;
        }
    }

    /// Context for the epoch that would run next
    pub fn epoch_context(&self) -> EpochContext {
        EpochContext {
            epoch: self.epoch,
            elapsed_sec: self.elapsed_sec,
            environment: self.environment.clone(),
        }
    }

    /// Compute and apply one epoch.
    ///
    /// All module deltas are computed from the unmodified pre-epoch state,
    /// summed per (node, entity, section), and applied once. A failing
    /// module aborts the epoch before anything is applied, so the
    /// simulation never carries a partially applied epoch.
    pub fn next_epoch(&mut self) -> Result<(), SimulationError> {
        if self.state == SimulationState::Terminated {
            return Err(SimulationError::Terminated);
        }
        let ctx = self.epoch_context();

        let mut merged = DeltaMap::new();
        for module in &self.modules {
            let deltas = module.compute_deltas(&self.graph, &self.entities, &ctx)?;
            merged.merge(deltas);
        }

        for ((node_id, entity, section), delta) in
            merged.iter().map(|(k, v)| (k.clone(), v))
        {
            match self.graph.node_mut(node_id) {
                Some(node) => node.container.apply_delta(entity, section, delta),
                None => log::warn!("Dropping delta for vanished node {}", node_id),
            }
        }

        self.epoch += 1;
        self.elapsed_sec += self.environment.time_step_sec();
        log::trace!("Epoch {} applied, t = {:.6e} s", self.epoch, self.elapsed_sec);
        Ok(())
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chemistry::EntityId;
    use crate::model::MolarConcentration;
    use crate::modules::{FreeDiffusion, FreeDiffusionConfig};

    #[test]
    fn test_next_epoch_advances_clock() {
        let mut simulation = Simulation::new();
        simulation.set_graph(AutomatonGraph::rectangular(2, 2));
        simulation.next_epoch().unwrap();
        assert_eq!(simulation.epoch(), 1);
        assert!((simulation.elapsed_sec() - 1e-6).abs() < 1e-18);
    }

    #[test]
    fn test_terminated_simulation_refuses_epochs() {
        let mut simulation = Simulation::new();
        simulation.set_state(SimulationState::Terminated);
        assert!(matches!(simulation.next_epoch(), Err(SimulationError::Terminated)));
    }

    #[test]
    fn test_next_epoch_valid_while_paused() {
        let mut simulation = Simulation::new();
        simulation.set_graph(AutomatonGraph::rectangular(1, 1));
        simulation.set_state(SimulationState::Paused);
        assert!(simulation.next_epoch().is_ok());
    }

    #[test]
    fn test_pipeline_runs_in_registration_order_on_one_snapshot() {
        // Two identical diffusion modules must each see the pre-epoch state,
        // so their deltas double rather than compound.
        let mut simulation = Simulation::new();
        simulation
            .register_entity(
                crate::chemistry::ChemicalEntity::new("s", "Solute").with_diffusivity(0.5e6),
            )
            .unwrap();
        simulation.set_graph(AutomatonGraph::rectangular(2, 1));
        let entity = EntityId::new("s");
        let a = simulation.graph().node_at(0, 0).unwrap().id;
        let b = simulation.graph().node_at(1, 0).unwrap().id;
        simulation
            .graph_mut()
            .node_mut(a)
            .unwrap()
            .set_concentration(entity.clone(), MolarConcentration::new(1.0));

        for _ in 0..2 {
            let module =
                FreeDiffusion::from_config(FreeDiffusionConfig::default(), &simulation).unwrap();
            simulation.add_module(Box::new(module));
        }
        simulation.next_epoch().unwrap();

        // One module would move 0.25 (k = 0.5); two modules on the same
        // snapshot move 0.5 total.
        let c_a = simulation.graph().node(a).unwrap().concentration(&entity);
        let c_b = simulation.graph().node(b).unwrap().concentration(&entity);
        assert!((c_a.mol_per_l() - 0.5).abs() < 1e-12, "got {}", c_a.mol_per_l());
        assert!((c_b.mol_per_l() - 0.5).abs() < 1e-12, "got {}", c_b.mol_per_l());
    }

    #[test]
    fn test_observed_flag_toggle() {
        let mut simulation = Simulation::new();
        simulation.set_graph(AutomatonGraph::rectangular(2, 1));
        let id = simulation.graph().node_at(1, 0).unwrap().id;
        simulation.set_observed(id, true);
        assert_eq!(simulation.observed_nodes(), vec![id]);
        simulation.set_observed(id, false);
        assert!(simulation.observed_nodes().is_empty());
    }
}
