//! cellgraph - graph-based cellular automaton simulation engine
//!
//! This library simulates diffusion and reaction of chemical entities across
//! a spatial graph of discrete cells, partitioned into biological
//! compartments (cytoplasm, extracellular space, membranes). The engine is
//! presentation-agnostic: a background scheduler advances epochs and emits
//! throttled update events to registered observers.

pub mod chemistry;
pub mod config;
pub mod error;
pub mod export;
pub mod model;
pub mod modules;
pub mod simulation;

pub use chemistry::{ChemicalEntity, EntityId, EntityRegistry};
pub use config::EnvironmentParameters;
pub use error::{ConfigurationError, ConsistencyError, SimulationError};
pub use export::CsvNodeWriter;
pub use model::{
    AutomatonEdge, AutomatonGraph, AutomatonNode, CellSection, ConcentrationContainer,
    MembraneSide, MolarConcentration, NodeId, NodeState, Region, SectionId, SectionKind,
};
pub use modules::{
    DeltaMap, EntityFilter, EpochContext, FreeDiffusion, FreeDiffusionConfig, MembraneTransport,
    MembraneTransportConfig, Reaction, ReactionConfig, ReactionStoichiometry, UpdateModule,
};
pub use simulation::{
    GraphUpdatedEvent, GraphUpdateListener, NodeUpdatedEvent, NodeUpdateListener, Simulation,
    SimulationHandle, SimulationManager, SimulationState,
};
