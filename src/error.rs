//! Error taxonomy for the simulation engine.
//!
//! Three failure families, surfaced at different points in the lifecycle:
//! - [`ConfigurationError`] at registration/build time (duplicate sections,
//!   modules referencing unknown entities); fatal to that configuration step.
//! - [`ConsistencyError`] at the mutating operation that would corrupt the
//!   graph (dangling edge endpoints, unregistered sections); the mutation is
//!   refused.
//! - [`SimulationError`] out of the epoch loop; the loop stops rather than
//!   silently skipping an epoch.

use thiserror::Error;

use crate::chemistry::EntityId;
use crate::model::{NodeId, SectionId};

/// Errors raised while assembling a simulation, before any epoch has run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    /// Two distinct sections claim the same id with conflicting kinds.
    #[error("section '{0}' already registered with a different kind")]
    DuplicateSection(SectionId),

    /// Two distinct entities claim the same id.
    #[error("chemical entity '{0}' already registered")]
    DuplicateEntity(EntityId),

    /// A module filter references an entity the simulation does not know.
    #[error("module '{module}' references unregistered entity '{entity}'")]
    UnknownEntity { module: &'static str, entity: EntityId },

    /// A module-specific parameter is outside its valid range.
    #[error("module '{module}': {reason}")]
    InvalidParameter { module: &'static str, reason: String },
}

/// Errors raised by graph mutations that would create inconsistent topology.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConsistencyError {
    /// An edge endpoint is not a node of this graph.
    #[error("edge endpoint {0} is not a node of this graph")]
    MissingEndpoint(NodeId),

    /// A node was assigned to a section absent from the graph's registry.
    #[error("section '{0}' is not registered in this graph")]
    UnregisteredSection(SectionId),
}

/// Errors escaping the epoch loop at run time.
#[derive(Debug, Error)]
pub enum SimulationError {
    /// A module's delta computation failed.
    #[error("module '{module}' failed during epoch {epoch}: {reason}")]
    ModuleComputation {
        module: &'static str,
        epoch: u64,
        reason: String,
    },

    /// `next_epoch` was called on a terminated simulation.
    #[error("simulation is terminated; no further epochs may run")]
    Terminated,

    /// The scheduler thread ended without delivering a result.
    #[error("simulation thread ended unexpectedly")]
    ThreadLost,

    /// A configuration problem was only detectable at run time.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}
