//! Spatial model: cell sections, concentration containers, and the
//! automaton graph.

mod concentrations;
mod graph;
mod sections;

pub use concentrations::{ConcentrationContainer, MembraneSide, MolarConcentration};
pub use graph::{
    AutomatonEdge, AutomatonGraph, AutomatonNode, NodeId, NodeState, Region,
};
pub use sections::{CellSection, SectionId, SectionKind, SectionRegistry};
