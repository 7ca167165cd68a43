//! Update events and listener interfaces.
//!
//! The engine emits two event kinds: a graph-level event carrying a
//! reference to the latest graph state, and a node-level event carrying an
//! owned concentration snapshot of one observed node. Both are delivered
//! synchronously on the scheduler thread; listeners must therefore be cheap
//! or hand the data off themselves.

use crate::chemistry::EntityId;
use crate::model::{AutomatonGraph, AutomatonNode, MolarConcentration, NodeId, SectionId};

/// The whole graph advanced by at least one epoch
#[derive(Debug)]
pub struct GraphUpdatedEvent<'a> {
    pub graph: &'a AutomatonGraph,
    /// Simulated seconds elapsed so far
    pub elapsed_sec: f64,
    /// Epochs computed so far
    pub epoch: u64,
}

/// An observed node's state at emission time
#[derive(Debug, Clone)]
pub struct NodeUpdatedEvent {
    pub node_id: NodeId,
    /// Simulated seconds elapsed at emission
    pub elapsed_sec: f64,
    /// Snapshot of every stored (entity, section, concentration) triple
    pub concentrations: Vec<(EntityId, SectionId, MolarConcentration)>,
}

impl NodeUpdatedEvent {
    /// Snapshot a node
    pub fn from_node(node: &AutomatonNode, elapsed_sec: f64) -> Self {
        Self {
            node_id: node.id,
            elapsed_sec,
            concentrations: node
                .container
                .iter()
                .map(|(e, s, c)| (e.clone(), s.clone(), c))
                .collect(),
        }
    }
}

/// Listener for graph-level updates
pub trait GraphUpdateListener: Send + Sync {
    fn on_graph_updated(&self, event: &GraphUpdatedEvent<'_>);
}

/// Listener for node-level updates of observed nodes
pub trait NodeUpdateListener: Send + Sync {
    fn on_node_updated(&self, event: &NodeUpdatedEvent);
}
