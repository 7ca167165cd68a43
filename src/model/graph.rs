//! The automaton graph: nodes, edges, and the section registry they live in.
//!
//! Nodes are discrete cells with a 2D position, an assigned section, and an
//! exclusively owned concentration container. Edges are pure topology; any
//! flux they carry is stored on the nodes.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use glam::Vec2;
use rand::Rng;

use crate::chemistry::EntityId;
use crate::error::ConsistencyError;
use crate::model::concentrations::{ConcentrationContainer, MolarConcentration};
use crate::model::sections::{CellSection, SectionId, SectionKind, SectionRegistry};

/// Graph-local node identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub usize);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Classification of a node, kept consistent with its assigned section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    /// Extracellular, aqueous environment
    Aqueous,
    /// Inside an enclosed compartment
    Cytosol,
    /// Sitting on a membrane
    Membrane,
}

/// One discrete cell of the automaton
#[derive(Debug, Clone)]
pub struct AutomatonNode {
    pub id: NodeId,
    /// Position in µm
    pub position: Vec2,
    /// Section this node currently belongs to
    pub section: SectionId,
    /// Derived classification, consistent with `section`
    pub state: NodeState,
    /// Concentration storage, exclusively owned
    pub container: ConcentrationContainer,
    /// Whether node-level update events are emitted for this node
    pub observed: bool,
}

impl AutomatonNode {
    pub fn is_observed(&self) -> bool {
        self.observed
    }

    /// Concentration of `entity` under the node's own section
    pub fn concentration(&self, entity: &EntityId) -> MolarConcentration {
        self.container.get(entity, &self.section)
    }

    /// Set the concentration of `entity` under the node's own section
    pub fn set_concentration(&mut self, entity: EntityId, value: MolarConcentration) {
        let section = self.section.clone();
        self.container.set(entity, section, value);
    }

    /// Section-scoped concentration write, used for membrane nodes
    pub fn set_available_concentration(
        &mut self,
        entity: EntityId,
        section: SectionId,
        value: MolarConcentration,
    ) {
        self.container.set(entity, section, value);
    }
}

/// Undirected link between two nodes
///
/// Carries no numeric state; the only classification the engine needs is
/// whether both endpoints sit on a membrane, which routes the edge to the
/// transport module instead of ordinary diffusion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutomatonEdge {
    pub a: NodeId,
    pub b: NodeId,
    /// True when both endpoints are membrane nodes
    pub both_membrane: bool,
}

/// Axis-aligned rectangular region used for bulk node reassignment
#[derive(Debug, Clone, Copy)]
pub struct Region {
    pub min: Vec2,
    pub max: Vec2,
}

impl Region {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
    }
}

/// The spatial graph owning nodes, edges, and the section registry
///
/// Node and edge storage is ordered so that iteration, and therefore module
/// computation, is deterministic across runs.
#[derive(Debug, Clone, Default)]
pub struct AutomatonGraph {
    nodes: BTreeMap<NodeId, AutomatonNode>,
    edges: BTreeSet<(NodeId, NodeId)>,
    adjacency: BTreeMap<NodeId, BTreeSet<NodeId>>,
    sections: SectionRegistry,
    /// (column, row) -> node, filled by the rectangular constructor
    coordinates: HashMap<(usize, usize), NodeId>,
    next_id: usize,
}

/// Section id of the default aqueous exterior every graph starts with
pub const DEFAULT_SECTION_ID: &str = "default";

impl AutomatonGraph {
    /// Empty graph with the default aqueous section registered
    pub fn new() -> Self {
        let mut graph = Self::default();
        graph
            .sections
            .register(CellSection::compartment(DEFAULT_SECTION_ID, "Default environment"))
            .ok();
        graph
    }

    /// Rectangular grid of `columns` × `rows` nodes with 4-neighbor edges,
    /// spaced `1.0` apart, all assigned to the default section.
    pub fn rectangular(columns: usize, rows: usize) -> Self {
        let mut graph = Self::new();
        for row in 0..rows {
            for column in 0..columns {
                let id = graph.insert_node(
                    Vec2::new(column as f32, row as f32),
                    SectionId::new(DEFAULT_SECTION_ID),
                );
                graph.coordinates.insert((column, row), id);
            }
        }
        // 4-neighborhood
        for row in 0..rows {
            for column in 0..columns {
                let here = graph.coordinates[&(column, row)];
                if column + 1 < columns {
                    let right = graph.coordinates[&(column + 1, row)];
                    graph.add_edge(here, right).ok();
                }
                if row + 1 < rows {
                    let below = graph.coordinates[&(column, row + 1)];
                    graph.add_edge(here, below).ok();
                }
            }
        }
        log::debug!(
            "Built rectangular graph: {} nodes, {} edges",
            graph.nodes.len(),
            graph.edges.len()
        );
        graph
    }

    fn insert_node(&mut self, position: Vec2, section: SectionId) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(
            id,
            AutomatonNode {
                id,
                position,
                section,
                state: NodeState::Aqueous,
                container: ConcentrationContainer::simple(),
                observed: false,
            },
        );
        self.adjacency.insert(id, BTreeSet::new());
        id
    }

    /// Register a section in the graph's registry
    pub fn add_cell_section(
        &mut self,
        section: CellSection,
    ) -> Result<(), crate::error::ConfigurationError> {
        self.sections.register(section)
    }

    pub fn sections(&self) -> &SectionRegistry {
        &self.sections
    }

    /// Assign a node to a registered section, deriving its state and, for
    /// membranes, swapping in a membrane container.
    ///
    /// Concentrations keyed under the previous section remain stored in the
    /// container but are no longer reachable through the node's active
    /// section. This lossy transition is deliberate.
    pub fn assign_section(
        &mut self,
        node_id: NodeId,
        section_id: &SectionId,
    ) -> Result<(), ConsistencyError> {
        let section = self
            .sections
            .section_by_id(section_id)
            .cloned()
            .ok_or_else(|| ConsistencyError::UnregisteredSection(section_id.clone()))?;
        let node = self
            .nodes
            .get_mut(&node_id)
            .ok_or(ConsistencyError::MissingEndpoint(node_id))?;
        node.section = section_id.clone();
        match &section.kind {
            SectionKind::Membrane { inner, outer } => {
                node.state = NodeState::Membrane;
                node.container = ConcentrationContainer::membrane(
                    outer.clone(),
                    inner.clone(),
                    section_id.clone(),
                );
            }
            SectionKind::EnclosedCompartment => {
                node.state = if section_id.as_str() == DEFAULT_SECTION_ID {
                    NodeState::Aqueous
                } else {
                    NodeState::Cytosol
                };
            }
        }
        Ok(())
    }

    /// Reassign every node whose position falls inside `region` to the given
    /// section. Returns how many nodes were reassigned.
    pub fn add_nodes_to_compartment(
        &mut self,
        section_id: &SectionId,
        region: Region,
    ) -> Result<usize, ConsistencyError> {
        if !self.sections.contains(section_id) {
            return Err(ConsistencyError::UnregisteredSection(section_id.clone()));
        }
        let affected: Vec<NodeId> = self
            .nodes
            .values()
            .filter(|node| region.contains(node.position))
            .map(|node| node.id)
            .collect();
        for id in &affected {
            self.assign_section(*id, section_id)?;
        }
        log::debug!("Reassigned {} nodes to section '{}'", affected.len(), section_id);
        Ok(affected.len())
    }

    /// Connect two existing nodes. Adding an existing edge is a no-op.
    pub fn add_edge(&mut self, a: NodeId, b: NodeId) -> Result<(), ConsistencyError> {
        if !self.nodes.contains_key(&a) {
            return Err(ConsistencyError::MissingEndpoint(a));
        }
        if !self.nodes.contains_key(&b) {
            return Err(ConsistencyError::MissingEndpoint(b));
        }
        let key = if a <= b { (a, b) } else { (b, a) };
        self.edges.insert(key);
        self.adjacency.entry(a).or_default().insert(b);
        self.adjacency.entry(b).or_default().insert(a);
        Ok(())
    }

    /// Remove a node and every edge touching it. Returns whether a removal
    /// occurred; removing an absent node is an idempotent no-op.
    pub fn remove_node(&mut self, id: NodeId) -> bool {
        if self.nodes.remove(&id).is_none() {
            return false;
        }
        if let Some(neighbors) = self.adjacency.remove(&id) {
            for neighbor in neighbors {
                if let Some(set) = self.adjacency.get_mut(&neighbor) {
                    set.remove(&id);
                }
                let key = if id <= neighbor { (id, neighbor) } else { (neighbor, id) };
                self.edges.remove(&key);
            }
        }
        self.coordinates.retain(|_, v| *v != id);
        log::debug!("Removed node {}", id);
        true
    }

    pub fn node(&self, id: NodeId) -> Option<&AutomatonNode> {
        self.nodes.get(&id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut AutomatonNode> {
        self.nodes.get_mut(&id)
    }

    /// Node at grid coordinate (column, row); rectangular graphs only
    pub fn node_at(&self, column: usize, row: usize) -> Option<&AutomatonNode> {
        self.coordinates.get(&(column, row)).and_then(|id| self.nodes.get(id))
    }

    pub fn node_at_mut(&mut self, column: usize, row: usize) -> Option<&mut AutomatonNode> {
        let id = self.coordinates.get(&(column, row)).copied()?;
        self.nodes.get_mut(&id)
    }

    /// All nodes of one grid row, in column order
    pub fn nodes_of_row(&self, row: usize) -> Vec<NodeId> {
        let mut ids: Vec<(usize, NodeId)> = self
            .coordinates
            .iter()
            .filter(|((_, r), _)| *r == row)
            .map(|((c, _), id)| (*c, *id))
            .collect();
        ids.sort_unstable();
        ids.into_iter().map(|(_, id)| id).collect()
    }

    /// All nodes in id order
    pub fn nodes(&self) -> impl Iterator<Item = &AutomatonNode> {
        self.nodes.values()
    }

    pub fn nodes_mut(&mut self) -> impl Iterator<Item = &mut AutomatonNode> {
        self.nodes.values_mut()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Neighbors of a node in id order; empty for unknown nodes
    pub fn neighbors(&self, id: NodeId) -> Vec<NodeId> {
        self.adjacency
            .get(&id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// All edges with their membrane classification, in endpoint order
    pub fn edges(&self) -> impl Iterator<Item = AutomatonEdge> + '_ {
        self.edges.iter().map(|&(a, b)| AutomatonEdge {
            a,
            b,
            both_membrane: self.is_membrane_node(a) && self.is_membrane_node(b),
        })
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    fn is_membrane_node(&self, id: NodeId) -> bool {
        self.nodes
            .get(&id)
            .map(|node| node.state == NodeState::Membrane)
            .unwrap_or(false)
    }

    /// Nodes currently flagged for observation, in id order
    pub fn observed_nodes(&self) -> Vec<NodeId> {
        self.nodes
            .values()
            .filter(|node| node.observed)
            .map(|node| node.id)
            .collect()
    }

    /// Set the same concentration of `entity` on every node, under each
    /// node's own section.
    pub fn fill_with_concentration(&mut self, entity: &EntityId, value: MolarConcentration) {
        for node in self.nodes.values_mut() {
            node.set_concentration(entity.clone(), value);
        }
    }

    /// Fill every node with a uniformly random concentration in
    /// `[0, max_mol_per_l]`, under each node's own section.
    pub fn fill_with_random_concentration<R: Rng>(
        &mut self,
        entity: &EntityId,
        max_mol_per_l: f64,
        rng: &mut R,
    ) {
        for node in self.nodes.values_mut() {
            let value = MolarConcentration::new(rng.gen_range(0.0..=max_mol_per_l));
            node.set_concentration(entity.clone(), value);
        }
    }

    /// Total amount of `entity` over all nodes and all sections
    pub fn total_concentration(&self, entity: &EntityId) -> MolarConcentration {
        self.nodes.values().map(|node| node.container.total(entity)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rectangular_construction() {
        let graph = AutomatonGraph::rectangular(3, 2);
        assert_eq!(graph.node_count(), 6);
        // 2 rows of 2 horizontal edges + 3 vertical edges
        assert_eq!(graph.edge_count(), 7);
        assert_eq!(graph.nodes_of_row(0).len(), 3);
        assert!(graph.node_at(2, 1).is_some());
        assert!(graph.node_at(3, 0).is_none());
    }

    #[test]
    fn test_remove_node_purges_edges() {
        let mut graph = AutomatonGraph::rectangular(2, 2);
        let target = graph.node_at(0, 0).unwrap().id;
        let neighbor = graph.node_at(1, 0).unwrap().id;

        assert!(graph.remove_node(target));
        assert!(!graph.remove_node(target), "second removal is a no-op");
        assert!(!graph.neighbors(neighbor).contains(&target));
        for edge in graph.edges() {
            assert!(edge.a != target && edge.b != target);
        }
    }

    #[test]
    fn test_edge_requires_existing_endpoints() {
        let mut graph = AutomatonGraph::rectangular(2, 1);
        let a = graph.node_at(0, 0).unwrap().id;
        let err = graph.add_edge(a, NodeId(99));
        assert!(matches!(err, Err(ConsistencyError::MissingEndpoint(NodeId(99)))));
    }

    #[test]
    fn test_assign_section_requires_registration() {
        let mut graph = AutomatonGraph::rectangular(1, 1);
        let id = graph.node_at(0, 0).unwrap().id;
        let err = graph.assign_section(id, &SectionId::new("nowhere"));
        assert!(matches!(err, Err(ConsistencyError::UnregisteredSection(_))));
    }

    #[test]
    fn test_membrane_assignment_swaps_container() {
        let mut graph = AutomatonGraph::rectangular(1, 1);
        graph.add_cell_section(CellSection::compartment("cyt", "Cytoplasm")).unwrap();
        graph.add_cell_section(CellSection::compartment("ext", "Extracellular")).unwrap();
        graph
            .add_cell_section(CellSection::membrane(
                "pm",
                "Plasma membrane",
                SectionId::new("cyt"),
                SectionId::new("ext"),
            ))
            .unwrap();

        let id = graph.node_at(0, 0).unwrap().id;
        graph.assign_section(id, &SectionId::new("pm")).unwrap();
        let node = graph.node(id).unwrap();
        assert_eq!(node.state, NodeState::Membrane);
        assert!(matches!(node.container, ConcentrationContainer::Membrane { .. }));
    }

    #[test]
    fn test_region_reassignment_counts_nodes() {
        let mut graph = AutomatonGraph::rectangular(3, 3);
        graph.add_cell_section(CellSection::compartment("cyt", "Cytoplasm")).unwrap();
        let count = graph
            .add_nodes_to_compartment(
                &SectionId::new("cyt"),
                Region::new(Vec2::new(0.0, 0.0), Vec2::new(1.0, 2.0)),
            )
            .unwrap();
        assert_eq!(count, 6);
        assert_eq!(graph.node_at(0, 0).unwrap().state, NodeState::Cytosol);
        assert_eq!(graph.node_at(2, 0).unwrap().state, NodeState::Aqueous);
    }

    #[test]
    fn test_reassignment_orphans_old_section_keys() {
        let mut graph = AutomatonGraph::rectangular(1, 1);
        graph.add_cell_section(CellSection::compartment("cyt", "Cytoplasm")).unwrap();
        let id = graph.node_at(0, 0).unwrap().id;

        let entity = EntityId::new("atp");
        graph
            .node_mut(id)
            .unwrap()
            .set_concentration(entity.clone(), MolarConcentration::new(0.5));
        graph.assign_section(id, &SectionId::new("cyt")).unwrap();

        let node = graph.node(id).unwrap();
        // The active section no longer reaches the old value...
        assert!(node.concentration(&entity).mol_per_l() == 0.0);
        // ...but the old key is still queryable through its own section.
        let orphaned = node
            .container
            .get(&entity, &SectionId::new(DEFAULT_SECTION_ID));
        assert!((orphaned.mol_per_l() - 0.5).abs() < 1e-15);
    }
}
