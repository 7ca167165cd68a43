//! Validation tests for free diffusion.
//!
//! Properties validated:
//! - the prescribed flux law moves exactly half the edge flux per endpoint
//! - closed systems conserve total concentration under pure diffusion
//! - gradients decay monotonically without sign reversal for small steps
//! - membrane-to-membrane edges are excluded from ordinary diffusion

use cellgraph::{
    AutomatonGraph, CellSection, ChemicalEntity, EntityId, FreeDiffusion, FreeDiffusionConfig,
    MembraneSide, MolarConcentration, SectionId, Simulation,
};

/// Two-node simulation with one solute.
///
/// At the default environment (Δt = 1 µs, d = 1 µm) a reference diffusivity
/// of `k · 1e6` µm²/s yields a per-epoch gradient coefficient of exactly `k`.
fn two_node_simulation(diffusivity_um2_per_s: f64) -> (Simulation, EntityId) {
    let mut simulation = Simulation::new();
    simulation
        .register_entity(
            ChemicalEntity::new("s", "Solute").with_diffusivity(diffusivity_um2_per_s),
        )
        .unwrap();
    simulation.set_graph(AutomatonGraph::rectangular(2, 1));
    let entity = EntityId::new("s");
    let a = simulation.graph().node_at(0, 0).unwrap().id;
    simulation
        .graph_mut()
        .node_mut(a)
        .unwrap()
        .set_concentration(entity.clone(), MolarConcentration::new(1.0));
    let module = FreeDiffusion::from_config(FreeDiffusionConfig::default(), &simulation).unwrap();
    simulation.add_module(Box::new(module));
    (simulation, entity)
}

fn concentrations(simulation: &Simulation, entity: &EntityId) -> (f64, f64) {
    let a = simulation.graph().node_at(0, 0).unwrap();
    let b = simulation.graph().node_at(1, 0).unwrap();
    (
        a.concentration(entity).mol_per_l(),
        b.concentration(entity).mol_per_l(),
    )
}

#[test]
fn test_prescribed_flux_law_at_unit_coefficient() {
    // k = D·Δt/d² = 1: the pair equilibrates in a single epoch.
    let (mut simulation, entity) = two_node_simulation(1e6);
    simulation.next_epoch().unwrap();

    let (c_a, c_b) = concentrations(&simulation, &entity);
    assert!((c_a - 0.5).abs() < 1e-12, "expected 0.5, got {}", c_a);
    assert!((c_b - 0.5).abs() < 1e-12, "expected 0.5, got {}", c_b);
}

#[test]
fn test_prescribed_flux_law_at_half_coefficient() {
    // k = 0.5: one epoch transfers a quarter of the gradient, landing on
    // (0.75, 0.25).
    let (mut simulation, entity) = two_node_simulation(0.5e6);
    simulation.next_epoch().unwrap();

    let (c_a, c_b) = concentrations(&simulation, &entity);
    assert!((c_a - 0.75).abs() < 1e-12, "expected 0.75, got {}", c_a);
    assert!((c_b - 0.25).abs() < 1e-12, "expected 0.25, got {}", c_b);
}

#[test]
fn test_gradient_decays_monotonically_without_overshoot() {
    let (mut simulation, entity) = two_node_simulation(0.5e6);
    let mut previous_gradient = 1.0;
    for _ in 0..50 {
        simulation.next_epoch().unwrap();
        let (c_a, c_b) = concentrations(&simulation, &entity);
        let gradient = c_a - c_b;
        assert!(gradient >= 0.0, "gradient reversed sign: {}", gradient);
        assert!(
            gradient <= previous_gradient + 1e-15,
            "gradient grew from {} to {}",
            previous_gradient,
            gradient
        );
        previous_gradient = gradient;
    }
    assert!(previous_gradient < 1e-5, "gradient failed to decay: {}", previous_gradient);
}

#[test]
fn test_closed_system_conserves_total_concentration() {
    let mut simulation = Simulation::new();
    simulation
        .register_entity(ChemicalEntity::new("s", "Solute").with_diffusivity(0.25e6))
        .unwrap();
    let mut graph = AutomatonGraph::rectangular(4, 4);
    let entity = EntityId::new("s");
    let mut rng = rand::thread_rng();
    graph.fill_with_random_concentration(&entity, 1.0, &mut rng);
    simulation.set_graph(graph);
    let module = FreeDiffusion::from_config(FreeDiffusionConfig::default(), &simulation).unwrap();
    simulation.add_module(Box::new(module));

    let initial = simulation.graph().total_concentration(&entity).mol_per_l();
    for _ in 0..200 {
        simulation.next_epoch().unwrap();
    }
    let after = simulation.graph().total_concentration(&entity).mol_per_l();
    assert!(
        (after - initial).abs() < 1e-9,
        "total drifted from {} to {}",
        initial,
        after
    );
}

#[test]
fn test_membrane_edges_excluded_from_free_diffusion() {
    let mut simulation = Simulation::new();
    simulation
        .register_entity(ChemicalEntity::new("s", "Solute").with_diffusivity(1e6))
        .unwrap();
    let mut graph = AutomatonGraph::rectangular(2, 1);
    graph.add_cell_section(CellSection::compartment("Cyt", "Cytoplasm")).unwrap();
    graph.add_cell_section(CellSection::compartment("Ext", "Extracellular")).unwrap();
    graph
        .add_cell_section(CellSection::membrane(
            "PM",
            "Plasma membrane",
            SectionId::new("Cyt"),
            SectionId::new("Ext"),
        ))
        .unwrap();
    for id in graph.nodes_of_row(0) {
        graph.assign_section(id, &SectionId::new("PM")).unwrap();
    }
    let entity = EntityId::new("s");
    let a = graph.node_at(0, 0).unwrap().id;
    graph.node_mut(a).unwrap().container.set_side(
        entity.clone(),
        MembraneSide::Inner,
        MolarConcentration::new(1.0),
    );
    simulation.set_graph(graph);
    let module = FreeDiffusion::from_config(FreeDiffusionConfig::default(), &simulation).unwrap();
    simulation.add_module(Box::new(module));

    simulation.next_epoch().unwrap();

    // The whole gradient sits across a membrane-to-membrane edge; ordinary
    // diffusion must not touch it.
    let node_a = simulation.graph().node_at(0, 0).unwrap();
    let node_b = simulation.graph().node_at(1, 0).unwrap();
    let inner_a = node_a
        .container
        .get_side(&entity, MembraneSide::Inner)
        .mol_per_l();
    let inner_b = node_b
        .container
        .get_side(&entity, MembraneSide::Inner)
        .mol_per_l();
    assert!((inner_a - 1.0).abs() < 1e-15);
    assert!(inner_b == 0.0);
}
