//! cellgraph - demo entry point
//!
//! Runs a small membrane/diffusion example headlessly: a 3×2 rectangular
//! graph whose top row is a plasma membrane between the extracellular
//! region and the cytoplasm, with one diffusing protein complex. Observed
//! node concentrations are exported to CSV.
//!
//! Usage:
//!   cargo run                     # default 0.05 simulated seconds
//!   cargo run -- --seconds 0.5    # longer run
//!   cargo run -- --ticks 10       # lower emission ceiling

use std::sync::Arc;

use anyhow::Result;
use cellgraph::{
    AutomatonGraph, CellSection, ChemicalEntity, CsvNodeWriter, EntityId, EnvironmentParameters,
    FreeDiffusion, FreeDiffusionConfig, MembraneSide, MembraneTransport,
    MembraneTransportConfig, MolarConcentration, SectionId, Simulation, SimulationManager,
};

fn build_simulation() -> Result<Simulation> {
    let mut simulation = Simulation::new();
    simulation.set_environment(EnvironmentParameters::load_or_default(
        "data/environment.json",
    ));

    // A membrane-anchored protein complex; diffusivity well below a small
    // solute's.
    simulation.register_entity(
        ChemicalEntity::new("G(BG)", "G protein beta-gamma complex").with_diffusivity(50.0),
    )?;

    let mut graph = AutomatonGraph::rectangular(3, 2);
    let extracellular = CellSection::compartment("Ext", "Extracellular region");
    let cytoplasm = CellSection::compartment("Cyt", "Cytoplasm");
    let membrane = CellSection::membrane(
        "PM",
        "Plasma membrane",
        cytoplasm.id.clone(),
        extracellular.id.clone(),
    );
    graph.add_cell_section(extracellular)?;
    graph.add_cell_section(cytoplasm)?;
    graph.add_cell_section(membrane)?;

    // Top row sits on the membrane, bottom row is cytoplasm.
    for node_id in graph.nodes_of_row(0) {
        graph.assign_section(node_id, &SectionId::new("PM"))?;
    }
    for node_id in graph.nodes_of_row(1) {
        graph.assign_section(node_id, &SectionId::new("Cyt"))?;
    }

    // Seed some complex on the cytoplasmic side of the first membrane node
    // and observe the opposite corner.
    let seed = graph.node_at(0, 0).expect("seed node").id;
    graph
        .node_mut(seed)
        .expect("seed node")
        .container
        .set_side(
            EntityId::new("G(BG)"),
            MembraneSide::Inner,
            MolarConcentration::new(0.1),
        );
    let watched = graph.node_at(2, 1).expect("watched node").id;
    simulation.set_graph(graph);
    simulation.set_observed(seed, true);
    simulation.set_observed(watched, true);

    let diffusion = FreeDiffusion::from_config(FreeDiffusionConfig::default(), &simulation)?;
    simulation.add_module(Box::new(diffusion));
    let transport =
        MembraneTransport::from_config(MembraneTransportConfig::default(), &simulation)?;
    simulation.add_module(Box::new(transport));

    Ok(simulation)
}

fn main() -> Result<()> {
    env_logger::init();
    log::info!("cellgraph demo starting");

    let mut seconds: f64 = 0.05;
    let mut ticks: u32 = 20;
    let args: Vec<String> = std::env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--seconds" if i + 1 < args.len() => {
                seconds = args[i + 1].parse()?;
                i += 2;
            }
            "--ticks" if i + 1 < args.len() => {
                ticks = args[i + 1].parse()?;
                i += 2;
            }
            other => {
                anyhow::bail!("unknown argument: {}", other);
            }
        }
    }

    let simulation = build_simulation()?;
    let entity = EntityId::new("G(BG)");
    let initial_total = simulation.graph().total_concentration(&entity);

    let mut manager = SimulationManager::new(simulation);
    manager.tie_emission_to_ticks(ticks);
    manager.set_termination_time(seconds);

    let writer = Arc::new(CsvNodeWriter::new()?);
    manager.add_node_listener(writer.clone());

    let handle = manager.start();
    let simulation = handle.join()?;
    writer.flush()?;

    let final_total = simulation.graph().total_concentration(&entity);
    println!("=== cellgraph demo ===");
    println!("Simulated time:   {:.6} s", simulation.elapsed_sec());
    println!("Computed epochs:  {}", simulation.epoch());
    println!("Total G(BG):      {:.9} mol/L (initially {:.9})",
        final_total.mol_per_l(),
        initial_total.mol_per_l()
    );
    println!("CSV export:       {}", writer.path().display());

    Ok(())
}
