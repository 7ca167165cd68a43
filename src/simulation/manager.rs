//! The epoch scheduler.
//!
//! Runs the epoch loop on one dedicated background thread. Every loop
//! iteration computes an epoch; emission to listeners is throttled to a
//! configured ticks-per-second ceiling, so the number of computed epochs can
//! exceed the number of emitted events. Emission samples computation;
//! intermediate frames are dropped under load rather than blocking the loop
//! on a slow subscriber.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver};

use crate::error::SimulationError;
use crate::simulation::events::{
    GraphUpdatedEvent, GraphUpdateListener, NodeUpdatedEvent, NodeUpdateListener,
};
use crate::simulation::{Simulation, SimulationState};

/// Default emission ceiling, matching the interactive renderer's needs
pub const DEFAULT_TICKS_PER_SECOND: u32 = 20;

/// Listener collections are snapshotted at every emission, so registration
/// from other threads never corrupts or blocks an in-flight emission.
type Listeners<T> = Arc<RwLock<Vec<Arc<T>>>>;

fn snapshot<T: ?Sized>(listeners: &Listeners<T>) -> Vec<Arc<T>> {
    listeners
        .read()
        .map(|guard| guard.clone())
        .unwrap_or_default()
}

/// Drives a [`Simulation`] through its epoch loop
pub struct SimulationManager {
    simulation: Simulation,
    graph_listeners: Listeners<dyn GraphUpdateListener>,
    node_listeners: Listeners<dyn NodeUpdateListener>,
    emission_interval: Duration,
    termination_time_sec: Option<f64>,
}

impl SimulationManager {
    pub fn new(simulation: Simulation) -> Self {
        log::debug!("Initializing simulation manager");
        Self {
            simulation,
            graph_listeners: Arc::new(RwLock::new(Vec::new())),
            node_listeners: Arc::new(RwLock::new(Vec::new())),
            emission_interval: Duration::from_secs(1) / DEFAULT_TICKS_PER_SECOND,
            termination_time_sec: None,
        }
    }

    /// Cap event emission at `ticks_per_second`; computation is unaffected
    pub fn tie_emission_to_ticks(&mut self, ticks_per_second: u32) {
        let ticks = ticks_per_second.max(1);
        self.emission_interval = Duration::from_secs(1) / ticks;
    }

    /// Terminate the run once the simulated clock reaches `seconds`
    pub fn set_termination_time(&mut self, seconds: f64) {
        self.termination_time_sec = Some(seconds);
    }

    pub fn add_graph_listener(&self, listener: Arc<dyn GraphUpdateListener>) {
        log::info!("Added a graph update listener");
        if let Ok(mut guard) = self.graph_listeners.write() {
            guard.push(listener);
        }
    }

    pub fn add_node_listener(&self, listener: Arc<dyn NodeUpdateListener>) {
        log::info!("Added a node update listener");
        if let Ok(mut guard) = self.node_listeners.write() {
            guard.push(listener);
        }
    }

    pub fn remove_node_listener(&self, listener: &Arc<dyn NodeUpdateListener>) {
        if let Ok(mut guard) = self.node_listeners.write() {
            guard.retain(|l| !Arc::ptr_eq(l, listener));
        }
    }

    pub fn simulation(&self) -> &Simulation {
        &self.simulation
    }

    pub fn simulation_mut(&mut self) -> &mut Simulation {
        &mut self.simulation
    }

    /// Compute one epoch and emit unconditionally (the step button)
    pub fn step(&mut self) -> Result<(), SimulationError> {
        self.simulation.next_epoch()?;
        emit(
            &self.simulation,
            &snapshot(&self.graph_listeners),
            &snapshot(&self.node_listeners),
        );
        Ok(())
    }

    /// Spawn the epoch loop on a background thread.
    ///
    /// The loop checks the cooperative cancel flag at the top of each
    /// iteration and finishes (never aborts) the current iteration before
    /// exiting. The final simulation, or the error that stopped the loop,
    /// is delivered through the returned handle.
    pub fn start(self) -> SimulationHandle {
        let SimulationManager {
            mut simulation,
            graph_listeners,
            node_listeners,
            emission_interval: interval,
            termination_time_sec: termination,
        } = self;
        let cancelled = Arc::new(AtomicBool::new(false));
        let (sender, receiver) = bounded(1);
        let loop_cancelled = Arc::clone(&cancelled);
        let loop_graph_listeners = Arc::clone(&graph_listeners);
        let loop_node_listeners = Arc::clone(&node_listeners);

        let thread = thread::spawn(move || {
            simulation.set_state(SimulationState::Running);
            log::info!(
                "Simulation loop started (emission every {:?}, termination {:?} s)",
                interval,
                termination
            );

            let mut next_emission = Instant::now();
            let mut skips: u64 = 0;
            let outcome = loop {
                if loop_cancelled.load(Ordering::Acquire) {
                    simulation.set_state(SimulationState::Paused);
                    log::info!("Simulation cancelled after {} epochs", simulation.epoch());
                    break Ok(());
                }
                if let Some(end) = termination {
                    if simulation.elapsed_sec() >= end {
                        simulation.set_state(SimulationState::Terminated);
                        log::info!(
                            "Simulation reached termination time at epoch {}",
                            simulation.epoch()
                        );
                        break Ok(());
                    }
                }
                if let Err(e) = simulation.next_epoch() {
                    log::error!("Epoch loop stopped: {}", e);
                    simulation.set_state(SimulationState::Terminated);
                    break Err(e);
                }
                if Instant::now() >= next_emission {
                    next_emission = Instant::now() + interval;
                    emit(
                        &simulation,
                        &snapshot(&loop_graph_listeners),
                        &snapshot(&loop_node_listeners),
                    );
                    log::trace!("Emitted update events after {} skips", skips);
                    skips = 0;
                } else {
                    skips += 1;
                }
            };

            let _ = sender.send(outcome.map(|_| simulation));
        });

        SimulationHandle {
            cancelled,
            receiver,
            thread,
            graph_listeners,
            node_listeners,
        }
    }
}

/// Emit one graph-level event, then one node-level event per observed node.
///
/// A panicking listener is isolated and logged; emission continues with the
/// remaining listeners.
fn emit(
    simulation: &Simulation,
    graph_listeners: &[Arc<dyn GraphUpdateListener>],
    node_listeners: &[Arc<dyn NodeUpdateListener>],
) {
    let graph_event = GraphUpdatedEvent {
        graph: simulation.graph(),
        elapsed_sec: simulation.elapsed_sec(),
        epoch: simulation.epoch(),
    };
    for listener in graph_listeners {
        let outcome = catch_unwind(AssertUnwindSafe(|| listener.on_graph_updated(&graph_event)));
        if outcome.is_err() {
            log::error!("Graph update listener panicked; continuing emission");
        }
    }

    if node_listeners.is_empty() {
        return;
    }
    for node_id in simulation.observed_nodes() {
        let node = match simulation.graph().node(node_id) {
            Some(node) => node,
            None => continue,
        };
        let event = NodeUpdatedEvent::from_node(node, simulation.elapsed_sec());
        for listener in node_listeners {
            let outcome = catch_unwind(AssertUnwindSafe(|| listener.on_node_updated(&event)));
            if outcome.is_err() {
                log::error!(
                    "Node update listener panicked for node {}; continuing emission",
                    node_id
                );
            }
        }
    }
}

/// Handle to a running simulation loop
pub struct SimulationHandle {
    cancelled: Arc<AtomicBool>,
    receiver: Receiver<Result<Simulation, SimulationError>>,
    thread: JoinHandle<()>,
    graph_listeners: Listeners<dyn GraphUpdateListener>,
    node_listeners: Listeners<dyn NodeUpdateListener>,
}

impl SimulationHandle {
    /// Request cooperative cancellation; the loop exits after finishing its
    /// current iteration.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Register a graph listener while the loop runs; it takes effect at
    /// the next emission.
    pub fn add_graph_listener(&self, listener: Arc<dyn GraphUpdateListener>) {
        if let Ok(mut guard) = self.graph_listeners.write() {
            guard.push(listener);
        }
    }

    /// Register a node listener while the loop runs
    pub fn add_node_listener(&self, listener: Arc<dyn NodeUpdateListener>) {
        if let Ok(mut guard) = self.node_listeners.write() {
            guard.push(listener);
        }
    }

    /// Remove a node listener by identity
    pub fn remove_node_listener(&self, listener: &Arc<dyn NodeUpdateListener>) {
        if let Ok(mut guard) = self.node_listeners.write() {
            guard.retain(|l| !Arc::ptr_eq(l, listener));
        }
    }

    /// Wait for the loop to end and take back the simulation.
    ///
    /// Returns the state as of the last fully applied epoch, or the error
    /// that stopped the loop.
    pub fn join(self) -> Result<Simulation, SimulationError> {
        let outcome = self.receiver.recv().map_err(|_| SimulationError::ThreadLost)?;
        let _ = self.thread.join();
        outcome
    }
}
