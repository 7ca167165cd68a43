//! Export functionality for simulation data.
//!
//! The CSV writer subscribes to node-update events and persists one record
//! per emitted (node, entity, section) concentration; the engine knows
//! nothing about the record format.

mod csv_export;

pub use csv_export::{CsvNodeWriter, NodeEventRecord};
