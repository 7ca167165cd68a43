//! CSV export of observed-node concentration time series.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Result;
use chrono::Local;
use serde::Serialize;

use crate::simulation::{NodeUpdatedEvent, NodeUpdateListener};

/// One exported row: a single concentration of one observed node
#[derive(Debug, Clone, Serialize)]
pub struct NodeEventRecord {
    /// Simulated seconds elapsed at emission
    pub elapsed_sec: f64,
    /// Node identifier
    pub node: String,
    /// Chemical entity id
    pub entity: String,
    /// Section the concentration is scoped to
    pub section: String,
    /// Concentration (mol/L)
    pub concentration_mol_per_l: f64,
}

/// CSV-writing node-update listener
///
/// Registered with the scheduler like any other listener; the writer locks
/// internally because emission happens on the scheduler thread.
pub struct CsvNodeWriter {
    writer: Mutex<csv::Writer<File>>,
    path: PathBuf,
}

impl CsvNodeWriter {
    /// Create a writer with a timestamped filename under `exports/`
    pub fn new() -> Result<Self> {
        let dir = PathBuf::from("exports");
        std::fs::create_dir_all(&dir)?;
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let filename = format!("nodes_{}.csv", timestamp);
        Self::at_path(dir.join(filename))
    }

    /// Create a writer at an explicit path
    pub fn at_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)?;
        let writer = csv::Writer::from_writer(file);
        log::info!("CSV node export started: {}", path.display());
        Ok(Self {
            writer: Mutex::new(writer),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush buffered rows to disk
    pub fn flush(&self) -> Result<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| anyhow::anyhow!("csv writer lock poisoned"))?;
        writer.flush()?;
        Ok(())
    }
}

impl NodeUpdateListener for CsvNodeWriter {
    fn on_node_updated(&self, event: &NodeUpdatedEvent) {
        let mut writer = match self.writer.lock() {
            Ok(writer) => writer,
            Err(_) => return,
        };
        for (entity, section, concentration) in &event.concentrations {
            let record = NodeEventRecord {
                elapsed_sec: event.elapsed_sec,
                node: event.node_id.to_string(),
                entity: entity.as_str().to_string(),
                section: section.as_str().to_string(),
                concentration_mol_per_l: concentration.mol_per_l(),
            };
            if let Err(e) = writer.serialize(&record) {
                log::error!("Failed to write node event record: {}", e);
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chemistry::EntityId;
    use crate::model::{MolarConcentration, NodeId, SectionId};

    #[test]
    fn test_writes_one_row_per_concentration() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nodes.csv");
        let writer = CsvNodeWriter::at_path(&path).unwrap();

        let event = NodeUpdatedEvent {
            node_id: NodeId(3),
            elapsed_sec: 0.5,
            concentrations: vec![
                (EntityId::new("a"), SectionId::new("cyt"), MolarConcentration::new(0.1)),
                (EntityId::new("b"), SectionId::new("cyt"), MolarConcentration::new(0.2)),
            ],
        };
        writer.on_node_updated(&event);
        writer.flush().unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let rows: Vec<&str> = contents.lines().collect();
        // Header plus two records
        assert_eq!(rows.len(), 3);
        assert!(rows[1].contains("n3"));
        assert!(rows[2].contains("0.2"));
    }
}
