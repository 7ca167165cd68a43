//! Cell sections: the named spatial regions that partition the simulated
//! space.
//!
//! A section is either an enclosed compartment (cytoplasm, extracellular
//! region) or a membrane separating two compartments. Sections have value
//! identity: two sections are the same section exactly when their ids match.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// Identifier of a cell section, unique within one graph
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SectionId(pub String);

impl SectionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SectionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Classification of a cell section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SectionKind {
    /// A volume fully enclosed by a boundary (or the unbounded exterior)
    EnclosedCompartment,
    /// A membrane separating two enclosed compartments
    Membrane {
        /// Section on the inner side of the membrane
        inner: SectionId,
        /// Section on the outer side of the membrane
        outer: SectionId,
    },
}

/// A named spatial region
///
/// Identity is immutable; which nodes belong to a section may change over
/// the lifetime of a graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellSection {
    pub id: SectionId,
    pub name: String,
    pub kind: SectionKind,
}

impl CellSection {
    /// Create an enclosed compartment
    pub fn compartment(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: SectionId::new(id),
            name: name.into(),
            kind: SectionKind::EnclosedCompartment,
        }
    }

    /// Create a membrane separating `inner` from `outer`
    pub fn membrane(
        id: impl Into<String>,
        name: impl Into<String>,
        inner: SectionId,
        outer: SectionId,
    ) -> Self {
        Self {
            id: SectionId::new(id),
            name: name.into(),
            kind: SectionKind::Membrane { inner, outer },
        }
    }

    pub fn is_membrane(&self) -> bool {
        matches!(self.kind, SectionKind::Membrane { .. })
    }
}

/// Registry of the sections present in one graph
#[derive(Debug, Clone, Default)]
pub struct SectionRegistry {
    sections: BTreeMap<SectionId, CellSection>,
}

impl SectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a section.
    ///
    /// Re-registering an identical section is a no-op. Registering a section
    /// whose id is taken by a section of a different kind fails.
    pub fn register(&mut self, section: CellSection) -> Result<(), ConfigurationError> {
        if let Some(existing) = self.sections.get(&section.id) {
            if existing.kind == section.kind {
                return Ok(());
            }
            return Err(ConfigurationError::DuplicateSection(section.id));
        }
        log::info!("Registered cell section '{}' ({})", section.id, section.name);
        self.sections.insert(section.id.clone(), section);
        Ok(())
    }

    pub fn section_by_id(&self, id: &SectionId) -> Option<&CellSection> {
        self.sections.get(id)
    }

    pub fn contains(&self, id: &SectionId) -> bool {
        self.sections.contains_key(id)
    }

    /// All registered sections in id order
    pub fn iter(&self) -> impl Iterator<Item = &CellSection> {
        self.sections.values()
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}
