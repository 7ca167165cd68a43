//! Per-node concentration storage.
//!
//! Every node owns exactly one container mapping (entity, section) to a
//! molar concentration. Nodes sitting on a membrane use the membrane
//! variant, which keeps the outer-compartment side, the inner-compartment
//! side, and the membrane surface itself as three separate key spaces that
//! never mix implicitly.

use std::collections::BTreeMap;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub};

use crate::chemistry::EntityId;
use crate::model::sections::SectionId;

/// Molar concentration (mol/L)
///
/// Concentrations move through all arithmetic as this quantity type; raw
/// floats only appear at the unit boundary (`mol_per_l` / `new`).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct MolarConcentration(f64);

impl MolarConcentration {
    pub const ZERO: Self = Self(0.0);

    /// Construct from a mol/L value
    pub fn new(mol_per_l: f64) -> Self {
        Self(mol_per_l)
    }

    /// Numeric value in mol/L
    pub fn mol_per_l(self) -> f64 {
        self.0
    }

    /// Clamp to the physical range (concentrations cannot be negative)
    pub fn clamped(self) -> Self {
        Self(self.0.max(0.0))
    }

    pub fn abs(self) -> Self {
        Self(self.0.abs())
    }
}

impl Add for MolarConcentration {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for MolarConcentration {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for MolarConcentration {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Neg for MolarConcentration {
    type Output = Self;
    fn neg(self) -> Self {
        Self(-self.0)
    }
}

impl Mul<f64> for MolarConcentration {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        Self(self.0 * rhs)
    }
}

impl Sum for MolarConcentration {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, c| acc + c)
    }
}

/// Which logical side of a membrane node a concentration belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembraneSide {
    /// The outer compartment half of the node
    Outer,
    /// The inner compartment half of the node
    Inner,
    /// Species embedded in the membrane itself
    MembraneSurface,
}

/// Per-node concentration storage, exclusively owned by one node
///
/// Both variants share the invariant that every (entity, section) pair ever
/// written stays queryable for the lifetime of the container and that reads
/// of unset pairs yield zero rather than failing.
#[derive(Debug, Clone)]
pub enum ConcentrationContainer {
    /// A node lying wholly inside one compartment
    Simple {
        concentrations: BTreeMap<(EntityId, SectionId), MolarConcentration>,
    },
    /// A node straddling a membrane: two compartment sides plus the surface
    Membrane {
        outer_section: SectionId,
        inner_section: SectionId,
        membrane_section: SectionId,
        concentrations: BTreeMap<(EntityId, SectionId), MolarConcentration>,
    },
}

impl ConcentrationContainer {
    /// Container for an ordinary compartment node
    pub fn simple() -> Self {
        Self::Simple {
            concentrations: BTreeMap::new(),
        }
    }

    /// Container for a membrane node separating `outer` from `inner`
    pub fn membrane(outer: SectionId, inner: SectionId, membrane: SectionId) -> Self {
        Self::Membrane {
            outer_section: outer,
            inner_section: inner,
            membrane_section: membrane,
            concentrations: BTreeMap::new(),
        }
    }

    fn map(&self) -> &BTreeMap<(EntityId, SectionId), MolarConcentration> {
        match self {
            Self::Simple { concentrations } => concentrations,
            Self::Membrane { concentrations, .. } => concentrations,
        }
    }

    fn map_mut(&mut self) -> &mut BTreeMap<(EntityId, SectionId), MolarConcentration> {
        match self {
            Self::Simple { concentrations } => concentrations,
            Self::Membrane { concentrations, .. } => concentrations,
        }
    }

    /// Concentration of `entity` in `section`; zero when unset
    pub fn get(&self, entity: &EntityId, section: &SectionId) -> MolarConcentration {
        self.map()
            .get(&(entity.clone(), section.clone()))
            .copied()
            .unwrap_or(MolarConcentration::ZERO)
    }

    /// Explicitly section-scoped read, used for nodes spanning multiple
    /// sections. Alias of [`get`](Self::get).
    pub fn available_concentration(
        &self,
        entity: &EntityId,
        section: &SectionId,
    ) -> MolarConcentration {
        self.get(entity, section)
    }

    /// Overwrite the concentration of `entity` in `section`.
    ///
    /// Values are clamped at zero, matching physical range.
    pub fn set(&mut self, entity: EntityId, section: SectionId, value: MolarConcentration) {
        self.map_mut().insert((entity, section), value.clamped());
    }

    /// Add a (possibly negative) delta to the stored concentration
    pub fn apply_delta(&mut self, entity: EntityId, section: SectionId, delta: MolarConcentration) {
        let current = self.get(&entity, &section);
        self.set(entity, section, current + delta);
    }

    /// Resolve a membrane side to its section id. Returns `None` on a
    /// simple container.
    pub fn side_section(&self, side: MembraneSide) -> Option<&SectionId> {
        match self {
            Self::Simple { .. } => None,
            Self::Membrane {
                outer_section,
                inner_section,
                membrane_section,
                ..
            } => Some(match side {
                MembraneSide::Outer => outer_section,
                MembraneSide::Inner => inner_section,
                MembraneSide::MembraneSurface => membrane_section,
            }),
        }
    }

    /// Read scoped to one membrane side; zero on a simple container
    pub fn get_side(&self, entity: &EntityId, side: MembraneSide) -> MolarConcentration {
        match self.side_section(side) {
            Some(section) => self.get(entity, section),
            None => MolarConcentration::ZERO,
        }
    }

    /// Write scoped to one membrane side; no-op on a simple container
    pub fn set_side(&mut self, entity: EntityId, side: MembraneSide, value: MolarConcentration) {
        if let Some(section) = self.side_section(side).cloned() {
            self.set(entity, section, value);
        }
    }

    /// All stored (entity, section, concentration) triples in key order
    pub fn iter(
        &self,
    ) -> impl Iterator<Item = (&EntityId, &SectionId, MolarConcentration)> {
        self.map().iter().map(|((e, s), c)| (e, s, *c))
    }

    /// Sum over every stored key for one entity, all sections included
    pub fn total(&self, entity: &EntityId) -> MolarConcentration {
        self.map()
            .iter()
            .filter(|((e, _), _)| e == entity)
            .map(|(_, c)| *c)
            .sum()
    }
}
