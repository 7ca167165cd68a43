//! Environmental parameter structures.
//!
//! These are the physical parameters the diffusion math depends on. They are
//! passed explicitly into every module computation; there is no ambient
//! global state.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Reference temperature for diffusivity scaling (K)
pub const REFERENCE_TEMPERATURE_K: f64 = 293.15;

/// Reference viscosity for diffusivity scaling (mPa·s)
pub const REFERENCE_VISCOSITY_MPA_S: f64 = 1.0;

/// Environmental parameters shared by all update modules
///
/// Diffusivities registered on chemical entities are given for the reference
/// conditions (20 °C, water viscosity) and are rescaled to the configured
/// temperature and viscosity via the Einstein relation before use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentParameters {
    /// System temperature (K)
    /// Reference conditions: 293.15 K (20 °C)
    pub temperature_k: f64,

    /// Medium viscosity (mPa·s)
    /// Reference: ~1.0 mPa·s for water at 20 °C
    pub viscosity_mpa_s: f64,

    /// Distance between the centers of two adjacent nodes (µm)
    pub node_distance_um: f64,

    /// Simulated time advanced by one epoch (µs)
    pub time_step_us: f64,
}

impl EnvironmentParameters {
    /// Load parameters from a JSON file or return defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match std::fs::read_to_string(path.as_ref()) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(params) => {
                    log::info!("Loaded environment parameters from {:?}", path.as_ref());
                    params
                }
                Err(e) => {
                    log::warn!("Failed to parse environment parameters: {}, using defaults", e);
                    Self::default()
                }
            },
            Err(_) => {
                log::info!("Environment parameters file not found, using defaults");
                Self::default()
            }
        }
    }

    /// Time step in seconds
    pub fn time_step_sec(&self) -> f64 {
        self.time_step_us * 1e-6
    }

    /// Scale a reference diffusivity (µm²/s) to the configured environment
    /// and to per-epoch, per-node-distance² units.
    ///
    /// Einstein relation: D ∝ T/η, taken relative to the reference
    /// conditions. The returned value is dimensionless and directly usable
    /// as the gradient coefficient of one epoch.
    pub fn scaled_diffusivity(&self, diffusivity_um2_per_s: f64) -> f64 {
        let environment_factor = (self.temperature_k / REFERENCE_TEMPERATURE_K)
            * (REFERENCE_VISCOSITY_MPA_S / self.viscosity_mpa_s);
        let d = diffusivity_um2_per_s * environment_factor;
        d * self.time_step_sec() / (self.node_distance_um * self.node_distance_um)
    }
}

impl Default for EnvironmentParameters {
    fn default() -> Self {
        Self {
            temperature_k: REFERENCE_TEMPERATURE_K,
            viscosity_mpa_s: REFERENCE_VISCOSITY_MPA_S,
            node_distance_um: 1.0,
            time_step_us: 1.0,
        }
    }
}
