//! Configuration module for loading simulation parameters.
//!
//! Environmental parameters carry documented physical defaults and can be
//! loaded from JSON files.

mod parameters;

pub use parameters::EnvironmentParameters;
