//! Physical constants in cgs units.
#![allow(clippy::excessive_precision)]

/// Boltzmann constant (erg/K)
pub const KB: f64 = 1.380649e-16;

/// Atomic mass unit (g)
pub const M_U: f64 = 1.66053906660e-24;

/// Speed of light (cm/s)
pub const C: f64 = 2.99792458e10;

/// Planck constant (erg s)
pub const H: f64 = 6.62607015e-27;

/// Second radiation constant `hc/k_B` (cm K)
pub const C2: f64 = 1.4387768775039337;

/// One bar in dyn/cm²
pub const BAR: f64 = 1.0e6;

/// Reference temperature of HITRAN/ExoMol line parameters (K)
pub const TREF_ORIGINAL: f64 = 296.0;
