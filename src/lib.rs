//! Spectrum synthesis for exoplanet and brown dwarf atmospheres.
//!
//! Line lists are turned into per-layer cross sections by the calculators in
//! [`opacity`], folded with mixing ratios and gravity into an optical depth
//! matrix, and integrated by the radiative transfer solvers in [`rtm`] into an
//! emission or transmission spectrum. The atmospheric structure (pressure
//! layers, temperature profiles, hydrostatic heights) lives in [`atm`], the
//! wavenumber grid in [`grid`].
//!
//! Everything is plain `f64` arithmetic; gradients for calibration are left to
//! the caller. With the `python` feature, a thin `pyo3` module exposes the
//! main entry points to Python.

pub mod atm;
pub mod constants;
mod error;
pub mod grid;
pub mod opacity;
pub mod rtm;

#[cfg(feature = "python")]
mod python;

#[cfg(test)]
mod testing;

pub use error::RtmError;
