//! Planck source function.

use ndarray::Array2;

use crate::constants::{C, C2, H};
use crate::error::RtmError;

/// `π B_ν` in erg s⁻¹ cm⁻² (cm⁻¹)⁻¹ at `temperature` (K) for each wavenumber
/// (cm⁻¹).
pub fn pi_planck(temperature: f64, wavenumber: &[f64]) -> Vec<f64> {
    let factor = 2.0 * std::f64::consts::PI * H * C * C;
    wavenumber
        .iter()
        .map(|&nu| factor * nu.powi(3) / (C2 * nu / temperature).exp_m1())
        .collect()
}

/// `π B_ν` for each layer temperature, layer × wavenumber.
pub fn pi_planck_matrix(temperature: &[f64], wavenumber: &[f64]) -> Result<Array2<f64>, RtmError> {
    if temperature.iter().any(|t| !(*t > 0.)) {
        return Err(RtmError::InvalidInput("temperature must be positive"));
    }
    let mut source = Array2::zeros((temperature.len(), wavenumber.len()));
    for (mut row, &t) in source.outer_iter_mut().zip(temperature) {
        for (s, b) in row.iter_mut().zip(pi_planck(t, wavenumber)) {
            *s = b;
        }
    }
    Ok(source)
}
