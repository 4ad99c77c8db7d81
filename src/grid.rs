//! Wavenumber grids.

use crate::error::RtmError;

/// Unit of the end points passed to [`SpectralGrid::log_uniform`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridUnit {
    /// Wavenumber in cm⁻¹
    Wavenumber,
    /// Wavelength in Å
    Angstrom,
    /// Wavelength in nm
    Nanometer,
}

impl GridUnit {
    /// Convert a value in this unit to wavenumber in cm⁻¹.
    fn to_wavenumber(self, value: f64) -> f64 {
        match self {
            GridUnit::Wavenumber => value,
            GridUnit::Angstrom => 1.0e8 / value,
            GridUnit::Nanometer => 1.0e7 / value,
        }
    }
}

/// Increasing wavenumber samples (cm⁻¹), fixed for a run.
///
/// These are the columns of every cross-section and optical depth matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralGrid {
    wavenumber: Vec<f64>,
}

impl SpectralGrid {
    /// Relative tolerance used to decide whether a grid is log-uniform.
    const LOG_UNIFORM_TOLERANCE: f64 = 1.0e-6;

    /// Build `n` samples uniformly spaced in ln ν between `x0` and `x1`.
    ///
    /// The end points may be given in either order and in any [`GridUnit`];
    /// the result is always sorted by increasing wavenumber.
    pub fn log_uniform(x0: f64, x1: f64, n: usize, unit: GridUnit) -> Result<Self, RtmError> {
        if n < 2 {
            return Err(RtmError::InvalidGrid("need at least two samples"));
        }
        if !(x0.is_finite() && x1.is_finite() && x0 > 0. && x1 > 0.) || x0 == x1 {
            return Err(RtmError::InvalidGrid(
                "end points must be distinct, finite and positive",
            ));
        }

        let (nu0, nu1) = {
            let a = unit.to_wavenumber(x0);
            let b = unit.to_wavenumber(x1);
            (a.min(b), a.max(b))
        };
        let log_nu0 = nu0.ln();
        let step = (nu1.ln() - log_nu0) / (n - 1) as f64;

        let mut wavenumber: Vec<f64> = (0..n).map(|i| (log_nu0 + step * i as f64).exp()).collect();
        // Pin the end exactly, it's otherwise off by rounding
        wavenumber[n - 1] = nu1;

        Ok(Self { wavenumber })
    }

    /// Use an existing set of wavenumbers (cm⁻¹).
    pub fn from_wavenumbers(wavenumber: Vec<f64>) -> Result<Self, RtmError> {
        if wavenumber.is_empty() {
            return Err(RtmError::InvalidGrid("empty grid"));
        }
        if wavenumber.iter().any(|nu| !nu.is_finite() || *nu <= 0.) {
            return Err(RtmError::InvalidGrid("wavenumbers must be finite and positive"));
        }
        if wavenumber.windows(2).any(|w| w[1] <= w[0]) {
            return Err(RtmError::InvalidGrid("wavenumbers must be strictly increasing"));
        }
        Ok(Self { wavenumber })
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.wavenumber.len()
    }

    /// Is the grid empty? (Never, by construction.)
    pub fn is_empty(&self) -> bool {
        self.wavenumber.is_empty()
    }

    /// Wavenumbers in cm⁻¹.
    pub fn wavenumber(&self) -> &[f64] {
        &self.wavenumber
    }

    /// Wavelengths in Å, in the same (decreasing) order as the wavenumbers.
    pub fn wavelength_aa(&self) -> Vec<f64> {
        self.wavenumber.iter().map(|nu| 1.0e8 / nu).collect()
    }

    /// Spectral resolution `R = 1 / Δ ln ν` of a log-uniform grid.
    ///
    /// Line-shape synthesis works in units of grid bins, which only have a
    /// fixed width in ln ν on such a grid.
    pub fn resolution(&self) -> Result<f64, RtmError> {
        let n = self.wavenumber.len();
        if n < 2 {
            return Err(RtmError::InvalidGrid("need at least two samples"));
        }
        let step = (self.wavenumber[n - 1] / self.wavenumber[0]).ln() / (n - 1) as f64;
        let uniform = self.wavenumber.windows(2).all(|w| {
            ((w[1] / w[0]).ln() - step).abs() <= Self::LOG_UNIFORM_TOLERANCE * step
        });
        if !uniform {
            return Err(RtmError::InvalidGrid(
                "line-shape synthesis needs a log-uniform wavenumber grid",
            ));
        }
        Ok(1.0 / step)
    }

    /// Fractional bin index of wavenumber `nu` on a log-uniform grid of
    /// resolution `resolution`.
    pub(crate) fn fractional_index(&self, nu: f64, resolution: f64) -> f64 {
        resolution * (nu / self.wavenumber[0]).ln()
    }
}
