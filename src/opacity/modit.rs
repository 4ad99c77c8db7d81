//! MODIT: per-call binning of lines onto the wavenumber and width grids.

use log::debug;
use ndarray::Array2;

use super::dit::{linear_weights, UniformAxis, VoigtConvolution, Weights};
use super::lines::{doppler_sigma_factor, LineDatabase};
use super::CrossSection;
use crate::error::RtmError;
use crate::grid::SpectralGrid;

/// Settings of the per-call binning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModitConfig {
    /// Step of the natural log of the Lorentzian width grid
    pub dit_grid_resolution: f64,
    /// Kernel reach in units of `sigma + gamma`; the whole grid if `None`
    pub wing_cutoff: Option<f64>,
}

impl Default for ModitConfig {
    fn default() -> Self {
        Self {
            dit_grid_resolution: 0.1,
            wing_cutoff: None,
        }
    }
}

/// Cross-section calculator that bins exact line strengths and widths on
/// every call.
///
/// Slower than [`OpaPremodit`](super::OpaPremodit) for repeated evaluation,
/// but free of the temperature expansion and energy grid.
#[derive(Debug, Clone)]
pub struct OpaModit {
    grid: SpectralGrid,
    resolution: f64,
    db: LineDatabase,
    config: ModitConfig,
    convolution: VoigtConvolution,
}

impl OpaModit {
    /// Calculator for `db` on `grid`, which must be log-uniform.
    pub fn new(db: &LineDatabase, grid: SpectralGrid, config: ModitConfig) -> Result<Self, RtmError> {
        if !(config.dit_grid_resolution.is_finite() && config.dit_grid_resolution > 0.) {
            return Err(RtmError::InvalidResolution(
                "width grid resolution must be positive",
            ));
        }
        if config.wing_cutoff.is_some_and(|c| !(c.is_finite() && c > 0.)) {
            return Err(RtmError::InvalidResolution("wing cutoff must be positive"));
        }
        let resolution = grid.resolution()?;
        Ok(Self {
            convolution: VoigtConvolution::new(grid.len()),
            grid,
            resolution,
            db: db.clone(),
            config,
        })
    }
}

impl CrossSection for OpaModit {
    fn grid(&self) -> &SpectralGrid {
        &self.grid
    }

    fn xsvector(&self, temperature: f64, pressure: f64) -> Result<Vec<f64>, RtmError> {
        if !(temperature > 0. && temperature.is_finite()) {
            return Err(RtmError::InvalidInput("temperature must be positive"));
        }
        if !(pressure >= 0. && pressure.is_finite()) {
            return Err(RtmError::InvalidInput("pressure must be non-negative"));
        }

        let n = self.grid.len();
        let r = self.resolution;
        let sigma = r * doppler_sigma_factor(temperature, self.db.molmass);
        // Lorentzian widths this far below the Doppler width don't change the
        // profile, and would stretch the width grid
        let gamma_floor = 1.0e-6 * sigma;

        let deposits: Vec<(Weights, f64, f64)> = self
            .db
            .lines
            .iter()
            .filter_map(|line| {
                let nu_weights = linear_weights(self.grid.fractional_index(line.nu_line, r), n)?;
                let gamma = (self.db.gamma_pressure(line, temperature, pressure)
                    + line.gamma_natural)
                    * r
                    / line.nu_line;
                let strength = self.db.line_strength(line, temperature);
                Some((nu_weights, gamma.max(gamma_floor).ln(), strength))
            })
            .collect();
        if deposits.len() < self.db.lines.len() {
            debug!(
                "{} lines outside the wavenumber grid were skipped",
                self.db.lines.len() - deposits.len()
            );
        }

        let mut xs = vec![0.; n];
        if deposits.is_empty() {
            return Ok(xs);
        }

        let (lg_min, lg_max) = deposits
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), d| {
                (lo.min(d.1), hi.max(d.1))
            });
        let axis = UniformAxis::covering(lg_min, lg_max, self.config.dit_grid_resolution);

        let mut lsd = Array2::<f64>::zeros((axis.len, n));
        for (nu_weights, log_gamma, strength) in &deposits {
            for &(ia, fa) in &axis.weights(*log_gamma) {
                for &(inu, fnu) in nu_weights {
                    lsd[[ia, inu]] += strength * fa * fnu;
                }
            }
        }

        let mut buffers = self.convolution.buffers();
        for (ia, row) in lsd.outer_iter().enumerate() {
            let row = row.as_slice().ok_or(RtmError::NotContiguous)?;
            let gamma = axis.value(ia).exp();
            self.convolution
                .convolve(row, sigma, gamma, self.config.wing_cutoff, &mut xs, &mut buffers);
        }

        // FFT round-off can dip below zero far from any line
        for (x, nu) in xs.iter_mut().zip(self.grid.wavenumber()) {
            *x = (*x * r / nu).max(0.);
        }
        Ok(xs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opacity::OpaDirect;
    use crate::testing::{mock_co_database, mock_co_grid, restrict_to_grid};

    #[test]
    fn matches_direct_summation() {
        let grid = mock_co_grid();
        // lines off the grid are dropped by the binning but not by the direct sum
        let db = restrict_to_grid(&mock_co_database(), &grid);
        let modit = OpaModit::new(&db, grid.clone(), ModitConfig::default()).unwrap();
        let direct = OpaDirect::new(&db, grid);

        let xs = modit.xsvector(1200., 1.0).unwrap();
        let reference = direct.xsvector(1200., 1.0).unwrap();
        for (a, b) in xs.iter().zip(&reference) {
            assert!((a / b - 1.).abs() < 0.01, "{a} vs {b}");
        }
    }

    #[test]
    fn zero_pressure_is_doppler_only() {
        let grid = mock_co_grid();
        let db = restrict_to_grid(&mock_co_database(), &grid);
        let modit = OpaModit::new(&db, grid, ModitConfig::default()).unwrap();
        let xs = modit.xsvector(1000., 0.).unwrap();
        assert!(xs.iter().all(|x| x.is_finite() && *x >= 0.));
        assert!(xs.iter().any(|x| *x > 0.));
    }

    #[test]
    fn rejects_bad_inputs() {
        let db = mock_co_database();
        let modit = OpaModit::new(&db, mock_co_grid(), ModitConfig::default()).unwrap();
        assert!(modit.xsvector(-10., 1.0).is_err());
        assert!(modit.xsvector(1000., f64::NAN).is_err());
        let config = ModitConfig {
            dit_grid_resolution: -0.1,
            ..Default::default()
        };
        assert!(OpaModit::new(&db, mock_co_grid(), config).is_err());
    }
}
