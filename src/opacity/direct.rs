//! Direct line-by-line summation of Voigt profiles.

use rayon::prelude::*;

use super::lines::{doppler_sigma_factor, LineDatabase};
use super::voigt::voigt_profile;
use super::CrossSection;
use crate::error::RtmError;
use crate::grid::SpectralGrid;

/// Brute-force cross-section calculator: the exact Voigt profile of every
/// line at every grid point, with no binning and no wing cutoff.
///
/// Cost scales with lines × grid points, so this is mostly a reference for
/// the binned methods. The grid does not need to be log-uniform.
#[derive(Debug, Clone)]
pub struct OpaDirect {
    grid: SpectralGrid,
    db: LineDatabase,
}

impl OpaDirect {
    /// Calculator for `db` on `grid`.
    pub fn new(db: &LineDatabase, grid: SpectralGrid) -> Self {
        Self {
            grid,
            db: db.clone(),
        }
    }
}

impl CrossSection for OpaDirect {
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

        let doppler = doppler_sigma_factor(temperature, self.db.molmass);
        // (center, strength, sigma, gamma) in cm⁻¹ units
        let profiles: Vec<(f64, f64, f64, f64)> = self
            .db
            .lines
            .iter()
            .map(|line| {
                (
                    line.nu_line,
                    self.db.line_strength(line, temperature),
                    line.nu_line * doppler,
                    self.db.gamma_pressure(line, temperature, pressure) + line.gamma_natural,
                )
            })
            .collect();

        Ok(self
            .grid
            .wavenumber()
            .par_iter()
            .map(|&nu| {
                profiles
                    .iter()
                    .map(|&(center, strength, sigma, gamma)| {
                        strength * voigt_profile(nu - center, sigma, gamma)
                    })
                    .sum()
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opacity::{LineRecord, PartitionFunction};
    use approx::assert_relative_eq;

    #[test]
    fn single_line_integrates_to_strength() {
        let line = LineRecord {
            nu_line: 1000.,
            elower: 500.,
            line_strength_ref: 1.0e-20,
            gamma_ref: 0.05,
            n_texp: 0.7,
            gamma_natural: 0.,
        };
        let partition = PartitionFunction::from_fn(vec![100., 3000.], |t| t).unwrap();
        let db = LineDatabase::new(vec![line], 28.0, partition).unwrap();

        let grid =
            SpectralGrid::from_wavenumbers((0..40001).map(|i| 980. + 0.001 * i as f64).collect())
                .unwrap();
        let direct = OpaDirect::new(&db, grid);
        let xs = direct.xsvector(296., 0.1).unwrap();
        let total: f64 = xs.iter().sum::<f64>() * 0.001;

        // the Lorentzian wings beyond ±20 cm⁻¹ carry 2 γ / (π 20) of the line
        let gamma = 0.005;
        let missing = 2. * gamma / (std::f64::consts::PI * 20.);
        assert_relative_eq!(total, 1.0e-20 * (1. - missing), max_relative = 1e-3);
    }
}
