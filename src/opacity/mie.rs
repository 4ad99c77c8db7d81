//! Particle optical properties from a precomputed Mie grid.

use ndarray::{Array2, Array3, ArrayView1};

use super::cia::bracket;
use crate::error::RtmError;
use crate::grid::SpectralGrid;

/// Mie cross sections of a lognormal size distribution, tabulated over its
/// geometric mean radius `rg` and geometric standard deviation `sigmag`.
///
/// The tables are sampled on the wavenumber axis of the refractive index
/// data, not on the working spectral grid.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleGrid {
    /// Increasing geometric mean radii in cm
    rg: Vec<f64>,
    /// Increasing geometric standard deviations
    sigmag: Vec<f64>,
    /// Increasing wavenumbers of the refractive index data in cm⁻¹
    nu_refraction: Vec<f64>,
    /// Extinction cross section in cm², rg × sigmag × wavenumber
    extinction: Array3<f64>,
    /// Scattering cross section in cm², same shape
    scattering: Array3<f64>,
    /// Asymmetry parameter, same shape
    asymmetry: Array3<f64>,
}

impl ParticleGrid {
    /// Grid from its axes and tables, each `rg.len()` × `sigmag.len()` ×
    /// `nu_refraction.len()`.
    pub fn new(
        rg: Vec<f64>,
        sigmag: Vec<f64>,
        nu_refraction: Vec<f64>,
        extinction: Array3<f64>,
        scattering: Array3<f64>,
        asymmetry: Array3<f64>,
    ) -> Result<Self, RtmError> {
        let shape = (rg.len(), sigmag.len(), nu_refraction.len());
        if shape.0 == 0 || shape.1 == 0 || shape.2 == 0 {
            return Err(RtmError::InconsistentInputs);
        }
        if [&extinction, &scattering, &asymmetry]
            .iter()
            .any(|table| table.dim() != shape)
        {
            return Err(RtmError::InconsistentInputs);
        }
        let increasing = |v: &[f64]| v.windows(2).all(|w| w[1] > w[0]);
        if !increasing(&rg) || !increasing(&sigmag) || !increasing(&nu_refraction) {
            return Err(RtmError::InvalidInput("particle grid axes must be increasing"));
        }
        if rg[0] <= 0. {
            return Err(RtmError::InvalidInput("particle radii must be positive"));
        }
        Ok(Self {
            rg,
            sigmag,
            nu_refraction,
            extinction,
            scattering,
            asymmetry,
        })
    }

    /// Wavenumber axis of the tables in cm⁻¹.
    pub fn nu_refraction(&self) -> &[f64] {
        &self.nu_refraction
    }

    /// Extinction, scattering cross sections and asymmetry parameter on the
    /// refractive index wavenumber axis.
    ///
    /// Bilinear in `(ln rg, sigmag)`, clamped to the grid.
    pub fn mieparams_at_refraction_index_wavenumber(
        &self,
        rg: f64,
        sigmag: f64,
    ) -> Result<[Vec<f64>; 3], RtmError> {
        if !(rg > 0. && rg.is_finite() && sigmag.is_finite()) {
            return Err(RtmError::InvalidInput(
                "particle radius must be positive and finite",
            ));
        }
        let log_rg: Vec<f64> = self.rg.iter().map(|r| r.ln()).collect();
        let (ir, fr) = bracket(rg.ln(), &log_rg);
        let (is, fs) = bracket(sigmag, &self.sigmag);
        let ir1 = (ir + 1).min(self.rg.len() - 1);
        let is1 = (is + 1).min(self.sigmag.len() - 1);

        let corners = [
            (ir, is, (1. - fr) * (1. - fs)),
            (ir1, is, fr * (1. - fs)),
            (ir, is1, (1. - fr) * fs),
            (ir1, is1, fr * fs),
        ];
        let interpolate = |table: &Array3<f64>| -> Vec<f64> {
            let mut out = vec![0.; self.nu_refraction.len()];
            for &(i, j, w) in &corners {
                if w == 0. {
                    continue;
                }
                for (o, v) in out.iter_mut().zip(table.slice(ndarray::s![i, j, ..])) {
                    *o += w * v;
                }
            }
            out
        };
        Ok([
            interpolate(&self.extinction),
            interpolate(&self.scattering),
            interpolate(&self.asymmetry),
        ])
    }
}

/// Particle optical properties on the working spectral grid.
#[derive(Debug, Clone, PartialEq)]
pub struct MieParams {
    /// Extinction cross section in cm²
    pub sigma_extinction: Vec<f64>,
    /// Scattering cross section in cm²
    pub sigma_scattering: Vec<f64>,
    /// Asymmetry parameter
    pub asymmetry: Vec<f64>,
}

impl MieParams {
    /// Single scattering albedo, zero where there is no extinction.
    pub fn single_scattering_albedo(&self) -> Vec<f64> {
        self.sigma_extinction
            .iter()
            .zip(&self.sigma_scattering)
            .map(|(&ext, &sca)| if ext > 0. { sca / ext } else { 0. })
            .collect()
    }
}

/// Mie optical properties interpolated onto a spectral grid.
#[derive(Debug, Clone)]
pub struct OpaMie {
    particles: ParticleGrid,
    grid: SpectralGrid,
    nu_brackets: Vec<(usize, f64)>,
}

impl OpaMie {
    /// Calculator for `particles` on `grid`.
    pub fn new(particles: ParticleGrid, grid: SpectralGrid) -> Self {
        let nu_brackets = grid
            .wavenumber()
            .iter()
            .map(|&nu| bracket(nu, &particles.nu_refraction))
            .collect();
        Self {
            particles,
            grid,
            nu_brackets,
        }
    }

    /// The wavenumber grid of the output.
    pub fn grid(&self) -> &SpectralGrid {
        &self.grid
    }

    fn onto_grid(&self, values: &[f64]) -> Vec<f64> {
        let last = values.len() - 1;
        self.nu_brackets
            .iter()
            .map(|&(i, f)| values[i] + f * (values[(i + 1).min(last)] - values[i]))
            .collect()
    }

    /// Optical properties for the size distribution `(rg, sigmag)`, with `rg`
    /// in cm.
    pub fn mieparams_vector(&self, rg: f64, sigmag: f64) -> Result<MieParams, RtmError> {
        let [ext, sca, g] = self
            .particles
            .mieparams_at_refraction_index_wavenumber(rg, sigmag)?;
        Ok(MieParams {
            sigma_extinction: self.onto_grid(&ext),
            sigma_scattering: self.onto_grid(&sca),
            asymmetry: self.onto_grid(&g),
        })
    }

    /// Per-layer `(extinction cross section, single scattering albedo,
    /// asymmetry parameter)`, each layer × wavenumber.
    pub fn mieparams_matrix(
        &self,
        rg: &[f64],
        sigmag: &[f64],
    ) -> Result<(Array2<f64>, Array2<f64>, Array2<f64>), RtmError> {
        if rg.len() != sigmag.len() {
            return Err(RtmError::InconsistentInputs);
        }
        let shape = (rg.len(), self.grid.len());
        let mut extinction = Array2::zeros(shape);
        let mut albedo = Array2::zeros(shape);
        let mut asymmetry = Array2::zeros(shape);
        for (layer, (&r, &s)) in rg.iter().zip(sigmag).enumerate() {
            let params = self.mieparams_vector(r, s)?;
            let omega = params.single_scattering_albedo();
            extinction
                .row_mut(layer)
                .assign(&ArrayView1::from(params.sigma_extinction.as_slice()));
            albedo.row_mut(layer).assign(&ArrayView1::from(omega.as_slice()));
            asymmetry
                .row_mut(layer)
                .assign(&ArrayView1::from(params.asymmetry.as_slice()));
        }
        Ok((extinction, albedo, asymmetry))
    }
}
