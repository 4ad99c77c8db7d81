//! Opacity calculators: line cross sections and continuum absorption.
//!
//! Line opacity comes from one of three calculators over the same line list,
//! gathered in [`LineOpacity`]: the precomputed-grid method [`OpaPremodit`]
//! for repeated evaluation, the per-call [`OpaModit`], and the brute-force
//! [`OpaDirect`] which sums every line's Voigt profile. Continuum opacity is
//! gathered in [`ContinuumOpacity`].

mod cia;
mod direct;
mod dit;
mod lines;
mod mie;
mod modit;
mod premodit;
mod voigt;

pub use cia::{CiaTable, OpaCia};
pub use direct::OpaDirect;
pub use lines::{LineDatabase, LineRecord, PartitionFunction};
pub use mie::{MieParams, OpaMie, ParticleGrid};
pub use modit::{ModitConfig, OpaModit};
pub use premodit::{
    auto_reference_temperatures, elower_interpolation_error, optimal_delta_elower,
    ExpansionOrder, OpaPremodit, PrecomputedLineGrid, PremoditConfig, ReferenceTemperatures,
};
pub use voigt::{faddeeva, voigt_profile};

use ndarray::Array2;
use rayon::prelude::*;

use crate::error::RtmError;
use crate::grid::SpectralGrid;

/// Line cross sections on a fixed wavenumber grid.
pub trait CrossSection: Sync {
    /// The wavenumber grid of the output.
    fn grid(&self) -> &SpectralGrid;

    /// Cross section in cm² per molecule at `temperature` (K) and `pressure`
    /// (bar).
    fn xsvector(&self, temperature: f64, pressure: f64) -> Result<Vec<f64>, RtmError>;

    /// Cross-section matrix (layer × wavenumber) for per-layer temperatures
    /// and pressures. Layers are evaluated in parallel.
    fn xsmatrix(&self, temperature: &[f64], pressure: &[f64]) -> Result<Array2<f64>, RtmError> {
        xsmatrix_by_layer(self.grid().len(), temperature, pressure, |t, p| {
            self.xsvector(t, p)
        })
    }
}

/// Evaluate `xsvector` for every layer in parallel and stack the rows.
pub(crate) fn xsmatrix_by_layer<F>(
    nwav: usize,
    temperature: &[f64],
    pressure: &[f64],
    xsvector: F,
) -> Result<Array2<f64>, RtmError>
where
    F: Fn(f64, f64) -> Result<Vec<f64>, RtmError> + Sync,
{
    if temperature.len() != pressure.len() {
        return Err(RtmError::InconsistentInputs);
    }
    let rows = temperature
        .par_iter()
        .zip(pressure)
        .map(|(&t, &p)| xsvector(t, p))
        .collect::<Result<Vec<_>, _>>()?;

    let mut matrix = Array2::zeros((rows.len(), nwav));
    for (mut out, row) in matrix.outer_iter_mut().zip(rows) {
        if row.len() != nwav {
            return Err(RtmError::InconsistentInputs);
        }
        out.assign(&ndarray::ArrayView1::from(row.as_slice()));
    }
    Ok(matrix)
}

/// The line cross-section calculators.
#[derive(Debug, Clone)]
pub enum LineOpacity {
    /// Precomputed line grid
    Premodit(OpaPremodit),
    /// Per-call binning
    Modit(OpaModit),
    /// Per-line summation
    Direct(OpaDirect),
}

impl LineOpacity {
    /// Short name of the method.
    pub fn method(&self) -> &'static str {
        match self {
            LineOpacity::Premodit(_) => "premodit",
            LineOpacity::Modit(_) => "modit",
            LineOpacity::Direct(_) => "lpf",
        }
    }

    fn inner(&self) -> &dyn CrossSection {
        match self {
            LineOpacity::Premodit(opa) => opa,
            LineOpacity::Modit(opa) => opa,
            LineOpacity::Direct(opa) => opa,
        }
    }
}

impl CrossSection for LineOpacity {
    fn grid(&self) -> &SpectralGrid {
        self.inner().grid()
    }

    fn xsvector(&self, temperature: f64, pressure: f64) -> Result<Vec<f64>, RtmError> {
        self.inner().xsvector(temperature, pressure)
    }

    fn xsmatrix(&self, temperature: &[f64], pressure: &[f64]) -> Result<Array2<f64>, RtmError> {
        self.inner().xsmatrix(temperature, pressure)
    }
}

impl From<OpaPremodit> for LineOpacity {
    fn from(opa: OpaPremodit) -> Self {
        LineOpacity::Premodit(opa)
    }
}

impl From<OpaModit> for LineOpacity {
    fn from(opa: OpaModit) -> Self {
        LineOpacity::Modit(opa)
    }
}

impl From<OpaDirect> for LineOpacity {
    fn from(opa: OpaDirect) -> Self {
        LineOpacity::Direct(opa)
    }
}

/// The continuum opacity sources.
///
/// `Hminus` and `Rayleigh` are known sources without an implementation; every
/// operation on them fails with [`RtmError::NotImplemented`].
#[derive(Debug, Clone)]
pub enum ContinuumOpacity {
    /// Collision-induced absorption
    Cia(OpaCia),
    /// Particle optical properties from a Mie grid
    Mie(OpaMie),
    /// Bound-free and free-free H⁻ absorption
    Hminus,
    /// Rayleigh scattering
    Rayleigh,
}

impl ContinuumOpacity {
    /// Short name of the method.
    pub fn method(&self) -> &'static str {
        match self {
            ContinuumOpacity::Cia(_) => "cia",
            ContinuumOpacity::Mie(_) => "mie",
            ContinuumOpacity::Hminus => "hminus",
            ContinuumOpacity::Rayleigh => "rayleigh",
        }
    }

    fn placeholder(&self) -> Option<RtmError> {
        match self {
            ContinuumOpacity::Hminus => Some(RtmError::NotImplemented("H- continuum opacity")),
            ContinuumOpacity::Rayleigh => Some(RtmError::NotImplemented("Rayleigh scattering opacity")),
            _ => None,
        }
    }

    fn unsupported(&self, operation: &'static str) -> RtmError {
        self.placeholder()
            .unwrap_or_else(|| RtmError::UnsupportedOperation {
                method: self.method(),
                operation,
            })
    }

    /// CIA calculator, if this is one.
    fn cia(&self, operation: &'static str) -> Result<&OpaCia, RtmError> {
        match self {
            ContinuumOpacity::Cia(opa) => Ok(opa),
            _ => Err(self.unsupported(operation)),
        }
    }

    /// Mie calculator, if this is one.
    fn mie(&self, operation: &'static str) -> Result<&OpaMie, RtmError> {
        match self {
            ContinuumOpacity::Mie(opa) => Ok(opa),
            _ => Err(self.unsupported(operation)),
        }
    }

    /// log10 of the CIA coefficient (cm⁵) at `temperature` (K).
    pub fn logacia_vector(&self, temperature: f64) -> Result<Vec<f64>, RtmError> {
        self.cia("logacia_vector")?.logacia_vector(temperature)
    }

    /// log10 of the CIA coefficient (cm⁵), layer × wavenumber.
    pub fn logacia_matrix(&self, temperature: &[f64]) -> Result<Array2<f64>, RtmError> {
        self.cia("logacia_matrix")?.logacia_matrix(temperature)
    }

    /// Particle optical properties for one size distribution.
    pub fn mieparams_vector(&self, rg: f64, sigmag: f64) -> Result<MieParams, RtmError> {
        self.mie("mieparams_vector")?.mieparams_vector(rg, sigmag)
    }

    /// Particle optical properties, layer × wavenumber.
    pub fn mieparams_matrix(
        &self,
        rg: &[f64],
        sigmag: &[f64],
    ) -> Result<(Array2<f64>, Array2<f64>, Array2<f64>), RtmError> {
        self.mie("mieparams_matrix")?.mieparams_matrix(rg, sigmag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{mock_cia_table, mock_co_database, mock_co_grid, mock_particle_grid};

    #[test]
    fn line_methods_share_the_interface() {
        let db = mock_co_database();
        let opacities: Vec<LineOpacity> = vec![
            OpaPremodit::new(&db, mock_co_grid(), PremoditConfig::auto(500., 1500.))
                .unwrap()
                .into(),
            OpaModit::new(&db, mock_co_grid(), ModitConfig::default())
                .unwrap()
                .into(),
        ];
        for opa in &opacities {
            let xs = opa.xsmatrix(&[800., 1000.], &[0.1, 1.0]).unwrap();
            assert_eq!(xs.dim(), (2, opa.grid().len()));
            assert!(xs.iter().all(|x| *x >= 0.));
        }
        assert_eq!(opacities[0].method(), "premodit");
        assert_eq!(opacities[1].method(), "modit");
    }

    #[test]
    fn placeholders_fail_explicitly() {
        for opa in [ContinuumOpacity::Hminus, ContinuumOpacity::Rayleigh] {
            assert!(matches!(
                opa.logacia_vector(1000.),
                Err(RtmError::NotImplemented(_))
            ));
            assert!(matches!(
                opa.mieparams_vector(1e-4, 2.0),
                Err(RtmError::NotImplemented(_))
            ));
        }
    }

    #[test]
    fn mismatched_operations_are_unsupported() {
        let grid = mock_co_grid();
        let cia = ContinuumOpacity::Cia(OpaCia::new(mock_cia_table(), grid.clone()));
        let mie = ContinuumOpacity::Mie(OpaMie::new(mock_particle_grid(), grid));

        assert!(cia.logacia_vector(1000.).is_ok());
        assert_eq!(
            cia.mieparams_vector(1e-4, 2.0).unwrap_err(),
            RtmError::UnsupportedOperation {
                method: "cia",
                operation: "mieparams_vector"
            }
        );
        assert!(mie.mieparams_vector(1e-4, 2.0).is_ok());
        assert!(matches!(
            mie.logacia_matrix(&[1000.]),
            Err(RtmError::UnsupportedOperation { method: "mie", .. })
        ));
    }
}
