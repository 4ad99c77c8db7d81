//! Layer optical depths from cross sections and CIA coefficients.

use ndarray::{Array2, ArrayView2, Zip};

use crate::atm::{number_density, Gravity, PressureLayers};
use crate::constants::{BAR, KB, M_U};
use crate::error::RtmError;

/// Optical depth of each layer for a line absorber.
///
/// For pressure thicknesses `dpressure` in bar, a cross-section matrix `xs`
/// (layer × wavenumber, cm²), the absorber's mass mixing ratio per layer, its
/// molecular mass in atomic mass units and the gravity in cm/s², the optical
/// depth is the column number of absorbers times the cross section:
///
/// `dtau = |xs| MMR dP / (M m_u g)`
pub fn layer_optical_depth(
    dpressure: &[f64],
    xs: ArrayView2<'_, f64>,
    mixing_ratio: &[f64],
    molmass: f64,
    gravity: &Gravity,
) -> Result<Array2<f64>, RtmError> {
    let nlayer = dpressure.len();
    if xs.nrows() != nlayer || mixing_ratio.len() != nlayer {
        return Err(RtmError::InconsistentInputs);
    }
    gravity.validate(nlayer)?;
    if !(molmass > 0.) {
        return Err(RtmError::InvalidInput("molecular mass must be positive"));
    }

    let mut dtau = xs.mapv(f64::abs);
    for (layer, mut row) in dtau.outer_iter_mut().enumerate() {
        let column = mixing_ratio[layer] * dpressure[layer] * BAR
            / (molmass * M_U * gravity.at(layer));
        row *= column;
    }
    Ok(dtau)
}

/// Optical depth of each layer for collision-induced absorption.
///
/// `logacia` is log10 of the CIA coefficient (cm⁵), layer × wavenumber, and
/// `vmr1`, `vmr2` the volume mixing ratios of the colliding pair. Pressures
/// are in bar, temperatures in K, the mean molecular weight in atomic mass
/// units and the gravity in cm/s². The sum is done in log10 so the very large
/// and very small factors don't over- or underflow.
#[allow(clippy::too_many_arguments)]
pub fn layer_optical_depth_cia(
    pressure: &[f64],
    dpressure: &[f64],
    logacia: ArrayView2<'_, f64>,
    temperature: &[f64],
    vmr1: &[f64],
    vmr2: &[f64],
    mean_molecular_weight: &[f64],
    gravity: &Gravity,
) -> Result<Array2<f64>, RtmError> {
    let nlayer = pressure.len();
    let per_layer = [
        dpressure.len(),
        logacia.nrows(),
        temperature.len(),
        vmr1.len(),
        vmr2.len(),
        mean_molecular_weight.len(),
    ];
    if per_layer.iter().any(|&n| n != nlayer) {
        return Err(RtmError::InconsistentInputs);
    }
    gravity.validate(nlayer)?;
    if temperature.iter().chain(pressure).any(|v| !(*v > 0.)) {
        return Err(RtmError::InvalidInput(
            "temperature and pressure must be positive",
        ));
    }

    let log_kb = KB.log10();
    let log_mu = M_U.log10();
    let mut dtau = Array2::zeros(logacia.dim());
    for (layer, (mut out, logac)) in dtau.outer_iter_mut().zip(logacia.outer_iter()).enumerate() {
        let n = number_density(pressure[layer], temperature[layer]);
        let offset = (vmr1[layer] * n).log10() + (vmr2[layer] * n).log10() + log_kb
            - gravity.at(layer).log10()
            - log_mu;
        let scale = temperature[layer] / mean_molecular_weight[layer] * dpressure[layer]
            / pressure[layer];
        Zip::from(&mut out)
            .and(&logac)
            .for_each(|o, &l| *o = 10f64.powf(l + offset) * scale);
    }
    Ok(dtau)
}

/// Check that an optical depth matrix is finite and non-negative.
pub(crate) fn validate_optical_depth(dtau: ArrayView2<'_, f64>) -> Result<(), RtmError> {
    for ((layer, index), &v) in dtau.indexed_iter() {
        if !v.is_finite() {
            return Err(RtmError::NonFiniteOpticalDepth { layer, index });
        }
        if v < 0. {
            return Err(RtmError::InvalidInput("optical depth must be non-negative"));
        }
    }
    Ok(())
}

/// Running sum of the optical depth contributions of several opacity sources
/// on a fixed set of layers.
#[derive(Debug)]
pub struct OpticalDepthAccumulator<'a> {
    layers: &'a PressureLayers,
    dtau: Array2<f64>,
}

impl<'a> OpticalDepthAccumulator<'a> {
    /// Empty accumulator for `layers` and `nwav` wavenumbers.
    pub fn new(layers: &'a PressureLayers, nwav: usize) -> Self {
        Self {
            layers,
            dtau: Array2::zeros((layers.len(), nwav)),
        }
    }

    fn add(&mut self, dtau: ArrayView2<'_, f64>) -> Result<&mut Self, RtmError> {
        if dtau.dim() != self.dtau.dim() {
            return Err(RtmError::InconsistentInputs);
        }
        self.dtau += &dtau;
        Ok(self)
    }

    /// Add a line absorber, see [`layer_optical_depth`].
    pub fn add_lines(
        &mut self,
        xs: ArrayView2<'_, f64>,
        mixing_ratio: &[f64],
        molmass: f64,
        gravity: &Gravity,
    ) -> Result<&mut Self, RtmError> {
        let dtau = layer_optical_depth(self.layers.dpressure(), xs, mixing_ratio, molmass, gravity)?;
        self.add(dtau.view())
    }

    /// Add a CIA pair, see [`layer_optical_depth_cia`].
    pub fn add_cia(
        &mut self,
        logacia: ArrayView2<'_, f64>,
        temperature: &[f64],
        vmr1: &[f64],
        vmr2: &[f64],
        mean_molecular_weight: &[f64],
        gravity: &Gravity,
    ) -> Result<&mut Self, RtmError> {
        let dtau = layer_optical_depth_cia(
            self.layers.pressure(),
            self.layers.dpressure(),
            logacia,
            temperature,
            vmr1,
            vmr2,
            mean_molecular_weight,
            gravity,
        )?;
        self.add(dtau.view())
    }

    /// Add an optical depth matrix computed elsewhere.
    pub fn add_matrix(&mut self, dtau: ArrayView2<'_, f64>) -> Result<&mut Self, RtmError> {
        self.add(dtau)
    }

    /// The summed optical depth, checked to be finite and non-negative.
    pub fn finish(self) -> Result<Array2<f64>, RtmError> {
        validate_optical_depth(self.dtau.view())?;
        Ok(self.dtau)
    }
}
