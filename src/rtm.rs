//! Atmospheric radiative transfer for emission and transmission spectra.
//!
//! The solvers take a layer × wavenumber optical depth matrix, built with an
//! [`OpticalDepthAccumulator`], and an [`AtmosphereState`]. [`ArtCommon`]
//! holds what both geometries share: the pressure layers, the wavenumber grid,
//! and the valid temperature range.

mod emission;
mod optical_depth;
mod planck;
mod special;
mod transmission;


pub use emission::{
    rtrun_emis_pure_absorption, rtrun_emis_pure_absorption_direct,
    rtrun_emis_pure_absorption_surface, trans2e3, trans2e3_derivative,
};
pub use optical_depth::{layer_optical_depth, layer_optical_depth_cia, OpticalDepthAccumulator};
pub use planck::{pi_planck, pi_planck_matrix};
pub use transmission::{
    chord_geometric_matrix, chord_optical_depth, rtrun_trans_pure_absorption,
};

use log::debug;
use ndarray::{Array2, ArrayView2};

use crate::atm::{
    gravity_profile, normalized_layer_height, AtmosphereState, ClipPolicy, Gravity, LayerOrder,
    PressureLayers, TemperatureProfile, TemperatureRange,
};
use crate::error::RtmError;
use crate::grid::SpectralGrid;

/// Layers, grid, and temperature range shared by the radiative transfer
/// geometries.
#[derive(Debug, Clone)]
pub struct ArtCommon {
    layers: PressureLayers,
    grid: SpectralGrid,
    range: TemperatureRange,
    /// Irradiation geometry factor of the Guillot profile
    pub fguillot: f64,
}

impl ArtCommon {
    /// Default top pressure in bar.
    pub const DEFAULT_PRESSURE_TOP: f64 = 1.0e-8;
    /// Default bottom pressure in bar.
    pub const DEFAULT_PRESSURE_BTM: f64 = 1.0e2;
    /// Default number of layers.
    pub const DEFAULT_NLAYER: usize = 100;

    /// Layers from `pressure_top` to `pressure_btm` (bar) on `grid`.
    pub fn new(
        grid: SpectralGrid,
        pressure_top: f64,
        pressure_btm: f64,
        nlayer: usize,
        order: LayerOrder,
    ) -> Result<Self, RtmError> {
        let layers = PressureLayers::from_pressures(pressure_top, pressure_btm, nlayer, order)?;
        debug!(
            "{nlayer} layers from {pressure_top:e} to {pressure_btm:e} bar on {} wavenumbers",
            grid.len()
        );
        Ok(Self {
            layers,
            grid,
            range: TemperatureRange::default(),
            fguillot: TemperatureProfile::DEFAULT_GUILLOT_F,
        })
    }

    /// Default layers, top first.
    pub fn with_default_layers(grid: SpectralGrid) -> Result<Self, RtmError> {
        Self::new(
            grid,
            Self::DEFAULT_PRESSURE_TOP,
            Self::DEFAULT_PRESSURE_BTM,
            Self::DEFAULT_NLAYER,
            LayerOrder::TopFirst,
        )
    }

    /// The pressure layers.
    pub fn layers(&self) -> &PressureLayers {
        &self.layers
    }

    /// The wavenumber grid.
    pub fn grid(&self) -> &SpectralGrid {
        &self.grid
    }

    /// The valid temperature range.
    pub fn temperature_range(&self) -> TemperatureRange {
        self.range
    }

    /// Restrict temperatures to `[low, high]` K, typically the validity range
    /// of a precomputed line grid. The clipping policy is kept.
    pub fn change_temperature_range(&mut self, low: f64, high: f64) -> Result<(), RtmError> {
        self.range = TemperatureRange::new(low, high, self.range.policy())?;
        Ok(())
    }

    /// Set the clipping policy for out-of-range temperatures.
    pub fn set_clip_policy(&mut self, policy: ClipPolicy) -> Result<(), RtmError> {
        self.range = TemperatureRange::new(self.range.low(), self.range.high(), policy)?;
        Ok(())
    }

    /// Clip a temperature profile to the valid range.
    pub fn clip_temperature(&self, temperature: &[f64]) -> Result<Vec<f64>, RtmError> {
        self.range.clip_profile(temperature)
    }

    fn profile(&self, profile: TemperatureProfile) -> Result<Vec<f64>, RtmError> {
        let temperature = profile.temperature(self.layers.pressure())?;
        self.clip_temperature(&temperature)
    }

    /// Clipped power-law profile `t0 (P / 1 bar)^alpha`.
    pub fn powerlaw_temperature(&self, t0: f64, alpha: f64) -> Result<Vec<f64>, RtmError> {
        self.profile(TemperatureProfile::PowerLaw { t0, alpha })
    }

    /// Clipped gray profile.
    pub fn gray_temperature(&self, gravity: f64, kappa: f64, t_int: f64) -> Result<Vec<f64>, RtmError> {
        self.profile(TemperatureProfile::Gray {
            gravity,
            kappa,
            t_int,
        })
    }

    /// Clipped Guillot profile with irradiation factor [`Self::fguillot`].
    pub fn guillot_temperature(
        &self,
        gravity: f64,
        kappa: f64,
        gamma: f64,
        t_int: f64,
        t_irr: f64,
    ) -> Result<Vec<f64>, RtmError> {
        self.profile(TemperatureProfile::Guillot {
            gravity,
            kappa,
            gamma,
            t_int,
            t_irr,
            f: self.fguillot,
        })
    }

    /// Normalized layer heights and lower radii, see
    /// [`normalized_layer_height`].
    pub fn atmosphere_height(
        &self,
        temperature: &[f64],
        mean_molecular_weight: &[f64],
        radius_btm: f64,
        gravity_btm: f64,
    ) -> Result<(Vec<f64>, Vec<f64>), RtmError> {
        normalized_layer_height(
            temperature,
            mean_molecular_weight,
            &self.layers,
            radius_btm,
            gravity_btm,
        )
    }

    /// The same gravity in every layer.
    pub fn constant_gravity_profile(&self, gravity: f64) -> Vec<f64> {
        vec![gravity; self.layers.len()]
    }

    /// Hydrostatic gravity at the lower boundary of every layer.
    pub fn gravity_profile(
        &self,
        temperature: &[f64],
        mean_molecular_weight: &[f64],
        radius_btm: f64,
        gravity_btm: f64,
    ) -> Result<Vec<f64>, RtmError> {
        gravity_profile(
            temperature,
            mean_molecular_weight,
            &self.layers,
            radius_btm,
            gravity_btm,
        )
    }

    /// The same mixing ratio in every layer.
    pub fn constant_mmr_profile(&self, value: f64) -> Vec<f64> {
        vec![value; self.layers.len()]
    }

    /// Optical depth of a line absorber on these layers, see
    /// [`layer_optical_depth`].
    pub fn opacity_profile_lines(
        &self,
        xs: ArrayView2<'_, f64>,
        mixing_ratio: &[f64],
        molmass: f64,
        gravity: &Gravity,
    ) -> Result<Array2<f64>, RtmError> {
        layer_optical_depth(self.layers.dpressure(), xs, mixing_ratio, molmass, gravity)
    }

    /// Optical depth of a CIA pair on these layers, see
    /// [`layer_optical_depth_cia`].
    pub fn opacity_profile_cia(
        &self,
        logacia: ArrayView2<'_, f64>,
        temperature: &[f64],
        vmr1: &[f64],
        vmr2: &[f64],
        mean_molecular_weight: &[f64],
        gravity: &Gravity,
    ) -> Result<Array2<f64>, RtmError> {
        layer_optical_depth_cia(
            self.layers.pressure(),
            self.layers.dpressure(),
            logacia,
            temperature,
            vmr1,
            vmr2,
            mean_molecular_weight,
            gravity,
        )
    }

    /// An empty accumulator on these layers and grid.
    pub fn accumulator(&self) -> OpticalDepthAccumulator<'_> {
        OpticalDepthAccumulator::new(&self.layers, self.grid.len())
    }

    fn check(&self, dtau: ArrayView2<'_, f64>, state: &AtmosphereState) -> Result<(), RtmError> {
        if dtau.dim() != (self.layers.len(), self.grid.len()) || state.len() != self.layers.len() {
            return Err(RtmError::InconsistentInputs);
        }
        if state.mean_molecular_weight.len() != state.len() {
            return Err(RtmError::InconsistentInputs);
        }
        state.gravity.validate(state.len())
    }
}

/// Emission spectrum of a purely absorbing atmosphere.
#[derive(Debug, Clone)]
pub struct ArtEmisPure {
    common: ArtCommon,
}

impl ArtEmisPure {
    /// Emission on `common`'s layers and grid.
    pub fn new(common: ArtCommon) -> Self {
        Self { common }
    }

    /// Shared layers, grid and range.
    pub fn common(&self) -> &ArtCommon {
        &self.common
    }

    /// Mutable access to the shared configuration.
    pub fn common_mut(&mut self) -> &mut ArtCommon {
        &mut self.common
    }

    /// Emergent flux in erg s⁻¹ cm⁻² (cm⁻¹)⁻¹.
    ///
    /// The source is the Planck function at each layer temperature. With a
    /// surface temperature in `state`, the surface emits as a blackbody below
    /// the bottom layer.
    pub fn run(&self, dtau: ArrayView2<'_, f64>, state: &AtmosphereState) -> Result<Vec<f64>, RtmError> {
        self.common.check(dtau, state)?;
        let nu = self.common.grid.wavenumber();
        let source = pi_planck_matrix(&state.temperature, nu)?;
        let order = self.common.layers.order();
        match state.surface_temperature {
            Some(ts) => {
                if !(ts > 0.) {
                    return Err(RtmError::InvalidInput("surface temperature must be positive"));
                }
                let surface = pi_planck(ts, nu);
                rtrun_emis_pure_absorption_surface(dtau, source.view(), &surface, order)
            }
            None => rtrun_emis_pure_absorption(dtau, source.view(), order),
        }
    }
}

/// Transmission (transit) spectrum of a purely absorbing atmosphere.
#[derive(Debug, Clone)]
pub struct ArtTransPure {
    common: ArtCommon,
}

impl ArtTransPure {
    /// Transmission on `common`'s layers and grid.
    pub fn new(common: ArtCommon) -> Self {
        Self { common }
    }

    /// Shared layers, grid and range.
    pub fn common(&self) -> &ArtCommon {
        &self.common
    }

    /// Mutable access to the shared configuration.
    pub fn common_mut(&mut self) -> &mut ArtCommon {
        &mut self.common
    }

    /// Squared transit radius normalized by the bottom radius.
    ///
    /// Needs the planet boundary in `state` for the layer geometry.
    pub fn run(&self, dtau: ArrayView2<'_, f64>, state: &AtmosphereState) -> Result<Vec<f64>, RtmError> {
        self.common.check(dtau, state)?;
        let boundary = state
            .boundary
            .ok_or(RtmError::MissingInput("planet boundary"))?;
        let (height, radius_lower) = self.common.atmosphere_height(
            &state.temperature,
            &state.mean_molecular_weight,
            boundary.radius_btm,
            boundary.gravity_btm,
        )?;
        let order = self.common.layers.order();
        let cgm = chord_geometric_matrix(&height, &radius_lower, order)?;
        let tau_chord = chord_optical_depth(cgm.view(), dtau)?;
        rtrun_trans_pure_absorption(tau_chord.view(), &radius_lower, order)
    }
}

/// Radiative transfer geometry.
#[derive(Debug, Clone)]
pub enum Art {
    /// Emission, pure absorption
    EmisPure(ArtEmisPure),
    /// Transmission, pure absorption
    TransPure(ArtTransPure),
}

impl Art {
    /// Name of the geometry.
    pub fn method(&self) -> &'static str {
        match self {
            Art::EmisPure(_) => "emission_pure_absorption",
            Art::TransPure(_) => "transmission_pure_absorption",
        }
    }

    /// Shared layers, grid and range.
    pub fn common(&self) -> &ArtCommon {
        match self {
            Art::EmisPure(art) => art.common(),
            Art::TransPure(art) => art.common(),
        }
    }

    /// Emergent flux or squared transit radius, per wavenumber.
    pub fn run(&self, dtau: ArrayView2<'_, f64>, state: &AtmosphereState) -> Result<Vec<f64>, RtmError> {
        match self {
            Art::EmisPure(art) => art.run(dtau, state),
            Art::TransPure(art) => art.run(dtau, state),
        }
    }
}

impl From<ArtEmisPure> for Art {
    fn from(art: ArtEmisPure) -> Self {
        Art::EmisPure(art)
    }
}

impl From<ArtTransPure> for Art {
    fn from(art: ArtTransPure) -> Self {
        Art::TransPure(art)
    }
}
