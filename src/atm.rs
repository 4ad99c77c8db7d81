//! Atmospheric structure: pressure layers, temperature profiles, and
//! hydrostatic equilibrium.

mod hydrostatic;
mod pressure;
mod profile;

pub use hydrostatic::{
    gravity_profile, normalized_layer_height, number_density, pressure_scale_height,
};
pub use pressure::{LayerOrder, PressureLayers};
pub use profile::{ClipPolicy, TemperatureProfile, TemperatureRange};

use crate::error::RtmError;

/// Gravity in cm/s², either constant or per layer.
#[derive(Debug, Clone, PartialEq)]
pub enum Gravity {
    /// Same gravity in every layer
    Constant(f64),
    /// One value per layer, in the layer order of the atmosphere
    Profile(Vec<f64>),
}

impl Gravity {
    /// Gravity in layer `layer`.
    pub fn at(&self, layer: usize) -> f64 {
        match self {
            Gravity::Constant(g) => *g,
            Gravity::Profile(g) => g[layer],
        }
    }

    /// Check the gravity against the number of layers.
    pub(crate) fn validate(&self, nlayer: usize) -> Result<(), RtmError> {
        let positive = match self {
            Gravity::Constant(g) => *g > 0.,
            Gravity::Profile(g) => {
                if g.len() != nlayer {
                    return Err(RtmError::InconsistentInputs);
                }
                g.iter().all(|g| *g > 0.)
            }
        };
        if positive {
            Ok(())
        } else {
            Err(RtmError::InvalidInput("gravity must be positive"))
        }
    }
}

/// Radius and gravity at the bottom boundary of the bottom layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanetBoundary {
    /// Radius in cm
    pub radius_btm: f64,
    /// Gravity in cm/s², i.e. `G M_p / radius_btm²`
    pub gravity_btm: f64,
}

/// Per-layer physical state handed to the radiative transfer solvers.
///
/// Only what the solvers read is carried here. Mixing ratios enter earlier,
/// when cross sections are turned into optical depth, and are passed to
/// [`ArtCommon::opacity_profile_lines`](crate::rtm::ArtCommon::opacity_profile_lines)
/// and [`OpticalDepthAccumulator`](crate::rtm::OpticalDepthAccumulator) directly.
#[derive(Debug, Clone, PartialEq)]
pub struct AtmosphereState {
    /// Temperature in K, already clipped to the valid range
    pub temperature: Vec<f64>,
    /// Mean molecular weight in atomic mass units
    pub mean_molecular_weight: Vec<f64>,
    /// Gravity
    pub gravity: Gravity,
    /// Planet boundary, needed for transmission geometry
    pub boundary: Option<PlanetBoundary>,
    /// Surface temperature in K; if set, emission is terminated by a surface
    /// source instead of zero
    pub surface_temperature: Option<f64>,
}

impl AtmosphereState {
    /// State with a constant gravity, mean molecular weight, and no boundary.
    pub fn new(temperature: Vec<f64>, mean_molecular_weight: f64, gravity: Gravity) -> Self {
        let n = temperature.len();
        Self {
            temperature,
            mean_molecular_weight: vec![mean_molecular_weight; n],
            gravity,
            boundary: None,
            surface_temperature: None,
        }
    }

    /// Attach a planet boundary.
    pub fn with_boundary(mut self, boundary: PlanetBoundary) -> Self {
        self.boundary = Some(boundary);
        self
    }

    /// Attach a surface temperature.
    pub fn with_surface_temperature(mut self, surface_temperature: f64) -> Self {
        self.surface_temperature = Some(surface_temperature);
        self
    }

    /// Number of layers.
    pub fn len(&self) -> usize {
        self.temperature.len()
    }

    /// Whether there are no layers.
    pub fn is_empty(&self) -> bool {
        self.temperature.is_empty()
    }
}
