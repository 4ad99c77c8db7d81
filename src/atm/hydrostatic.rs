//! Hydrostatic equilibrium: scale height, layer heights, and gravity.

use crate::constants::{BAR, KB, M_U};
use crate::error::RtmError;

use super::pressure::PressureLayers;

/// Pressure scale height in cm.
///
/// For gravity `gravity` in cm/s², temperature in K, and mean molecular
/// weight `mmw` in atomic mass units.
pub fn pressure_scale_height(gravity: f64, temperature: f64, mmw: f64) -> f64 {
    KB * temperature / (mmw * M_U * gravity)
}

/// Number density in cm⁻³ for a pressure in bar and temperature in K.
pub fn number_density(pressure: f64, temperature: f64) -> f64 {
    pressure * BAR / (KB * temperature)
}

/// Layer heights and lower-boundary radii, normalized by `radius_btm`.
///
/// The integration starts at the bottom boundary of the bottom layer (radius
/// 1) and moves upward. Each layer's height is its pressure scale height,
/// evaluated with the gravity at its lower boundary, times its thickness in
/// ln P. Gravity falls off as the inverse square of the radius, starting from
/// `gravity_btm` (cm/s²) at `radius_btm` (cm).
///
/// Returns `(normalized_height, normalized_radius_lower)`, both in the same
/// layer order as `layers`.
pub fn normalized_layer_height(
    temperature: &[f64],
    mean_molecular_weight: &[f64],
    layers: &PressureLayers,
    radius_btm: f64,
    gravity_btm: f64,
) -> Result<(Vec<f64>, Vec<f64>), RtmError> {
    let n = layers.len();
    if temperature.len() != n || mean_molecular_weight.len() != n {
        return Err(RtmError::InconsistentInputs);
    }
    if !(radius_btm > 0. && gravity_btm > 0.) {
        return Err(RtmError::InvalidInput(
            "bottom radius and gravity must be positive",
        ));
    }
    if temperature.iter().chain(mean_molecular_weight).any(|v| !(*v > 0.)) {
        return Err(RtmError::InvalidInput(
            "temperature and mean molecular weight must be positive",
        ));
    }

    let dlnp = -layers.pressure_decrease_rate().ln();
    let mut height = vec![0.; n];
    let mut radius_lower = vec![0.; n];

    let mut r = 1.0;
    for i in layers.top_down().rev() {
        let gravity = gravity_btm / (r * r);
        let h = pressure_scale_height(gravity, temperature[i], mean_molecular_weight[i]) * dlnp
            / radius_btm;
        height[i] = h;
        radius_lower[i] = r;
        r += h;
    }

    Ok((height, radius_lower))
}

/// Per-layer gravity (cm/s²) in hydrostatic equilibrium, evaluated at each
/// layer's lower boundary.
pub fn gravity_profile(
    temperature: &[f64],
    mean_molecular_weight: &[f64],
    layers: &PressureLayers,
    radius_btm: f64,
    gravity_btm: f64,
) -> Result<Vec<f64>, RtmError> {
    let (_, radius_lower) = normalized_layer_height(
        temperature,
        mean_molecular_weight,
        layers,
        radius_btm,
        gravity_btm,
    )?;
    Ok(radius_lower.iter().map(|r| gravity_btm / (r * r)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atm::LayerOrder;
    use approx::assert_relative_eq;

    #[test]
    fn jupiter_scale_height() {
        // ~27 km for Jupiter at 165 K
        let h = pressure_scale_height(2479., 165., 2.22);
        assert_relative_eq!(h / 1e5, 24.9, max_relative = 0.02);
    }

    #[test]
    fn heights_stack_from_the_bottom() {
        let layers = PressureLayers::new(-6., 2., 40, LayerOrder::TopFirst).unwrap();
        let t = vec![1000.; 40];
        let mmw = vec![2.33; 40];
        let (height, radius) =
            normalized_layer_height(&t, &mmw, &layers, 7.0e9, 2478.57).unwrap();

        assert_relative_eq!(radius[39], 1.0);
        for i in 0..39 {
            assert_relative_eq!(radius[i], radius[i + 1] + height[i + 1], max_relative = 1e-12);
            // Gravity weakens with height, so isothermal layers thicken upward
            assert!(height[i] > height[i + 1]);
        }

        let layers_rev = PressureLayers::new(-6., 2., 40, LayerOrder::BottomFirst).unwrap();
        let (height_rev, radius_rev) =
            normalized_layer_height(&t, &mmw, &layers_rev, 7.0e9, 2478.57).unwrap();
        assert_relative_eq!(radius_rev[0], 1.0);
        assert_relative_eq!(height_rev[0], height[39]);
        assert_relative_eq!(radius_rev[39], radius[0]);
    }

    #[test]
    fn gravity_decreases_upward() {
        let layers = PressureLayers::new(-6., 2., 10, LayerOrder::TopFirst).unwrap();
        let g = gravity_profile(&[1500.; 10], &[2.33; 10], &layers, 7.0e9, 2478.57).unwrap();
        assert_relative_eq!(g[9], 2478.57);
        assert!(g.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn ideal_gas_number_density() {
        // Loschmidt-ish: 1 bar at 273.15 K
        assert_relative_eq!(number_density(1.0, 273.15), 2.651e19, max_relative = 1e-3);
    }
}
