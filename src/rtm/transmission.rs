//! Transmission spectra: chord geometry and transit radius.

use ndarray::{Array2, ArrayView2};
use smallvec::SmallVec;

use super::optical_depth::validate_optical_depth;
use crate::atm::LayerOrder;
use crate::error::RtmError;

/// Chord geometric matrix.
///
/// For the normalized layer heights and lower-boundary radii returned by
/// [`crate::atm::normalized_layer_height`], element `[i, j]` is the length of
/// the chord with impact parameter equal to the lower radius of layer `i`
/// inside layer `j`, divided by the height of layer `j`. It is zero for
/// layers below layer `i`. Multiplying by the layer optical depths gives the
/// chord optical depth, see [`chord_optical_depth`].
///
/// Both axes use the layer order of the inputs.
pub fn chord_geometric_matrix(
    height: &[f64],
    radius_lower: &[f64],
    order: LayerOrder,
) -> Result<Array2<f64>, RtmError> {
    let n = height.len();
    if radius_lower.len() != n {
        return Err(RtmError::InconsistentInputs);
    }
    if height.iter().chain(radius_lower).any(|v| !(*v > 0.)) {
        return Err(RtmError::InvalidInput(
            "layer heights and radii must be positive",
        ));
    }

    let ranked: SmallVec<[usize; 128]> = order.top_down(n).collect();
    let mut cgm = Array2::zeros((n, n));
    for (rank_i, &i) in ranked.iter().enumerate() {
        let b2 = radius_lower[i] * radius_lower[i];
        for &j in &ranked[..=rank_i] {
            let upper = radius_lower[j] + height[j];
            let outer = (upper * upper - b2).sqrt();
            let inner = if j == i {
                0.
            } else {
                (radius_lower[j] * radius_lower[j] - b2).max(0.).sqrt()
            };
            cgm[[i, j]] = 2. * (outer - inner) / height[j];
        }
    }
    Ok(cgm)
}

/// Optical depth along each chord, impact parameter × wavenumber.
pub fn chord_optical_depth(
    cgm: ArrayView2<'_, f64>,
    dtau: ArrayView2<'_, f64>,
) -> Result<Array2<f64>, RtmError> {
    if cgm.ncols() != dtau.nrows() || !cgm.is_square() {
        return Err(RtmError::InconsistentInputs);
    }
    validate_optical_depth(dtau)?;
    Ok(cgm.dot(&dtau))
}

/// Squared transit radius, normalized by the bottom radius, of a purely
/// absorbing atmosphere.
///
/// `tau_chord` is the chord optical depth for an impact parameter at the lower
/// radius of each layer. Everything below the bottom boundary is opaque, so
/// the result is `r_btm² + 2 ∫ (1 - e^(-τ)) b db`, integrated by the
/// trapezoid rule over the lower radii.
pub fn rtrun_trans_pure_absorption(
    tau_chord: ArrayView2<'_, f64>,
    radius_lower: &[f64],
    order: LayerOrder,
) -> Result<Vec<f64>, RtmError> {
    let n = radius_lower.len();
    if tau_chord.nrows() != n || n == 0 {
        return Err(RtmError::InconsistentInputs);
    }
    validate_optical_depth(tau_chord)?;

    let nwav = tau_chord.ncols();
    let mut bottom_up = order.top_down(n).rev();
    let Some(btm) = bottom_up.next() else {
        return Err(RtmError::InconsistentInputs);
    };
    let r_btm = radius_lower[btm];

    let absorbed_area = |layer: usize, k: usize| {
        let b = radius_lower[layer];
        -(-tau_chord[[layer, k]]).exp_m1() * b
    };
    let mut depth = vec![r_btm * r_btm; nwav];
    let mut lower = btm;
    for upper in bottom_up {
        let db = radius_lower[upper] - radius_lower[lower];
        for (k, d) in depth.iter_mut().enumerate() {
            *d += db * (absorbed_area(lower, k) + absorbed_area(upper, k));
        }
        lower = upper;
    }
    Ok(depth)
}
