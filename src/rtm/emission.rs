//! Emission spectra of a purely absorbing atmosphere.

use ndarray::{ArrayView2, Zip};

use super::optical_depth::validate_optical_depth;
use super::special::{expint1, expint2};
use crate::atm::LayerOrder;
use crate::error::RtmError;

/// Two-stream transmission of a layer with optical depth `tau`,
/// `(1 - τ) e^(-τ) + τ² E1(τ)`.
///
/// Exactly 1 at `τ = 0`, where the `τ² E1(τ)` term vanishes.
pub fn trans2e3(tau: f64) -> f64 {
    if tau == 0.0 {
        return 1.0;
    }
    ((1.0 - tau) * (-tau).exp() + tau * tau * expint1(tau)).max(0.0)
}

/// Derivative of [`trans2e3`] with respect to the optical depth, `-2 E2(τ)`.
pub fn trans2e3_derivative(tau: f64) -> f64 {
    -2.0 * expint2(tau)
}

fn check_shapes(
    dtau: ArrayView2<'_, f64>,
    source: ArrayView2<'_, f64>,
    surface: Option<&[f64]>,
) -> Result<(), RtmError> {
    if dtau.dim() != source.dim() {
        return Err(RtmError::InconsistentInputs);
    }
    if let Some(sb) = surface {
        if sb.len() != dtau.ncols() {
            return Err(RtmError::InconsistentInputs);
        }
    }
    validate_optical_depth(dtau)
}

fn two_stream(
    dtau: ArrayView2<'_, f64>,
    source: ArrayView2<'_, f64>,
    surface: Option<&[f64]>,
    order: LayerOrder,
) -> Result<Vec<f64>, RtmError> {
    check_shapes(dtau, source, surface)?;

    let nwav = dtau.ncols();
    let mut flux = vec![0.; nwav];
    // Product of the transmissions of every layer above the current one
    let mut trans_above = vec![1.; nwav];
    for layer in order.top_down(dtau.nrows()) {
        Zip::from(&mut flux[..])
            .and(&mut trans_above[..])
            .and(dtau.row(layer))
            .and(source.row(layer))
            .for_each(|f, above, &tau, &s| {
                let trans = trans2e3(tau);
                *f += (1. - trans) * s * *above;
                *above *= trans;
            });
    }
    if let Some(sb) = surface {
        for ((f, above), s) in flux.iter_mut().zip(&trans_above).zip(sb) {
            *f += s * above;
        }
    }
    Ok(flux)
}

/// Emergent flux of a purely absorbing atmosphere in the two-stream
/// approximation.
///
/// `dtau` is the layer × wavenumber optical depth and `source` the source
/// function on the same shape, usually [`super::pi_planck_matrix`]. Each
/// layer emits `(1 - T) S`, attenuated by the transmission `T` of every layer
/// above it. Nothing is emitted from below the bottom layer.
pub fn rtrun_emis_pure_absorption(
    dtau: ArrayView2<'_, f64>,
    source: ArrayView2<'_, f64>,
    order: LayerOrder,
) -> Result<Vec<f64>, RtmError> {
    two_stream(dtau, source, None, order)
}

/// Same as [`rtrun_emis_pure_absorption`], with a surface source `surface`
/// (one value per wavenumber) below the bottom layer.
pub fn rtrun_emis_pure_absorption_surface(
    dtau: ArrayView2<'_, f64>,
    source: ArrayView2<'_, f64>,
    surface: &[f64],
    order: LayerOrder,
) -> Result<Vec<f64>, RtmError> {
    two_stream(dtau, source, Some(surface), order)
}

/// Emergent flux by direct integration along the vertical,
/// `Σ S e^(-τ) Δτ` with `τ` the optical depth from the top through the
/// bottom of each layer.
///
/// Only accurate for optically thin layers; kept as a cross-check of the
/// two-stream solver.
pub fn rtrun_emis_pure_absorption_direct(
    dtau: ArrayView2<'_, f64>,
    source: ArrayView2<'_, f64>,
    order: LayerOrder,
) -> Result<Vec<f64>, RtmError> {
    check_shapes(dtau, source, None)?;

    let nwav = dtau.ncols();
    let mut flux = vec![0.; nwav];
    let mut tau = vec![0.; nwav];
    for layer in order.top_down(dtau.nrows()) {
        Zip::from(&mut flux[..])
            .and(&mut tau[..])
            .and(dtau.row(layer))
            .and(source.row(layer))
            .for_each(|f, tau, &dt, &s| {
                *tau += dt;
                *f += s * (-*tau).exp() * dt;
            });
    }
    Ok(flux)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use ndarray::{array, Array2};

    #[test]
    fn transmission_limits() {
        assert_eq!(trans2e3(0.0), 1.0);
        assert_eq!(trans2e3_derivative(0.0), -2.0);
        assert_relative_eq!(trans2e3(1e-9), 1.0, max_relative = 1e-8);
        assert!(trans2e3(50.) < 1e-20);
        assert_eq!(trans2e3(1000.), 0.0);
        // (1 - 1) e^-1 + E1(1)
        assert_relative_eq!(trans2e3(1.0), 0.2193839344, max_relative = 1e-5);
    }

    #[test]
    fn derivative_matches_finite_difference() {
        for &tau in &[0.01, 0.3, 0.7, 2.5, 5.0] {
            let h = 1e-6 * tau;
            let fd = (trans2e3(tau + h) - trans2e3(tau - h)) / (2. * h);
            assert_relative_eq!(fd, trans2e3_derivative(tau), max_relative = 2e-3);
        }
    }

    #[test]
    fn single_layer() {
        let dtau = array![[0.0, 0.5, 3.0]];
        let source = array![[2.0, 2.0, 2.0]];
        let flux = rtrun_emis_pure_absorption(dtau.view(), source.view(), LayerOrder::TopFirst)
            .unwrap();
        for (f, &tau) in flux.iter().zip(dtau.iter()) {
            assert_relative_eq!(*f, 2.0 * (1. - trans2e3(tau)), max_relative = 1e-12);
        }

        let with_surface = rtrun_emis_pure_absorption_surface(
            dtau.view(),
            source.view(),
            &[5.0, 5.0, 5.0],
            LayerOrder::TopFirst,
        )
        .unwrap();
        assert_relative_eq!(with_surface[0], 5.0);
        assert_relative_eq!(
            with_surface[1],
            flux[1] + 5.0 * trans2e3(0.5),
            max_relative = 1e-12
        );
    }

    #[test]
    fn layer_order_does_not_matter() {
        let dtau = array![[0.1, 0.01], [0.5, 0.2], [2.0, 1.0]];
        let source = array![[1.0, 1.5], [2.0, 2.5], [3.0, 3.5]];
        let top = rtrun_emis_pure_absorption(dtau.view(), source.view(), LayerOrder::TopFirst)
            .unwrap();

        let flip = |a: &Array2<f64>| {
            let mut b = a.clone();
            b.invert_axis(ndarray::Axis(0));
            b
        };
        let btm = rtrun_emis_pure_absorption(
            flip(&dtau).view(),
            flip(&source).view(),
            LayerOrder::BottomFirst,
        )
        .unwrap();
        for (a, b) in top.iter().zip(&btm) {
            assert_relative_eq!(*a, *b, max_relative = 1e-14);
        }

        // the upper layer hides part of the lower ones
        let expected = (1. - trans2e3(0.1)) * 1.0
            + (1. - trans2e3(0.5)) * 2.0 * trans2e3(0.1)
            + (1. - trans2e3(2.0)) * 3.0 * trans2e3(0.1) * trans2e3(0.5);
        assert_relative_eq!(top[0], expected, max_relative = 1e-12);
    }

    #[test]
    fn direct_agrees_when_thin() {
        let n = 200;
        let dtau = Array2::from_elem((n, 1), 1e-5);
        let source = Array2::from_shape_fn((n, 1), |(i, _)| 1.0 + i as f64 / n as f64);
        let two_stream =
            rtrun_emis_pure_absorption(dtau.view(), source.view(), LayerOrder::TopFirst).unwrap();
        let direct =
            rtrun_emis_pure_absorption_direct(dtau.view(), source.view(), LayerOrder::TopFirst)
                .unwrap();
        // the two-stream emission of a thin layer is 2Δτ S with a diffusivity of 2
        assert_relative_eq!(two_stream[0], 2. * direct[0], max_relative = 2e-3);
    }

    #[test]
    fn optically_thick_isothermal() {
        let dtau = Array2::from_elem((30, 2), 1.0);
        let source = Array2::from_elem((30, 2), 7.0);
        let flux =
            rtrun_emis_pure_absorption(dtau.view(), source.view(), LayerOrder::TopFirst).unwrap();
        assert_abs_diff_eq!(flux[0], 7.0, epsilon = 1e-12);
    }

    #[test]
    fn rejects_bad_input() {
        let source = Array2::zeros((2, 2));
        let nan = array![[0.0, 0.0], [f64::INFINITY, 0.0]];
        assert_eq!(
            rtrun_emis_pure_absorption(nan.view(), source.view(), LayerOrder::TopFirst),
            Err(RtmError::NonFiniteOpticalDepth { layer: 1, index: 0 })
        );
        let negative = array![[0.0, -1.0], [0.0, 0.0]];
        assert!(
            rtrun_emis_pure_absorption_direct(negative.view(), source.view(), LayerOrder::TopFirst)
                .is_err()
        );
        let short = Array2::zeros((1, 2));
        assert_eq!(
            rtrun_emis_pure_absorption(short.view(), source.view(), LayerOrder::TopFirst),
            Err(RtmError::InconsistentInputs)
        );
        assert!(rtrun_emis_pure_absorption_surface(
            source.view(),
            source.view(),
            &[1.0],
            LayerOrder::TopFirst
        )
        .is_err());
    }
}
