//! Voigt line profile through the Faddeeva function.

use num_complex::Complex64;
use std::f64::consts::PI;

/// Faddeeva function `w(z) = e^(-z²) erfc(-iz)` for `z = x + iy`, `y >= 0`.
///
/// Humlíček's four-region rational approximation (W4), good to a relative
/// error of about 1e-4 over the upper half plane. Only the real part (the
/// Voigt function) is needed by the line-shape code, but the full complex
/// value is returned.
///
/// # References
///
/// J. Humlíček, "Optimized computation of the Voigt and complex probability
/// functions", JQSRT 27, 437 (1982), <https://doi.org/10.1016/0022-4073(82)90078-4>.
pub fn faddeeva(x: f64, y: f64) -> Complex64 {
    #![allow(clippy::excessive_precision)]
    let t = Complex64::new(y, -x);
    let s = x.abs() + y;

    if s >= 15.0 {
        // Region I
        t * 0.5641896 / (0.5 + t * t)
    } else if s >= 5.5 {
        // Region II
        let u = t * t;
        t * (1.410474 + u * 0.5641896) / (0.75 + u * (3.0 + u))
    } else if y >= 0.195 * x.abs() - 0.176 {
        // Region III
        (16.4955 + t * (20.20933 + t * (11.96482 + t * (3.778987 + t * 0.5642236))))
            / (16.4955
                + t * (38.82363 + t * (39.27121 + t * (21.69274 + t * (6.699398 + t)))))
    } else {
        // Region IV
        let u = t * t;
        let num = t
            * (36183.31
                - u * (3321.9905
                    - u * (1540.787 - u * (219.0313 - u * (35.76683 - u * (1.320522 - u * 0.56419))))));
        let den = 32066.6
            - u * (24322.84
                - u * (9022.228
                    - u * (2186.181 - u * (364.2191 - u * (61.57037 - u * (1.841439 - u))))));
        u.exp() - num / den
    }
}

/// Normalized Voigt profile at offset `x` from line center.
///
/// `sigma` is the standard deviation of the Gaussian (Doppler) part and
/// `gamma` the half width at half maximum of the Lorentzian part, both in the
/// same units as `x`. The profile integrates to one over `x`.
pub fn voigt_profile(x: f64, sigma: f64, gamma: f64) -> f64 {
    let scale = sigma * std::f64::consts::SQRT_2;
    faddeeva(x / scale, gamma / scale).re / (sigma * (2.0 * PI).sqrt())
}

/// Voigt profile sampled at integer offsets `0..=half_width` from line center.
///
/// Offsets, `sigma`, and `gamma` are all in units of grid bins. The profile is
/// symmetric, so only the non-negative half is returned.
pub(crate) fn voigt_kernel(sigma: f64, gamma: f64, half_width: usize) -> Vec<f64> {
    (0..=half_width)
        .map(|k| voigt_profile(k as f64, sigma, gamma))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn faddeeva_reference_values() {
        // w(iy) = e^(y²) erfc(y) on the imaginary axis
        assert_relative_eq!(faddeeva(0., 1.).re, 0.4275835761558070, max_relative = 1e-4);
        assert_relative_eq!(faddeeva(0., 0.1).re, 0.8964569799691295, max_relative = 1e-4);
        assert_relative_eq!(faddeeva(0., 20.).re, 0.0281743487, max_relative = 1e-4);
        // w(x) on the real axis has real part e^(-x²)
        assert_relative_eq!(faddeeva(1., 0.).re, (-1f64).exp(), max_relative = 1e-4);
        assert_relative_eq!(faddeeva(0.5, 0.).re, (-0.25f64).exp(), max_relative = 1e-4);
    }

    #[test]
    fn gaussian_limit() {
        let sigma: f64 = 2.0;
        for &x in &[0., 0.7, 2.0, 4.5] {
            let gauss = (-x * x / (2. * sigma * sigma)).exp() / (sigma * (2. * PI).sqrt());
            assert_relative_eq!(voigt_profile(x, sigma, 1e-10), gauss, max_relative = 1e-4);
        }
    }

    #[test]
    fn lorentzian_wings() {
        // far from center, V -> gamma / (pi x²)
        let x = 300.;
        let gamma = 3.;
        assert_relative_eq!(
            voigt_profile(x, 0.5, gamma),
            gamma / (PI * (x * x + gamma * gamma)),
            max_relative = 1e-3
        );
    }

    #[test]
    fn kernel_is_normalized() {
        let kernel = voigt_kernel(3.0, 1.5, 20000);
        let total = kernel[0] + 2.0 * kernel[1..].iter().sum::<f64>();
        assert_relative_eq!(total, 1.0, max_relative = 1e-3);
    }
}
