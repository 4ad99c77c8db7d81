//! Exponential integrals.

/// Exponential integral `E1(x)` for `x > 0`.
///
/// Rational approximations from Abramowitz & Stegun 5.1.53 (`x <= 1`, absolute
/// error below 2e-7) and 5.1.56 (`x > 1`, relative error of `x e^x E1(x)` below
/// 5e-5). Returns infinity at zero.
pub(crate) fn expint1(x: f64) -> f64 {
    #![allow(clippy::excessive_precision)]
    if x <= 0.0 {
        return f64::INFINITY;
    }
    if x <= 1.0 {
        -x.ln() - 0.57721566
            + x * (0.99999193 + x * (-0.24991055 + x * (0.05519968 + x * (-0.00976004 + x * 0.00107857))))
    } else {
        let num = x * x + 2.334733 * x + 0.250621;
        let den = x * x + 3.330657 * x + 1.681534;
        num / den / (x * x.exp())
    }
}

/// Exponential integral `E2(x) = e^(-x) - x E1(x)`, with `E2(0) = 1`.
pub(crate) fn expint2(x: f64) -> f64 {
    if x == 0.0 {
        return 1.0;
    }
    (-x).exp() - x * expint1(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn tabulated_values() {
        // Abramowitz & Stegun table 5.1
        assert_relative_eq!(expint1(0.5), 0.5597735948, max_relative = 1e-6);
        assert_relative_eq!(expint1(1.0), 0.2193839344, max_relative = 1e-5);
        assert_relative_eq!(expint1(2.0), 0.0489005107, max_relative = 1e-4);
        assert_relative_eq!(expint1(5.0), 0.0011482956, max_relative = 1e-4);
        assert_relative_eq!(expint2(1.0), 0.1484955068, max_relative = 1e-5);
    }

    #[test]
    fn singular_at_zero() {
        assert!(expint1(0.0).is_infinite());
        assert_eq!(expint2(0.0), 1.0);
        // E2 is continuous at zero
        assert_relative_eq!(expint2(1e-12), 1.0, max_relative = 1e-9);
    }
}
