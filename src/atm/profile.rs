//! Temperature-pressure profiles.

use log::warn;

use crate::constants::BAR;
use crate::error::RtmError;

/// What to do with a temperature outside the valid range.
///
/// Out-of-range values are mapped to the nearest boundary unless the policy is
/// [`ClipPolicy::Strict`]. Clipping has zero derivative outside the range, so a
/// sampler that drifts outside it sees a flat likelihood.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClipPolicy {
    /// Clip to the boundary without comment
    #[default]
    Silent,
    /// Clip to the boundary and emit a `log` warning
    Warn,
    /// Reject the temperature with [`RtmError::TemperatureOutOfRange`]
    Strict,
}

/// Valid temperature range `[low, high]` and the clipping policy applied to it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemperatureRange {
    low: f64,
    high: f64,
    policy: ClipPolicy,
}

impl Default for TemperatureRange {
    fn default() -> Self {
        Self {
            low: 0.0,
            high: f64::INFINITY,
            policy: ClipPolicy::Silent,
        }
    }
}

impl TemperatureRange {
    /// A range from `low` to `high` in K.
    pub fn new(low: f64, high: f64, policy: ClipPolicy) -> Result<Self, RtmError> {
        if low.is_nan() || high.is_nan() || low < 0. || high <= low {
            return Err(RtmError::InvalidResolution(
                "temperature range must satisfy 0 <= low < high",
            ));
        }
        Ok(Self { low, high, policy })
    }

    /// Lower end in K.
    pub fn low(&self) -> f64 {
        self.low
    }

    /// Upper end in K.
    pub fn high(&self) -> f64 {
        self.high
    }

    /// Clipping policy.
    pub fn policy(&self) -> ClipPolicy {
        self.policy
    }

    /// Clip a single temperature.
    pub fn clip(&self, temperature: f64) -> Result<f64, RtmError> {
        if temperature >= self.low && temperature <= self.high {
            return Ok(temperature);
        }
        match self.policy {
            ClipPolicy::Silent => {}
            ClipPolicy::Warn => warn!(
                "temperature {temperature} K clipped to the valid range [{}, {}] K",
                self.low, self.high
            ),
            ClipPolicy::Strict => {
                return Err(RtmError::TemperatureOutOfRange {
                    temperature,
                    low: self.low,
                    high: self.high,
                })
            }
        }
        if temperature.is_nan() {
            return Err(RtmError::InvalidInput("temperature is NaN"));
        }
        Ok(temperature.clamp(self.low, self.high))
    }

    /// Clip a whole profile.
    pub fn clip_profile(&self, temperature: &[f64]) -> Result<Vec<f64>, RtmError> {
        temperature.iter().map(|&t| self.clip(t)).collect()
    }
}

/// Shape law of a temperature profile.
///
/// Gravity is in cm/s², opacities in cm²/g, temperatures in K.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TemperatureProfile {
    /// `T = t0 (P / 1 bar)^alpha`
    PowerLaw {
        /// Temperature at 1 bar
        t0: f64,
        /// Power-law index
        alpha: f64,
    },
    /// Gray radiative-equilibrium atmosphere
    Gray {
        /// Surface gravity
        gravity: f64,
        /// Infrared opacity
        kappa: f64,
        /// Temperature equivalent of the intrinsic energy flow
        t_int: f64,
    },
    /// Irradiated two-stream analytic profile (Guillot 2010, eq. 29)
    Guillot {
        /// Surface gravity
        gravity: f64,
        /// Thermal (infrared) opacity
        kappa: f64,
        /// Ratio of the visible to the thermal opacity; above 1 gives an inversion
        gamma: f64,
        /// Temperature equivalent of the intrinsic energy flow
        t_int: f64,
        /// Temperature equivalent of the irradiation
        t_irr: f64,
        /// Irradiation geometry: 1 at the substellar point, 0.5 for a
        /// day-side average, 0.25 for the whole surface
        f: f64,
    },
}

impl TemperatureProfile {
    /// Whole-surface average for the Guillot irradiation geometry factor.
    pub const DEFAULT_GUILLOT_F: f64 = 0.25;

    /// Unclipped temperature at each pressure (bar).
    pub fn temperature(&self, pressure: &[f64]) -> Result<Vec<f64>, RtmError> {
        match *self {
            TemperatureProfile::PowerLaw { t0, alpha } => {
                Ok(pressure.iter().map(|p| t0 * p.powf(alpha)).collect())
            }
            TemperatureProfile::Gray {
                gravity,
                kappa,
                t_int,
            } => {
                if gravity <= 0. {
                    return Err(RtmError::InvalidInput("gravity must be positive"));
                }
                Ok(pressure
                    .iter()
                    .map(|p| {
                        let tau = p * BAR * kappa / gravity;
                        (0.75 * t_int.powi(4) * (2.0 / 3.0 + tau)).powf(0.25)
                    })
                    .collect())
            }
            TemperatureProfile::Guillot {
                gravity,
                kappa,
                gamma,
                t_int,
                t_irr,
                f,
            } => {
                if gravity <= 0. || gamma <= 0. {
                    return Err(RtmError::InvalidInput(
                        "gravity and opacity ratio must be positive",
                    ));
                }
                let sqrt3 = 3f64.sqrt();
                let inv_sqrt3 = 1.0 / sqrt3;
                Ok(pressure
                    .iter()
                    .map(|p| {
                        let tau = p * BAR * kappa / gravity;
                        let internal = 0.75 * t_int.powi(4) * (2.0 / 3.0 + tau);
                        let irradiated = 0.75
                            * t_irr.powi(4)
                            * f
                            * (2.0 / 3.0
                                + inv_sqrt3 / gamma
                                + (gamma * inv_sqrt3 - inv_sqrt3 / gamma)
                                    * (-gamma * tau * sqrt3).exp());
                        (internal + irradiated).powf(0.25)
                    })
                    .collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn power_law() {
        let profile = TemperatureProfile::PowerLaw { t0: 1300., alpha: 0.1 };
        let t = profile.temperature(&[1.0, 10.0, 1e-3]).unwrap();
        assert_relative_eq!(t[0], 1300.);
        assert_relative_eq!(t[1], 1300. * 10f64.powf(0.1));
        assert_relative_eq!(t[2], 1300. * 1e-3f64.powf(0.1));
    }

    #[test]
    fn gray_reaches_skin_temperature_at_top() {
        let profile = TemperatureProfile::Gray {
            gravity: 2478.57,
            kappa: 0.01,
            t_int: 1200.,
        };
        let t = profile.temperature(&[1e-12, 1.0]).unwrap();
        // T^4 -> Tint^4 / 2 as tau -> 0
        assert_relative_eq!(t[0], 1200. * 0.5f64.powf(0.25), max_relative = 1e-6);
        assert!(t[1] > t[0]);
    }

    #[test]
    fn guillot_without_irradiation_is_gray() {
        let pressure = [1e-4, 1e-2, 1.0, 100.0];
        let gray = TemperatureProfile::Gray {
            gravity: 1000.,
            kappa: 0.02,
            t_int: 800.,
        };
        let guillot = TemperatureProfile::Guillot {
            gravity: 1000.,
            kappa: 0.02,
            gamma: 0.5,
            t_int: 800.,
            t_irr: 0.,
            f: TemperatureProfile::DEFAULT_GUILLOT_F,
        };
        let a = gray.temperature(&pressure).unwrap();
        let b = guillot.temperature(&pressure).unwrap();
        for (a, b) in a.iter().zip(&b) {
            assert_relative_eq!(a, b, max_relative = 1e-12);
        }
    }

    #[test]
    fn clipping_policies() {
        let silent = TemperatureRange::new(400., 1500., ClipPolicy::Silent).unwrap();
        assert_eq!(
            silent.clip_profile(&[100., 800., 3000.]).unwrap(),
            vec![400., 800., 1500.]
        );

        let warn = TemperatureRange::new(400., 1500., ClipPolicy::Warn).unwrap();
        assert_eq!(warn.clip(3000.).unwrap(), 1500.);

        let strict = TemperatureRange::new(400., 1500., ClipPolicy::Strict).unwrap();
        assert_eq!(strict.clip(1000.).unwrap(), 1000.);
        assert!(matches!(
            strict.clip(399.),
            Err(RtmError::TemperatureOutOfRange { .. })
        ));

        let unbounded = TemperatureRange::default();
        assert_eq!(unbounded.clip(1.0e5).unwrap(), 1.0e5);
        assert!(TemperatureRange::new(10., 5., ClipPolicy::Silent).is_err());
    }
}
