//! Molecular line lists, as handed over by the opacity database.

use crate::constants::{C2, TREF_ORIGINAL};
use crate::error::RtmError;

/// A single spectral line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineRecord {
    /// Line center in cm⁻¹
    pub nu_line: f64,
    /// Lower-state energy in cm⁻¹
    pub elower: f64,
    /// Line strength at the database reference temperature, cm/molecule
    pub line_strength_ref: f64,
    /// Lorentzian half width at the reference temperature and pressure, cm⁻¹/bar
    pub gamma_ref: f64,
    /// Temperature exponent of the Lorentzian width
    pub n_texp: f64,
    /// Natural (radiative damping) half width in cm⁻¹
    pub gamma_natural: f64,
}

/// Tabulated partition function, linearly interpolated and clamped at the
/// ends of the table.
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionFunction {
    temperature: Vec<f64>,
    value: Vec<f64>,
}

impl PartitionFunction {
    /// Tabulated values `value` at increasing `temperature` (K).
    pub fn new(temperature: Vec<f64>, value: Vec<f64>) -> Result<Self, RtmError> {
        if temperature.is_empty() || temperature.len() != value.len() {
            return Err(RtmError::InconsistentInputs);
        }
        if temperature.windows(2).any(|w| w[1] <= w[0]) {
            return Err(RtmError::InvalidInput(
                "partition function temperatures must be strictly increasing",
            ));
        }
        if value.iter().any(|q| !(*q > 0.)) {
            return Err(RtmError::InvalidInput("partition function must be positive"));
        }
        Ok(Self { temperature, value })
    }

    /// Tabulate `f` at the given temperatures.
    pub fn from_fn(temperature: Vec<f64>, f: impl Fn(f64) -> f64) -> Result<Self, RtmError> {
        let value = temperature.iter().map(|&t| f(t)).collect();
        Self::new(temperature, value)
    }

    /// Partition function at `temperature` (K).
    pub fn evaluate(&self, temperature: f64) -> f64 {
        interp_clamped(temperature, &self.temperature, &self.value)
    }
}

/// A molecular line list with the metadata needed to evaluate it.
#[derive(Debug, Clone, PartialEq)]
pub struct LineDatabase {
    /// The lines, in any order
    pub lines: Vec<LineRecord>,
    /// Molecular mass in atomic mass units
    pub molmass: f64,
    /// Partition function
    pub partition: PartitionFunction,
    /// Temperature at which `line_strength_ref` and `gamma_ref` are given (K)
    pub reference_temperature: f64,
    /// Pressure at which `gamma_ref` is given (bar)
    pub reference_pressure: f64,
}

impl LineDatabase {
    /// Line list with the usual 296 K / 1 bar reference state.
    pub fn new(
        lines: Vec<LineRecord>,
        molmass: f64,
        partition: PartitionFunction,
    ) -> Result<Self, RtmError> {
        if !(molmass > 0.) {
            return Err(RtmError::InvalidInput("molecular mass must be positive"));
        }
        Ok(Self {
            lines,
            molmass,
            partition,
            reference_temperature: TREF_ORIGINAL,
            reference_pressure: 1.0,
        })
    }

    /// Strength of `line` at `temperature` (K), cm/molecule.
    pub fn line_strength(&self, line: &LineRecord, temperature: f64) -> f64 {
        let t0 = self.reference_temperature;
        let qr = self.partition.evaluate(t0) / self.partition.evaluate(temperature);
        line.line_strength_ref
            * qr
            * (-C2 * line.elower * (1.0 / temperature - 1.0 / t0)).exp()
            * stimulated_emission_ratio(line.nu_line, temperature, t0)
    }

    /// Lorentzian half width of `line` (cm⁻¹) at `temperature` (K) and
    /// `pressure` (bar), without natural broadening.
    pub fn gamma_pressure(&self, line: &LineRecord, temperature: f64, pressure: f64) -> f64 {
        line.gamma_ref
            * (pressure / self.reference_pressure)
            * (self.reference_temperature / temperature).powf(line.n_texp)
    }
}

/// Ratio of the stimulated emission factors `(1 - e^(-c2 ν/T)) / (1 - e^(-c2 ν/T0))`.
pub(crate) fn stimulated_emission_ratio(nu: f64, temperature: f64, t0: f64) -> f64 {
    (-C2 * nu / temperature).exp_m1() / (-C2 * nu / t0).exp_m1()
}

/// Doppler standard deviation divided by the wavenumber, `sqrt(kT / m c²)`.
pub(crate) fn doppler_sigma_factor(temperature: f64, molmass: f64) -> f64 {
    use crate::constants::{C, KB, M_U};
    (KB * temperature / (molmass * M_U)).sqrt() / C
}

/// Linear interpolation of `y(x)` at `x0`, clamped to the end values.
///
/// `x` must be increasing. A NaN `x0` gets the first value.
pub(crate) fn interp_clamped(x0: f64, x: &[f64], y: &[f64]) -> f64 {
    let n = x.len();
    if n == 1 || !(x0 > x[0]) {
        return y[0];
    }
    if x0 >= x[n - 1] {
        return y[n - 1];
    }
    let i = x.partition_point(|&xi| xi <= x0) - 1;
    let f = (x0 - x[i]) / (x[i + 1] - x[i]);
    y[i] + f * (y[i + 1] - y[i])
}
