//! PreMODIT: cross sections from a line grid precomputed once per molecule.
//!
//! Lines are aggregated onto the wavenumber grid, onto a coarse grid of
//! broadening parameters (log of the reference Lorentzian width in grid bins,
//! its temperature exponent, and log of the natural width in grid bins), and
//! onto a grid of lower-state energies. A temperature evaluation then only
//! touches the aggregated grid: the Boltzmann factor is applied per energy
//! node, and one FFT Voigt convolution is done per broadening bin.

use std::collections::BTreeMap;

use log::{debug, info};
use ndarray::Array2;
use smallvec::smallvec;

use super::dit::{linear_weights, UniformAxis, VoigtConvolution, Weights};
use super::lines::{
    doppler_sigma_factor, stimulated_emission_ratio, LineDatabase, LineRecord, PartitionFunction,
};
use super::{xsmatrix_by_layer, CrossSection};
use crate::atm::{ClipPolicy, TemperatureRange};
use crate::constants::C2;
use crate::error::RtmError;
use crate::grid::SpectralGrid;

/// Number of terms of the temperature expansion consumed at evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExpansionOrder {
    /// Only the weights at the weighting temperature
    Zeroth,
    /// Adds the linear term in `1/T`
    First,
    /// Adds the quadratic term in `1/T`
    #[default]
    Second,
}

impl ExpansionOrder {
    fn evaluate(self, c: &[f64; 3], dt: f64) -> f64 {
        match self {
            ExpansionOrder::Zeroth => c[0],
            ExpansionOrder::First => c[0] + c[1] * dt,
            ExpansionOrder::Second => c[0] + dt * (c[1] + 0.5 * c[2] * dt),
        }
    }
}

/// How the reference temperatures of the line grid are chosen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReferenceTemperatures {
    /// Picked from the temperature range `[t_low, t_high]` (K) the grid must
    /// serve; temperatures are clipped to that range at evaluation.
    Auto {
        /// Lowest temperature in K
        t_low: f64,
        /// Highest temperature in K
        t_high: f64,
    },
    /// Given explicitly; temperatures are not clipped.
    Manual {
        /// Origin of the line strengths and Boltzmann factors (K)
        tref: f64,
        /// Temperature at which the energy weights are exact (K)
        twt: f64,
    },
}

/// Settings of the precomputed line grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PremoditConfig {
    /// Default expansion order of the temperature dependence
    pub order: ExpansionOrder,
    /// Reference temperature selection
    pub temperatures: ReferenceTemperatures,
    /// Step of the natural log of the reference width grid
    pub dit_grid_resolution: f64,
    /// Step of the width temperature exponent grid
    pub n_texp_resolution: f64,
    /// Largest relative line strength error allowed from the energy grid
    pub elower_tolerance: f64,
    /// Energy grid spacing in cm⁻¹; chosen from the tolerance if `None`
    pub delta_elower: Option<f64>,
    /// Kernel reach in units of `sigma + gamma`; the whole grid if `None`
    pub wing_cutoff: Option<f64>,
    /// Treatment of temperatures outside the automatic range
    pub clip_policy: ClipPolicy,
}

impl PremoditConfig {
    /// Defaults for a grid that serves temperatures from `t_low` to `t_high` K.
    pub fn auto(t_low: f64, t_high: f64) -> Self {
        Self::with_temperatures(ReferenceTemperatures::Auto { t_low, t_high })
    }

    /// Defaults with explicitly chosen reference temperatures.
    pub fn manual(tref: f64, twt: f64) -> Self {
        Self::with_temperatures(ReferenceTemperatures::Manual { tref, twt })
    }

    fn with_temperatures(temperatures: ReferenceTemperatures) -> Self {
        Self {
            order: ExpansionOrder::default(),
            temperatures,
            dit_grid_resolution: 0.1,
            n_texp_resolution: 0.05,
            elower_tolerance: 0.005,
            delta_elower: None,
            wing_cutoff: None,
            clip_policy: ClipPolicy::Silent,
        }
    }

    fn validate(&self) -> Result<(), RtmError> {
        let positive = |x: f64| x.is_finite() && x > 0.;
        if !positive(self.dit_grid_resolution) || !positive(self.n_texp_resolution) {
            return Err(RtmError::InvalidResolution(
                "broadening grid resolutions must be positive",
            ));
        }
        if !positive(self.elower_tolerance) {
            return Err(RtmError::InvalidResolution(
                "energy grid tolerance must be positive",
            ));
        }
        if self.delta_elower.is_some_and(|d| !positive(d)) {
            return Err(RtmError::InvalidResolution(
                "energy grid spacing must be positive",
            ));
        }
        if self.wing_cutoff.is_some_and(|c| !positive(c)) {
            return Err(RtmError::InvalidResolution("wing cutoff must be positive"));
        }
        match self.temperatures {
            ReferenceTemperatures::Auto { t_low, t_high } => {
                if !(positive(t_low) && positive(t_high) && t_low < t_high) {
                    return Err(RtmError::InvalidResolution(
                        "temperature range must satisfy 0 < t_low < t_high",
                    ));
                }
            }
            ReferenceTemperatures::Manual { tref, twt } => {
                if !(positive(tref) && positive(twt)) {
                    return Err(RtmError::InvalidInput(
                        "reference temperatures must be positive",
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Reference temperatures `(tref, twt)` for the range `[t_low, t_high]`.
///
/// They sit at the two Chebyshev nodes of the range in `1/T`, the hotter one
/// being `tref`.
pub fn auto_reference_temperatures(t_low: f64, t_high: f64) -> (f64, f64) {
    let mid = 0.5 * (1. / t_high + 1. / t_low);
    let half = 0.5 * (1. / t_low - 1. / t_high) * std::f64::consts::FRAC_1_SQRT_2;
    (1. / (mid - half), 1. / (mid + half))
}

/// Weight of the lower energy node and its first two derivatives in `x`.
///
/// A line at `a = delta - u` above a node and `u` below the next one gets the
/// weight `w(x) = expm1(x u) / expm1(x delta)` on the lower node and `1 - w` on
/// the upper one, where `x = c2 (1/T - 1/Tref)`. This keeps the Boltzmann
/// factor exact at `x = 0` and at the `x` where `w` was evaluated.
pub(crate) fn elower_weight(x: f64, u: f64, delta: f64) -> [f64; 3] {
    if (x * delta).abs() < 1.0e-4 {
        let w0 = u / delta;
        let g1 = 0.5 * (u - delta);
        let g2 = (u * u - delta * delta) / 12.;
        return [w0, w0 * g1, w0 * (g1 * g1 + g2)];
    }
    let n = (x * u).exp_m1();
    let m = (x * delta).exp_m1();
    let n1 = u * (x * u).exp();
    let m1 = delta * (x * delta).exp();
    let n2 = u * n1;
    let m2 = delta * m1;
    let cross = n1 * m - n * m1;
    [
        n / m,
        cross / (m * m),
        (n2 * m - n * m2) / (m * m) - 2. * m1 * cross / (m * m * m),
    ]
}

/// Worst relative Boltzmann-factor error of the energy interpolation with
/// node spacing `delta`, over `[t_low, t_high]` and positions within a bin.
pub fn elower_interpolation_error(
    delta: f64,
    order: ExpansionOrder,
    t_low: f64,
    t_high: f64,
    tref: f64,
    twt: f64,
) -> f64 {
    const NPOSITION: usize = 24;
    const NTEMPERATURE: usize = 40;

    let x_wt = C2 * (1. / twt - 1. / tref);
    let mut worst: f64 = 0.;
    for ia in 1..NPOSITION {
        let a = delta * ia as f64 / NPOSITION as f64;
        let u = delta - a;
        let w = elower_weight(x_wt, u, delta);
        for it in 0..=NTEMPERATURE {
            let inv_t = 1. / t_high + (1. / t_low - 1. / t_high) * it as f64 / NTEMPERATURE as f64;
            let x = C2 * (inv_t - 1. / tref);
            let weight = order.evaluate(&w, x - x_wt);
            let approx = weight * (a * x).exp() + (1. - weight) * (-u * x).exp();
            worst = worst.max((approx - 1.).abs());
        }
    }
    worst
}

/// Largest multiple of 25 cm⁻¹, up to 5000 cm⁻¹, whose energy interpolation
/// error stays within `tolerance`.
pub fn optimal_delta_elower(
    order: ExpansionOrder,
    t_low: f64,
    t_high: f64,
    tref: f64,
    twt: f64,
    tolerance: f64,
) -> Result<f64, RtmError> {
    const STEP: f64 = 25.;
    (1..=200)
        .rev()
        .map(|k| STEP * k as f64)
        .find(|&delta| {
            elower_interpolation_error(delta, order, t_low, t_high, tref, twt) <= tolerance
        })
        .ok_or(RtmError::InvalidResolution(
            "no energy grid spacing meets the tolerance",
        ))
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct LineGridEntry {
    nu_index: usize,
    elower_index: usize,
    coefficients: [f64; 3],
}

/// Entries sharing one broadening node.
#[derive(Debug, Clone, PartialEq)]
struct BroadeningBin {
    /// ln of the reference Lorentzian width in grid bins
    log_gamma_ref: f64,
    n_texp: f64,
    /// Natural width in grid bins, added after the pressure scaling
    gamma_natural: f64,
    entries: Vec<LineGridEntry>,
}

/// Line strengths aggregated over wavenumber, broadening and energy nodes,
/// with their temperature expansion coefficients.
///
/// Built once per molecule and spectral grid, read-only afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct PrecomputedLineGrid {
    tref: f64,
    twt: f64,
    delta_elower: f64,
    elower: Vec<f64>,
    bins: Vec<BroadeningBin>,
    nline: usize,
}

impl PrecomputedLineGrid {
    /// Aggregate the lines of `db` that fall on `grid`.
    ///
    /// `resolution` is that of the log-uniform `grid`, and `tref`/`twt` the
    /// reference temperatures.
    fn build(
        db: &LineDatabase,
        grid: &SpectralGrid,
        resolution: f64,
        tref: f64,
        twt: f64,
        delta_elower: f64,
        config: &PremoditConfig,
    ) -> Result<Self, RtmError> {
        let n = grid.len();

        // Lines on the grid, with their nu weights and ln of the reference
        // width in bins
        let mut kept = Vec::with_capacity(db.lines.len());
        for line in &db.lines {
            if !(line.gamma_ref > 0.) {
                return Err(RtmError::InvalidInput("reference widths must be positive"));
            }
            if !(line.gamma_natural >= 0. && line.gamma_natural.is_finite()) {
                return Err(RtmError::InvalidInput("natural widths must be non-negative"));
            }
            let q = grid.fractional_index(line.nu_line, resolution);
            if let Some(nu_weights) = linear_weights(q, n) {
                let log_gamma = (line.gamma_ref * resolution / line.nu_line).ln();
                kept.push((line, nu_weights, log_gamma));
            }
        }
        let nline = kept.len();
        if nline < db.lines.len() {
            debug!(
                "{} lines outside the wavenumber grid were dropped",
                db.lines.len() - nline
            );
        }
        if kept.is_empty() {
            return Ok(Self {
                tref,
                twt,
                delta_elower,
                elower: Vec::new(),
                bins: Vec::new(),
                nline,
            });
        }

        let (lg_min, lg_max) = min_max(kept.iter().map(|k| k.2));
        let (n_min, n_max) = min_max(kept.iter().map(|k| k.0.n_texp));
        let (e_min, e_max) = min_max(kept.iter().map(|k| k.0.elower));
        let gamma_axis = UniformAxis::covering(lg_min, lg_max, config.dit_grid_resolution);
        let texp_axis = UniformAxis::covering(n_min, n_max, config.n_texp_resolution);
        let energy_axis = UniformAxis::covering(e_min, e_max, delta_elower);
        let natural = NaturalWidthAxis::new(
            kept.iter().map(|k| natural_width_in_bins(k.0, resolution)),
            config.dit_grid_resolution,
        );

        let x_wt = C2 * (1. / twt - 1. / tref);

        // (width, exponent, natural width, wavenumber, energy) nodes
        let mut aggregated: BTreeMap<(usize, usize, usize, usize, usize), [f64; 3]> =
            BTreeMap::new();
        for (line, nu_weights, log_gamma) in &kept {
            let strength = db.line_strength(line, tref);

            let j = (((line.elower - e_min) / delta_elower).floor() as usize)
                .min(energy_axis.len - 2);
            let u = energy_axis.value(j + 1) - line.elower;
            let w = elower_weight(x_wt, u, delta_elower);
            let lower = [w[0], C2 * w[1], C2 * C2 * w[2]];
            let upper = [1. - w[0], -lower[1], -lower[2]];

            let natural_weights = natural.weights(natural_width_in_bins(line, resolution));
            for &(ia, fa) in &gamma_axis.weights(*log_gamma) {
                for &(ib, fb) in &texp_axis.weights(line.n_texp) {
                    for &(ic, fc) in &natural_weights {
                        for &(inu, fnu) in nu_weights {
                            let s = strength * fa * fb * fc * fnu;
                            for (je, c) in [(j, &lower), (j + 1, &upper)] {
                                let slot = aggregated
                                    .entry((ia, ib, ic, inu, je))
                                    .or_insert([0.; 3]);
                                for (acc, c) in slot.iter_mut().zip(c) {
                                    *acc += s * c;
                                }
                            }
                        }
                    }
                }
            }
        }

        // BTreeMap order keeps each broadening node's entries contiguous
        let mut bins: Vec<BroadeningBin> = Vec::new();
        let mut current = None;
        for ((ia, ib, ic, nu_index, elower_index), coefficients) in aggregated {
            if current != Some((ia, ib, ic)) {
                current = Some((ia, ib, ic));
                bins.push(BroadeningBin {
                    log_gamma_ref: gamma_axis.value(ia),
                    n_texp: texp_axis.value(ib),
                    gamma_natural: natural.value(ic),
                    entries: Vec::new(),
                });
            }
            if let Some(bin) = bins.last_mut() {
                bin.entries.push(LineGridEntry {
                    nu_index,
                    elower_index,
                    coefficients,
                });
            }
        }

        Ok(Self {
            tref,
            twt,
            delta_elower,
            elower: (0..energy_axis.len).map(|k| energy_axis.value(k)).collect(),
            bins,
            nline,
        })
    }

    /// Origin of the line strengths and Boltzmann factors (K).
    pub fn tref(&self) -> f64 {
        self.tref
    }

    /// Temperature at which the energy weights are exact (K).
    pub fn twt(&self) -> f64 {
        self.twt
    }

    /// Energy grid spacing in cm⁻¹.
    pub fn delta_elower(&self) -> f64 {
        self.delta_elower
    }

    /// Energy grid nodes in cm⁻¹.
    pub fn elower_grid(&self) -> &[f64] {
        &self.elower
    }

    /// Number of occupied broadening nodes.
    pub fn num_broadening_bins(&self) -> usize {
        self.bins.len()
    }

    /// Number of lines aggregated into the grid.
    pub fn num_lines(&self) -> usize {
        self.nline
    }

    /// Number of stored coefficient triples.
    pub fn num_entries(&self) -> usize {
        self.bins.iter().map(|b| b.entries.len()).sum()
    }
}

fn natural_width_in_bins(line: &LineRecord, resolution: f64) -> f64 {
    line.gamma_natural * resolution / line.nu_line
}

/// Log-spaced natural width nodes, with an extra node 0 for lines without
/// natural broadening.
#[derive(Debug, Clone, Copy)]
struct NaturalWidthAxis {
    log_axis: Option<UniformAxis>,
}

impl NaturalWidthAxis {
    fn new(widths: impl Iterator<Item = f64>, step: f64) -> Self {
        let (lo, hi) = min_max(widths.filter(|w| *w > 0.).map(f64::ln));
        let log_axis = (lo <= hi).then(|| UniformAxis::covering(lo, hi, step));
        Self { log_axis }
    }

    fn weights(&self, width: f64) -> Weights {
        match self.log_axis {
            Some(axis) if width > 0. => axis
                .weights(width.ln())
                .into_iter()
                .map(|(k, f)| (k + 1, f))
                .collect(),
            _ => smallvec![(0, 1.)],
        }
    }

    fn value(&self, node: usize) -> f64 {
        match self.log_axis {
            Some(axis) if node > 0 => axis.value(node - 1).exp(),
            _ => 0.,
        }
    }
}

fn min_max(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    })
}

/// Cross-section calculator backed by a [`PrecomputedLineGrid`].
#[derive(Debug, Clone)]
pub struct OpaPremodit {
    grid: SpectralGrid,
    resolution: f64,
    line_grid: PrecomputedLineGrid,
    molmass: f64,
    partition: PartitionFunction,
    /// Temperature and pressure at which the database widths are given
    width_reference: (f64, f64),
    order: ExpansionOrder,
    wing_cutoff: Option<f64>,
    range: TemperatureRange,
    convolution: VoigtConvolution,
}

impl OpaPremodit {
    /// Precompute the line grid of `db` on `grid`, which must be log-uniform.
    pub fn new(
        db: &LineDatabase,
        grid: SpectralGrid,
        config: PremoditConfig,
    ) -> Result<Self, RtmError> {
        config.validate()?;
        let resolution = grid.resolution()?;

        let (tref, twt, span, range) = match config.temperatures {
            ReferenceTemperatures::Auto { t_low, t_high } => {
                let (tref, twt) = auto_reference_temperatures(t_low, t_high);
                let range = TemperatureRange::new(t_low, t_high, config.clip_policy)?;
                (tref, twt, (t_low, t_high), range)
            }
            ReferenceTemperatures::Manual { tref, twt } => {
                (tref, twt, (tref.min(twt), tref.max(twt)), TemperatureRange::default())
            }
        };
        let delta_elower = match config.delta_elower {
            Some(delta) => delta,
            None => optimal_delta_elower(
                config.order,
                span.0,
                span.1,
                tref,
                twt,
                config.elower_tolerance,
            )?,
        };

        let line_grid =
            PrecomputedLineGrid::build(db, &grid, resolution, tref, twt, delta_elower, &config)?;
        info!(
            "PreMODIT grid: {} of {} lines, Tref = {tref:.1} K, Twt = {twt:.1} K, \
             dE = {delta_elower} cm^-1, {} broadening bins, {} entries",
            line_grid.num_lines(),
            db.lines.len(),
            line_grid.num_broadening_bins(),
            line_grid.num_entries(),
        );

        Ok(Self {
            convolution: VoigtConvolution::new(grid.len()),
            grid,
            resolution,
            line_grid,
            molmass: db.molmass,
            partition: db.partition.clone(),
            width_reference: (db.reference_temperature, db.reference_pressure),
            order: config.order,
            wing_cutoff: config.wing_cutoff,
            range,
        })
    }

    /// The precomputed line grid.
    pub fn line_grid(&self) -> &PrecomputedLineGrid {
        &self.line_grid
    }

    /// Range that input temperatures are clipped to.
    pub fn temperature_range(&self) -> TemperatureRange {
        self.range
    }

    /// Default expansion order.
    pub fn order(&self) -> ExpansionOrder {
        self.order
    }

    /// Cross section (cm²) at `temperature` (K) and `pressure` (bar), using
    /// expansion order `order` of the same precomputed grid.
    pub fn xsvector_with_order(
        &self,
        temperature: f64,
        pressure: f64,
        order: ExpansionOrder,
    ) -> Result<Vec<f64>, RtmError> {
        let temperature = self.range.clip(temperature)?;
        if !(temperature > 0.) {
            return Err(RtmError::InvalidInput("temperature must be positive"));
        }
        if !(pressure >= 0. && pressure.is_finite()) {
            return Err(RtmError::InvalidInput("pressure must be non-negative"));
        }

        let lg = &self.line_grid;
        let t = 1. / temperature - 1. / lg.tref;
        let dt = t - (1. / lg.twt - 1. / lg.tref);
        let boltzmann: Vec<f64> = lg.elower.iter().map(|e| (-C2 * e * t).exp()).collect();
        let sigma = self.resolution * doppler_sigma_factor(temperature, self.molmass);
        let (t0, p0) = self.width_reference;

        let n = self.grid.len();
        let mut xs = vec![0.; n];
        let mut lsd = vec![0.; n];
        let mut buffers = self.convolution.buffers();
        for bin in &lg.bins {
            lsd.fill(0.);
            for entry in &bin.entries {
                lsd[entry.nu_index] +=
                    order.evaluate(&entry.coefficients, dt) * boltzmann[entry.elower_index];
            }
            let gamma = bin.log_gamma_ref.exp()
                * (pressure / p0)
                * (t0 / temperature).powf(bin.n_texp)
                + bin.gamma_natural;
            self.convolution
                .convolve(&lsd, sigma, gamma, self.wing_cutoff, &mut xs, &mut buffers);
        }

        let qr = self.partition.evaluate(lg.tref) / self.partition.evaluate(temperature);
        for (x, &nu) in xs.iter_mut().zip(self.grid.wavenumber()) {
            let scale = self.resolution / nu * qr * stimulated_emission_ratio(nu, temperature, lg.tref);
            *x = (*x * scale).max(0.);
        }
        Ok(xs)
    }

    /// Cross-section matrix (layer × wavenumber) using expansion order `order`.
    pub fn xsmatrix_with_order(
        &self,
        temperature: &[f64],
        pressure: &[f64],
        order: ExpansionOrder,
    ) -> Result<Array2<f64>, RtmError> {
        xsmatrix_by_layer(self.grid.len(), temperature, pressure, |t, p| {
            self.xsvector_with_order(t, p, order)
        })
    }
}

impl CrossSection for OpaPremodit {
    fn grid(&self) -> &SpectralGrid {
        &self.grid
    }

    fn xsvector(&self, temperature: f64, pressure: f64) -> Result<Vec<f64>, RtmError> {
        self.xsvector_with_order(temperature, pressure, self.order)
    }

    fn xsmatrix(&self, temperature: &[f64], pressure: &[f64]) -> Result<Array2<f64>, RtmError> {
        self.xsmatrix_with_order(temperature, pressure, self.order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    use crate::grid::GridUnit;
    use crate::opacity::{OpaDirect, OpaModit};
    use crate::testing::{mock_co_database, mock_co_grid, mock_dense_database, restrict_to_grid};
    use approx::assert_relative_eq;

    fn max_relative_error(a: &[f64], b: &[f64]) -> f64 {
        a.iter()
            .zip(b)
            .map(|(a, b)| (a / b - 1.).abs())
            .fold(0., f64::max)
    }

    #[test]
    fn chebyshev_reference_temperatures() {
        let (tref, twt) = auto_reference_temperatures(500., 1500.);
        assert_relative_eq!(tref, 1160.19, max_relative = 1e-4);
        assert_relative_eq!(twt, 554.10, max_relative = 1e-4);
    }

    #[test]
    fn energy_weight_is_exact_at_both_references() {
        let (tref, twt) = (1200., 600.);
        let delta = 800.;
        let x_wt = C2 * (1. / twt - 1. / tref);
        for &a in &[10., 300., 790.] {
            let u = delta - a;
            let w = elower_weight(x_wt, u, delta)[0];
            let approx = w * (a * x_wt).exp() + (1. - w) * (-u * x_wt).exp();
            assert_relative_eq!(approx, 1.0, max_relative = 1e-12);
        }
    }

    #[test]
    fn energy_weight_series_matches_closed_form() {
        let (u, delta) = (300., 1000.);
        // just below and just above the switch to the series
        let series = elower_weight(0.9e-4 / delta, u, delta);
        let closed = elower_weight(1.1e-4 / delta, u, delta);
        assert_relative_eq!(series[0], closed[0], max_relative = 1e-3);
        assert_relative_eq!(series[1], closed[1], max_relative = 1e-3);
        assert_relative_eq!(series[2], closed[2], max_relative = 1e-2);
    }

    #[test]
    fn automatic_energy_spacing() {
        let (tref, twt) = auto_reference_temperatures(500., 1500.);
        let zeroth =
            optimal_delta_elower(ExpansionOrder::Zeroth, 500., 1500., tref, twt, 0.005).unwrap();
        let first =
            optimal_delta_elower(ExpansionOrder::First, 500., 1500., tref, twt, 0.005).unwrap();
        let second =
            optimal_delta_elower(ExpansionOrder::Second, 500., 1500., tref, twt, 0.005).unwrap();
        assert_eq!(zeroth, 275.);
        assert_eq!(first, 875.);
        assert_eq!(second, 1150.);
        assert!(
            elower_interpolation_error(second + 25., ExpansionOrder::Second, 500., 1500., tref, twt)
                > 0.005
        );
    }

    #[test]
    fn rejects_bad_configuration() {
        let db = mock_co_database();
        let mut config = PremoditConfig::auto(500., 1500.);
        config.dit_grid_resolution = 0.;
        assert!(matches!(
            OpaPremodit::new(&db, mock_co_grid(), config),
            Err(RtmError::InvalidResolution(_))
        ));
        assert!(OpaPremodit::new(&db, mock_co_grid(), PremoditConfig::auto(1500., 500.)).is_err());

        let linear = SpectralGrid::from_wavenumbers((0..100).map(|i| 4330. + 0.1 * i as f64).collect())
            .unwrap();
        assert!(matches!(
            OpaPremodit::new(&db, linear, PremoditConfig::auto(500., 1500.)),
            Err(RtmError::InvalidGrid(_))
        ));
    }

    #[test]
    fn matches_modit_across_the_range() {
        let db = mock_co_database();
        let opa = OpaPremodit::new(&db, mock_co_grid(), PremoditConfig::auto(500., 1500.)).unwrap();
        let modit = OpaModit::new(&db, mock_co_grid(), Default::default()).unwrap();
        assert_eq!(opa.line_grid().delta_elower(), 1150.);

        for &t in &[500., 1200., 1500.] {
            let xs = opa.xsvector(t, 1.0).unwrap();
            let reference = modit.xsvector(t, 1.0).unwrap();
            assert!(max_relative_error(&xs, &reference) < 0.01, "T = {t}");
        }
    }

    #[test]
    fn all_orders_agree_at_reference_temperature() {
        let db = mock_co_database();
        let opa = OpaPremodit::new(&db, mock_co_grid(), PremoditConfig::auto(500., 1500.)).unwrap();
        let tref = opa.line_grid().tref();
        let zeroth = opa
            .xsvector_with_order(tref, 1.0, ExpansionOrder::Zeroth)
            .unwrap();
        for order in [ExpansionOrder::First, ExpansionOrder::Second] {
            let xs = opa.xsvector_with_order(tref, 1.0, order).unwrap();
            for (a, b) in xs.iter().zip(&zeroth) {
                assert_relative_eq!(a, b, max_relative = 1e-9);
            }
        }

        let modit = OpaModit::new(&db, mock_co_grid(), Default::default()).unwrap();
        let reference = modit.xsvector(tref, 1.0).unwrap();
        assert!(max_relative_error(&zeroth, &reference) < 0.01);
    }

    #[test]
    fn temperatures_are_clipped_to_the_range() {
        let db = mock_co_database();
        let opa = OpaPremodit::new(&db, mock_co_grid(), PremoditConfig::auto(500., 1500.)).unwrap();
        assert_eq!(opa.xsvector(3000., 1.0).unwrap(), opa.xsvector(1500., 1.0).unwrap());

        let mut config = PremoditConfig::auto(500., 1500.);
        config.clip_policy = ClipPolicy::Strict;
        let strict = OpaPremodit::new(&db, mock_co_grid(), config).unwrap();
        assert!(matches!(
            strict.xsvector(3000., 1.0),
            Err(RtmError::TemperatureOutOfRange { .. })
        ));
    }

    #[test]
    fn matrix_rows_are_vectors() {
        let db = mock_co_database();
        let opa = OpaPremodit::new(&db, mock_co_grid(), PremoditConfig::auto(500., 1500.)).unwrap();
        let t = [600., 900., 1300.];
        let p = [0.01, 0.1, 1.0];
        let matrix = opa.xsmatrix(&t, &p).unwrap();
        assert_eq!(matrix.dim(), (3, opa.grid().len()));
        for (i, row) in matrix.outer_iter().enumerate() {
            let xs = opa.xsvector(t[i], p[i]).unwrap();
            assert_eq!(row.to_vec(), xs);
            assert!(xs.iter().all(|x| *x >= 0.));
        }
        assert!(matches!(
            opa.xsmatrix(&t, &p[..2]),
            Err(RtmError::InconsistentInputs)
        ));
    }

    #[test]
    fn natural_broadening_follows_direct_sum() {
        let grid = mock_co_grid();
        let narrow = restrict_to_grid(&mock_co_database(), &grid);
        let mut db = narrow.clone();
        // half the lines radiatively damped, half not
        for (i, line) in db.lines.iter_mut().enumerate() {
            if i % 2 == 0 {
                line.gamma_natural = 0.05;
            }
        }
        let config = PremoditConfig::auto(500., 1500.);
        let opa = OpaPremodit::new(&db, grid.clone(), config).unwrap();
        let reference = OpaDirect::new(&db, grid.clone()).xsvector(1000., 0.01).unwrap();
        let xs = opa.xsvector(1000., 0.01).unwrap();
        assert!(max_relative_error(&xs, &reference) < 0.01);

        let undamped = OpaPremodit::new(&narrow, grid.clone(), config)
            .unwrap()
            .xsvector(1000., 0.01)
            .unwrap();
        assert!(max_relative_error(&undamped, &reference) > 0.5);

        db.lines[0].gamma_natural = -0.01;
        assert!(matches!(
            OpaPremodit::new(&db, grid, config),
            Err(RtmError::InvalidInput(_))
        ));
    }

    #[test]
    fn faster_than_direct_sum_on_dense_line_list() {
        let grid = SpectralGrid::log_uniform(22900., 23100., 5000, GridUnit::Angstrom).unwrap();
        let db = mock_dense_database(&grid, 5000);
        let opa = OpaPremodit::new(&db, grid.clone(), PremoditConfig::auto(500., 1500.)).unwrap();
        let direct = OpaDirect::new(&db, grid);

        // one thread each, so the direct sum gets no head start from rayon
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(1)
            .build()
            .unwrap();
        let (xs, reference, premodit_time, direct_time) = pool.install(|| {
            let start = Instant::now();
            let xs = opa.xsvector(1000., 0.1).unwrap();
            let premodit_time = start.elapsed();
            let start = Instant::now();
            let reference = direct.xsvector(1000., 0.1).unwrap();
            (xs, reference, premodit_time, start.elapsed())
        });
        assert!(max_relative_error(&xs, &reference) < 0.02);
        assert!(
            premodit_time < direct_time,
            "PreMODIT {premodit_time:?}, direct {direct_time:?}"
        );
    }
}
