//! Python interface.
//!
//! NOTE: this module is the interface between Rust and Python. The real work
//! happens in the other modules, and they do not use `pyo3`, it's only used
//! here.

use std::{
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
    time::Duration,
};

use log::{debug, info};
use ndarray::{Array2, ArrayView1};
use numpy::prelude::*;
use numpy::{PyArray1, PyArray2, PyReadonlyArray1, PyReadonlyArray2};
use pyo3::exceptions::{PyNotImplementedError, PyValueError};
use pyo3::prelude::*;
use rayon::prelude::*;

use crate::atm::{normalized_layer_height, Gravity, LayerOrder, PressureLayers};
use crate::error::RtmError;
use crate::grid::SpectralGrid;
use crate::opacity::{
    CrossSection, ExpansionOrder, LineDatabase, LineRecord, OpaPremodit, PartitionFunction,
    PremoditConfig,
};
use crate::rtm;

impl From<RtmError> for PyErr {
    fn from(e: RtmError) -> Self {
        match e {
            RtmError::NotImplemented(_) => PyNotImplementedError::new_err(e.to_string()),
            _ => PyValueError::new_err(e.to_string()),
        }
    }
}

fn layer_order(bottom_first: bool) -> LayerOrder {
    if bottom_first {
        LayerOrder::BottomFirst
    } else {
        LayerOrder::TopFirst
    }
}

/// A single value is a constant gravity, anything else is one per layer.
fn gravity_from(values: &[f64]) -> Gravity {
    match values {
        [g] => Gravity::Constant(*g),
        _ => Gravity::Profile(values.to_vec()),
    }
}

/// PreMODIT cross-section calculator.
///
/// The line grid is precomputed once at construction from NumPy arrays of the
/// line parameters, and then evaluated for any number of temperature-pressure
/// profiles.
#[pyclass]
struct Premodit {
    inner: OpaPremodit,
}

#[pymethods]
impl Premodit {
    /// Precompute the line grid.
    ///
    /// The line arrays all have shape (`num_lines`, ): `nu_lines` line centers
    /// in cm⁻¹, `elower` lower state energies in cm⁻¹, `line_strength_ref`
    /// strengths at 296 K in cm/molecule, `gamma_ref` Lorentz half widths at
    /// 296 K and 1 bar in cm⁻¹, and `n_texp` their temperature exponents.
    ///
    /// `partition_temperature` and `partition_values` tabulate the partition
    /// function. `wavenumber` is the log-uniform output grid in cm⁻¹, and
    /// `t_low`, `t_high` the temperature range (K) the grid has to serve.
    /// `order` is the expansion order, 0, 1, or 2.
    #[new]
    #[pyo3(signature = (nu_lines, elower, line_strength_ref, gamma_ref, n_texp, molmass, partition_temperature, partition_values, wavenumber, t_low, t_high, order=2))]
    #[allow(clippy::too_many_arguments)]
    fn new(
        py: Python<'_>,
        nu_lines: PyReadonlyArray1<'_, f64>,
        elower: PyReadonlyArray1<'_, f64>,
        line_strength_ref: PyReadonlyArray1<'_, f64>,
        gamma_ref: PyReadonlyArray1<'_, f64>,
        n_texp: PyReadonlyArray1<'_, f64>,
        molmass: f64,
        partition_temperature: PyReadonlyArray1<'_, f64>,
        partition_values: PyReadonlyArray1<'_, f64>,
        wavenumber: PyReadonlyArray1<'_, f64>,
        t_low: f64,
        t_high: f64,
        order: u8,
    ) -> PyResult<Self> {
        let num_lines = nu_lines.len();
        if [elower.len(), line_strength_ref.len(), gamma_ref.len(), n_texp.len()]
            .iter()
            .any(|&n| n != num_lines)
        {
            return Err(RtmError::InconsistentInputs.into());
        }
        let order = match order {
            0 => ExpansionOrder::Zeroth,
            1 => ExpansionOrder::First,
            2 => ExpansionOrder::Second,
            _ => return Err(RtmError::InvalidInput("expansion order must be 0, 1, or 2").into()),
        };

        let lines = nu_lines
            .as_slice()?
            .iter()
            .zip(elower.as_slice()?)
            .zip(line_strength_ref.as_slice()?)
            .zip(gamma_ref.as_slice()?)
            .zip(n_texp.as_slice()?)
            .map(|((((&nu_line, &elower), &strength), &gamma), &n)| LineRecord {
                nu_line,
                elower,
                line_strength_ref: strength,
                gamma_ref: gamma,
                n_texp: n,
                gamma_natural: 0.,
            })
            .collect();
        let partition = PartitionFunction::new(
            partition_temperature.as_slice()?.to_vec(),
            partition_values.as_slice()?.to_vec(),
        )?;
        let db = LineDatabase::new(lines, molmass, partition)?;
        let grid = SpectralGrid::from_wavenumbers(wavenumber.as_slice()?.to_vec())?;
        let config = PremoditConfig {
            order,
            ..PremoditConfig::auto(t_low, t_high)
        };
        debug!("building PreMODIT grid for {num_lines} lines");

        let inner = py.allow_threads(|| OpaPremodit::new(&db, grid, config))?;
        Ok(Self { inner })
    }

    /// Reference temperature in K.
    #[getter]
    fn tref(&self) -> f64 {
        self.inner.line_grid().tref()
    }

    /// Weighting temperature in K.
    #[getter]
    fn twt(&self) -> f64 {
        self.inner.line_grid().twt()
    }

    /// Lower state energy spacing in cm⁻¹.
    #[getter]
    fn delta_elower(&self) -> f64 {
        self.inner.line_grid().delta_elower()
    }

    /// Cross-section matrix in cm², shape (`num_layers`, `num_wavenumbers`).
    ///
    /// `temperature` (K) and `pressure` (bar) have shape (`num_layers`, ).
    ///
    /// The number of worker threads is controlled by `num_threads`. It must be
    /// a positive integer, or `None` to automatically choose the number of
    /// threads.
    #[pyo3(signature = (temperature, pressure, num_threads=None))]
    fn xsmatrix<'py>(
        &self,
        py: Python<'py>,
        temperature: PyReadonlyArray1<'py, f64>,
        pressure: PyReadonlyArray1<'py, f64>,
        num_threads: Option<usize>,
    ) -> PyResult<Bound<'py, PyArray2<f64>>> {
        let temperature = temperature.as_slice()?;
        let pressure = pressure.as_slice()?;
        if temperature.len() != pressure.len() {
            return Err(RtmError::InconsistentInputs.into());
        }
        let num_layers = temperature.len();
        let opa = &self.inner;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads.unwrap_or(0))
            .build()
            .map_err(|e| PyValueError::new_err(e.to_string()))?;

        // These atomics keep track of how many layers have finished and
        // whether it's time to cancel the computation or not
        let num_completed = AtomicUsize::new(0);
        let cancelled = AtomicBool::new(false);
        let mut rows = Vec::new();

        info!("Computing cross sections for {num_layers} layers");

        pool.in_place_scope(|s| -> Result<(), PyErr> {
            s.spawn(|_| {
                temperature
                    .par_iter()
                    .zip(pressure)
                    .map(|(&t, &p)| -> Result<_, RtmError> {
                        if cancelled.load(Ordering::Relaxed) {
                            return Err(RtmError::Cancelled);
                        }
                        opa.xsvector(t, p)
                    })
                    .inspect(|_| {
                        num_completed.fetch_add(1, Ordering::Relaxed);
                    })
                    .collect_into_vec(&mut rows);
            });

            // Progress reporting and early cancellation happen back here in
            // the main thread
            while !cancelled.load(Ordering::Relaxed) {
                if let Err(e) = py.check_signals() {
                    cancelled.store(true, Ordering::Relaxed);
                    return Err(e);
                }

                let num_completed = num_completed.load(Ordering::Relaxed);
                debug!("Completed {num_completed}/{num_layers} layers");
                if num_completed == num_layers {
                    break;
                }

                py.allow_threads(|| {
                    std::thread::sleep(Duration::from_millis(200));
                });
            }

            Ok(())
        })?;

        let mut xs = Array2::zeros((num_layers, opa.grid().len()));
        for (mut out, row) in xs.outer_iter_mut().zip(rows) {
            let row = row?;
            out.assign(&ArrayView1::from(row.as_slice()));
        }
        Ok(xs.into_pyarray(py))
    }
}

/// Log-uniform pressure layers.
///
/// Returns (`pressure`, `dpressure`, `k`): the representative pressure and the
/// pressure thickness of each layer in bar, and the pressure decrease rate.
#[pyfunction]
#[pyo3(signature = (log_pressure_top=-8., log_pressure_btm=2., nlayer=100, bottom_first=false))]
fn pressure_layer<'py>(
    py: Python<'py>,
    log_pressure_top: f64,
    log_pressure_btm: f64,
    nlayer: usize,
    bottom_first: bool,
) -> PyResult<(Bound<'py, PyArray1<f64>>, Bound<'py, PyArray1<f64>>, f64)> {
    let layers = PressureLayers::new(
        log_pressure_top,
        log_pressure_btm,
        nlayer,
        layer_order(bottom_first),
    )?;
    Ok((
        layers.pressure().to_vec().into_pyarray(py),
        layers.dpressure().to_vec().into_pyarray(py),
        layers.pressure_decrease_rate(),
    ))
}

/// Optical depth of a line absorber, shape (`num_layers`, `num_wavenumbers`).
///
/// `dpressure` is the layer thickness in bar, `xs` the cross-section matrix in
/// cm², `mixing_ratio` the mass mixing ratio per layer, and `molmass` the
/// molecular mass in atomic mass units. `gravity` in cm/s² has either one
/// element, or one per layer.
#[pyfunction]
fn layer_optical_depth<'py>(
    py: Python<'py>,
    dpressure: PyReadonlyArray1<'py, f64>,
    xs: PyReadonlyArray2<'py, f64>,
    mixing_ratio: PyReadonlyArray1<'py, f64>,
    molmass: f64,
    gravity: PyReadonlyArray1<'py, f64>,
) -> PyResult<Bound<'py, PyArray2<f64>>> {
    let dtau = rtm::layer_optical_depth(
        dpressure.as_slice()?,
        xs.as_array(),
        mixing_ratio.as_slice()?,
        molmass,
        &gravity_from(gravity.as_slice()?),
    )?;
    Ok(dtau.into_pyarray(py))
}

/// Emergent flux of a purely absorbing atmosphere, shape (`num_wavenumbers`, ).
///
/// The source is the Planck function at `temperature` (K), one per layer, on
/// `wavenumber` (cm⁻¹). With `surface_temperature`, a blackbody surface sits
/// below the bottom layer.
#[pyfunction]
#[pyo3(signature = (dtau, temperature, wavenumber, surface_temperature=None, bottom_first=false))]
fn rtrun_emission<'py>(
    py: Python<'py>,
    dtau: PyReadonlyArray2<'py, f64>,
    temperature: PyReadonlyArray1<'py, f64>,
    wavenumber: PyReadonlyArray1<'py, f64>,
    surface_temperature: Option<f64>,
    bottom_first: bool,
) -> PyResult<Bound<'py, PyArray1<f64>>> {
    let nu = wavenumber.as_slice()?;
    let source = rtm::pi_planck_matrix(temperature.as_slice()?, nu)?;
    let order = layer_order(bottom_first);
    let flux = match surface_temperature {
        Some(ts) => {
            let surface = rtm::pi_planck(ts, nu);
            rtm::rtrun_emis_pure_absorption_surface(dtau.as_array(), source.view(), &surface, order)?
        }
        None => rtm::rtrun_emis_pure_absorption(dtau.as_array(), source.view(), order)?,
    };
    Ok(flux.into_pyarray(py))
}

/// Squared transit radius normalized by `radius_btm`, shape
/// (`num_wavenumbers`, ).
///
/// The layers span `10^log_pressure_top` to `10^log_pressure_btm` bar, one per
/// row of `dtau`. `temperature` (K) and `mean_molecular_weight` have one value
/// per layer; `radius_btm` (cm) and `gravity_btm` (cm/s²) are at the bottom
/// boundary.
#[pyfunction]
#[pyo3(signature = (dtau, temperature, mean_molecular_weight, log_pressure_top, log_pressure_btm, radius_btm, gravity_btm, bottom_first=false))]
#[allow(clippy::too_many_arguments)]
fn rtrun_transmission<'py>(
    py: Python<'py>,
    dtau: PyReadonlyArray2<'py, f64>,
    temperature: PyReadonlyArray1<'py, f64>,
    mean_molecular_weight: PyReadonlyArray1<'py, f64>,
    log_pressure_top: f64,
    log_pressure_btm: f64,
    radius_btm: f64,
    gravity_btm: f64,
    bottom_first: bool,
) -> PyResult<Bound<'py, PyArray1<f64>>> {
    let dtau = dtau.as_array();
    let order = layer_order(bottom_first);
    let layers = PressureLayers::new(log_pressure_top, log_pressure_btm, dtau.nrows(), order)?;
    let (height, radius_lower) = normalized_layer_height(
        temperature.as_slice()?,
        mean_molecular_weight.as_slice()?,
        &layers,
        radius_btm,
        gravity_btm,
    )?;
    let cgm = rtm::chord_geometric_matrix(&height, &radius_lower, order)?;
    let tau_chord = rtm::chord_optical_depth(cgm.view(), dtau)?;
    let rp2 = rtm::rtrun_trans_pure_absorption(tau_chord.view(), &radius_lower, order)?;
    Ok(rp2.into_pyarray(py))
}

/// A Python module implemented in Rust.
#[pymodule]
fn exo_atmos_rtm(m: &Bound<'_, PyModule>) -> PyResult<()> {
    pyo3_log::init();

    m.add_class::<Premodit>()?;
    m.add_function(wrap_pyfunction!(pressure_layer, m)?)?;
    m.add_function(wrap_pyfunction!(layer_optical_depth, m)?)?;
    m.add_function(wrap_pyfunction!(rtrun_emission, m)?)?;
    m.add_function(wrap_pyfunction!(rtrun_transmission, m)?)?;
    Ok(())
}
