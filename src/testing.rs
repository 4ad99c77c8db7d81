//! Stand-ins for the opacity database, shared by the tests.

use ndarray::{Array2, Array3};

use crate::constants::C2;
use crate::grid::{GridUnit, SpectralGrid};
use crate::opacity::{CiaTable, LineDatabase, LineRecord, ParticleGrid, PartitionFunction};

/// CO first-overtone R and P branches near the 2.3 µm band head.
pub(crate) fn mock_co_database() -> LineDatabase {
    let lines = (-10i32..76)
        .filter(|&m| m != 0)
        .map(|m| {
            let j = f64::from(if m > 0 { m - 1 } else { -m });
            let m = m as f64;
            let elower = 1.9225 * j * (j + 1.);
            LineRecord {
                nu_line: 4260.0624 + 3.81 * m - 0.035 * m * m,
                elower,
                line_strength_ref: 5.0e-23 * m.abs() * (-C2 * elower / 296.).exp(),
                gamma_ref: 0.07 - 0.0004 * m.abs(),
                n_texp: 0.75 - 0.002 * m.abs(),
                gamma_natural: 0.,
            }
        })
        .collect();
    let temperature: Vec<f64> = (1..=60).map(|i| 50. * i as f64).collect();
    let partition = PartitionFunction::from_fn(temperature, |t| 0.3619 * t + 0.3333)
        .expect("valid partition table");
    LineDatabase::new(lines, 28.0101, partition).expect("valid line database")
}

/// 22900–23100 Å with 10⁴ log-uniform samples.
pub(crate) fn mock_co_grid() -> SpectralGrid {
    SpectralGrid::log_uniform(22900., 23100., 10000, GridUnit::Angstrom).expect("valid grid")
}

/// `nline` synthetic lines scattered over `grid`, with widths, exponents and
/// energies spread by low-discrepancy sequences.
pub(crate) fn mock_dense_database(grid: &SpectralGrid, nline: usize) -> LineDatabase {
    let nu = grid.wavenumber();
    let (lo, hi) = (nu[0], nu[nu.len() - 1]);
    let frac = |k: usize, a: f64| (k as f64 * a).fract();
    let lines = (0..nline)
        .map(|k| {
            let elower = 5000. * frac(k, 0.754_877_666_246_692_7);
            LineRecord {
                nu_line: lo + (hi - lo) * frac(k, 0.618_033_988_749_894_9),
                elower,
                line_strength_ref: 1.0e-22
                    * (0.1 + frac(k, 0.569_840_290_998_053_2))
                    * (-C2 * elower / 296.).exp(),
                gamma_ref: 0.02 + 0.08 * frac(k, 0.414_213_562_373_095),
                n_texp: 0.5 + 0.3 * frac(k, 0.732_050_807_568_877_2),
                gamma_natural: 0.,
            }
        })
        .collect();
    LineDatabase::new(lines, 28.0101, mock_co_database().partition).expect("valid line database")
}

/// Copy of `db` without the lines outside `grid`.
pub(crate) fn restrict_to_grid(db: &LineDatabase, grid: &SpectralGrid) -> LineDatabase {
    let nu = grid.wavenumber();
    let (lo, hi) = (nu[0], nu[nu.len() - 1]);
    LineDatabase {
        lines: db
            .lines
            .iter()
            .filter(|l| l.nu_line >= lo && l.nu_line <= hi)
            .copied()
            .collect(),
        ..db.clone()
    }
}

/// Smooth H2-H2-like CIA table covering the mock CO grid.
pub(crate) fn mock_cia_table() -> CiaTable {
    let nucia: Vec<f64> = (0..15).map(|i| 4000. + 50. * i as f64).collect();
    let tcia = vec![500., 1000., 1500., 2000., 3000.];
    let logac = Array2::from_shape_fn((tcia.len(), nucia.len()), |(i, j)| {
        -45.5 + 0.5 * (tcia[i] / 1000f64).log10() - 5.0e-4 * (nucia[j] - 4300.)
    });
    CiaTable::new(nucia, tcia, logac).expect("valid CIA table")
}

/// Extinction cross section of the mock particle grid.
pub(crate) fn mock_extinction(rg: f64, sigmag: f64, inu: usize) -> f64 {
    std::f64::consts::PI * rg * rg * sigmag * (2.0 + 0.1 * inu as f64)
}

/// Particle grid with geometric-optics-like extinction.
pub(crate) fn mock_particle_grid() -> ParticleGrid {
    let rg = vec![1e-6, 1e-5, 1e-4, 1e-3];
    let sigmag = vec![1.5, 2.0, 2.5];
    let nu_refraction: Vec<f64> = (0..8).map(|i| 4000. + 100. * i as f64).collect();
    let shape = (rg.len(), sigmag.len(), nu_refraction.len());
    let extinction = Array3::from_shape_fn(shape, |(i, j, k)| mock_extinction(rg[i], sigmag[j], k));
    let scattering = extinction.mapv(|e| 0.6 * e);
    let asymmetry = Array3::from_shape_fn(shape, |(_, j, k)| 0.2 + 0.1 * sigmag[j] + 0.01 * k as f64);
    ParticleGrid::new(rg, sigmag, nu_refraction, extinction, scattering, asymmetry)
        .expect("valid particle grid")
}
