//! Collision-induced absorption.

use ndarray::{Array2, ArrayView1};

use crate::error::RtmError;
use crate::grid::SpectralGrid;

/// Tabulated CIA coefficients of one collision pair.
#[derive(Debug, Clone, PartialEq)]
pub struct CiaTable {
    /// Increasing wavenumbers in cm⁻¹
    nucia: Vec<f64>,
    /// Increasing temperatures in K
    tcia: Vec<f64>,
    /// log10 of the absorption coefficient in cm⁵, temperature × wavenumber
    logac: Array2<f64>,
}

impl CiaTable {
    /// Table from its axes and log10 coefficients (`tcia.len()` × `nucia.len()`).
    pub fn new(nucia: Vec<f64>, tcia: Vec<f64>, logac: Array2<f64>) -> Result<Self, RtmError> {
        if nucia.is_empty() || tcia.is_empty() || logac.dim() != (tcia.len(), nucia.len()) {
            return Err(RtmError::InconsistentInputs);
        }
        let increasing = |v: &[f64]| v.windows(2).all(|w| w[1] > w[0]);
        if !increasing(&nucia) || !increasing(&tcia) {
            return Err(RtmError::InvalidInput("CIA table axes must be increasing"));
        }
        Ok(Self { nucia, tcia, logac })
    }

    /// Wavenumber axis in cm⁻¹.
    pub fn nucia(&self) -> &[f64] {
        &self.nucia
    }

    /// Temperature axis in K.
    pub fn tcia(&self) -> &[f64] {
        &self.tcia
    }
}

/// Index and fraction of `x` between neighboring samples of the increasing
/// `axis`, clamped to its ends. NaN lands on the first sample.
pub(crate) fn bracket(x: f64, axis: &[f64]) -> (usize, f64) {
    let n = axis.len();
    if n == 1 || !(x > axis[0]) {
        return (0, 0.);
    }
    if x >= axis[n - 1] {
        return (n - 2, 1.);
    }
    let i = axis.partition_point(|&a| a <= x) - 1;
    (i, (x - axis[i]) / (axis[i + 1] - axis[i]))
}

fn lerp_row(row: ArrayView1<'_, f64>, (i, f): (usize, f64)) -> f64 {
    let j = (i + 1).min(row.len() - 1);
    row[i] + f * (row[j] - row[i])
}

/// CIA coefficients interpolated onto a spectral grid.
#[derive(Debug, Clone)]
pub struct OpaCia {
    table: CiaTable,
    grid: SpectralGrid,
    /// Bracket of each grid wavenumber on the table axis
    nu_brackets: Vec<(usize, f64)>,
}

impl OpaCia {
    /// Calculator for `table` on `grid`.
    pub fn new(table: CiaTable, grid: SpectralGrid) -> Self {
        let nu_brackets = grid
            .wavenumber()
            .iter()
            .map(|&nu| bracket(nu, &table.nucia))
            .collect();
        Self {
            table,
            grid,
            nu_brackets,
        }
    }

    /// The wavenumber grid of the output.
    pub fn grid(&self) -> &SpectralGrid {
        &self.grid
    }

    /// log10 of the CIA coefficient (cm⁵) at `temperature` (K), bilinear in
    /// temperature and wavenumber and clamped to the table.
    pub fn logacia_vector(&self, temperature: f64) -> Result<Vec<f64>, RtmError> {
        if !(temperature > 0. && temperature.is_finite()) {
            return Err(RtmError::InvalidInput("temperature must be positive"));
        }
        let (it, ft) = bracket(temperature, &self.table.tcia);
        let lo = self.table.logac.row(it);
        let hi = self.table.logac.row((it + 1).min(self.table.tcia.len() - 1));
        Ok(self
            .nu_brackets
            .iter()
            .map(|&b| {
                let a = lerp_row(lo, b);
                let c = lerp_row(hi, b);
                a + ft * (c - a)
            })
            .collect())
    }

    /// log10 of the CIA coefficient (cm⁵), layer × wavenumber.
    pub fn logacia_matrix(&self, temperature: &[f64]) -> Result<Array2<f64>, RtmError> {
        let mut matrix = Array2::zeros((temperature.len(), self.grid.len()));
        for (mut row, &t) in matrix.outer_iter_mut().zip(temperature) {
            row.assign(&ArrayView1::from(self.logacia_vector(t)?.as_slice()));
        }
        Ok(matrix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn table() -> CiaTable {
        CiaTable::new(
            vec![4000., 4500.],
            vec![1000., 2000.],
            array![[-46., -45.], [-44., -43.]],
        )
        .unwrap()
    }

    #[test]
    fn bilinear_and_clamped() {
        let grid = SpectralGrid::from_wavenumbers(vec![3000., 4000., 4250., 4500., 5000.]).unwrap();
        let opa = OpaCia::new(table(), grid);

        let v = opa.logacia_vector(1500.).unwrap();
        let expected = [-45., -45., -44.5, -44., -44.];
        for (a, b) in v.iter().zip(&expected) {
            assert_relative_eq!(a, b, epsilon = 1e-12);
        }

        let cold = opa.logacia_vector(100.).unwrap();
        assert_relative_eq!(cold[2], -45.5, epsilon = 1e-12);
        let hot = opa.logacia_matrix(&[2500., 1000.]).unwrap();
        assert_relative_eq!(hot[[0, 2]], -43.5, epsilon = 1e-12);
        assert_relative_eq!(hot[[1, 2]], -45.5, epsilon = 1e-12);
    }

    #[test]
    fn rejects_malformed_tables() {
        assert!(CiaTable::new(vec![1., 2.], vec![1000.], Array2::zeros((1, 3))).is_err());
        assert!(CiaTable::new(vec![2., 1.], vec![1000.], Array2::zeros((1, 2))).is_err());
    }

    #[test]
    fn bracket_ends() {
        let axis = [1., 2., 4.];
        assert_eq!(bracket(0., &axis), (0, 0.));
        assert_eq!(bracket(5., &axis), (1, 1.));
        assert_eq!(bracket(3., &axis), (1, 0.5));
        assert_eq!(bracket(3., &[2.]), (0, 0.));
        assert_eq!(bracket(f64::NAN, &axis), (0, 0.));
    }

    #[test]
    fn non_finite_temperature_is_an_error() {
        let grid = SpectralGrid::from_wavenumbers(vec![4000., 4250., 4500.]).unwrap();
        let opa = OpaCia::new(table(), grid);
        for t in [f64::NAN, f64::INFINITY, -100., 0.] {
            assert_eq!(
                opa.logacia_vector(t),
                Err(RtmError::InvalidInput("temperature must be positive"))
            );
        }
        assert!(opa.logacia_matrix(&[1000., f64::NAN]).is_err());
    }
}
