//! Discrete integral transform helpers: linear deposition of line quantities
//! onto uniform grids, and the convolution of a line shape density with a
//! Voigt kernel.

use std::fmt;
use std::sync::Arc;

use num_complex::Complex64;
use rustfft::{Fft, FftPlanner};
use smallvec::{smallvec, SmallVec};

use super::voigt::voigt_kernel;

/// Nonzero `(index, weight)` pairs of a linear deposition.
pub(crate) type Weights = SmallVec<[(usize, f64); 2]>;

/// Linear weights of the fractional index `q` on a grid of `n` points.
///
/// Returns `None` if `q` falls outside `[0, n - 1]`. Zero weights are left out,
/// so a point exactly on a node deposits on that node alone.
pub(crate) fn linear_weights(q: f64, n: usize) -> Option<Weights> {
    if !(q >= 0.0 && q <= (n - 1) as f64) {
        return None;
    }
    let i = (q.floor() as usize).min(n - 1);
    let f = q - i as f64;
    let mut weights: Weights = smallvec![];
    if f < 1.0 {
        weights.push((i, 1.0 - f));
    }
    if f > 0.0 && i + 1 < n {
        weights.push((i + 1, f));
    }
    Some(weights)
}

/// Uniform axis `start + k * step`, `k = 0..len`, covering a range of values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct UniformAxis {
    pub(crate) start: f64,
    pub(crate) step: f64,
    pub(crate) len: usize,
}

impl UniformAxis {
    /// Axis with spacing `step` starting at `min` and reaching at least `max`.
    ///
    /// Always has at least two points.
    pub(crate) fn covering(min: f64, max: f64, step: f64) -> Self {
        let len = ((max - min) / step).floor() as usize + 2;
        Self {
            start: min,
            step,
            len,
        }
    }

    /// Value of node `k`.
    pub(crate) fn value(&self, k: usize) -> f64 {
        self.start + k as f64 * self.step
    }

    /// Linear weights of `x`, clamped into the axis.
    pub(crate) fn weights(&self, x: f64) -> Weights {
        let q = ((x - self.start) / self.step).clamp(0.0, (self.len - 1) as f64);
        // q is always in range after clamping
        linear_weights(q, self.len).unwrap_or_default()
    }
}

/// Kernel half width in grid bins for Voigt parameters `sigma` and `gamma`.
///
/// Without a cutoff the kernel reaches across the whole grid of `n` points;
/// with one it reaches `cutoff * (sigma + gamma)` bins.
pub(crate) fn kernel_half_width(sigma: f64, gamma: f64, n: usize, cutoff: Option<f64>) -> usize {
    let full = n.saturating_sub(1);
    match cutoff {
        None => full,
        Some(c) => ((c * (sigma + gamma)).ceil() as usize).min(full),
    }
}

/// Voigt convolution on a grid of `n` points.
///
/// Dense densities and wide kernels go through zero-padded FFTs of length
/// `2n`, so a convolution costs `O(n log n)` whatever the kernel reach. A
/// density with few nonzero bins under a short kernel is scattered directly.
#[derive(Clone)]
pub(crate) struct VoigtConvolution {
    n: usize,
    /// Padded transform length
    len: usize,
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
}

impl fmt::Debug for VoigtConvolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VoigtConvolution")
            .field("n", &self.n)
            .finish_non_exhaustive()
    }
}

/// Buffers of one [`VoigtConvolution`], reused across broadening bins.
#[derive(Debug)]
pub(crate) struct ConvolutionBuffers {
    signal: Vec<Complex64>,
    kernel: Vec<Complex64>,
    scratch: Vec<Complex64>,
}

impl VoigtConvolution {
    /// Plans the transforms for a grid of `n` points.
    pub(crate) fn new(n: usize) -> Self {
        let mut planner = FftPlanner::<f64>::new();
        let len = 2 * n.max(1);
        Self {
            n,
            len,
            forward: planner.plan_fft_forward(len),
            inverse: planner.plan_fft_inverse(len),
        }
    }

    /// Fresh buffers; one set per thread.
    pub(crate) fn buffers(&self) -> ConvolutionBuffers {
        let len = self.len;
        let scratch = self
            .forward
            .get_inplace_scratch_len()
            .max(self.inverse.get_inplace_scratch_len());
        ConvolutionBuffers {
            signal: vec![Complex64::default(); len],
            kernel: vec![Complex64::default(); len],
            scratch: vec![Complex64::default(); scratch],
        }
    }

    /// Rough operation count of one FFT convolution.
    fn fft_cost(&self) -> usize {
        let len = self.len;
        3 * len * (usize::BITS - len.leading_zeros()) as usize
    }

    /// Add the line shape density `lsd` convolved with a Voigt kernel to `out`.
    ///
    /// `sigma` and `gamma` are in grid bins.
    pub(crate) fn convolve(
        &self,
        lsd: &[f64],
        sigma: f64,
        gamma: f64,
        cutoff: Option<f64>,
        out: &mut [f64],
        buffers: &mut ConvolutionBuffers,
    ) {
        let n = self.n;
        debug_assert_eq!(lsd.len(), n);
        debug_assert_eq!(out.len(), n);
        let nonzero = lsd.iter().filter(|v| **v != 0.0).count();
        if n == 0 || nonzero == 0 {
            return;
        }
        let half_width = kernel_half_width(sigma, gamma, n, cutoff);
        let kernel = voigt_kernel(sigma, gamma, half_width);
        if nonzero * (2 * half_width + 1) <= self.fft_cost() {
            scatter_kernel(lsd, &kernel, out);
            return;
        }

        let len = self.len;
        let ConvolutionBuffers {
            signal,
            kernel: spectrum,
            scratch,
        } = buffers;
        signal.fill(Complex64::default());
        for (s, &v) in signal.iter_mut().zip(lsd) {
            s.re = v;
        }
        // half_width < n, so the two wings never overlap in the padded buffer
        spectrum.fill(Complex64::default());
        spectrum[0].re = kernel[0];
        for (k, &v) in kernel.iter().enumerate().skip(1) {
            spectrum[k].re = v;
            spectrum[len - k].re = v;
        }
        self.forward.process_with_scratch(&mut signal[..], &mut scratch[..]);
        self.forward.process_with_scratch(&mut spectrum[..], &mut scratch[..]);
        for (s, k) in signal.iter_mut().zip(spectrum.iter()) {
            *s *= *k;
        }
        self.inverse.process_with_scratch(&mut signal[..], &mut scratch[..]);

        let norm = 1.0 / len as f64;
        for (o, s) in out.iter_mut().zip(signal.iter()) {
            *o += s.re * norm;
        }
    }
}

/// Scatter the symmetric `kernel` (center first) from every nonzero bin.
fn scatter_kernel(lsd: &[f64], kernel: &[f64], out: &mut [f64]) {
    let n = out.len();
    let half_width = kernel.len() - 1;
    for (i, &v) in lsd.iter().enumerate() {
        if v == 0.0 {
            continue;
        }
        let lo = i.saturating_sub(half_width);
        let hi = (i + half_width).min(n - 1);
        for (j, o) in out[lo..=hi].iter_mut().enumerate() {
            let k = (lo + j).abs_diff(i);
            *o += v * kernel[k];
        }
    }
}
