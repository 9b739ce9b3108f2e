//! Forward and inverse spectral transform of fixed size per stream.
//!
//! `rustfft` has no real-to-complex transform, so the forward direction runs
//! a full complex FFT over a zero-imaginary input and keeps only the
//! non-redundant one-sided half `M = N/2 + 1`; the inverse direction rebuilds
//! the conjugate-symmetric full spectrum before transforming back and takes
//! the real part.

use num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

pub struct SpectralCore {
    fsize: usize,
    msize: usize,
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
    scratch: Vec<Complex<f64>>,
}

impl SpectralCore {
    pub fn new(fsize: usize) -> Self {
        let mut planner = FftPlanner::<f64>::new();
        let forward = planner.plan_fft_forward(fsize);
        let inverse = planner.plan_fft_inverse(fsize);
        SpectralCore {
            fsize,
            msize: fsize / 2 + 1,
            forward,
            inverse,
            scratch: vec![Complex::new(0.0, 0.0); fsize],
        }
    }

    pub fn fsize(&self) -> usize {
        self.fsize
    }

    pub fn msize(&self) -> usize {
        self.msize
    }

    /// Transforms a real windowed frame of length `fsize` into the one-sided
    /// spectrum `out[0..msize]`.
    pub fn forward(&mut self, frame: &[f64], out: &mut [Complex<f64>]) {
        debug_assert_eq!(frame.len(), self.fsize);
        debug_assert_eq!(out.len(), self.msize);
        for (s, &x) in self.scratch.iter_mut().zip(frame.iter()) {
            *s = Complex::new(x, 0.0);
        }
        self.forward.process(&mut self.scratch);
        out.copy_from_slice(&self.scratch[..self.msize]);
    }

    /// Transforms a one-sided, gain-applied spectrum back into a real frame
    /// of length `fsize`.
    pub fn inverse(&mut self, spectrum: &[Complex<f64>], out: &mut [f64]) {
        debug_assert_eq!(spectrum.len(), self.msize);
        debug_assert_eq!(out.len(), self.fsize);
        self.scratch[..self.msize].copy_from_slice(spectrum);
        for k in self.msize..self.fsize {
            self.scratch[k] = self.scratch[self.fsize - k].conj();
        }
        self.inverse.process(&mut self.scratch);
        for (o, s) in out.iter_mut().zip(self.scratch.iter()) {
            *o = s.re;
        }
    }
}

/// Per-bin periodogram `lambda_y[k] = Re^2 + Im^2` from a one-sided spectrum.
pub fn periodogram(spectrum: &[Complex<f64>], lambda_y: &mut [f64]) {
    for (ly, s) in lambda_y.iter_mut().zip(spectrum.iter()) {
        *ly = s.re * s.re + s.im * s.im;
    }
}
