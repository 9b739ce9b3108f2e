//! Immutable-after-creation engine configuration and the runtime-tunable
//! method selectors.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::window::WindowType;

/// Per-bin gain estimator selector (spec.md §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GainMethod {
    /// Gaussian speech model, linear amplitude (Ephraim-Malah 1984).
    AmplitudeMmse,
    /// Gaussian speech model, log amplitude (Ephraim-Malah 1985).
    LogMmse,
    /// Gamma speech distribution, tabulated (default).
    GammaTabulated,
    /// Two-stage MMSE with learned hard-threshold override.
    TwoStageLearned,
}

impl TryFrom<i32> for GainMethod {
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(GainMethod::AmplitudeMmse),
            1 => Ok(GainMethod::LogMmse),
            2 => Ok(GainMethod::GammaTabulated),
            3 => Ok(GainMethod::TwoStageLearned),
            other => Err(other),
        }
    }
}

/// Noise power estimator selector (spec.md §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoiseMethod {
    /// Martin minimum-statistics.
    MinimumStatistics,
    /// Gerkmann & Hendriks speech-presence-probability.
    Spp,
    /// Cohen minima-controlled recursive averaging.
    Mcra,
}

impl TryFrom<i32> for NoiseMethod {
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(NoiseMethod::MinimumStatistics),
            1 => Ok(NoiseMethod::Spp),
            2 => Ok(NoiseMethod::Mcra),
            other => Err(other),
        }
    }
}

/// Immutable-after-creation engine configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EngineConfig {
    /// FFT size `N`, power of two.
    pub fft_size: usize,
    /// Overlap factor `L = N / hop`.
    pub overlap: usize,
    /// Host block size `B`, samples per `process()` call.
    pub block_size: usize,
    /// Sample rate in Hz.
    pub sample_rate: f64,
    /// Window type.
    pub window_type: WindowType,
    /// Output gain scalar `g_o`.
    pub output_gain: f64,
    /// Gain estimator selector.
    pub gain_method: GainMethod,
    /// Noise power estimator selector.
    pub npe_method: NoiseMethod,
    /// Post-filter enable flag.
    pub post_filter_enable: bool,
}

impl EngineConfig {
    pub fn hop(&self) -> usize {
        self.fft_size / self.overlap
    }

    pub fn one_sided_len(&self) -> usize {
        self.fft_size / 2 + 1
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.fft_size < 64 || !self.fft_size.is_power_of_two() {
            return Err(EngineError::InvalidFftSize(self.fft_size));
        }
        if self.overlap == 0 || self.fft_size % self.overlap != 0 {
            return Err(EngineError::InvalidOverlap {
                fft_size: self.fft_size,
                overlap: self.overlap,
            });
        }
        if self.block_size == 0 {
            return Err(EngineError::InvalidBlockSize);
        }
        if !(self.sample_rate > 0.0) {
            return Err(EngineError::InvalidSampleRate(self.sample_rate));
        }
        Ok(())
    }
}
