//! Crate error type.
//!
//! Only construction/reconfiguration is fallible. The per-block processing
//! path never returns an error: invalid method selectors are no-ops, NaN
//! masks are scrubbed, and table-load failures fall back to compiled-in
//! defaults (see `tables` module).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("FFT size must be a power of two >= 64, got {0}")]
    InvalidFftSize(usize),

    #[error("overlap factor must evenly divide the FFT size, got fft_size={fft_size} overlap={overlap}")]
    InvalidOverlap { fft_size: usize, overlap: usize },

    #[error("block size must be nonzero")]
    InvalidBlockSize,

    #[error("sample rate must be positive, got {0}")]
    InvalidSampleRate(f64),

    #[error("unsupported window type selector {0}")]
    UnsupportedWindowType(i32),
}
