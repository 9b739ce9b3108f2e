//! Real-time single-channel spectral noise-reduction engine.
//!
//! Consumes a stream of complex-valued samples, estimates the noise power
//! spectral density, computes a per-bin gain mask, and synthesises a
//! denoised output stream via overlap-add. See [`Engine`] for the entry
//! point.

pub mod config;
pub mod engine;
pub mod error;
pub mod framer;
pub mod gain;
pub mod noise;
pub mod postfilter;
pub mod spectral;
pub mod special;
pub mod tables;
pub mod window;

pub use config::{EngineConfig, GainMethod, NoiseMethod};
pub use engine::Engine;
pub use error::EngineError;
pub use num_complex::Complex;
pub use tables::{TableLoader, TableStore};
pub use window::WindowType;
