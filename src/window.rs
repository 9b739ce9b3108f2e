//! Analysis/synthesis window construction.
//!
//! Only the Hann-root variant is defined, matching the one case the original
//! algorithm implements. Any other selector is rejected at `Engine`
//! construction time rather than silently producing an all-zero window.

use serde::{Deserialize, Serialize};

/// Window function selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WindowType {
    /// `sqrt(0.54 - 0.46*cos(2*pi*i/N))`, normalised to unity coherent gain.
    HannRoot,
}

impl TryFrom<i32> for WindowType {
    type Error = ();

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(WindowType::HannRoot),
            _ => Err(()),
        }
    }
}

/// Builds the analysis/synthesis window of length `fsize`, normalised so
/// the sum of window samples divided by `fsize` is 1 (coherent-gain
/// normalisation).
pub fn build_window(window_type: WindowType, fsize: usize) -> Vec<f64> {
    match window_type {
        WindowType::HannRoot => {
            let arg = 2.0 * std::f64::consts::PI / fsize as f64;
            let mut window: Vec<f64> = (0..fsize)
                .map(|i| (0.54 - 0.46 * (i as f64 * arg).cos()).sqrt())
                .collect();
            let sum: f64 = window.iter().sum();
            let inv_coherent_gain = fsize as f64 / sum;
            for w in window.iter_mut() {
                *w *= inv_coherent_gain;
            }
            window
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hann_root_has_unity_coherent_gain() {
        let window = build_window(WindowType::HannRoot, 512);
        let mean = window.iter().sum::<f64>() / window.len() as f64;
        assert!((mean - 1.0).abs() < 1e-9);
    }

    #[test]
    fn hann_root_is_symmetric_about_dc_null() {
        let window = build_window(WindowType::HannRoot, 256);
        assert!(window[0] < window[64]);
        assert!(window.iter().all(|w| w.is_finite() && *w >= 0.0));
    }

    #[test]
    fn unsupported_wintype_selector_is_rejected() {
        assert_eq!(WindowType::try_from(0), Ok(WindowType::HannRoot));
        assert!(WindowType::try_from(1).is_err());
    }
}
