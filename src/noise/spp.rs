//! Speech-presence-probability based noise-power estimator.
//!
//! Gerkmann & Hendriks, "Noise Power Estimation Based on the Probability of
//! Speech Presence", Algorithm 1.

use super::NoiseEstimator;

pub struct Spp {
    msize: usize,
    alpha_pow: f64,
    alpha_pbar: f64,
    eps_h1: f64,
    eps_h1r: f64,

    sigma2_n: Vec<f64>,
    p_h1y: Vec<f64>,
    pbar: Vec<f64>,
    en2y: Vec<f64>,

    lambda_d: Vec<f64>,
}

impl Spp {
    pub fn new(msize: usize, hop: usize, rate: f64) -> Self {
        let tau = |settle: f64| -128.0 / 8000.0 / settle.ln();
        let smoothing = |settle: f64| (-(hop as f64) / rate / tau(settle)).exp();
        let eps_h1 = 10f64.powf(15.0 / 10.0);

        Spp {
            msize,
            alpha_pow: smoothing(0.8),
            alpha_pbar: smoothing(0.9),
            eps_h1,
            eps_h1r: eps_h1 / (1.0 + eps_h1),
            sigma2_n: vec![0.5; msize],
            p_h1y: vec![0.0; msize],
            pbar: vec![0.5; msize],
            en2y: vec![0.0; msize],
            lambda_d: vec![0.5; msize],
        }
    }
}

impl NoiseEstimator for Spp {
    fn update(&mut self, lambda_y: &[f64]) -> &[f64] {
        debug_assert_eq!(lambda_y.len(), self.msize);
        for k in 0..self.msize {
            self.p_h1y[k] = 1.0
                / (1.0 + (1.0 + self.eps_h1) * (-self.eps_h1r * lambda_y[k] / self.sigma2_n[k]).exp());
            self.pbar[k] = self.alpha_pbar * self.pbar[k] + (1.0 - self.alpha_pbar) * self.p_h1y[k];
            if self.pbar[k] > 0.99 {
                self.p_h1y[k] = self.p_h1y[k].min(0.99);
            }
            self.en2y[k] = (1.0 - self.p_h1y[k]) * lambda_y[k] + self.p_h1y[k] * self.sigma2_n[k];
            self.sigma2_n[k] = self.alpha_pow * self.sigma2_n[k] + (1.0 - self.alpha_pow) * self.en2y[k];
        }
        self.lambda_d.copy_from_slice(&self.sigma2_n);
        &self.lambda_d
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stabilises_near_stationary_noise_variance() {
        let msize = 8;
        let mut est = Spp::new(msize, 512, 48000.0);
        let lambda_y = vec![2.0e-4; msize];
        let mut lambda_d = vec![0.0; msize];
        for _ in 0..5000 {
            lambda_d = est.update(&lambda_y).to_vec();
        }
        for &v in &lambda_d {
            assert!(v.is_finite());
            assert!((v - 2.0e-4).abs() < 5.0e-5);
        }
    }

    #[test]
    fn never_produces_negative_or_nan_power() {
        let msize = 4;
        let mut est = Spp::new(msize, 256, 48000.0);
        let lambda_y = vec![0.0, 1.0, 1e-10, 5.0];
        let lambda_d = est.update(&lambda_y);
        for &v in lambda_d {
            assert!(v.is_finite());
            assert!(v >= 0.0);
        }
    }
}
