//! Minima-controlled recursive-averaging noise-power estimator (Cohen).

use super::NoiseEstimator;

pub struct Mcra {
    msize: usize,
    eta: f64,
    gamma: f64,
    beta: f64,
    alpha_d: f64,
    alpha_p: f64,
    delta_lf: f64,
    delta_mf: f64,
    delta_0: f64,
    delta_1: f64,
    delta_2: f64,

    p_new: Vec<f64>,
    p_min: Vec<f64>,
    p: Vec<f64>,
    d: Vec<f64>,

    lambda_d: Vec<f64>,
}

impl Mcra {
    pub fn new(msize: usize, hop: usize, rate: f64) -> Self {
        let tau = |settle: f64| -256.0 / (20100.0 * settle.ln());
        let smoothing = |settle: f64| (-(hop as f64) / (rate * tau(settle))).exp();

        Mcra {
            msize,
            eta: smoothing(0.7),
            gamma: smoothing(0.998),
            beta: smoothing(0.8),
            alpha_d: smoothing(0.85),
            alpha_p: smoothing(0.2),
            delta_lf: 1000.0 / (rate / 2.0) * msize as f64,
            delta_mf: 3000.0 / (rate / 2.0) * msize as f64,
            delta_0: 2.0,
            delta_1: 2.0,
            delta_2: 5.0,
            p_new: vec![0.0; msize],
            p_min: vec![0.0; msize],
            p: vec![0.0; msize],
            d: vec![0.5; msize],
            lambda_d: vec![0.5; msize],
        }
    }
}

impl NoiseEstimator for Mcra {
    fn update(&mut self, lambda_y: &[f64]) -> &[f64] {
        debug_assert_eq!(lambda_y.len(), self.msize);
        let c = (1.0 - self.gamma) / (1.0 - self.beta);
        for k in 0..self.msize {
            let p_old = self.p_new[k];
            self.p_new[k] = self.eta * p_old + (1.0 - self.eta) * lambda_y[k];
            if self.p_min[k] < self.p_new[k] {
                self.p_min[k] =
                    self.gamma * self.p_min[k] + c * (self.p_new[k] - self.beta * p_old);
            } else {
                self.p_min[k] = self.p_new[k];
            }
            let sr = self.p_new[k] / self.p_min[k];
            let delta = if (k as f64) <= self.delta_lf {
                self.delta_0
            } else if (k as f64) <= self.delta_mf {
                self.delta_1
            } else {
                self.delta_2
            };
            let indicator = if sr > delta { 1.0 } else { 0.0 };
            self.p[k] = self.alpha_p * self.p[k] + (1.0 - self.alpha_p) * indicator;
            let alpha_s = self.alpha_d + (1.0 - self.alpha_d) * self.p[k];
            self.d[k] = alpha_s * self.d[k] + (1.0 - alpha_s) * lambda_y[k];
        }
        self.lambda_d.copy_from_slice(&self.d);
        &self.lambda_d
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stabilises_on_stationary_noise() {
        let msize = 16;
        let mut est = Mcra::new(msize, 512, 48000.0);
        let lambda_y = vec![3.0e-4; msize];
        let mut lambda_d = vec![0.0; msize];
        for _ in 0..8000 {
            lambda_d = est.update(&lambda_y).to_vec();
        }
        for &v in &lambda_d {
            assert!(v.is_finite());
            assert!(v > 0.0);
        }
    }

    #[test]
    fn low_frequency_bins_use_tighter_threshold() {
        let est = Mcra::new(512, 512, 48000.0);
        assert!(est.delta_lf < est.delta_mf);
        assert_eq!(est.delta_0, 2.0);
        assert_eq!(est.delta_2, 5.0);
    }
}
