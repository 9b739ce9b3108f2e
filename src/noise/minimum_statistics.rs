//! Martin's minimum-statistics noise-power estimator.
//!
//! Tracks temporal minima of smoothed power over a sliding window split into
//! `U` sub-windows of `V` frames each, with a bias correction derived from
//! the estimated variance of the power estimate (`Q_eq`).

use super::NoiseEstimator;

const DVALS: [f64; 18] = [
    1.0, 2.0, 5.0, 8.0, 10.0, 15.0, 20.0, 30.0, 40.0, 60.0, 80.0, 120.0, 140.0, 160.0, 180.0,
    220.0, 260.0, 300.0,
];
const MVALS: [f64; 18] = [
    0.000, 0.260, 0.480, 0.580, 0.610, 0.668, 0.705, 0.762, 0.800, 0.841, 0.865, 0.890, 0.900,
    0.910, 0.920, 0.930, 0.935, 0.940,
];

/// Log-x linear-y interpolation over the 18-point `(D, M)` table.
fn interp_m(x: f64) -> f64 {
    if x <= DVALS[0] {
        return MVALS[0];
    }
    if x >= DVALS[DVALS.len() - 1] {
        return MVALS[MVALS.len() - 1];
    }
    let mut idx = 1;
    while x > DVALS[idx] {
        idx += 1;
    }
    let xllow = DVALS[idx - 1].log10();
    let xlhigh = DVALS[idx].log10();
    let frac = (x.log10() - xllow) / (xlhigh - xllow);
    MVALS[idx - 1] + frac * (MVALS[idx] - MVALS[idx - 1])
}

pub struct MinimumStatistics {
    msize: usize,

    alpha_csmooth: f64,
    alpha_max: f64,
    alpha_cmin: f64,
    alpha_min_max: f64,
    snrq: f64,
    beta_max: f64,
    inv_qeq_max: f64,
    av: f64,

    u: usize,
    v: usize,
    d: usize,
    m_of_d: f64,
    m_of_v: f64,
    inv_qbar_points: [f64; 4],
    nsmax: [f64; 4],

    p: Vec<f64>,
    alpha_opt_hat: Vec<f64>,
    alpha_hat: Vec<f64>,
    sigma2_n: Vec<f64>,
    pbar: Vec<f64>,
    p2bar: Vec<f64>,
    qeq: Vec<f64>,
    bmin: Vec<f64>,
    bmin_sub: Vec<f64>,
    k_mod: Vec<bool>,
    actmin: Vec<f64>,
    actmin_sub: Vec<f64>,
    lmin_flag: Vec<bool>,
    pmin_u: Vec<f64>,
    actminbuff: Vec<Vec<f64>>,

    alpha_c: f64,
    subwc: usize,
    amb_idx: usize,

    lambda_d: Vec<f64>,
}

impl MinimumStatistics {
    pub fn new(msize: usize, hop: usize, rate: f64) -> Self {
        let tau = |settle: f64| -128.0 / 8000.0 / settle.ln();
        let smoothing = |settle: f64| (-(hop as f64) / rate / tau(settle)).exp();

        let dtime = 8.0 * 12.0 * 128.0 / 8000.0;
        let u = 8usize;
        let mut v = (0.5 + dtime * rate / (u as f64 * hop as f64)) as usize;
        if v < 4 {
            v = 4;
        }
        let mut u = (0.5 + dtime * rate / (v as f64 * hop as f64)) as usize;
        if u < 1 {
            u = 1;
        }
        let d = u * v;

        let db_unit = 12.0 * 128.0 / 8000.0;
        let nsmax_for = |db: f64| {
            let db_per_time = 10.0 * db.log10() / db_unit;
            10f64.powf(db_per_time / 10.0 * v as f64 * hop as f64 / rate)
        };

        MinimumStatistics {
            msize,
            alpha_csmooth: smoothing(0.7),
            alpha_max: smoothing(0.96),
            alpha_cmin: smoothing(0.7),
            alpha_min_max: smoothing(0.3),
            snrq: -(hop as f64) / (0.064 * rate),
            beta_max: smoothing(0.8),
            inv_qeq_max: 0.5,
            av: 2.12,
            u,
            v,
            d,
            m_of_d: interp_m(d as f64),
            m_of_v: interp_m(v as f64),
            inv_qbar_points: [0.03, 0.05, 0.06, 1.0e300],
            nsmax: [nsmax_for(8.0), nsmax_for(4.0), nsmax_for(2.0), nsmax_for(1.2)],
            p: vec![0.5; msize],
            alpha_opt_hat: vec![0.0; msize],
            alpha_hat: vec![0.0; msize],
            sigma2_n: vec![0.5; msize],
            pbar: vec![0.5; msize],
            p2bar: vec![0.25; msize],
            qeq: vec![0.0; msize],
            bmin: vec![0.0; msize],
            bmin_sub: vec![0.0; msize],
            k_mod: vec![false; msize],
            actmin: vec![1.0e300; msize],
            actmin_sub: vec![1.0e300; msize],
            lmin_flag: vec![false; msize],
            pmin_u: vec![0.5; msize],
            actminbuff: vec![vec![1.0e300; msize]; u],
            alpha_c: 1.0,
            subwc: v,
            amb_idx: 0,
            lambda_d: vec![0.5; msize],
        }
    }
}

impl NoiseEstimator for MinimumStatistics {
    fn update(&mut self, lambda_y: &[f64]) -> &[f64] {
        debug_assert_eq!(lambda_y.len(), self.msize);

        let sum_prev_p: f64 = self.p.iter().sum();
        let sum_lambda_y: f64 = lambda_y.iter().sum();
        let sum_prev_sigma2n: f64 = self.sigma2_n.iter().sum();

        for k in 0..self.msize {
            let f0 = self.p[k] / self.sigma2_n[k] - 1.0;
            self.alpha_opt_hat[k] = 1.0 / (1.0 + f0 * f0);
        }
        let snr = sum_prev_p / sum_prev_sigma2n;
        let alpha_min = self.alpha_min_max.min(snr.powf(self.snrq));
        for v in self.alpha_opt_hat.iter_mut() {
            if *v < alpha_min {
                *v = alpha_min;
            }
        }

        let f1 = sum_prev_p / sum_lambda_y - 1.0;
        let alpha_c_tilda = 1.0 / (1.0 + f1 * f1);
        self.alpha_c = self.alpha_csmooth * self.alpha_c
            + (1.0 - self.alpha_csmooth) * alpha_c_tilda.max(self.alpha_cmin);
        let f2 = self.alpha_max * self.alpha_c;
        for k in 0..self.msize {
            self.alpha_hat[k] = f2 * self.alpha_opt_hat[k];
        }
        for k in 0..self.msize {
            self.p[k] = self.alpha_hat[k] * self.p[k] + (1.0 - self.alpha_hat[k]) * lambda_y[k];
        }

        let mut inv_qbar = 0.0;
        for k in 0..self.msize {
            let beta = self.beta_max.min(self.alpha_hat[k] * self.alpha_hat[k]);
            self.pbar[k] = beta * self.pbar[k] + (1.0 - beta) * self.p[k];
            self.p2bar[k] = beta * self.p2bar[k] + (1.0 - beta) * self.p[k] * self.p[k];
            let var_hat = self.p2bar[k] - self.pbar[k] * self.pbar[k];
            let mut inv_qeq = var_hat / (2.0 * self.sigma2_n[k] * self.sigma2_n[k]);
            if inv_qeq > self.inv_qeq_max {
                inv_qeq = self.inv_qeq_max;
            }
            self.qeq[k] = 1.0 / inv_qeq;
            inv_qbar += inv_qeq;
        }
        inv_qbar /= self.msize as f64;
        let bc = 1.0 + self.av * inv_qbar.sqrt();

        for k in 0..self.msize {
            let qeq_tilda = (self.qeq[k] - 2.0 * self.m_of_d) / (1.0 - self.m_of_d);
            let qeq_tilda_sub = (self.qeq[k] - 2.0 * self.m_of_v) / (1.0 - self.m_of_v);
            self.bmin[k] = 1.0 + 2.0 * (self.d as f64 - 1.0) / qeq_tilda;
            self.bmin_sub[k] = 1.0 + 2.0 * (self.v as f64 - 1.0) / qeq_tilda_sub;
        }

        self.k_mod.iter_mut().for_each(|v| *v = false);
        for k in 0..self.msize {
            let f3 = self.p[k] * self.bmin[k] * bc;
            if f3 < self.actmin[k] {
                self.actmin[k] = f3;
                self.actmin_sub[k] = self.p[k] * self.bmin_sub[k] * bc;
                self.k_mod[k] = true;
            }
        }

        if self.subwc == self.v {
            let noise_slope_max = if inv_qbar < self.inv_qbar_points[0] {
                self.nsmax[0]
            } else if inv_qbar < self.inv_qbar_points[1] {
                self.nsmax[1]
            } else if inv_qbar < self.inv_qbar_points[2] {
                self.nsmax[2]
            } else {
                self.nsmax[3]
            };

            for k in 0..self.msize {
                if self.k_mod[k] {
                    self.lmin_flag[k] = false;
                }
                self.actminbuff[self.amb_idx][k] = self.actmin[k];
                let mut min = 1.0e300;
                for ku in 0..self.u {
                    if self.actminbuff[ku][k] < min {
                        min = self.actminbuff[ku][k];
                    }
                }
                self.pmin_u[k] = min;
                if self.lmin_flag[k]
                    && self.actmin_sub[k] < noise_slope_max * self.pmin_u[k]
                    && self.actmin_sub[k] > self.pmin_u[k]
                {
                    self.pmin_u[k] = self.actmin_sub[k];
                    for ku in 0..self.u {
                        self.actminbuff[ku][k] = self.actmin_sub[k];
                    }
                }
                self.lmin_flag[k] = false;
                self.actmin[k] = 1.0e300;
                self.actmin_sub[k] = 1.0e300;
            }
            self.amb_idx += 1;
            if self.amb_idx == self.u {
                self.amb_idx = 0;
            }
            self.subwc = 1;
        } else {
            if self.subwc > 1 {
                for k in 0..self.msize {
                    if self.k_mod[k] {
                        self.lmin_flag[k] = true;
                        self.sigma2_n[k] = self.actmin_sub[k].min(self.pmin_u[k]);
                        self.pmin_u[k] = self.sigma2_n[k];
                    }
                }
            }
            self.subwc += 1;
        }

        self.lambda_d.copy_from_slice(&self.sigma2_n);
        &self.lambda_d
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interp_m_clamps_at_table_edges() {
        assert_eq!(interp_m(0.5), MVALS[0]);
        assert_eq!(interp_m(1000.0), MVALS[17]);
    }

    #[test]
    fn interp_m_interpolates_between_points() {
        let mid = interp_m(3.5);
        assert!(mid > MVALS[1] && mid < MVALS[2]);
    }

    #[test]
    fn stabilises_on_stationary_noise() {
        let msize = 16;
        let mut est = MinimumStatistics::new(msize, 512, 48000.0);
        let lambda_y = vec![1.0e-4; msize];
        let mut lambda_d = vec![0.0; msize];
        for _ in 0..4000 {
            lambda_d = est.update(&lambda_y).to_vec();
        }
        for &v in &lambda_d {
            assert!(v.is_finite());
            assert!(v > 0.0);
            assert!((v - 1.0e-4).abs() < 1.0e-4);
        }
    }
}
