//! Adaptive smoothing of the gain mask across frequency, driven by the
//! residual-noise energy ratio.

pub struct PostFilter {
    msize: usize,
    pub zeta_thresh: f64,
    pub psi: f64,
    pub t2: f64,
    nmask: Vec<f64>,
}

impl PostFilter {
    pub fn new(msize: usize) -> Self {
        PostFilter {
            msize,
            zeta_thresh: 0.75,
            psi: 20.0,
            t2: 0.20,
            nmask: vec![0.0; msize],
        }
    }

    /// Smooths `mask` in place. Returns `zeta_t`, the clamped energy ratio,
    /// so the caller can apply the learned-gain mute rule.
    pub fn apply(&mut self, lambda_y: &[f64], mask: &mut [f64]) -> f64 {
        debug_assert_eq!(lambda_y.len(), self.msize);
        debug_assert_eq!(mask.len(), self.msize);

        let mut sum_pre = 0.0;
        let mut sum_post = 0.0;
        for k in 0..self.msize {
            sum_pre += lambda_y[k];
            sum_post += mask[k] * mask[k] * lambda_y[k];
        }
        let zeta = sum_post / sum_pre;
        let zeta_t = if zeta >= self.zeta_thresh { 1.0 } else { zeta };

        let kernel_len = if zeta_t == 1.0 {
            1
        } else {
            1 + 2 * (0.5 + self.psi * (1.0 - zeta_t / self.zeta_thresh)) as i64 as usize
        };
        // Clamp so the widest kernel can never reach past either edge of a
        // short spectrum; an unclamped `n` panics on a near-silent frame
        // with a wide spectrum-independent kernel (low zeta_t, small msize).
        let n = (kernel_len / 2).min(self.msize / 2);

        for k in 0..n {
            let mut acc = 0.0;
            for m in 0..=(2 * k) {
                acc += mask[m];
            }
            self.nmask[k] = acc / (2 * k + 1) as f64;
        }
        for k in n..(self.msize - n) {
            let mut acc = 0.0;
            for m in (k - n)..=(k + n) {
                acc += mask[m];
            }
            self.nmask[k] = acc / kernel_len as f64;
        }
        for k in (self.msize - n)..self.msize {
            let mut acc = 0.0;
            // Mirrors the C loop's descending range; equivalent to summing
            // the last `2*(msize-k)-1` bins.
            let span = 2 * (self.msize - k) - 1;
            for m in (self.msize - span)..self.msize {
                acc += mask[m];
            }
            self.nmask[k] = acc / span as f64;
        }

        mask.copy_from_slice(&self.nmask);
        zeta_t
    }
}
