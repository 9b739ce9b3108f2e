//! Ring-buffered overlap-add input/output accumulators.
//!
//! Indices are kept explicit rather than hidden behind a producer/consumer
//! abstraction: the overlap-add combination step walks the save buffers in a
//! specific order (`for i in (1..=overlap).rev()`) that is easiest to get
//! right, and keep right, against a reference trace when every index is a
//! plain field.

pub struct Framer {
    fsize: usize,
    hop: usize,
    overlap: usize,
    bsize: usize,

    iasize: usize,
    oasize: usize,
    inaccum: Vec<f64>,
    outaccum: Vec<f64>,
    save: Vec<Vec<f64>>,

    iainidx: usize,
    iaoutidx: usize,
    oainidx: usize,
    oaoutidx: usize,
    init_oainidx: usize,
    saveidx: usize,
    nsamps: usize,
}

impl Framer {
    pub fn new(fsize: usize, overlap: usize, bsize: usize) -> Self {
        let hop = fsize / overlap;
        let iasize = if fsize > bsize {
            fsize
        } else {
            bsize + fsize - hop
        };
        let (oasize, oainidx) = if fsize > bsize {
            let oasize = if bsize > hop { bsize } else { hop };
            let raw = fsize as i64 - bsize as i64 - hop as i64;
            (oasize, raw.rem_euclid(oasize as i64) as usize)
        } else {
            (bsize, fsize - hop)
        };

        Framer {
            fsize,
            hop,
            overlap,
            bsize,
            iasize,
            oasize,
            inaccum: vec![0.0; iasize],
            outaccum: vec![0.0; oasize],
            save: vec![vec![0.0; fsize]; overlap],
            iainidx: 0,
            iaoutidx: 0,
            oainidx,
            oaoutidx: 0,
            init_oainidx: oainidx,
            saveidx: 0,
            nsamps: 0,
        }
    }

    pub fn hop(&self) -> usize {
        self.hop
    }

    /// Appends `input` (in-phase samples, length `bsize`) to the input
    /// accumulator and advances the sample counter.
    pub fn push(&mut self, input: &[f64]) {
        debug_assert_eq!(input.len(), self.bsize);
        for &x in input {
            self.inaccum[self.iainidx] = x;
            self.iainidx = (self.iainidx + 1) % self.iasize;
        }
        self.nsamps += self.bsize;
    }

    pub fn frame_ready(&self) -> bool {
        self.nsamps >= self.fsize
    }

    /// Copies the next windowed analysis frame of length `fsize` into `frame`
    /// and advances the read cursor by one hop.
    pub fn take_frame(&mut self, window: &[f64], frame: &mut [f64]) {
        debug_assert_eq!(frame.len(), self.fsize);
        let mut j = self.iaoutidx;
        for i in 0..self.fsize {
            frame[i] = window[i] * self.inaccum[j];
            j = (j + 1) % self.iasize;
        }
        self.iaoutidx = (self.iaoutidx + self.hop) % self.iasize;
        self.nsamps -= self.hop;
    }

    /// Windows the synthesised frame, stores it into the current save slot
    /// and overlap-adds the save buffers into the output accumulator.
    pub fn store_and_overlap_add(&mut self, window: &[f64], synthesised: &[f64]) {
        debug_assert_eq!(synthesised.len(), self.fsize);
        let slot = &mut self.save[self.saveidx];
        for i in 0..self.fsize {
            slot[i] = window[i] * synthesised[i];
        }
        for i in (1..=self.overlap).rev() {
            let sbuff = (self.saveidx + i) % self.overlap;
            let sbegin = self.hop * (self.overlap - i);
            let mut k = self.oainidx;
            for j in sbegin..(sbegin + self.hop) {
                if i == self.overlap {
                    self.outaccum[k] = self.save[sbuff][j];
                } else {
                    self.outaccum[k] += self.save[sbuff][j];
                }
                k = (k + 1) % self.oasize;
            }
        }
        self.saveidx = (self.saveidx + 1) % self.overlap;
        self.oainidx = (self.oainidx + self.hop) % self.oasize;
    }

    /// Drains `bsize` samples from the output accumulator into `output`.
    pub fn pull(&mut self, output: &mut [f64]) {
        debug_assert_eq!(output.len(), self.bsize);
        for o in output.iter_mut() {
            *o = self.outaccum[self.oaoutidx];
            self.oaoutidx = (self.oaoutidx + 1) % self.oasize;
        }
    }

    pub fn flush(&mut self) {
        self.inaccum.iter_mut().for_each(|v| *v = 0.0);
        for buf in &mut self.save {
            buf.iter_mut().for_each(|v| *v = 0.0);
        }
        self.outaccum.iter_mut().for_each(|v| *v = 0.0);
        self.nsamps = 0;
        self.iainidx = 0;
        self.iaoutidx = 0;
        self.oainidx = self.init_oainidx;
        self.oaoutidx = 0;
        self.saveidx = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flush_restores_index_seeds() {
        let mut framer = Framer::new(16, 4, 8);
        let block = vec![1.0; 8];
        framer.push(&block);
        framer.push(&block);
        let window = vec![1.0; 16];
        let mut frame = vec![0.0; 16];
        framer.take_frame(&window, &mut frame);
        framer.flush();
        assert_eq!(framer.iainidx, 0);
        assert_eq!(framer.iaoutidx, 0);
        assert_eq!(framer.oaoutidx, 0);
        assert_eq!(framer.oainidx, framer.init_oainidx);
        assert_eq!(framer.saveidx, 0);
        assert_eq!(framer.nsamps, 0);
        assert!(framer.inaccum.iter().all(|&v| v == 0.0));
        assert!(framer.outaccum.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn identity_pass_through_reproduces_input_after_latency() {
        // fsize == bsize, overlap 1: degenerates to a pure block delay.
        let fsize = 8;
        let overlap = 1;
        let bsize = 8;
        let mut framer = Framer::new(fsize, overlap, bsize);
        let window = vec![1.0; fsize];
        let input: Vec<f64> = (0..fsize).map(|i| i as f64 + 1.0).collect();

        framer.push(&input);
        assert!(framer.frame_ready());
        let mut frame = vec![0.0; fsize];
        framer.take_frame(&window, &mut frame);
        framer.store_and_overlap_add(&window, &frame);
        let mut out = vec![0.0; bsize];
        framer.pull(&mut out);
        assert_eq!(out, input);
    }

    #[test]
    fn frame_ready_tracks_accumulated_samples() {
        let mut framer = Framer::new(16, 4, 4);
        assert!(!framer.frame_ready());
        for _ in 0..4 {
            framer.push(&vec![0.0; 4]);
        }
        assert!(framer.frame_ready());
    }
}
