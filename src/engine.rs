//! Top-level state machine: Framer -> SpectralCore -> NoiseEstimator ->
//! GainEstimator -> optional PostFilter -> SpectralCore(inverse) -> Framer.

use num_complex::Complex;

use crate::config::{EngineConfig, GainMethod, NoiseMethod};
use crate::error::EngineError;
use crate::framer::Framer;
use crate::gain::GainEstimatorSlot;
use crate::noise::NoiseEstimatorSlot;
use crate::postfilter::PostFilter;
use crate::spectral::{periodogram, SpectralCore};
use crate::tables::TableStore;
use crate::window::build_window;

pub struct Engine {
    config: EngineConfig,
    run: bool,
    /// The host's dispatch-position selector. Matching it against the
    /// channel graph's current position is the host's responsibility (see
    /// the out-of-scope channel graph); the engine only stores the value.
    position: i32,

    window: Vec<f64>,
    framer: Framer,
    spectral: SpectralCore,

    noise: NoiseEstimatorSlot,
    noise_method: NoiseMethod,
    gain: GainEstimatorSlot,
    gain_method: GainMethod,
    tables: TableStore,

    post_filter: PostFilter,
    post_filter_enabled: bool,

    frame: Vec<f64>,
    spectrum: Vec<Complex<f64>>,
    lambda_y: Vec<f64>,
    mask: Vec<f64>,
    synthesis_spectrum: Vec<Complex<f64>>,
    synthesis_frame: Vec<f64>,
}

impl Engine {
    pub fn new(config: EngineConfig, tables: TableStore) -> Result<Engine, EngineError> {
        config.validate()?;
        Self::build(config, tables, true, 0)
    }

    fn build(config: EngineConfig, tables: TableStore, run: bool, position: i32) -> Result<Engine, EngineError> {
        let hop = config.hop();
        let msize = config.one_sided_len();
        let window = build_window(config.window_type, config.fft_size);

        let noise_method = config.npe_method;
        let gain_method = config.gain_method;

        Ok(Engine {
            window,
            framer: Framer::new(config.fft_size, config.overlap, config.block_size),
            spectral: SpectralCore::new(config.fft_size),
            noise: NoiseEstimatorSlot::new(noise_method, msize, hop, config.sample_rate),
            noise_method,
            gain: GainEstimatorSlot::new(gain_method, msize, hop, config.sample_rate),
            gain_method,
            tables,
            post_filter: PostFilter::new(msize),
            post_filter_enabled: config.post_filter_enable,
            frame: vec![0.0; config.fft_size],
            spectrum: vec![Complex::new(0.0, 0.0); msize],
            lambda_y: vec![0.0; msize],
            mask: vec![0.0; msize],
            synthesis_spectrum: vec![Complex::new(0.0, 0.0); msize],
            synthesis_frame: vec![0.0; config.fft_size],
            config,
            run,
            position,
        })
    }

    pub fn set_run(&mut self, run: bool) {
        self.run = run;
    }

    pub fn set_position(&mut self, position: i32) {
        self.position = position;
    }

    pub fn set_gain_method(&mut self, method: GainMethod) {
        if method == self.gain_method {
            return;
        }
        self.gain_method = method;
        self.config.gain_method = method;
        let hop = self.config.hop();
        self.gain = GainEstimatorSlot::new(method, self.config.one_sided_len(), hop, self.config.sample_rate);
    }

    pub fn set_noise_method(&mut self, method: NoiseMethod) {
        if method == self.noise_method {
            return;
        }
        self.noise_method = method;
        self.config.npe_method = method;
        let hop = self.config.hop();
        self.noise = NoiseEstimatorSlot::new(method, self.config.one_sided_len(), hop, self.config.sample_rate);
    }

    pub fn set_post_filter_enabled(&mut self, enabled: bool) {
        self.post_filter_enabled = enabled;
        self.config.post_filter_enable = enabled;
    }

    /// Sets the learned-threshold gain estimator's own `zeta_thresh`
    /// (`g.zeta_thresh` in the original, default -2.0).
    pub fn set_zeta_thresh(&mut self, value: f64) {
        self.gain.set_zeta_thresh(value);
    }

    /// Sets the post-filter's energy-ratio threshold (`ae.zetaThresh` in the
    /// original, default 0.75) — a distinct knob from `set_zeta_thresh`.
    pub fn set_post_filter_zeta_thresh(&mut self, value: f64) {
        self.post_filter.zeta_thresh = value;
    }

    pub fn set_psi(&mut self, value: f64) {
        self.post_filter.psi = value;
    }

    pub fn set_t2(&mut self, value: f64) {
        self.post_filter.t2 = value;
    }

    pub fn flush(&mut self) {
        self.framer.flush();
    }

    pub fn set_sample_rate(&mut self, rate: f64) -> Result<(), EngineError> {
        let mut config = self.config;
        config.sample_rate = rate;
        config.validate()?;
        *self = Self::build(config, std::mem::replace(&mut self.tables, TableStore::compiled_defaults()), self.run, self.position)?;
        Ok(())
    }

    pub fn set_block_size(&mut self, size: usize) -> Result<(), EngineError> {
        let mut config = self.config;
        config.block_size = size;
        config.validate()?;
        *self = Self::build(config, std::mem::replace(&mut self.tables, TableStore::compiled_defaults()), self.run, self.position)?;
        Ok(())
    }

    /// Processes one host block. `input`/`output` carry `block_size`
    /// complex samples each; only the in-phase component of `input` is
    /// read, and `output`'s quadrature component is always zeroed.
    pub fn process(&mut self, input: &[Complex<f64>], output: &mut [Complex<f64>]) {
        debug_assert_eq!(input.len(), self.config.block_size);
        debug_assert_eq!(output.len(), self.config.block_size);

        if !self.run {
            if !std::ptr::eq(input.as_ptr(), output.as_ptr()) {
                for (o, i) in output.iter_mut().zip(input.iter()) {
                    *o = *i;
                }
            }
            return;
        }

        let in_phase: Vec<f64> = input.iter().map(|c| c.re).collect();
        self.framer.push(&in_phase);

        while self.framer.frame_ready() {
            self.framer.take_frame(&self.window, &mut self.frame);
            self.spectral.forward(&self.frame, &mut self.spectrum);

            periodogram(&self.spectrum, &mut self.lambda_y);
            let lambda_d = self.noise.update(&self.lambda_y).to_vec();

            self.gain.compute(&self.lambda_y, &lambda_d, &self.tables, &mut self.mask);

            if self.post_filter_enabled {
                let zeta_t = self.post_filter.apply(&self.lambda_y, &mut self.mask);
                if self.gain.is_learned() && zeta_t < self.post_filter.t2 {
                    for g in self.mask.iter_mut() {
                        *g *= 0.05;
                    }
                }
            }

            let overall_gain = self.config.output_gain / self.config.fft_size as f64 / self.config.overlap as f64;
            for k in 0..self.spectrum.len() {
                let g = overall_gain * self.mask[k];
                self.synthesis_spectrum[k] = self.spectrum[k] * g;
            }

            self.spectral.inverse(&self.synthesis_spectrum, &mut self.synthesis_frame);
            self.framer.store_and_overlap_add(&self.window, &self.synthesis_frame);
        }

        let mut out_in_phase = vec![0.0; self.config.block_size];
        self.framer.pull(&mut out_in_phase);
        for (o, &i) in output.iter_mut().zip(out_in_phase.iter()) {
            *o = Complex::new(i, 0.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::WindowType;

    fn test_config() -> EngineConfig {
        EngineConfig {
            fft_size: 512,
            overlap: 4,
            block_size: 256,
            sample_rate: 48000.0,
            window_type: WindowType::HannRoot,
            output_gain: 1.0,
            gain_method: GainMethod::GammaTabulated,
            npe_method: NoiseMethod::MinimumStatistics,
            post_filter_enable: false,
        }
    }

    #[test]
    fn silence_stays_silent() {
        let mut engine = Engine::new(test_config(), TableStore::compiled_defaults()).unwrap();
        let input = vec![Complex::new(0.0, 0.0); 256];
        let mut output = vec![Complex::new(0.0, 0.0); 256];
        for _ in 0..40 {
            engine.process(&input, &mut output);
        }
        for c in &output {
            assert!(c.re.abs() < 1e-8);
            assert_eq!(c.im, 0.0);
        }
    }

    #[test]
    fn run_zero_is_byte_copy() {
        let mut engine = Engine::new(test_config(), TableStore::compiled_defaults()).unwrap();
        engine.set_run(false);
        let input: Vec<Complex<f64>> = (0..256).map(|i| Complex::new(i as f64, 7.0)).collect();
        let mut output = vec![Complex::new(0.0, 0.0); 256];
        engine.process(&input, &mut output);
        assert_eq!(input, output);
    }

    #[test]
    fn toggle_run_and_flush_reproduces_identical_second_segment() {
        let mut engine = Engine::new(test_config(), TableStore::compiled_defaults()).unwrap();
        let input: Vec<Complex<f64>> = (0..256).map(|i| Complex::new((i as f64 * 0.01).sin(), 0.0)).collect();

        let mut out1 = vec![Complex::new(0.0, 0.0); 256];
        for _ in 0..8 {
            engine.process(&input, &mut out1);
        }

        engine.set_run(false);
        let mut bypass = vec![Complex::new(0.0, 0.0); 256];
        engine.process(&input, &mut bypass);
        engine.set_run(true);
        engine.flush();

        let mut out2 = vec![Complex::new(0.0, 0.0); 256];
        for _ in 0..8 {
            engine.process(&input, &mut out2);
        }

        assert_eq!(out1, out2);
    }

    #[test]
    fn gain_method_survives_block_size_rebuild() {
        let mut engine = Engine::new(test_config(), TableStore::compiled_defaults()).unwrap();
        engine.set_gain_method(GainMethod::TwoStageLearned);
        engine.set_noise_method(NoiseMethod::Spp);
        engine.set_post_filter_enabled(true);
        engine.set_block_size(128).unwrap();
        assert_eq!(engine.gain_method, GainMethod::TwoStageLearned);
        assert_eq!(engine.noise_method, NoiseMethod::Spp);
        assert!(engine.post_filter_enabled);
    }

    #[test]
    fn post_filter_zeta_thresh_is_independent_of_gain_zeta_thresh() {
        let mut engine = Engine::new(test_config(), TableStore::compiled_defaults()).unwrap();
        engine.set_gain_method(GainMethod::TwoStageLearned);
        engine.set_zeta_thresh(0.3);
        engine.set_post_filter_zeta_thresh(0.9);
        assert_eq!(engine.post_filter.zeta_thresh, 0.9);
    }

    #[test]
    fn switching_gain_method_produces_no_nan_or_inf() {
        let mut engine = Engine::new(test_config(), TableStore::compiled_defaults()).unwrap();
        let input: Vec<Complex<f64>> = (0..256).map(|i| Complex::new((i as f64 * 0.05).sin(), 0.0)).collect();
        let mut output = vec![Complex::new(0.0, 0.0); 256];
        for i in 0..8 {
            if i == 4 {
                engine.set_gain_method(GainMethod::LogMmse);
            }
            engine.process(&input, &mut output);
            for c in &output {
                assert!(c.re.is_finite());
            }
        }
    }
}
