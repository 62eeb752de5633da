//! Noise layer: colored noise through a band-pass whose centre drifts with
//! a slow LFO.

use crate::dsp::{ColoredNoiseGenerator, NoiseType, Oscillator, StateFilter, Waveform};
use crate::engine::buffer::AudioBuffer;

use super::{duplicate_first_channel, LayerControls};

pub const MIN_CENTER_HZ: f32 = 500.0;
pub const MAX_CENTER_HZ: f32 = 8000.0;

/// Centre offset at full modulation depth (Hz)
const SWEEP_RANGE_HZ: f32 = 1000.0;

const LFO_RATE_HZ: f32 = 0.1;
const FILTER_RESONANCE: f32 = 0.5;

const DEFAULT_CENTER_HZ: f32 = 2000.0;
const DEFAULT_MOD_DEPTH: f32 = 0.5;
const DEFAULT_ATMOSPHERE: f32 = 0.8;
const DEFAULT_LEVEL: f32 = 0.4;

#[derive(Debug, Clone)]
pub struct NoiseLayer {
    pub(super) controls: LayerControls,
    generator: ColoredNoiseGenerator,
    noise_type: NoiseType,
    filter: StateFilter,
    lfo: Oscillator,
    center: f32,
    mod_depth: f32,
    atmosphere: f32,
}

impl NoiseLayer {
    /// Noise layer seeded from OS entropy
    pub fn new() -> Self {
        Self::with_generator(ColoredNoiseGenerator::new())
    }

    /// Noise layer with a reproducible random stream
    pub fn with_seed(seed: u64) -> Self {
        Self::with_generator(ColoredNoiseGenerator::with_seed(seed))
    }

    fn with_generator(generator: ColoredNoiseGenerator) -> Self {
        Self {
            controls: LayerControls::new(DEFAULT_LEVEL),
            generator,
            noise_type: NoiseType::Pink,
            filter: StateFilter::band_pass(DEFAULT_CENTER_HZ, FILTER_RESONANCE),
            lfo: Oscillator::new(Waveform::Sine, LFO_RATE_HZ),
            center: DEFAULT_CENTER_HZ,
            mod_depth: DEFAULT_MOD_DEPTH,
            atmosphere: DEFAULT_ATMOSPHERE,
        }
    }

    pub fn prepare(&mut self, sample_rate: f64) {
        self.filter.prepare(sample_rate);
        self.lfo.prepare(sample_rate);
        self.generator.reset();
        self.controls.prepare(sample_rate);
    }

    /// Takes effect from the next sample; filter state is kept
    pub fn set_noise_type(&mut self, noise_type: NoiseType) {
        self.noise_type = noise_type;
    }

    pub fn noise_type(&self) -> NoiseType {
        self.noise_type
    }

    /// Band-pass centre before modulation, clamped to [500, 8000] Hz
    pub fn set_filter_frequency(&mut self, frequency: f32) {
        self.center = if frequency.is_nan() {
            DEFAULT_CENTER_HZ
        } else {
            frequency.clamp(MIN_CENTER_HZ, MAX_CENTER_HZ)
        };
    }

    pub fn filter_frequency(&self) -> f32 {
        self.center
    }

    /// LFO depth, [0, 1]; 1 sweeps the centre by ±1 kHz
    pub fn set_filter_modulation(&mut self, depth: f32) {
        self.mod_depth = if depth.is_nan() { 0.0 } else { depth.clamp(0.0, 1.0) };
    }

    pub fn filter_modulation(&self) -> f32 {
        self.mod_depth
    }

    pub fn set_atmosphere(&mut self, amount: f32) {
        self.atmosphere = if amount.is_nan() { 0.0 } else { amount.clamp(0.0, 1.0) };
    }

    pub fn atmosphere(&self) -> f32 {
        self.atmosphere
    }

    /// Centre the band-pass is currently tuned to
    pub fn current_center(&self) -> f32 {
        self.filter.cutoff()
    }

    pub fn set_level(&mut self, level: f32) {
        self.controls.set_level(level);
    }

    pub fn set_active(&mut self, active: bool) {
        self.controls.set_active(active);
    }

    pub fn is_active(&self) -> bool {
        self.controls.is_active()
    }

    pub fn controls_mut(&mut self) -> &mut LayerControls {
        &mut self.controls
    }

    pub fn process(&mut self, buffer: &mut AudioBuffer, num_samples: usize) {
        let n = num_samples.min(buffer.len());
        if n == 0 {
            return;
        }
        if !self.controls.is_active() {
            buffer.clear_range(0, n);
            return;
        }

        let out = buffer.channel_mut(0);
        for sample in out[..n].iter_mut() {
            let lfo = self.lfo.next_sample();
            let center = (self.center + lfo * self.mod_depth * SWEEP_RANGE_HZ)
                .clamp(MIN_CENTER_HZ, MAX_CENTER_HZ);
            self.filter.set_cutoff(center);

            let noise = self.generator.next(self.noise_type);
            let filtered = self.filter.process_sample(noise);
            *sample = filtered * self.atmosphere * self.controls.next_gain();
        }
        duplicate_first_channel(buffer, n);
    }

    pub fn reset(&mut self) {
        self.generator.reset();
        self.filter.reset();
        self.lfo.reset();
        self.controls.reset();
    }
}

impl Default for NoiseLayer {
    fn default() -> Self {
        Self::new()
    }
}
