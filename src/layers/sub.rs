//! Sub-bass layer: fundamental and octave-down sines, low-passed.

use crate::dsp::{Oscillator, StateFilter, Waveform};
use crate::engine::buffer::AudioBuffer;

use super::{duplicate_first_channel, LayerControls};

pub const MIN_SUB_FREQUENCY: f32 = 40.0;
pub const MAX_SUB_FREQUENCY: f32 = 120.0;
pub const MAX_HARMONICS: f32 = 0.5;

const FILTER_CUTOFF_HZ: f32 = 120.0;
const FILTER_RESONANCE: f32 = 0.1;

const DEFAULT_FREQUENCY: f32 = 60.0;
const DEFAULT_LEVEL: f32 = 0.3;
const DEFAULT_HARMONICS: f32 = 0.2;
const DEFAULT_WARMTH: f32 = 0.5;

#[derive(Debug, Clone)]
pub struct SubLayer {
    pub(super) controls: LayerControls,
    fundamental: Oscillator,
    octave_down: Oscillator,
    filter: StateFilter,
    frequency: f32,
    harmonics: f32,
    warmth: f32,
}

impl SubLayer {
    pub fn new() -> Self {
        Self {
            controls: LayerControls::new(DEFAULT_LEVEL),
            fundamental: Oscillator::new(Waveform::Sine, DEFAULT_FREQUENCY),
            octave_down: Oscillator::new(Waveform::Sine, DEFAULT_FREQUENCY * 0.5),
            filter: StateFilter::low_pass(FILTER_CUTOFF_HZ, FILTER_RESONANCE),
            frequency: DEFAULT_FREQUENCY,
            harmonics: DEFAULT_HARMONICS,
            warmth: DEFAULT_WARMTH,
        }
    }

    pub fn prepare(&mut self, sample_rate: f64) {
        self.fundamental.prepare(sample_rate);
        self.octave_down.prepare(sample_rate);
        self.filter.prepare(sample_rate);
        self.controls.prepare(sample_rate);
    }

    /// Set the fundamental, clamped to the sub range [40, 120] Hz
    pub fn set_frequency(&mut self, frequency: f32) {
        let frequency = if frequency.is_nan() {
            MIN_SUB_FREQUENCY
        } else {
            frequency.clamp(MIN_SUB_FREQUENCY, MAX_SUB_FREQUENCY)
        };
        if frequency != self.frequency {
            self.frequency = frequency;
            self.fundamental.set_frequency(frequency);
            self.octave_down.set_frequency(frequency * 0.5);
        }
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    /// Amount of the octave-down sine, [0, 0.5]
    pub fn set_harmonics(&mut self, amount: f32) {
        self.harmonics = if amount.is_nan() { 0.0 } else { amount.clamp(0.0, MAX_HARMONICS) };
    }

    pub fn harmonics(&self) -> f32 {
        self.harmonics
    }

    /// Output scaling, [0, 1]
    pub fn set_warmth(&mut self, amount: f32) {
        self.warmth = if amount.is_nan() { 0.0 } else { amount.clamp(0.0, 1.0) };
    }

    pub fn warmth(&self) -> f32 {
        self.warmth
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
            let mixed = self.fundamental.next_sample() + self.octave_down.next_sample() * self.harmonics;
            let filtered = self.filter.process_sample(mixed);
            *sample = filtered * self.warmth * self.controls.next_gain();
        }
        duplicate_first_channel(buffer, n);
    }

    pub fn reset(&mut self) {
        self.fundamental.reset();
        self.octave_down.reset();
        self.filter.reset();
        self.controls.reset();
    }
}

impl Default for SubLayer {
    fn default() -> Self {
        Self::new()
    }
}
