//! Oscillator layer: three detuned oscillators through a low-pass.

use crate::dsp::{Oscillator, StateFilter, Waveform};
use crate::engine::buffer::AudioBuffer;

use super::{duplicate_first_channel, LayerControls};

/// Equal-gain normalization for three summed oscillators
const INV_SQRT_3: f32 = 0.577_350_27;

/// Detune spread of the upper and lower voices, as fractions of `detune_cents`.
/// Unequal so the two beat at different rates.
const UPPER_SPREAD: f32 = 0.5;
const LOWER_SPREAD: f32 = -0.7;

const FILTER_CUTOFF_HZ: f32 = 1200.0;
const FILTER_RESONANCE: f32 = 0.3;

pub const MAX_DETUNE_CENTS: f32 = 50.0;

const DEFAULT_FREQUENCY: f32 = 440.0;
const DEFAULT_DETUNE_CENTS: f32 = 5.0;
const DEFAULT_LEVEL: f32 = 0.7;

#[inline]
fn cents_to_ratio(cents: f32) -> f32 {
    2.0_f32.powf(cents / 1200.0)
}

#[derive(Debug, Clone)]
pub struct OscillatorLayer {
    pub(super) controls: LayerControls,
    oscillators: [Oscillator; 3],
    filter: StateFilter,
    base_frequency: f32,
    detune_cents: f32,
    waveform: Waveform,
}

impl OscillatorLayer {
    pub fn new() -> Self {
        let waveform = Waveform::Triangle;
        let mut layer = Self {
            controls: LayerControls::new(DEFAULT_LEVEL),
            oscillators: std::array::from_fn(|_| Oscillator::new(waveform, DEFAULT_FREQUENCY)),
            filter: StateFilter::low_pass(FILTER_CUTOFF_HZ, FILTER_RESONANCE),
            base_frequency: DEFAULT_FREQUENCY,
            detune_cents: DEFAULT_DETUNE_CENTS,
            waveform,
        };
        layer.update_frequencies();
        layer
    }

    pub fn prepare(&mut self, sample_rate: f64) {
        for osc in &mut self.oscillators {
            osc.prepare(sample_rate);
        }
        self.filter.prepare(sample_rate);
        self.controls.prepare(sample_rate);
    }

    /// Set the played frequency; negative values become 0 Hz
    pub fn set_frequency(&mut self, frequency: f32) {
        let frequency = frequency.max(0.0);
        if frequency != self.base_frequency {
            self.base_frequency = frequency;
            self.update_frequencies();
        }
    }

    /// The frequency last passed to `set_frequency`
    pub fn effective_frequency(&self) -> f32 {
        self.base_frequency
    }

    /// Switch all three oscillators; phases are kept
    pub fn set_waveform(&mut self, waveform: Waveform) {
        if waveform != self.waveform {
            self.waveform = waveform;
            for osc in &mut self.oscillators {
                osc.set_waveform(waveform);
            }
        }
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    /// Detune in cents, clamped to ±50
    pub fn set_detune(&mut self, cents: f32) {
        let cents = if cents.is_nan() {
            0.0
        } else {
            cents.clamp(-MAX_DETUNE_CENTS, MAX_DETUNE_CENTS)
        };
        if cents != self.detune_cents {
            self.detune_cents = cents;
            self.update_frequencies();
        }
    }

    pub fn detune(&self) -> f32 {
        self.detune_cents
    }

    /// Frequencies of the three oscillators (centre, upper, lower)
    pub fn voice_frequencies(&self) -> [f32; 3] {
        [
            self.oscillators[0].frequency(),
            self.oscillators[1].frequency(),
            self.oscillators[2].frequency(),
        ]
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

        let [a, b, c] = &mut self.oscillators;
        let out = buffer.channel_mut(0);
        for sample in out[..n].iter_mut() {
            let sum = a.next_sample() + b.next_sample() + c.next_sample();
            let filtered = self.filter.process_sample(sum * INV_SQRT_3);
            *sample = filtered * self.controls.next_gain();
        }
        duplicate_first_channel(buffer, n);
    }

    pub fn reset(&mut self) {
        for osc in &mut self.oscillators {
            osc.reset();
        }
        self.filter.reset();
        self.controls.reset();
    }

    fn update_frequencies(&mut self) {
        let f = self.base_frequency;
        let d = self.detune_cents;
        self.oscillators[0].set_frequency(f);
        self.oscillators[1].set_frequency(f * cents_to_ratio(d * UPPER_SPREAD));
        self.oscillators[2].set_frequency(f * cents_to_ratio(d * LOWER_SPREAD));
    }
}

impl Default for OscillatorLayer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::AdsrParams;
    use crate::engine::buffer::ChannelLayout;
    use approx::assert_relative_eq;

    fn sounding(sample_rate: f64) -> OscillatorLayer {
        let mut layer = OscillatorLayer::new();
        layer.prepare(sample_rate);
        layer.controls_mut().set_envelope(AdsrParams::new(0.0, 0.0, 1.0, 0.0));
        layer.set_active(true);
        layer
    }

    #[test]
    fn test_effective_frequency_round_trip() {
        let mut layer = OscillatorLayer::new();
        for f in [27.5, 220.0, 440.0, 1234.5] {
            layer.set_frequency(f);
            assert_eq!(layer.effective_frequency(), f);
        }
    }

    #[test]
    fn test_detune_ratios() {
        let mut layer = OscillatorLayer::new();
        layer.set_frequency(440.0);
        layer.set_detune(20.0);
        let [f1, f2, f3] = layer.voice_frequencies();
        assert_eq!(f1, 440.0);
        assert_relative_eq!(f2, 440.0 * 2.0_f32.powf(10.0 / 1200.0), max_relative = 1e-6);
        assert_relative_eq!(f3, 440.0 * 2.0_f32.powf(-14.0 / 1200.0), max_relative = 1e-6);
    }

    #[test]
    fn test_detune_clamped() {
        let mut layer = OscillatorLayer::new();
        layer.set_detune(400.0);
        assert_eq!(layer.detune(), 50.0);
        layer.set_detune(-400.0);
        assert_eq!(layer.detune(), -50.0);
    }

    #[test]
    fn test_zero_detune_shares_frequency() {
        let mut layer = OscillatorLayer::new();
        layer.set_frequency(330.0);
        layer.set_detune(0.0);
        let [f1, f2, f3] = layer.voice_frequencies();
        assert_eq!(f1, f2);
        assert_eq!(f2, f3);
    }

    #[test]
    fn test_channels_identical() {
        let mut layer = sounding(48000.0);
        layer.set_waveform(Waveform::Saw);
        let mut buffer = AudioBuffer::new(512, ChannelLayout::Stereo);
        layer.process(&mut buffer, 512);
        assert_eq!(buffer.channel(0), buffer.channel(1));
        assert!(!buffer.is_silent());
    }

    #[test]
    fn test_partial_block_leaves_tail_untouched() {
        let mut layer = sounding(48000.0);
        let mut buffer = AudioBuffer::new(64, ChannelLayout::Stereo);
        buffer.channel_mut(1).fill(9.0);
        layer.process(&mut buffer, 32);
        assert!(buffer.channel(1)[32..].iter().all(|&s| s == 9.0));
    }

    #[test]
    fn test_zero_detune_matches_scaled_single_oscillator() {
        let mut layer = sounding(48000.0);
        layer.set_waveform(Waveform::Saw);
        layer.set_frequency(220.0);
        layer.set_detune(0.0);
        layer.set_level(0.5);

        let mut reference_osc = Oscillator::new(Waveform::Saw, 220.0);
        reference_osc.prepare(48000.0);
        let mut reference_filter = StateFilter::low_pass(FILTER_CUTOFF_HZ, FILTER_RESONANCE);
        reference_filter.prepare(48000.0);

        let mut buffer = AudioBuffer::new(2048, ChannelLayout::Mono);
        layer.process(&mut buffer, 2048);

        let sqrt3 = 3.0_f32.sqrt();
        for (i, &got) in buffer.channel(0).iter().enumerate() {
            let x = reference_osc.next_sample();
            let expected = reference_filter.process_sample(x * sqrt3) * 0.5;
            assert!((got - expected).abs() < 1e-4, "sample {i}: {got} vs {expected}");
        }
    }
}
