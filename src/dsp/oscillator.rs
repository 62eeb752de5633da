//! Phase-accumulator oscillator.
//!
//! Shapes are evaluated directly from the phase (no wavetable), so switching
//! waveform takes effect on the next sample without touching the phase.

use std::f64::consts::{PI, TAU};

use serde::{Deserialize, Serialize};

/// Supported waveform shapes.
///
/// Index order matches the `osc1Waveform` choice parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Waveform {
    #[default]
    Sine,
    Saw,
    Triangle,
    Square,
}

impl Waveform {
    pub const NAMES: [&'static str; 4] = ["sine", "saw", "triangle", "square"];

    /// Map a choice index to a waveform; out-of-range indices fall back to sine.
    pub fn from_index(index: usize) -> Self {
        match index {
            1 => Waveform::Saw,
            2 => Waveform::Triangle,
            3 => Waveform::Square,
            _ => Waveform::Sine,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Waveform::Sine => 0,
            Waveform::Saw => 1,
            Waveform::Triangle => 2,
            Waveform::Square => 3,
        }
    }

    /// Evaluate the shape at a normalized phase in [0, 1).
    #[inline]
    pub fn evaluate(self, phase: f64) -> f64 {
        let x = TAU * phase;
        match self {
            Waveform::Sine => x.sin(),
            Waveform::Saw => 2.0 * phase - 1.0,
            // asin(sin(x)) folds the sine into a straight-sided triangle
            Waveform::Triangle => x.sin().asin() * (2.0 / PI),
            Waveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
        }
    }
}

/// A single periodic oscillator with its own phase.
#[derive(Debug, Clone)]
pub struct Oscillator {
    waveform: Waveform,
    frequency: f32,
    phase: f64,
    phase_inc: f64,
    sample_rate: f64,
}

impl Oscillator {
    pub fn new(waveform: Waveform, frequency: f32) -> Self {
        let mut osc = Oscillator {
            waveform,
            frequency: 0.0,
            phase: 0.0,
            phase_inc: 0.0,
            sample_rate: 44100.0,
        };
        osc.set_frequency(frequency);
        osc
    }

    pub fn prepare(&mut self, sample_rate: f64) {
        if sample_rate.is_finite() && sample_rate > 0.0 {
            self.sample_rate = sample_rate;
        }
        self.update_increment();
        self.reset();
    }

    /// Set frequency in Hz. Negative and NaN inputs become 0 Hz.
    pub fn set_frequency(&mut self, frequency: f32) {
        self.frequency = frequency.max(0.0);
        self.update_increment();
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.waveform = waveform;
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    /// Phase increment per sample (cycles/sample).
    pub fn phase_increment(&self) -> f64 {
        self.phase_inc
    }

    /// Generate the next sample.
    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        let sample = self.waveform.evaluate(self.phase);

        self.phase += self.phase_inc;
        if self.phase >= 1.0 {
            self.phase -= self.phase.floor();
        }

        sample as f32
    }

    /// Reset oscillator phase.
    pub fn reset(&mut self) {
        self.phase = 0.0;
    }

    fn update_increment(&mut self) {
        // Above Nyquist the oscillator only aliases; pin it there instead.
        let nyquist = self.sample_rate * 0.5;
        self.phase_inc = (self.frequency as f64).min(nyquist) / self.sample_rate;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sine_zero_at_start() {
        let mut osc = Oscillator::new(Waveform::Sine, 440.0);
        osc.prepare(48000.0);
        let sample = osc.next_sample();
        assert!(sample.abs() < 1e-7, "Sine should start at 0, got {sample}");
    }

    #[test]
    fn sine_matches_reference() {
        let mut osc = Oscillator::new(Waveform::Sine, 440.0);
        osc.prepare(48000.0);
        for n in 0..4800 {
            let expected = (TAU * 440.0 * n as f64 / 48000.0).sin() as f32;
            let got = osc.next_sample();
            assert!((got - expected).abs() < 1e-4, "n={n}: {got} vs {expected}");
        }
    }

    #[test]
    fn all_shapes_stay_in_range() {
        for waveform in [Waveform::Sine, Waveform::Saw, Waveform::Triangle, Waveform::Square] {
            let mut osc = Oscillator::new(waveform, 330.0);
            osc.prepare(44100.0);
            for _ in 0..44100 {
                let s = osc.next_sample();
                assert!((-1.0..=1.0).contains(&s), "{waveform:?} out of range: {s}");
            }
        }
    }

    #[test]
    fn triangle_hits_peaks_at_quarter_phases() {
        assert!((Waveform::Triangle.evaluate(0.25) - 1.0).abs() < 1e-9);
        assert!((Waveform::Triangle.evaluate(0.75) + 1.0).abs() < 1e-9);
        assert!(Waveform::Triangle.evaluate(0.0).abs() < 1e-9);
        // linear between the peaks
        assert!((Waveform::Triangle.evaluate(0.125) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn waveform_index_roundtrip() {
        for (i, name) in Waveform::NAMES.iter().enumerate() {
            let w = Waveform::from_index(i);
            assert_eq!(w.index(), i);
            assert_eq!(serde_json::to_value(w).unwrap(), serde_json::json!(name));
        }
        assert_eq!(Waveform::from_index(99), Waveform::Sine);
    }

    #[test]
    fn waveform_switch_keeps_phase() {
        let mut a = Oscillator::new(Waveform::Sine, 1000.0);
        a.prepare(48000.0);
        for _ in 0..10 {
            a.next_sample();
        }
        a.set_waveform(Waveform::Saw);
        let mut b = Oscillator::new(Waveform::Saw, 1000.0);
        b.prepare(48000.0);
        for _ in 0..10 {
            b.next_sample();
        }
        assert_eq!(a.next_sample(), b.next_sample());
    }

    #[test]
    fn frequency_pinned_at_nyquist() {
        let mut osc = Oscillator::new(Waveform::Sine, 100_000.0);
        osc.prepare(48000.0);
        assert!((osc.phase_increment() - 0.5).abs() < 1e-12);
        osc.set_frequency(-3.0);
        assert_eq!(osc.frequency(), 0.0);
    }
}
