//! State-Variable Filter
//!
//! Topology-preserving-transform (trapezoidal) state-variable filter with
//! low-pass and band-pass outputs. State persists across blocks; coefficients
//! are recomputed whenever cutoff, resonance or sample rate change, which is
//! cheap enough to do every sample for the noise layer's sweep.
//!
//! `resonance` is the filter Q: 1/√2 is Butterworth, lower values are more
//! damped. Both cutoff and resonance are clamped at the setter, so the filter
//! cannot be driven unstable through its public API.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

// ============================================================================
// Constants
// ============================================================================

/// Lowest cutoff the filter accepts (Hz)
pub const MIN_CUTOFF_HZ: f32 = 10.0;

/// Highest cutoff as a fraction of the sample rate (just under Nyquist)
const MAX_CUTOFF_RATIO: f64 = 0.49;

/// Resonance (Q) range
pub const MIN_RESONANCE: f32 = 0.01;
pub const MAX_RESONANCE: f32 = 20.0;

/// Used until `prepare()` is called so coefficients are always finite
const FALLBACK_SAMPLE_RATE: f64 = 44100.0;

// ============================================================================
// Filter Mode
// ============================================================================

/// Which output of the state-variable core is returned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    #[default]
    LowPass,
    BandPass,
}

// ============================================================================
// State Filter
// ============================================================================

/// Resonant low-pass / band-pass filter with persistent state
#[derive(Debug, Clone)]
pub struct StateFilter {
    mode: FilterMode,
    cutoff: f32,
    resonance: f32,
    sample_rate: f64,

    // Coefficients
    g: f64,
    r2: f64,
    h: f64,

    // Integrator states
    s1: f64,
    s2: f64,
}

impl StateFilter {
    /// Create a filter with the given mode, cutoff (Hz) and resonance (Q)
    pub fn new(mode: FilterMode, cutoff: f32, resonance: f32) -> Self {
        let mut filter = Self {
            mode,
            cutoff: cutoff.max(MIN_CUTOFF_HZ),
            resonance: resonance.clamp(MIN_RESONANCE, MAX_RESONANCE),
            sample_rate: FALLBACK_SAMPLE_RATE,
            g: 0.0,
            r2: 0.0,
            h: 0.0,
            s1: 0.0,
            s2: 0.0,
        };
        filter.update_coefficients();
        filter
    }

    /// Low-pass filter shorthand
    pub fn low_pass(cutoff: f32, resonance: f32) -> Self {
        Self::new(FilterMode::LowPass, cutoff, resonance)
    }

    /// Band-pass filter shorthand
    pub fn band_pass(center: f32, resonance: f32) -> Self {
        Self::new(FilterMode::BandPass, center, resonance)
    }

    /// Set the sample rate and clear state
    pub fn prepare(&mut self, sample_rate: f64) {
        if sample_rate.is_finite() && sample_rate > 0.0 {
            self.sample_rate = sample_rate;
        }
        self.update_coefficients();
        self.reset();
    }

    /// Set cutoff (low-pass) or centre (band-pass) frequency in Hz
    ///
    /// Clamped to [MIN_CUTOFF_HZ, 0.49 * sample_rate]. NaN is treated as the
    /// minimum cutoff.
    pub fn set_cutoff(&mut self, cutoff: f32) {
        let max = (self.sample_rate * MAX_CUTOFF_RATIO) as f32;
        let clamped = if cutoff.is_nan() {
            MIN_CUTOFF_HZ
        } else {
            cutoff.clamp(MIN_CUTOFF_HZ, max)
        };
        if clamped != self.cutoff {
            self.cutoff = clamped;
            self.update_coefficients();
        }
    }

    /// Set resonance (Q), clamped to [MIN_RESONANCE, MAX_RESONANCE]
    pub fn set_resonance(&mut self, resonance: f32) {
        let clamped = if resonance.is_nan() {
            MIN_RESONANCE
        } else {
            resonance.clamp(MIN_RESONANCE, MAX_RESONANCE)
        };
        if clamped != self.resonance {
            self.resonance = clamped;
            self.update_coefficients();
        }
    }

    pub fn cutoff(&self) -> f32 {
        self.cutoff
    }

    pub fn resonance(&self) -> f32 {
        self.resonance
    }

    pub fn mode(&self) -> FilterMode {
        self.mode
    }

    /// Process a single sample
    #[inline]
    pub fn process_sample(&mut self, input: f32) -> f32 {
        let x = input as f64;
        let high = self.h * (x - self.s1 * (self.r2 + self.g) - self.s2);

        let band = high * self.g + self.s1;
        self.s1 = high * self.g + band;

        let low = band * self.g + self.s2;
        self.s2 = band * self.g + low;

        match self.mode {
            FilterMode::LowPass => low as f32,
            FilterMode::BandPass => band as f32,
        }
    }

    /// Filter a slice in place
    pub fn process_slice(&mut self, samples: &mut [f32]) {
        for sample in samples.iter_mut() {
            *sample = self.process_sample(*sample);
        }
    }

    /// Clear integrator state
    pub fn reset(&mut self) {
        self.s1 = 0.0;
        self.s2 = 0.0;
    }

    fn update_coefficients(&mut self) {
        let max = self.sample_rate * MAX_CUTOFF_RATIO;
        let cutoff = (self.cutoff as f64).min(max);
        self.g = (PI * cutoff / self.sample_rate).tan();
        self.r2 = 1.0 / self.resonance as f64;
        self.h = 1.0 / (1.0 + self.r2 * self.g + self.g * self.g);
    }
}

// ============================================================================
// Tests
// ============================================================================
