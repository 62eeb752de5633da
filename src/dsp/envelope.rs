//! ADSR envelope generator.
//!
//! Linear segments driven by per-sample steps. Retriggering starts the attack
//! from the current level and release ramps down from wherever the envelope
//! was, so gating never produces a step in the output.

use serde::{Deserialize, Serialize};

/// Longest attack/decay time accepted (seconds)
pub const MAX_SEGMENT_SECS: f32 = 10.0;

/// Longest release time accepted (seconds)
pub const MAX_RELEASE_SECS: f32 = 20.0;

/// Envelope stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeStage {
    Idle,
    Attack,
    Decay,
    Sustain,
    Release,
}

/// Envelope timing. Times are in seconds, sustain is a level in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdsrParams {
    pub attack: f32,
    pub decay: f32,
    pub sustain: f32,
    pub release: f32,
}

impl Default for AdsrParams {
    fn default() -> Self {
        Self {
            attack: 0.5,
            decay: 0.5,
            sustain: 0.8,
            release: 1.5,
        }
    }
}

impl AdsrParams {
    /// Build clamped parameters. NaN inputs become 0.
    pub fn new(attack: f32, decay: f32, sustain: f32, release: f32) -> Self {
        let clean = |v: f32, max: f32| if v.is_nan() { 0.0 } else { v.clamp(0.0, max) };
        Self {
            attack: clean(attack, MAX_SEGMENT_SECS),
            decay: clean(decay, MAX_SEGMENT_SECS),
            sustain: clean(sustain, 1.0),
            release: clean(release, MAX_RELEASE_SECS),
        }
    }
}

/// Samples spent in a segment of `secs` seconds; never less than one.
fn segment_samples(secs: f32, sample_rate: f64) -> f32 {
    ((secs as f64 * sample_rate) as f32).max(1.0)
}

#[derive(Debug, Clone)]
pub struct Envelope {
    params: AdsrParams,
    stage: EnvelopeStage,
    level: f32,
    sample_rate: f64,
    attack_step: f32,
    decay_step: f32,
    release_step: f32,
}

impl Envelope {
    pub fn new(params: AdsrParams) -> Self {
        let mut env = Self {
            params: AdsrParams::new(params.attack, params.decay, params.sustain, params.release),
            stage: EnvelopeStage::Idle,
            level: 0.0,
            sample_rate: 44100.0,
            attack_step: 0.0,
            decay_step: 0.0,
            release_step: 0.0,
        };
        env.update_steps();
        env
    }

    /// Set the sample rate and return to Idle
    pub fn prepare(&mut self, sample_rate: f64) {
        if sample_rate.is_finite() && sample_rate > 0.0 {
            self.sample_rate = sample_rate;
        }
        self.update_steps();
        self.reset();
    }

    /// Replace the timing. Takes effect immediately, including mid-segment.
    pub fn set_params(&mut self, params: AdsrParams) {
        let params = AdsrParams::new(params.attack, params.decay, params.sustain, params.release);
        if params != self.params {
            self.params = params;
            self.update_steps();
        }
    }

    pub fn params(&self) -> AdsrParams {
        self.params
    }

    /// Start (or restart) the attack from the current level
    pub fn gate_on(&mut self) {
        self.stage = EnvelopeStage::Attack;
    }

    /// Enter release from the current level. No-op when idle.
    pub fn gate_off(&mut self) {
        if self.stage == EnvelopeStage::Idle || self.stage == EnvelopeStage::Release {
            return;
        }
        if self.level <= 0.0 {
            self.level = 0.0;
            self.stage = EnvelopeStage::Idle;
            return;
        }
        self.release_step = self.level / segment_samples(self.params.release, self.sample_rate);
        self.stage = EnvelopeStage::Release;
    }

    /// Advance one sample and return the gain in [0, 1]
    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        match self.stage {
            EnvelopeStage::Idle => {
                self.level = 0.0;
            }
            EnvelopeStage::Attack => {
                self.level += self.attack_step;
                if self.level >= 1.0 {
                    self.level = 1.0;
                    self.stage = EnvelopeStage::Decay;
                }
            }
            EnvelopeStage::Decay => {
                self.level -= self.decay_step;
                if self.level <= self.params.sustain {
                    self.level = self.params.sustain;
                    self.stage = EnvelopeStage::Sustain;
                }
            }
            EnvelopeStage::Sustain => {
                self.level = self.params.sustain;
            }
            EnvelopeStage::Release => {
                self.level -= self.release_step;
                if self.level <= 0.0 {
                    self.level = 0.0;
                    self.stage = EnvelopeStage::Idle;
                }
            }
        }
        self.level
    }

    pub fn stage(&self) -> EnvelopeStage {
        self.stage
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    /// True once release has finished (or before the first gate)
    pub fn is_idle(&self) -> bool {
        self.stage == EnvelopeStage::Idle
    }

    pub fn reset(&mut self) {
        self.stage = EnvelopeStage::Idle;
        self.level = 0.0;
    }

    fn update_steps(&mut self) {
        self.attack_step = 1.0 / segment_samples(self.params.attack, self.sample_rate);
        self.decay_step =
            (1.0 - self.params.sustain) / segment_samples(self.params.decay, self.sample_rate);
    }
}

impl Default for Envelope {
    fn default() -> Self {
        Self::new(AdsrParams::default())
    }
}
