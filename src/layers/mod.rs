//! Synthesis Layers
//!
//! The four sound sources summed by the mixer:
//! - Oscillator: three detuned oscillators through a gentle low-pass
//! - Sub: fundamental plus octave-down sine, low-passed to the sub range
//! - Noise: colored noise through a slowly swept band-pass
//! - Sampler: decoded sample playback
//!
//! Every layer carries the same [`LayerControls`] (level, pan, ADSR) and
//! renders into a scratch [`AudioBuffer`] owned by the mixer. Layers never
//! allocate while processing.

mod noise;
mod oscillator;
mod sampler;
mod sub;

pub use noise::NoiseLayer;
pub use oscillator::OscillatorLayer;
pub use sampler::{sample_channel, SampleCommand, SampleLoader, SampleReceiver, SamplerLayer};
pub use sub::SubLayer;

use crate::dsp::{AdsrParams, Envelope};
use crate::engine::buffer::AudioBuffer;

// ============================================================================
// Layer Kind
// ============================================================================

/// Identifies a layer slot; also indexes the mixer's scratch buffers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerKind {
    Oscillator,
    Sub,
    Noise,
    Sampler,
}

impl LayerKind {
    pub const ALL: [LayerKind; 4] = [
        LayerKind::Oscillator,
        LayerKind::Sub,
        LayerKind::Noise,
        LayerKind::Sampler,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            LayerKind::Oscillator => "oscillator",
            LayerKind::Sub => "sub",
            LayerKind::Noise => "noise",
            LayerKind::Sampler => "sampler",
        }
    }
}

// ============================================================================
// Shared Controls
// ============================================================================

/// Level, pan and envelope common to every layer
#[derive(Debug, Clone)]
pub struct LayerControls {
    level: f32,
    pan: f32,
    envelope: Envelope,
}

impl LayerControls {
    pub fn new(level: f32) -> Self {
        let mut controls = Self {
            level: 0.0,
            pan: 0.0,
            envelope: Envelope::default(),
        };
        controls.set_level(level);
        controls
    }

    pub fn prepare(&mut self, sample_rate: f64) {
        self.envelope.prepare(sample_rate);
    }

    /// Level in [0, 1]; NaN is treated as 0
    pub fn set_level(&mut self, level: f32) {
        self.level = if level.is_nan() { 0.0 } else { level.clamp(0.0, 1.0) };
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    /// Pan in [-1, 1]; NaN is treated as centre
    pub fn set_pan(&mut self, pan: f32) {
        self.pan = if pan.is_nan() { 0.0 } else { pan.clamp(-1.0, 1.0) };
    }

    pub fn pan(&self) -> f32 {
        self.pan
    }

    pub fn set_envelope(&mut self, params: AdsrParams) {
        self.envelope.set_params(params);
    }

    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    /// Gate the envelope on (attack) or off (release)
    pub fn set_active(&mut self, active: bool) {
        if active {
            self.envelope.gate_on();
        } else {
            self.envelope.gate_off();
        }
    }

    /// Sounding, i.e. the envelope has not returned to idle
    pub fn is_active(&self) -> bool {
        !self.envelope.is_idle()
    }

    /// `level × envelope` for the next sample
    #[inline]
    pub fn next_gain(&mut self) -> f32 {
        self.level * self.envelope.next_sample()
    }

    /// Envelope alone for the next sample, for layers whose level is applied
    /// only by the mixer
    #[inline]
    pub fn envelope_gain(&mut self) -> f32 {
        self.envelope.next_sample()
    }

    /// Advance the envelope by `num_samples` without producing output
    pub fn skip(&mut self, num_samples: usize) {
        for _ in 0..num_samples {
            if self.envelope.is_idle() {
                break;
            }
            self.envelope.next_sample();
        }
    }

    pub fn reset(&mut self) {
        self.envelope.reset();
    }
}

/// Copy the first `num_samples` of channel 0 into every other channel
pub(crate) fn duplicate_first_channel(buffer: &mut AudioBuffer, num_samples: usize) {
    if let Some((first, rest)) = buffer.samples.split_first_mut() {
        let n = num_samples.min(first.len());
        for channel in rest {
            let m = n.min(channel.len());
            channel[..m].copy_from_slice(&first[..m]);
        }
    }
}

// ============================================================================
// Layer
// ============================================================================

/// One of the four synthesis layers
#[derive(Debug)]
pub enum Layer {
    Oscillator(OscillatorLayer),
    Sub(SubLayer),
    Noise(NoiseLayer),
    Sampler(SamplerLayer),
}

impl Layer {
    pub fn kind(&self) -> LayerKind {
        match self {
            Layer::Oscillator(_) => LayerKind::Oscillator,
            Layer::Sub(_) => LayerKind::Sub,
            Layer::Noise(_) => LayerKind::Noise,
            Layer::Sampler(_) => LayerKind::Sampler,
        }
    }

    pub fn prepare(&mut self, sample_rate: f64) {
        match self {
            Layer::Oscillator(l) => l.prepare(sample_rate),
            Layer::Sub(l) => l.prepare(sample_rate),
            Layer::Noise(l) => l.prepare(sample_rate),
            Layer::Sampler(l) => l.prepare(sample_rate),
        }
    }

    /// Render `num_samples` into the start of `buffer`, overwriting it
    pub fn process(&mut self, buffer: &mut AudioBuffer, num_samples: usize) {
        match self {
            Layer::Oscillator(l) => l.process(buffer, num_samples),
            Layer::Sub(l) => l.process(buffer, num_samples),
            Layer::Noise(l) => l.process(buffer, num_samples),
            Layer::Sampler(l) => l.process(buffer, num_samples),
        }
    }

    /// Run the envelope for `num_samples` while the layer is muted, so a
    /// release that starts while disabled still completes
    pub fn skip(&mut self, num_samples: usize) {
        self.controls_mut().skip(num_samples);
    }

    pub fn set_active(&mut self, active: bool) {
        match self {
            Layer::Sampler(l) => l.set_active(active),
            _ => self.controls_mut().set_active(active),
        }
    }

    pub fn is_active(&self) -> bool {
        self.controls().is_active()
    }

    pub fn set_level(&mut self, level: f32) {
        self.controls_mut().set_level(level);
    }

    pub fn level(&self) -> f32 {
        self.controls().level()
    }

    pub fn set_pan(&mut self, pan: f32) {
        self.controls_mut().set_pan(pan);
    }

    pub fn pan(&self) -> f32 {
        self.controls().pan()
    }

    pub fn set_envelope(&mut self, params: AdsrParams) {
        self.controls_mut().set_envelope(params);
    }

    pub fn reset(&mut self) {
        match self {
            Layer::Oscillator(l) => l.reset(),
            Layer::Sub(l) => l.reset(),
            Layer::Noise(l) => l.reset(),
            Layer::Sampler(l) => l.reset(),
        }
    }

    pub fn controls(&self) -> &LayerControls {
        match self {
            Layer::Oscillator(l) => &l.controls,
            Layer::Sub(l) => &l.controls,
            Layer::Noise(l) => &l.controls,
            Layer::Sampler(l) => &l.controls,
        }
    }

    fn controls_mut(&mut self) -> &mut LayerControls {
        match self {
            Layer::Oscillator(l) => &mut l.controls,
            Layer::Sub(l) => &mut l.controls,
            Layer::Noise(l) => &mut l.controls,
            Layer::Sampler(l) => &mut l.controls,
        }
    }
}
