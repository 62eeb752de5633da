//! Layer Mixer
//!
//! Owns the four synthesis layers and sums them into the host's output
//! buffer once per block:
//!
//! 1. apply note events, take one parameter snapshot, push settings to layers
//! 2. let each enabled layer render into its own scratch buffer
//! 3. accumulate `scratch × level × pan_gain` into the (cleared) output
//!
//! Scratch buffers are allocated in [`LayerMixer::prepare`]; `process` never
//! allocates, locks or fails.

use std::sync::Arc;

use log::{debug, info};

use crate::config::{EngineConfig, MAX_TUNING_HZ, MIN_TUNING_HZ};
use crate::engine::buffer::{AudioBuffer, ChannelLayout};
use crate::engine::notes::{midi_to_frequency, NoteEvent, DEFAULT_TUNING_HZ};
use crate::error::{Result, StrataError};
use crate::layers::{
    Layer, LayerKind, NoiseLayer, OscillatorLayer, SampleLoader, SamplerLayer, SubLayer,
};
use crate::params::{ParamId, ParamSnapshot, ParameterStore};

/// Notes remembered for last-note priority
pub const MAX_HELD_NOTES: usize = 128;

/// Scratch buffers are always stereo; mono output reads channel 0 only
const SCRATCH_LAYOUT: ChannelLayout = ChannelLayout::Stereo;

/// Linear pan law: returns (left, right) gains
///
/// Pan −1 is hard left (1, 0), 0 is centre (1, 1), +1 is hard right (0, 1).
#[inline]
pub fn pan_gains(pan: f32) -> (f32, f32) {
    (1.0 - pan.max(0.0), 1.0 + pan.min(0.0))
}

/// Enable, level and pan parameters for a layer slot
fn layer_param_ids(kind: LayerKind) -> (ParamId, ParamId, ParamId) {
    match kind {
        LayerKind::Oscillator => (ParamId::Osc1Enable, ParamId::Osc1Level, ParamId::Osc1Pan),
        LayerKind::Sub => (ParamId::SubEnable, ParamId::SubLevel, ParamId::SubPan),
        LayerKind::Noise => (ParamId::NoiseEnable, ParamId::NoiseLevel, ParamId::NoisePan),
        LayerKind::Sampler => (
            ParamId::SamplerEnable,
            ParamId::SamplerLevel,
            ParamId::SamplerPan,
        ),
    }
}

pub struct LayerMixer {
    params: Arc<ParameterStore>,
    layers: [Layer; 4],
    enabled: [bool; 4],
    scratch: Vec<AudioBuffer>,
    sample_rate: f64,
    max_block_size: usize,
    prepared: bool,
    tuning_hz: f32,
    held_notes: Vec<u8>,
    current_note: Option<u8>,
    frequency: f32,
}

impl LayerMixer {
    /// Create an unprepared mixer reading from `params`
    ///
    /// Returns the loader that feeds the sampler layer from the control thread.
    pub fn new(params: Arc<ParameterStore>) -> (Self, SampleLoader) {
        let (sampler, loader) = SamplerLayer::new();
        let mixer = Self {
            params,
            layers: [
                Layer::Oscillator(OscillatorLayer::new()),
                Layer::Sub(SubLayer::new()),
                Layer::Noise(NoiseLayer::new()),
                Layer::Sampler(sampler),
            ],
            enabled: [true; 4],
            scratch: Vec::new(),
            sample_rate: 0.0,
            max_block_size: 0,
            prepared: false,
            tuning_hz: DEFAULT_TUNING_HZ,
            held_notes: Vec::with_capacity(MAX_HELD_NOTES),
            current_note: None,
            frequency: midi_to_frequency(69, DEFAULT_TUNING_HZ),
        };
        (mixer, loader)
    }

    /// Create and prepare a mixer from a configuration
    ///
    /// Parameter overrides in `config.params` are written to the store first.
    pub fn from_config(
        config: &EngineConfig,
        params: Arc<ParameterStore>,
    ) -> Result<(Self, SampleLoader)> {
        config.validate()?;
        for (name, value) in &config.params {
            params.set_param(name, value)?;
        }

        let (mut mixer, loader) = Self::new(params);
        mixer.set_tuning(config.tuning_hz);
        mixer.prepare(config.sample_rate as f64, config.max_block_size)?;
        Ok((mixer, loader))
    }

    /// Allocate scratch buffers and prepare every layer
    ///
    /// # Errors
    /// * `InvalidConfig` - Zero/non-finite sample rate or zero block size
    /// * `OutOfMemory` - Scratch allocation failed
    pub fn prepare(&mut self, sample_rate: f64, max_block_size: usize) -> Result<()> {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(StrataError::InvalidConfig {
                reason: format!("invalid sample rate: {}", sample_rate),
            });
        }
        if max_block_size == 0 {
            return Err(StrataError::InvalidConfig {
                reason: "max block size must be greater than zero".to_string(),
            });
        }

        self.prepared = false;

        let mut scratch = Vec::new();
        scratch
            .try_reserve_exact(LayerKind::ALL.len())
            .map_err(|e| StrataError::OutOfMemory {
                details: format!("scratch table: {}", e),
            })?;
        for _ in LayerKind::ALL {
            scratch.push(AudioBuffer::try_new(max_block_size, SCRATCH_LAYOUT)?);
        }

        self.scratch = scratch;
        self.sample_rate = sample_rate;
        self.max_block_size = max_block_size;

        for layer in &mut self.layers {
            layer.prepare(sample_rate);
        }
        self.prepared = true;

        info!(
            "Mixer prepared: {} Hz, max block {} samples",
            sample_rate, max_block_size
        );
        Ok(())
    }

    /// Clear all DSP state and forget held notes
    pub fn reset(&mut self) {
        for layer in &mut self.layers {
            layer.reset();
        }
        for buffer in &mut self.scratch {
            buffer.clear();
        }
        self.held_notes.clear();
        self.current_note = None;
        debug!("Mixer reset");
    }

    // ========================================================================
    // Notes
    // ========================================================================

    pub fn handle_event(&mut self, event: NoteEvent) {
        match event {
            NoteEvent::NoteOn { note, velocity } => self.note_on(note, velocity),
            NoteEvent::NoteOff { note } => self.note_off(note),
        }
    }

    /// Start a note; it becomes the sounding note and retriggers every layer
    ///
    /// Velocity 0 is a note-off.
    pub fn note_on(&mut self, note: u8, velocity: f32) {
        if velocity.is_nan() || velocity <= 0.0 {
            self.note_off(note);
            return;
        }

        if let Some(pos) = self.held_notes.iter().position(|&n| n == note) {
            self.held_notes.remove(pos);
        }
        if self.held_notes.len() == MAX_HELD_NOTES {
            self.held_notes.remove(0);
        }
        self.held_notes.push(note);

        self.current_note = Some(note);
        self.frequency = midi_to_frequency(note, self.tuning_hz);
        for layer in &mut self.layers {
            layer.set_active(true);
        }
    }

    /// Release a note
    ///
    /// Releasing the sounding note glides back to the most recent note still
    /// held, without retriggering; with nothing held every layer is released.
    pub fn note_off(&mut self, note: u8) {
        if let Some(pos) = self.held_notes.iter().position(|&n| n == note) {
            self.held_notes.remove(pos);
        }
        if self.current_note != Some(note) {
            return;
        }

        match self.held_notes.last().copied() {
            Some(previous) => {
                self.current_note = Some(previous);
                self.frequency = midi_to_frequency(previous, self.tuning_hz);
            }
            None => {
                self.current_note = None;
                for layer in &mut self.layers {
                    layer.set_active(false);
                }
            }
        }
    }

    /// Set the A4 reference, clamped to [400, 480] Hz
    pub fn set_tuning(&mut self, tuning_hz: f32) {
        self.tuning_hz = if tuning_hz.is_nan() {
            DEFAULT_TUNING_HZ
        } else {
            tuning_hz.clamp(MIN_TUNING_HZ, MAX_TUNING_HZ)
        };
        if let Some(note) = self.current_note {
            self.frequency = midi_to_frequency(note, self.tuning_hz);
        }
    }

    pub fn tuning(&self) -> f32 {
        self.tuning_hz
    }

    pub fn current_note(&self) -> Option<u8> {
        self.current_note
    }

    /// Frequency of the sounding (or last sounded) note
    pub fn current_frequency(&self) -> f32 {
        self.frequency
    }

    pub fn held_notes(&self) -> &[u8] {
        &self.held_notes
    }

    // ========================================================================
    // Processing
    // ========================================================================

    /// Fill `output` with the next block
    ///
    /// `events` are applied before rendering. Before a successful `prepare`
    /// the output is silence.
    pub fn process(&mut self, output: &mut AudioBuffer, events: &[NoteEvent]) {
        for &event in events {
            self.handle_event(event);
        }

        output.clear();
        if !self.prepared {
            return;
        }

        let snapshot = self.params.snapshot();
        self.apply_snapshot(&snapshot);

        let total = output.len();
        let mono = output.channels() == 1;
        let mut offset = 0;

        while offset < total {
            let n = (total - offset).min(self.max_block_size);

            for kind in LayerKind::ALL {
                let i = kind.index();
                if !self.enabled[i] {
                    self.layers[i].skip(n);
                    continue;
                }

                let scratch = &mut self.scratch[i];
                let layer = &mut self.layers[i];
                scratch.clear_range(0, n);
                layer.process(scratch, n);

                let level = layer.level();
                if mono {
                    output.add_from(0, offset, &scratch.channel(0)[..n], level);
                } else {
                    let (left, right) = pan_gains(layer.pan());
                    output.add_from(0, offset, &scratch.channel(0)[..n], level * left);
                    output.add_from(1, offset, &scratch.channel(1)[..n], level * right);
                }
            }

            offset += n;
        }
    }

    fn apply_snapshot(&mut self, snapshot: &ParamSnapshot) {
        let adsr = snapshot.adsr();
        let frequency = self.frequency;

        for layer in &mut self.layers {
            let kind = layer.kind();
            let (enable, level, pan) = layer_param_ids(kind);
            self.enabled[kind.index()] = snapshot.flag(enable);
            layer.set_level(snapshot.get(level));
            layer.set_pan(snapshot.get(pan));
            layer.set_envelope(adsr);

            match layer {
                Layer::Oscillator(osc) => {
                    osc.set_waveform(snapshot.waveform());
                    osc.set_detune(snapshot.get(ParamId::Osc1Detune));
                    osc.set_frequency(frequency);
                }
                Layer::Sub(sub) => {
                    sub.set_frequency(frequency);
                    sub.set_harmonics(snapshot.get(ParamId::SubHarmonics));
                    sub.set_warmth(snapshot.get(ParamId::SubWarmth));
                }
                Layer::Noise(noise) => {
                    noise.set_noise_type(snapshot.noise_type());
                    noise.set_filter_frequency(snapshot.get(ParamId::NoiseFilterCutoff));
                    noise.set_filter_modulation(snapshot.get(ParamId::NoiseFilterMod));
                    noise.set_atmosphere(snapshot.get(ParamId::NoiseAtmosphere));
                }
                Layer::Sampler(sampler) => {
                    sampler.receive_samples();
                    sampler.set_looping(snapshot.flag(ParamId::SamplerLoop));
                }
            }
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn layer(&self, kind: LayerKind) -> &Layer {
        &self.layers[kind.index()]
    }

    pub fn layer_mut(&mut self, kind: LayerKind) -> &mut Layer {
        &mut self.layers[kind.index()]
    }

    /// Whether the layer took part in the last block
    pub fn is_enabled(&self, kind: LayerKind) -> bool {
        self.enabled[kind.index()]
    }

    pub fn params(&self) -> &Arc<ParameterStore> {
        &self.params
    }

    pub fn is_prepared(&self) -> bool {
        self.prepared
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn max_block_size(&self) -> usize {
        self.max_block_size
    }
}
