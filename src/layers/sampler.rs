//! Sampler layer
//!
//! Plays a decoded sample through a fractional cursor. The sample itself is
//! shared (`Arc<AudioBuffer>`); the layer owns only the cursor.
//!
//! Samples reach the audio thread over a lock-free SPSC ring
//! ([`SampleLoader`] → [`SampleReceiver`]). A second ring carries replaced
//! samples back to the control thread, so the last reference to a buffer is
//! never dropped on the audio thread.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use log::{info, warn};
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};

use crate::engine::buffer::AudioBuffer;
use crate::engine::io::load_sample;
use crate::error::{Result, StrataError};

use super::LayerControls;

/// Pending sample commands the control thread may queue
const COMMAND_CAPACITY: usize = 4;

/// Replaced samples awaiting release on the control thread
const RETIRED_CAPACITY: usize = 8;

const DEFAULT_LEVEL: f32 = 0.8;

// ============================================================================
// Handoff
// ============================================================================

/// Control → audio message
pub enum SampleCommand {
    Load(Arc<AudioBuffer>),
    Unload,
}

/// Control-thread side of the sample handoff
pub struct SampleLoader {
    commands: HeapProd<SampleCommand>,
    retired: HeapCons<Arc<AudioBuffer>>,
}

/// Audio-thread side of the sample handoff
pub struct SampleReceiver {
    commands: HeapCons<SampleCommand>,
    retired: HeapProd<Arc<AudioBuffer>>,
}

/// Create a connected loader/receiver pair
pub fn sample_channel() -> (SampleLoader, SampleReceiver) {
    let (command_tx, command_rx) = HeapRb::<SampleCommand>::new(COMMAND_CAPACITY).split();
    let (retired_tx, retired_rx) = HeapRb::<Arc<AudioBuffer>>::new(RETIRED_CAPACITY).split();
    (
        SampleLoader {
            commands: command_tx,
            retired: retired_rx,
        },
        SampleReceiver {
            commands: command_rx,
            retired: retired_tx,
        },
    )
}

impl SampleLoader {
    /// Decode a WAV file and queue it for playback
    ///
    /// # Errors
    /// Decoding errors from [`load_sample`], or `SampleQueueFull` when the
    /// audio thread has not drained earlier commands yet.
    pub fn load_file(&mut self, path: &Path) -> Result<()> {
        let buffer = load_sample(path).map_err(|e| {
            warn!("Failed to load sample {}: {}", path.display(), e);
            e
        })?;
        info!(
            "Loaded sample {} ({:.2}s, {} Hz)",
            path.display(),
            buffer.duration_secs(),
            buffer.sample_rate
        );
        self.submit(buffer)
    }

    /// Queue an already decoded buffer for playback
    pub fn submit(&mut self, buffer: AudioBuffer) -> Result<()> {
        if buffer.is_empty() {
            return Err(StrataError::EmptyAudio);
        }
        self.send(SampleCommand::Load(Arc::new(buffer)))
    }

    /// Queue removal of the current sample
    pub fn unload(&mut self) -> Result<()> {
        self.send(SampleCommand::Unload)
    }

    /// Drop buffers the audio thread has handed back; returns how many
    pub fn collect_garbage(&mut self) -> usize {
        let mut released = 0;
        while self.retired.try_pop().is_some() {
            released += 1;
        }
        released
    }

    fn send(&mut self, command: SampleCommand) -> Result<()> {
        self.collect_garbage();
        self.commands
            .try_push(command)
            .map_err(|_| StrataError::SampleQueueFull)
    }
}

impl fmt::Debug for SampleLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SampleLoader")
            .field("pending", &self.commands.occupied_len())
            .field("retired", &self.retired.occupied_len())
            .finish()
    }
}

impl fmt::Debug for SampleReceiver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SampleReceiver")
            .field("pending", &self.commands.occupied_len())
            .finish()
    }
}

// ============================================================================
// Sampler Layer
// ============================================================================

#[derive(Debug)]
pub struct SamplerLayer {
    pub(super) controls: LayerControls,
    receiver: SampleReceiver,
    sample: Option<Arc<AudioBuffer>>,
    cursor: f64,
    step: f64,
    engine_rate: f64,
    looping: bool,
}

impl SamplerLayer {
    /// Create the layer along with the loader that feeds it
    pub fn new() -> (Self, SampleLoader) {
        let (loader, receiver) = sample_channel();
        let layer = Self {
            controls: LayerControls::new(DEFAULT_LEVEL),
            receiver,
            sample: None,
            cursor: 0.0,
            step: 1.0,
            engine_rate: 44100.0,
            looping: false,
        };
        (layer, loader)
    }

    pub fn prepare(&mut self, sample_rate: f64) {
        if sample_rate.is_finite() && sample_rate > 0.0 {
            self.engine_rate = sample_rate;
        }
        self.update_step();
        self.cursor = 0.0;
        self.controls.prepare(sample_rate);
    }

    /// Apply queued load/unload commands
    ///
    /// Called once per block on the audio thread. A command is only taken
    /// when the retired ring has room for the buffer it replaces.
    pub fn receive_samples(&mut self) {
        while !self.receiver.retired.is_full() {
            let Some(command) = self.receiver.commands.try_pop() else {
                break;
            };
            let replaced = match command {
                SampleCommand::Load(buffer) => {
                    self.cursor = 0.0;
                    self.sample.replace(buffer)
                }
                SampleCommand::Unload => self.sample.take(),
            };
            if let Some(old) = replaced {
                // cannot fail: checked for vacancy above
                let pushed = self.receiver.retired.try_push(old);
                debug_assert!(pushed.is_ok(), "retired ring full after vacancy check");
            }
            self.update_step();
        }
    }

    pub fn has_sample(&self) -> bool {
        self.sample.is_some()
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    /// Read position in sample frames
    pub fn cursor(&self) -> f64 {
        self.cursor
    }

    /// Cursor advance per output sample
    pub fn playback_step(&self) -> f64 {
        self.step
    }

    pub fn set_level(&mut self, level: f32) {
        self.controls.set_level(level);
    }

    /// Note-on restarts playback from the first frame
    pub fn set_active(&mut self, active: bool) {
        if active {
            self.cursor = 0.0;
        }
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

        let sample = match &self.sample {
            Some(sample) if self.controls.is_active() && !sample.is_empty() => sample,
            _ => {
                buffer.clear_range(0, n);
                return;
            }
        };

        let len = sample.len();
        let left = sample.channel(0);
        let right = if sample.channels() > 1 { sample.channel(1) } else { left };
        let end = len as f64;

        for i in 0..n {
            if self.cursor >= end {
                if self.looping {
                    self.cursor %= end;
                } else {
                    for channel in buffer.samples.iter_mut() {
                        channel[i..n].fill(0.0);
                    }
                    // keep the envelope moving so release still completes
                    self.controls.skip(n - i);
                    return;
                }
            }

            let index = self.cursor as usize;
            let frac = (self.cursor - index as f64) as f32;
            let next = if index + 1 < len {
                index + 1
            } else if self.looping {
                0
            } else {
                index
            };

            // level is applied once, by the mixer
            let gain = self.controls.envelope_gain();
            let l = left[index] + (left[next] - left[index]) * frac;
            let r = right[index] + (right[next] - right[index]) * frac;

            buffer.samples[0][i] = l * gain;
            if let Some(channel) = buffer.samples.get_mut(1) {
                channel[i] = r * gain;
            }

            self.cursor += self.step;
        }
    }

    pub fn reset(&mut self) {
        self.cursor = 0.0;
        self.controls.reset();
    }

    fn update_step(&mut self) {
        self.step = match &self.sample {
            Some(sample) if sample.sample_rate > 0 => sample.sample_rate as f64 / self.engine_rate,
            _ => 1.0,
        };
    }
}
