//! Audio Buffer Management
//!
//! Provides the planar audio buffer used for layer scratch space, the mixer's
//! output and decoded samples, plus a few level measurements used by tests and
//! the CLI.

use crate::error::{Result, StrataError};

// ============================================================================
// Constants
// ============================================================================

/// Default sample rate when nothing else is specified (48kHz)
pub const DEFAULT_SAMPLE_RATE: u32 = 48000;

// ============================================================================
// Helper Functions
// ============================================================================

/// Linear amplitude to dB; zero and below map to -inf
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    if linear <= 0.0 {
        f32::NEG_INFINITY
    } else {
        20.0 * linear.log10()
    }
}

/// RMS level of every channel together, in dB (-inf when empty or silent)
pub fn calculate_rms(buffer: &AudioBuffer) -> f32 {
    let total_samples = buffer.channels() * buffer.len();
    if total_samples == 0 {
        return f32::NEG_INFINITY;
    }

    let sum_squares: f64 = buffer
        .samples
        .iter()
        .flat_map(|channel| channel.iter())
        .map(|&s| (s as f64) * (s as f64))
        .sum();

    let rms = (sum_squares / total_samples as f64).sqrt() as f32;
    linear_to_db(rms)
}

/// Absolute peak across all channels, in dB
pub fn calculate_peak(buffer: &AudioBuffer) -> f32 {
    let peak = buffer
        .samples
        .iter()
        .flat_map(|channel| channel.iter())
        .map(|&s| s.abs())
        .fold(0.0_f32, f32::max);

    linear_to_db(peak)
}

// ============================================================================
// Channel Layout
// ============================================================================

/// Audio channel configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelLayout {
    /// Single channel (mono)
    Mono,
    /// Two channels (stereo: left, right)
    #[default]
    Stereo,
}

impl ChannelLayout {
    pub fn num_channels(&self) -> usize {
        match self {
            ChannelLayout::Mono => 1,
            ChannelLayout::Stereo => 2,
        }
    }

    /// Layout for a decoded file's channel count; only mono and stereo exist
    pub fn from_count(count: usize) -> Option<Self> {
        match count {
            1 => Some(ChannelLayout::Mono),
            2 => Some(ChannelLayout::Stereo),
            _ => None,
        }
    }
}

// ============================================================================
// Audio Buffer
// ============================================================================

/// Planar 32-bit float audio buffer
///
/// Each channel is a separate `Vec<f32>`. Buffers used on the audio thread are
/// allocated up front (see [`AudioBuffer::try_new`]) and only ever written in
/// place afterwards.
///
/// # Example
/// ```
/// use strata::engine::buffer::{AudioBuffer, ChannelLayout};
///
/// let buffer = AudioBuffer::new(512, ChannelLayout::Stereo);
/// assert_eq!(buffer.channels(), 2);
/// assert_eq!(buffer.len(), 512);
/// ```
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    /// Sample data: outer Vec is channels, inner Vec is samples
    pub samples: Vec<Vec<f32>>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl AudioBuffer {
    /// Zeroed buffer at the default rate
    pub fn new(num_samples: usize, layout: ChannelLayout) -> Self {
        let num_channels = layout.num_channels();
        let samples = vec![vec![0.0_f32; num_samples]; num_channels];
        Self {
            samples,
            sample_rate: DEFAULT_SAMPLE_RATE,
        }
    }

    /// Create a zeroed buffer, reporting allocation failure instead of aborting
    ///
    /// Used by the mixer's `prepare()` so that a failed scratch allocation is an
    /// error the host can see rather than a process abort.
    pub fn try_new(num_samples: usize, layout: ChannelLayout) -> Result<Self> {
        let num_channels = layout.num_channels();
        let mut samples = Vec::new();
        samples
            .try_reserve_exact(num_channels)
            .map_err(|e| StrataError::OutOfMemory {
                details: format!("channel table for {} channels: {}", num_channels, e),
            })?;

        for _ in 0..num_channels {
            let mut channel = Vec::new();
            channel
                .try_reserve_exact(num_samples)
                .map_err(|e| StrataError::OutOfMemory {
                    details: format!("{} samples per channel: {}", num_samples, e),
                })?;
            channel.resize(num_samples, 0.0);
            samples.push(channel);
        }

        Ok(Self {
            samples,
            sample_rate: DEFAULT_SAMPLE_RATE,
        })
    }

    /// Set the sample rate, builder style
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// De-interleave decoded frames into a planar buffer
    ///
    /// # Errors
    /// `InvalidAudio` if the data does not split into whole frames
    pub fn from_interleaved(
        interleaved: &[f32],
        layout: ChannelLayout,
        sample_rate: u32,
    ) -> Result<Self> {
        let num_channels = layout.num_channels();

        if interleaved.len() % num_channels != 0 {
            return Err(StrataError::InvalidAudio {
                reason: format!(
                    "Interleaved data length {} is not divisible by channel count {}",
                    interleaved.len(),
                    num_channels
                ),
                source: None,
            });
        }

        let num_samples = interleaved.len() / num_channels;
        let mut samples = vec![Vec::with_capacity(num_samples); num_channels];

        for frame in interleaved.chunks_exact(num_channels) {
            for (ch, &sample) in frame.iter().enumerate() {
                samples[ch].push(sample);
            }
        }

        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Interleave for WAV export (L, R, L, R, ...)
    pub fn to_interleaved(&self) -> Vec<f32> {
        let num_channels = self.channels();
        let num_samples = self.len();

        let mut interleaved = Vec::with_capacity(num_channels * num_samples);
        for sample_idx in 0..num_samples {
            for channel in &self.samples {
                interleaved.push(channel[sample_idx]);
            }
        }

        interleaved
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.samples.len()
    }

    /// Samples per channel
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.first().map(|ch| ch.len()).unwrap_or(0)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.len() as f64 / self.sample_rate as f64
    }

    /// # Panics
    /// If `index` is not a channel of this buffer
    #[inline]
    pub fn channel(&self, index: usize) -> &[f32] {
        &self.samples[index]
    }

    #[inline]
    pub fn channel_mut(&mut self, index: usize) -> &mut [f32] {
        &mut self.samples[index]
    }

    /// Zero every sample in place
    pub fn clear(&mut self) {
        for channel in &mut self.samples {
            channel.fill(0.0);
        }
    }

    /// Zero `len` samples starting at `start` on every channel (clamped to the buffer)
    pub fn clear_range(&mut self, start: usize, len: usize) {
        for channel in &mut self.samples {
            let end = start.saturating_add(len).min(channel.len());
            if start < end {
                channel[start..end].fill(0.0);
            }
        }
    }

    /// Accumulate `source * gain` into a channel starting at `dest_start`
    ///
    /// Writes are clamped to the destination length, so a short destination
    /// never panics.
    pub fn add_from(&mut self, dest_channel: usize, dest_start: usize, source: &[f32], gain: f32) {
        let Some(dest) = self.samples.get_mut(dest_channel) else {
            return;
        };
        if dest_start >= dest.len() {
            return;
        }
        for (d, &s) in dest[dest_start..].iter_mut().zip(source) {
            *d += s * gain;
        }
    }

    /// True when every sample is exactly zero
    pub fn is_silent(&self) -> bool {
        self.samples
            .iter()
            .all(|channel| channel.iter().all(|&s| s == 0.0))
    }

    /// Check that the buffer contains no NaN/Inf
    pub fn is_finite(&self) -> bool {
        self.samples
            .iter()
            .all(|channel| channel.iter().all(|s| s.is_finite()))
    }
}

// ============================================================================
// Tests
// ============================================================================
