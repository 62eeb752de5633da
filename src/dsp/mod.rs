//! DSP building blocks
//!
//! Sample-level generators and processors shared by the synthesis layers.
//! Everything here is allocation-free after construction and safe to call
//! from the audio thread.

mod envelope;
mod filter;
mod noise;
mod oscillator;

pub use envelope::{AdsrParams, Envelope, EnvelopeStage, MAX_RELEASE_SECS, MAX_SEGMENT_SECS};
pub use filter::{FilterMode, StateFilter, MAX_RESONANCE, MIN_CUTOFF_HZ, MIN_RESONANCE};
pub use noise::{ColoredNoiseGenerator, NoiseType};
pub use oscillator::{Oscillator, Waveform};
