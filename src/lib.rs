//! Strata - Layered Pad Synthesis Engine
//!
//! Strata renders a sustained pad sound by summing four independent layers
//! into one output buffer, once per audio block:
//! 1. Oscillator - three detuned oscillators through a low-pass
//! 2. Sub - fundamental and octave-down sines in the sub-bass range
//! 3. Noise - colored noise through a slowly swept band-pass
//! 4. Sampler - playback of a decoded WAV sample
//!
//! # Threading
//!
//! The [`engine::LayerMixer`] runs on the audio thread and never allocates,
//! locks or returns errors while processing. Parameters are shared through a
//! lock-free [`params::ParameterStore`]; samples are handed over through a
//! [`layers::SampleLoader`].
//!
//! # Example
//! ```
//! use std::sync::Arc;
//! use strata::engine::{AudioBuffer, ChannelLayout, LayerMixer, NoteEvent};
//! use strata::params::ParameterStore;
//!
//! let params = Arc::new(ParameterStore::new());
//! let (mut mixer, _loader) = LayerMixer::new(Arc::clone(&params));
//! mixer.prepare(48000.0, 512).unwrap();
//!
//! let mut block = AudioBuffer::new(512, ChannelLayout::Stereo);
//! mixer.process(&mut block, &[NoteEvent::NoteOn { note: 57, velocity: 1.0 }]);
//! assert!(block.is_finite());
//! ```

pub mod cli;
pub mod config;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod layers;
pub mod params;

pub use config::EngineConfig;
pub use error::{Result, StrataError};
