//! Audio Engine Module
//!
//! Core engine plumbing:
//! - Audio buffer management
//! - Note events and pitch conversion
//! - The layer mixer driven by the host's audio callback
//! - WAV decoding and export

pub mod buffer;
pub mod io;
pub mod mixer;
pub mod notes;

pub use buffer::{AudioBuffer, ChannelLayout};
pub use io::{export_wav, load_sample, ExportFormat};
pub use mixer::{pan_gains, LayerMixer, MAX_HELD_NOTES};
pub use notes::{midi_to_frequency, NoteEvent};
