//! Note events and pitch conversion

use serde::{Deserialize, Serialize};

/// Default tuning reference: A4 = 440 Hz
pub const DEFAULT_TUNING_HZ: f32 = 440.0;

/// MIDI note number of the tuning reference (A4)
pub const REFERENCE_NOTE: u8 = 69;

/// A note event delivered to the mixer at the start of a block
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NoteEvent {
    /// Velocity is normalized to [0, 1]; 0 is treated as note-off
    NoteOn { note: u8, velocity: f32 },
    NoteOff { note: u8 },
}

impl NoteEvent {
    pub fn note(&self) -> u8 {
        match *self {
            NoteEvent::NoteOn { note, .. } | NoteEvent::NoteOff { note } => note,
        }
    }

    /// True for a note-on with a non-zero velocity
    pub fn is_note_on(&self) -> bool {
        matches!(*self, NoteEvent::NoteOn { velocity, .. } if velocity > 0.0)
    }
}

/// Equal-tempered frequency of a MIDI note
///
/// `tuning_hz` is the frequency of A4 (note 69).
#[inline]
pub fn midi_to_frequency(note: u8, tuning_hz: f32) -> f32 {
    tuning_hz * 2.0_f32.powf((note as f32 - REFERENCE_NOTE as f32) / 12.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_reference_pitches() {
        assert_relative_eq!(midi_to_frequency(69, 440.0), 440.0);
        assert_relative_eq!(midi_to_frequency(81, 440.0), 880.0, max_relative = 1e-6);
        assert_relative_eq!(midi_to_frequency(57, 440.0), 220.0, max_relative = 1e-6);
        assert_relative_eq!(midi_to_frequency(60, 440.0), 261.6256, max_relative = 1e-5);
        assert_relative_eq!(midi_to_frequency(69, 432.0), 432.0);
    }

    #[test]
    fn test_zero_velocity_is_not_note_on() {
        assert!(NoteEvent::NoteOn { note: 60, velocity: 0.8 }.is_note_on());
        assert!(!NoteEvent::NoteOn { note: 60, velocity: 0.0 }.is_note_on());
        assert!(!NoteEvent::NoteOff { note: 60 }.is_note_on());
    }

    #[test]
    fn test_event_json() {
        let event: NoteEvent =
            serde_json::from_str(r#"{"type":"note_on","note":64,"velocity":1.0}"#).unwrap();
        assert_eq!(event, NoteEvent::NoteOn { note: 64, velocity: 1.0 });
        assert_eq!(event.note(), 64);
    }
}
