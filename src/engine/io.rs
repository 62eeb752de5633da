//! Audio file I/O for Strata
//!
//! This is the file-decoding side of the sampler: WAV files are decoded to
//! 32-bit float at their own sample rate on the control thread. The sampler
//! layer compensates for rate differences with its playback cursor, so no
//! resampling happens here. Rendered output goes back out through
//! [`export_wav`].

use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use log::debug;

use crate::engine::buffer::{AudioBuffer, ChannelLayout};
use crate::error::{Result, StrataError};

/// Export format configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportFormat {
    /// Bit depth: 16, 24, or 32 (32 = float)
    pub bit_depth: u16,
}

impl Default for ExportFormat {
    fn default() -> Self {
        ExportFormat { bit_depth: 24 }
    }
}

impl ExportFormat {
    /// Create a new export format with the given bit depth
    pub fn new(bit_depth: u16) -> Self {
        ExportFormat { bit_depth }
    }

    /// # Errors
    /// `UnsupportedFormat` unless the depth is 16, 24 or 32
    pub fn validate(&self) -> Result<()> {
        match self.bit_depth {
            16 | 24 | 32 => Ok(()),
            other => Err(unsupported_depth(other)),
        }
    }
}

/// Decode a WAV file for sampler playback
///
/// # Arguments
/// * `path` - Path to the WAV file
///
/// # Returns
/// The decoded audio at the file's own sample rate, mono or stereo.
///
/// # Errors
/// * `FileNotFound` - If the file does not exist
/// * `InvalidAudio` - If the file is not a readable WAV file
/// * `UnsupportedFormat` - More than 2 channels, or an unsupported bit depth
/// * `EmptyAudio` - The file decodes to zero frames
pub fn load_sample(path: &Path) -> Result<AudioBuffer> {
    if !path.exists() {
        return Err(StrataError::FileNotFound {
            path: path.display().to_string(),
            source: None,
        });
    }

    let reader = WavReader::open(path).map_err(|e| StrataError::InvalidAudio {
        reason: format!("Failed to open WAV file: {}", e),
        source: Some(Box::new(e)),
    })?;

    let spec = reader.spec();
    let layout = ChannelLayout::from_count(spec.channels as usize).ok_or_else(|| {
        StrataError::UnsupportedFormat {
            format: format!("{}-channel audio (only mono/stereo supported)", spec.channels),
        }
    })?;

    let interleaved = read_samples_as_f32(reader, spec.bits_per_sample, spec.sample_format)?;
    let buffer = AudioBuffer::from_interleaved(&interleaved, layout, spec.sample_rate)?;

    if buffer.is_empty() {
        return Err(StrataError::EmptyAudio);
    }

    debug!(
        "Decoded {} ({} ch, {} Hz, {:.2}s)",
        path.display(),
        buffer.channels(),
        buffer.sample_rate,
        buffer.duration_secs()
    );

    Ok(buffer)
}

/// Write an AudioBuffer to a WAV file at the buffer's sample rate
pub fn export_wav(buffer: &AudioBuffer, path: &Path, format: ExportFormat) -> Result<()> {
    // checked before the file is created so a bad depth leaves nothing behind
    format.validate()?;

    let spec = WavSpec {
        channels: buffer.channels() as u16,
        sample_rate: buffer.sample_rate,
        bits_per_sample: format.bit_depth,
        sample_format: if format.bit_depth == 32 {
            SampleFormat::Float
        } else {
            SampleFormat::Int
        },
    };

    let interleaved = buffer.to_interleaved();
    let mut writer = WavWriter::create(path, spec).map_err(hound_to_io)?;

    match format.bit_depth {
        16 => {
            for sample in interleaved {
                let scaled = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
                writer.write_sample(scaled).map_err(hound_to_io)?;
            }
        }
        24 => {
            for sample in interleaved {
                // 24-bit stored as i32 in hound
                let scaled = (sample * 8388607.0).clamp(-8388608.0, 8388607.0) as i32;
                writer.write_sample(scaled).map_err(hound_to_io)?;
            }
        }
        32 => {
            for sample in interleaved {
                writer.write_sample(sample).map_err(hound_to_io)?;
            }
        }
        other => return Err(unsupported_depth(other)),
    }

    writer.finalize().map_err(hound_to_io)?;
    Ok(())
}

// ============================================================================
// Internal helper functions
// ============================================================================

fn unsupported_depth(bit_depth: u16) -> StrataError {
    StrataError::UnsupportedFormat {
        format: format!("{}-bit audio (only 16, 24, 32 supported)", bit_depth),
    }
}

fn hound_to_io(e: hound::Error) -> StrataError {
    match e {
        hound::Error::IoError(io) => StrataError::Io(io),
        other => StrataError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            other.to_string(),
        )),
    }
}

/// Read samples from WAV reader and convert to f32
fn read_samples_as_f32<R: std::io::Read>(
    mut reader: WavReader<R>,
    bits_per_sample: u16,
    sample_format: SampleFormat,
) -> Result<Vec<f32>> {
    let invalid = |bits: &str, e: hound::Error| StrataError::InvalidAudio {
        reason: format!("Failed to read {} samples: {}", bits, e),
        source: Some(Box::new(e)),
    };

    match sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<Vec<f32>, _>>()
            .map_err(|e| invalid("float", e)),
        SampleFormat::Int => match bits_per_sample {
            8 => reader
                .samples::<i8>()
                .map(|s| s.map(|v| v as f32 / 128.0))
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(|e| invalid("8-bit", e)),
            16 => reader
                .samples::<i16>()
                .map(|s| s.map(|v| v as f32 / 32768.0))
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(|e| invalid("16-bit", e)),
            24 => reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / 8388608.0))
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(|e| invalid("24-bit", e)),
            32 => reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / 2147483648.0))
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(|e| invalid("32-bit int", e)),
            _ => Err(StrataError::UnsupportedFormat {
                format: format!("{}-bit integer audio", bits_per_sample),
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn ramp(len: usize, layout: ChannelLayout, sample_rate: u32) -> AudioBuffer {
        let mut buffer = AudioBuffer::new(len, layout).with_sample_rate(sample_rate);
        for ch in 0..buffer.channels() {
            let sign = if ch == 0 { 1.0 } else { -1.0 };
            for (i, s) in buffer.channel_mut(ch).iter_mut().enumerate() {
                *s = sign * (i as f32 / len as f32 - 0.5);
            }
        }
        buffer
    }

    #[test]
    fn test_round_trip_stereo_float() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        let original = ramp(1000, ChannelLayout::Stereo, 44100);

        export_wav(&original, &path, ExportFormat::new(32)).unwrap();
        let loaded = load_sample(&path).unwrap();

        assert_eq!(loaded.channels(), 2);
        assert_eq!(loaded.len(), 1000);
        assert_eq!(loaded.sample_rate, 44100);
        for ch in 0..2 {
            for (a, b) in original.channel(ch).iter().zip(loaded.channel(ch)) {
                assert!((a - b).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_round_trip_mono_16bit() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mono.wav");
        let original = ramp(500, ChannelLayout::Mono, 48000);

        export_wav(&original, &path, ExportFormat::new(16)).unwrap();
        let loaded = load_sample(&path).unwrap();

        assert_eq!(loaded.channels(), 1);
        for (a, b) in original.channel(0).iter().zip(loaded.channel(0)) {
            assert!((a - b).abs() < 1e-3);
        }
    }

    #[test]
    fn test_load_nonexistent_file() {
        let err = load_sample(Path::new("/definitely/not/here.wav")).unwrap_err();
        assert_eq!(err.error_code(), "FILE_NOT_FOUND");
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_load_garbage_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("garbage.wav");
        std::fs::write(&path, b"this is not a riff header").unwrap();

        let err = load_sample(&path).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_AUDIO");
    }

    #[test]
    fn test_load_empty_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.wav");
        let empty = AudioBuffer::new(0, ChannelLayout::Mono);
        export_wav(&empty, &path, ExportFormat::new(16)).unwrap();

        let err = load_sample(&path).unwrap_err();
        assert_eq!(err.error_code(), "EMPTY_AUDIO");
    }

    #[test]
    fn test_export_rejects_unknown_bit_depth() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("odd.wav");
        let buffer = ramp(10, ChannelLayout::Mono, 48000);
        let err = export_wav(&buffer, &path, ExportFormat::new(12)).unwrap_err();
        assert_eq!(err.error_code(), "UNSUPPORTED_FORMAT");
        assert!(!path.exists(), "rejected export must not leave a file");
    }
}
