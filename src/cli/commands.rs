//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info};
use serde_json::Value;

use crate::config::EngineConfig;
use crate::engine::buffer::{calculate_peak, calculate_rms, AudioBuffer};
use crate::engine::io::{export_wav, ExportFormat};
use crate::engine::mixer::LayerMixer;
use crate::engine::notes::NoteEvent;
use crate::error::{Result, StrataError};
use crate::params::ParameterStore;

/// Options for the `render` command
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub output: PathBuf,
    pub note: u8,
    pub seconds: f32,
    pub hold: f32,
    pub config: Option<PathBuf>,
    pub overrides: Vec<String>,
    pub sample: Option<PathBuf>,
    pub bit_depth: u16,
}

/// Split a `name=value` override
///
/// The value is parsed as JSON when possible (`0.5`, `true`) and taken as a
/// plain string otherwise (`brown`).
pub fn parse_assignment(assignment: &str) -> Result<(String, Value)> {
    let (name, raw) = assignment
        .split_once('=')
        .ok_or_else(|| StrataError::InvalidParameterValue {
            name: assignment.to_string(),
            expected: "NAME=VALUE",
            found: assignment.to_string(),
        })?;

    let raw = raw.trim();
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((name.trim().to_string(), value))
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => {
            info!("Loading engine config: {}", path.display());
            EngineConfig::from_json_file(path)
        }
        None => Ok(EngineConfig::default()),
    }
}

/// Drive the mixer block by block: note-on at the start, note-off after
/// `hold_samples`, `total_samples` in all.
pub fn render_note(
    mixer: &mut LayerMixer,
    note: u8,
    total_samples: usize,
    hold_samples: usize,
    config: &EngineConfig,
) -> AudioBuffer {
    let block_size = config.max_block_size;
    let mut output = AudioBuffer::new(total_samples, config.layout).with_sample_rate(config.sample_rate);
    let mut block = AudioBuffer::new(block_size, config.layout);

    let mut position = 0;
    let mut released = false;
    while position < total_samples {
        let n = (total_samples - position).min(block_size);
        if block.len() != n {
            block = AudioBuffer::new(n, config.layout);
        }

        let mut events = Vec::with_capacity(1);
        if position == 0 {
            events.push(NoteEvent::NoteOn { note, velocity: 1.0 });
        }
        if !released && position >= hold_samples {
            events.push(NoteEvent::NoteOff { note });
            released = true;
        }

        mixer.process(&mut block, &events);
        for ch in 0..output.channels() {
            output.channel_mut(ch)[position..position + n].copy_from_slice(block.channel(ch));
        }
        position += n;
    }

    output
}

/// Render a note to a WAV file.
pub fn render(options: &RenderOptions) -> Result<()> {
    let config = load_config(options.config.as_deref())?;

    let overrides = options
        .overrides
        .iter()
        .map(|assignment| parse_assignment(assignment))
        .collect::<Result<Vec<_>>>()?;

    let params = Arc::new(ParameterStore::new());
    let (mut mixer, mut loader) = LayerMixer::from_config(&config, Arc::clone(&params))?;

    // command-line overrides win over the config file
    for (name, value) in &overrides {
        debug!("Override {} = {}", name, value);
        params.set_param(name, value)?;
    }

    if let Some(sample) = &options.sample {
        loader.load_file(sample)?;
    }

    let sample_rate = config.sample_rate as f32;
    let total = (options.seconds.max(0.0) * sample_rate) as usize;
    let hold = (options.hold.max(0.0) * sample_rate) as usize;

    info!(
        "Rendering note {} for {:.2}s (held {:.2}s)",
        options.note, options.seconds, options.hold
    );
    let output = render_note(&mut mixer, options.note, total, hold, &config);
    loader.collect_garbage();

    export_wav(&output, &options.output, ExportFormat::new(options.bit_depth))?;

    println!("Rendered: {}", options.output.display());
    println!("  Duration: {:.2}s", output.duration_secs());
    println!("  Peak:     {:.1} dBFS", calculate_peak(&output));
    println!("  RMS:      {:.1} dBFS", calculate_rms(&output));

    Ok(())
}

/// Print the parameter table as JSON.
pub fn print_params(config: Option<&Path>) -> Result<()> {
    let config = load_config(config)?;
    let params = ParameterStore::new();
    for (name, value) in &config.params {
        params.set_param(name, value)?;
    }

    println!("{}", serde_json::to_string_pretty(&params.get_params())?);
    Ok(())
}
