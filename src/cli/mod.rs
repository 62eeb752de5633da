//! CLI Module
//!
//! Command-line interface for offline rendering with the Strata engine.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Strata - layered pad synthesis engine
#[derive(Parser, Debug)]
#[command(name = "strata-cli")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render a held note to a WAV file
    #[command(name = "render")]
    Render {
        /// Output WAV path
        #[arg(short, long)]
        output: PathBuf,

        /// MIDI note number to play
        #[arg(short, long, default_value_t = 57)]
        note: u8,

        /// Total length of the render in seconds
        #[arg(short, long, default_value_t = 6.0)]
        seconds: f32,

        /// How long the note is held before release, in seconds
        #[arg(long, default_value_t = 3.0)]
        hold: f32,

        /// Engine configuration file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Parameter override, e.g. --set noiseType=brown (repeatable)
        #[arg(long = "set", value_name = "NAME=VALUE")]
        set: Vec<String>,

        /// WAV file for the sampler layer
        #[arg(long)]
        sample: Option<PathBuf>,

        /// Output bit depth: 16, 24 or 32 (float)
        #[arg(long, default_value_t = 24)]
        bit_depth: u16,
    },

    /// Print every parameter with its current value as JSON
    #[command(name = "params")]
    Params {
        /// Engine configuration file whose overrides are applied first
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}
