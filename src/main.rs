//! Strata CLI - Layered Pad Synthesis
//!
//! Command-line interface for rendering with the Strata engine.

use clap::Parser;
use env_logger::Env;
use log::info;

use strata::cli::commands::{self, RenderOptions};
use strata::cli::{Cli, Commands};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logger
    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    info!("Strata v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Some(cmd) => handle_command(cmd),
        None => {
            println!("Strata v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for available commands");
            Ok(())
        }
    }
}

fn handle_command(cmd: Commands) -> anyhow::Result<()> {
    match cmd {
        Commands::Render {
            output,
            note,
            seconds,
            hold,
            config,
            set,
            sample,
            bit_depth,
        } => {
            let options = RenderOptions {
                output,
                note,
                seconds,
                hold,
                config,
                overrides: set,
                sample,
                bit_depth,
            };
            commands::render(&options)?;
        }
        Commands::Params { config } => commands::print_params(config.as_deref())?,
    }
    Ok(())
}
