//! dispviz CLI: animate sensor displacement recordings.
//!
//! Usage:
//!   dispviz                    Render input/gauges.csv to output/sim.mp4
//!   dispviz render [INPUT]     Render a sample table to video
//!   dispviz info [INPUT]       Show sample table information
//!   dispviz check              Check encoder availability

use clap::{Parser, Subcommand};

use dispviz_common::config::AppConfig;
use dispviz_common::logging::init_cli_logging;

mod commands;

use commands::render::RenderArgs;

/// Input read when no path is given.
pub const DEFAULT_INPUT: &str = "input/gauges.csv";

/// Video written when no output is given.
pub const DEFAULT_OUTPUT: &str = "output/sim.mp4";

#[derive(Parser)]
#[command(
    name = "dispviz",
    about = "Render sensor displacement recordings as animated marker plots",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a sample table to video
    Render(RenderArgs),

    /// Show sample table information
    Info {
        /// Path to the CSV file
        input: Option<std::path::PathBuf>,

        /// Print machine-readable JSON
        #[arg(long)]
        json: bool,
    },

    /// Check system capabilities
    Check {
        /// Write the default config file if none exists
        #[arg(long)]
        write_config: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load();
    init_cli_logging(&config.logging, cli.verbose);
    tracing::debug!(render = ?config.render, "Configuration loaded");

    match cli.command {
        None => commands::render::run(RenderArgs::default(), &config),
        Some(Commands::Render(args)) => commands::render::run(args, &config),
        Some(Commands::Info { input, json }) => commands::info::run(input, json, &config),
        Some(Commands::Check { write_config }) => commands::check::run(write_config, &config),
    }
}
