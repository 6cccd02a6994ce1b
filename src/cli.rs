//! Command line interface

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::app::RunOptions;

#[derive(Debug, Parser)]
#[command(
    name = "travelplan",
    version,
    about = "Generate a day-by-day travel itinerary with an AI model"
)]
pub struct Cli {
    /// Configuration file (default: <config dir>/travelplan/config.toml)
    #[arg(long, short, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log at debug level
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Where to write the itinerary (default: output.txt)
    #[arg(long, short, global = true, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Skip web and flight search
    #[arg(long, global = true)]
    pub no_enrich: bool,

    /// Stream the answer from auto-selected providers
    #[arg(long, global = true, conflicts_with = "no_stream")]
    pub stream: bool,

    /// Wait for the complete answer from auto-selected providers
    #[arg(long, global = true)]
    pub no_stream: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Ask for trip details and generate an itinerary (default)
    Plan,
    /// Show which generation and enrichment services are configured
    Providers,
}

impl Cli {
    #[must_use]
    pub fn command(&self) -> Command {
        self.command.unwrap_or(Command::Plan)
    }

    #[must_use]
    pub fn run_options(&self) -> RunOptions {
        let stream = match (self.stream, self.no_stream) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        };
        RunOptions {
            output_path: self.output.clone(),
            enrich: !self.no_enrich,
            stream,
        }
    }
}
