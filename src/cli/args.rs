//! Command-line argument parsing for Rivet
//!
//! Provides clap-based CLI with subcommands and verbosity control.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Rivet - route maintenance questions by knowledge coverage
#[derive(Parser, Debug)]
#[command(name = "rivet")]
#[command(version = "0.3.0")]
#[command(
    about = "Route maintenance questions by knowledge coverage and research the gaps",
    long_about = None
)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Verbosity level: default (warnings), -v (info), -vv (debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ask one question and print the routed, synthesized answer
    Ask {
        /// The question, quoted
        question: String,

        /// Identifier recorded with any logged knowledge gap
        #[arg(long, default_value = "cli")]
        user: String,

        /// Print the route trace after the answer
        #[arg(long)]
        trace: bool,
    },

    /// Inspect and maintain the knowledge-gap log
    Gaps {
        #[command(subcommand)]
        command: GapsCommand,
    },

    /// Run one research pass in the foreground
    Research {
        /// Query to research
        query: String,
    },

    /// Show or initialize configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Gap-log maintenance subcommands
#[derive(Subcommand, Debug)]
pub enum GapsCommand {
    /// List the most frequently asked gaps
    List {
        /// Maximum rows to print
        #[arg(short, long, default_value_t = 20)]
        limit: usize,

        /// Include resolved gaps
        #[arg(long)]
        all: bool,
    },

    /// Print gap log statistics
    Stats,

    /// Mark a gap resolved by the atoms that now cover it
    Resolve {
        /// Gap id to resolve
        gap_id: String,

        /// Knowledge atom ids that resolve the gap
        #[arg(required = true)]
        atom_ids: Vec<String>,
    },
}

/// Configuration subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the active configuration as TOML
    Show,

    /// Write the default configuration file
    Init,
}

impl Args {
    /// Tracing filter directive for the chosen verbosity
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "rivet=warn",
            1 => "rivet=info",
            _ => "rivet=debug",
        }
    }
}
