//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Top-level CLI parser for `rewind`.
#[derive(Debug, Parser)]
#[command(name = "rewind", version, about = "Inspect and maintain HTTP replay cassettes")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Recordings directory [default: $REWIND_RECORDINGS_DIR or tests/recordings]
    #[arg(long, global = true)]
    pub dir: Option<PathBuf>,

    /// Log debug output to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported top-level subcommands.
///
/// `CASSETTE` is a cassette name resolved under the recordings directory,
/// or a path to a `.yaml` file.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the interactions stored in a cassette.
    List {
        /// Cassette name or file.
        cassette: String,
    },
    /// Redact credentials in a cassette recorded without sanitizing.
    Sanitize {
        /// Cassette name or file.
        cassette: String,
        /// Report what would change without rewriting the file.
        #[arg(long)]
        dry_run: bool,
    },
    /// Drop interactions shadowed by an earlier identical request.
    Dedupe {
        /// Cassette name or file.
        cassette: String,
        /// Report what would change without rewriting the file.
        #[arg(long)]
        dry_run: bool,
    },
}
