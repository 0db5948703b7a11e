//! Frozen clocks and HTTP record/replay cassettes for deterministic tests.
//!
//! * [`clock`] freezes every clock reader of this crate at a chosen instant.
//! * [`client`] offers recordable HTTP clients and the interception slot.
//! * [`cassette`] stores interactions and decides between replaying and
//!   recording them.
//! * [`replay`] is the entry point tests use, combining both.

pub mod adapters;
pub mod cassette;
pub mod client;
pub mod clock;
pub mod config;
pub mod context;
pub mod error;
pub mod ports;
pub mod replay;
pub mod sanitize;

#[cfg(feature = "yaml")]
pub mod cli;
#[cfg(feature = "yaml")]
pub mod commands;

pub use cassette::RecordMode;
pub use config::ReplayConfig;
pub use error::{ReplayError, Result};
pub use replay::Replay;

/// Run the maintenance CLI with the provided arguments.
///
/// # Errors
///
/// Returns an error string when argument parsing fails or command execution fails.
#[cfg(feature = "yaml")]
pub fn run<I, T>(args: I) -> std::result::Result<(), String>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    use clap::Parser;

    let cli = cli::Cli::try_parse_from(args).map_err(|err| err.to_string())?;
    commands::dispatch(&cli)
}


#[cfg(all(test, feature = "yaml"))]
mod tests {
    use super::run;

    #[test]
    fn run_lists_missing_cassette() {
        let dir = tempfile::tempdir().unwrap();
        let dir = dir.path().to_str().unwrap();
        assert!(run(["rewind", "list", "absent", "--dir", dir]).is_ok());
    }

    #[test]
    fn run_errors_on_unknown_subcommand() {
        let result = run(["rewind", "unknown"]);
        assert!(result.is_err());
    }
}
