//! Command dispatch and handlers.

pub mod dedupe;
pub mod list;
pub mod sanitize;

use std::path::Path;

use crate::cassette::store::CassetteStore;
use crate::cli::{Cli, Command};
use crate::config::ReplayConfig;

/// Dispatch a parsed command to its handler.
///
/// The recordings directory comes from `--dir`, then
/// `REWIND_RECORDINGS_DIR`, then the default.
///
/// # Errors
///
/// Returns an error string if configuration is invalid or the selected
/// command handler fails.
pub fn dispatch(cli: &Cli) -> Result<(), String> {
    let mut config = ReplayConfig::default().with_env_overrides().map_err(|e| e.to_string())?;
    if let Some(dir) = &cli.dir {
        config.recordings_dir.clone_from(dir);
    }

    match &cli.command {
        Command::List { cassette } => list::run(&resolve(&config, cassette)),
        Command::Sanitize { cassette, dry_run } => {
            sanitize::run(&resolve(&config, cassette), *dry_run)
        }
        Command::Dedupe { cassette, dry_run } => dedupe::run(&resolve(&config, cassette), *dry_run),
    }
}

/// A cassette argument is a file path when it names an existing file or
/// ends in `.yaml`; otherwise it is a name under the recordings directory.
fn resolve(config: &ReplayConfig, cassette: &str) -> CassetteStore {
    let as_path = Path::new(cassette);
    if as_path.is_file() || as_path.extension().is_some_and(|ext| ext == "yaml") {
        CassetteStore::new(as_path)
    } else {
        CassetteStore::for_cassette(config, cassette)
    }
}
