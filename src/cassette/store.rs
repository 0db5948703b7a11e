//! Cassette files on disk.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::format::{CassetteFile, Interaction, FORMAT_VERSION};
use crate::config::ReplayConfig;
use crate::error::{CassetteIoSource, ReplayError, Result};

/// Reads and rewrites one cassette file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CassetteStore {
    path: PathBuf,
}

#[derive(Serialize)]
struct CassetteRef<'a> {
    version: u32,
    interactions: &'a [Interaction],
}

impl CassetteStore {
    /// Store backed by the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store for the cassette called `name` under the configured directory.
    #[must_use]
    pub fn for_cassette(config: &ReplayConfig, name: &str) -> Self {
        Self::new(config.cassette_path(name))
    }

    /// Path of the cassette file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the file has been written yet.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Read every stored interaction. A missing or empty file holds none.
    ///
    /// # Errors
    ///
    /// Returns [`ReplayError::CassetteIo`] if the file cannot be read, is
    /// not a cassette document, or has an unsupported version.
    pub fn load(&self) -> Result<Vec<Interaction>> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "cassette absent, starting empty");
                return Ok(Vec::new());
            }
            Err(e) => return Err(ReplayError::cassette(&self.path, e)),
        };
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        let file: CassetteFile =
            serde_yaml::from_str(&text).map_err(|e| ReplayError::cassette(&self.path, e))?;
        if file.version != FORMAT_VERSION {
            return Err(ReplayError::cassette(&self.path, CassetteIoSource::Version(file.version)));
        }
        tracing::debug!(
            path = %self.path.display(),
            interactions = file.interactions.len(),
            "cassette loaded"
        );
        Ok(file.interactions)
    }

    /// Replace the file with `interactions`, creating parent directories.
    ///
    /// The document is written to a sibling temp file first and renamed
    /// over the cassette, so readers never see a partial file.
    ///
    /// # Errors
    ///
    /// Returns [`ReplayError::CassetteIo`] if encoding or writing fails.
    pub fn save(&self, interactions: &[Interaction]) -> Result<()> {
        let yaml = serde_yaml::to_string(&CassetteRef { version: FORMAT_VERSION, interactions })
            .map_err(|e| ReplayError::cassette(&self.path, e))?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ReplayError::cassette(&self.path, e))?;
        }
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        std::fs::write(&tmp, yaml).map_err(|e| ReplayError::cassette(&self.path, e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| ReplayError::cassette(&self.path, e))?;
        tracing::debug!(
            path = %self.path.display(),
            interactions = interactions.len(),
            "cassette written"
        );
        Ok(())
    }
}
