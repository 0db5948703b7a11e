//! `rewind sanitize` command.

use crate::cassette::store::CassetteStore;
use crate::sanitize::Sanitizer;

/// Execute the `sanitize` command.
///
/// Runs the default sanitizer over every interaction and rewrites the
/// cassette if anything changed.
///
/// # Errors
///
/// Returns an error string if the cassette cannot be read or written.
pub fn run(store: &CassetteStore, dry_run: bool) -> Result<(), String> {
    let interactions = store.load().map_err(|e| e.to_string())?;
    let sanitizer = Sanitizer::new();
    let cleaned: Vec<_> = interactions.iter().map(|i| sanitizer.sanitize(i)).collect();
    let changed = interactions.iter().zip(&cleaned).filter(|(before, after)| before != after).count();

    if changed == 0 {
        println!("Nothing to redact in {}.", store.path().display());
        return Ok(());
    }
    if dry_run {
        println!(
            "Would sanitize {changed} of {} interaction(s) in {}.",
            interactions.len(),
            store.path().display()
        );
        return Ok(());
    }
    store.save(&cleaned).map_err(|e| e.to_string())?;
    println!(
        "Sanitized {changed} of {} interaction(s) in {}.",
        interactions.len(),
        store.path().display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cassette::format::{Interaction, Request, Response};

    fn raw_store(dir: &tempfile::TempDir) -> CassetteStore {
        let store = CassetteStore::new(dir.path().join("raw.yaml"));
        store
            .save(&[Interaction {
                request: Request::new("GET", "https://a.example/me").header("Authorization", "Bearer xyz"),
                response: Response::new(200, "{}"),
            }])
            .unwrap();
        store
    }

    #[test]
    fn rewrites_unsanitized_cassette() {
        let dir = tempfile::tempdir().unwrap();
        let store = raw_store(&dir);
        run(&store, false).unwrap();
        let text = std::fs::read_to_string(store.path()).unwrap();
        assert!(!text.contains("Bearer xyz"));
        assert!(text.contains("***REDACTED***"));
    }

    #[test]
    fn dry_run_leaves_file_alone() {
        let dir = tempfile::tempdir().unwrap();
        let store = raw_store(&dir);
        run(&store, true).unwrap();
        assert!(std::fs::read_to_string(store.path()).unwrap().contains("Bearer xyz"));
    }
}
