//! `rewind dedupe` command.

use crate::cassette::format::Interaction;
use crate::cassette::matcher;
use crate::cassette::store::CassetteStore;

/// Execute the `dedupe` command.
///
/// Replay always answers with the first matching interaction, so later
/// interactions whose request matches an earlier one are never used.
/// `record` mode accumulates them; this removes them.
///
/// # Errors
///
/// Returns an error string if the cassette cannot be read or written.
pub fn run(store: &CassetteStore, dry_run: bool) -> Result<(), String> {
    let interactions = store.load().map_err(|e| e.to_string())?;
    let (kept, removed) = dedupe(interactions);

    if removed == 0 {
        println!("No duplicate interactions in {}.", store.path().display());
        return Ok(());
    }
    if !dry_run {
        store.save(&kept).map_err(|e| e.to_string())?;
    }
    let verb = if dry_run { "Would remove" } else { "Removed" };
    println!(
        "{verb} {removed} duplicate interaction(s) from {}; {} kept.",
        store.path().display(),
        kept.len()
    );
    Ok(())
}

/// Keep the first interaction of every group of matching requests.
/// Returns the survivors in their original order and the number removed.
#[must_use]
pub fn dedupe(interactions: Vec<Interaction>) -> (Vec<Interaction>, usize) {
    let total = interactions.len();
    let mut kept: Vec<Interaction> = Vec::with_capacity(total);
    for interaction in interactions {
        if matcher::find_match(&kept, &interaction.request).is_none() {
            kept.push(interaction);
        }
    }
    let removed = total - kept.len();
    (kept, removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cassette::format::{Request, Response};

    fn interaction(url: &str, date: &str, body: &str) -> Interaction {
        Interaction {
            request: Request::new("GET", url).header("Date", date),
            response: Response::new(200, body),
        }
    }

    #[test]
    fn later_matches_are_dropped() {
        let (kept, removed) = dedupe(vec![
            interaction("https://a.example/1", "Mon", "first"),
            interaction("https://a.example/2", "Mon", "other"),
            interaction("https://a.example/1", "Tue", "second"),
        ]);
        assert_eq!(removed, 1);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].response.body, "first");
        assert_eq!(kept[1].response.body, "other");
    }

    #[test]
    fn narrower_earlier_request_shadows_wider_later_one() {
        let plain = Interaction {
            request: Request::new("GET", "https://a.example/1"),
            response: Response::new(200, "plain"),
        };
        let traced = Interaction {
            request: Request::new("GET", "https://a.example/1").header("X-Trace", "abc"),
            response: Response::new(200, "traced"),
        };

        let (kept, removed) = dedupe(vec![plain.clone(), traced.clone()]);
        assert_eq!(removed, 1);
        assert_eq!(kept[0].response.body, "plain");

        let (kept, removed) = dedupe(vec![traced, plain]);
        assert_eq!(removed, 0);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn rewrites_cassette() {
        let dir = tempfile::tempdir().unwrap();
        let store = CassetteStore::new(dir.path().join("dupes.yaml"));
        store
            .save(&[
                interaction("https://a.example/1", "Mon", "a"),
                interaction("https://a.example/1", "Tue", "b"),
            ])
            .unwrap();

        run(&store, false).unwrap();
        assert_eq!(store.load().unwrap().len(), 1);
    }
}
