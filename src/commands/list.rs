//! `rewind list` command.

use crate::cassette::store::CassetteStore;

/// Execute the `list` command.
///
/// Prints one line per interaction: `index. METHOD URL -> STATUS`.
///
/// # Errors
///
/// Returns an error string if the cassette cannot be read.
pub fn run(store: &CassetteStore) -> Result<(), String> {
    let interactions = store.load().map_err(|e| e.to_string())?;
    if interactions.is_empty() {
        println!("No interactions recorded in {}.", store.path().display());
        return Ok(());
    }

    let width = interactions.len().to_string().len();
    for (index, interaction) in interactions.iter().enumerate() {
        let binary = if interaction.response.is_binary { " (binary)" } else { "" };
        println!(
            "{:>width$}. {} {} -> {}{binary}",
            index + 1,
            interaction.request.method,
            interaction.request.url,
            interaction.response.status,
        );
    }
    println!("\n{} interaction(s) in {}.", interactions.len(), store.path().display());
    Ok(())
}
