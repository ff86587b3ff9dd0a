//! Command handlers

pub mod config;
pub mod favorite;
pub mod section;
pub mod transfer;

use anyhow::{bail, Result};
use uuid::Uuid;

use marks_core::Store;

/// Resolve a section from its title, a full UUID or an id prefix
///
/// An exact title (ignoring case) wins over an id prefix.
pub fn resolve_section_id(store: &Store, input: &str) -> Result<Uuid> {
    if let Some(section) = store.find_section_by_title(input) {
        return Ok(section.id);
    }
    let candidates = store
        .list_sections()
        .iter()
        .map(|s| (s.id, s.title.as_str()));
    resolve_id("section", input, candidates)
}

/// Resolve a favorite from a full UUID or an id prefix
pub fn resolve_favorite_id(store: &Store, input: &str) -> Result<Uuid> {
    let candidates = store.favorites().iter().map(|f| (f.id, f.title.as_str()));
    resolve_id("favorite", input, candidates)
}

/// Match `input` against `(id, label)` pairs by full UUID or prefix
fn resolve_id<'a>(
    kind: &str,
    input: &str,
    candidates: impl Iterator<Item = (Uuid, &'a str)>,
) -> Result<Uuid> {
    let input = input.trim();
    if input.is_empty() {
        bail!("No {} id given", kind);
    }

    let full = Uuid::parse_str(input).ok();
    let matches: Vec<(Uuid, &str)> = candidates
        .filter(|(id, _)| match full {
            Some(full) => *id == full,
            None => id.to_string().starts_with(&input.to_lowercase()),
        })
        .collect();

    match matches.len() {
        0 => bail!("No {} found matching: {}", kind, input),
        1 => Ok(matches[0].0),
        _ => {
            eprintln!("Multiple {}s match '{}':", kind, input);
            for (id, label) in &matches {
                eprintln!("  {} - {}", id, label);
            }
            bail!("Ambiguous ID. Please provide more characters.");
        }
    }
}
