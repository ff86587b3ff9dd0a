//! Favorite command handlers

use anyhow::{bail, Context, Result};

use marks_core::links::suggest_title;
use marks_core::{Board, DragEntity, DropOutcome, FavoritePatch, NewFavorite};

use super::{resolve_favorite_id, resolve_section_id};
use crate::output::Output;
use crate::prompt::confirm;

/// Create a favorite at the end of a section
///
/// Without `--title` the title is suggested from the URL host.
pub async fn add(
    board: &mut Board,
    url: String,
    section: String,
    title: Option<String>,
    icon: Option<String>,
    output: &Output,
) -> Result<()> {
    let section_id = resolve_section_id(board.store(), &section)?;

    let title = match title {
        Some(title) => title,
        None => suggest_title(&url)
            .with_context(|| format!("Cannot suggest a title for '{}'. Use --title.", url))?,
    };

    let mut new = NewFavorite::new(title, url, section_id);
    new.icon = icon;

    let favorite = board.create_favorite(new).await?;
    output.print_favorite(&favorite, board.store().section(section_id));
    Ok(())
}

/// Change fields of a favorite, or move it to another section
pub async fn edit(
    board: &mut Board,
    id: String,
    title: Option<String>,
    url: Option<String>,
    section: Option<String>,
    icon: Option<String>,
    output: &Output,
) -> Result<()> {
    let uuid = resolve_favorite_id(board.store(), &id)?;
    let section_id = section
        .map(|s| resolve_section_id(board.store(), &s))
        .transpose()?;

    let patch = FavoritePatch {
        title,
        url,
        // "none" clears the icon
        icon: icon.map(|i| if i == "none" { None } else { Some(i) }),
        section_id,
    };
    if patch.is_empty() {
        bail!("Nothing to change. Use --title, --url, --section or --icon.");
    }

    let favorite = board.update_favorite(uuid, patch).await?;
    output.print_favorite(&favorite, board.store().section(favorite.section_id));
    Ok(())
}

/// Delete a favorite
pub async fn delete(board: &mut Board, id: String, output: &Output) -> Result<()> {
    let uuid = resolve_favorite_id(board.store(), &id)?;

    if output.should_prompt() {
        if let Some(favorite) = board.store().favorite(uuid) {
            println!(
                "Delete favorite: {} - {}",
                &favorite.id.to_string()[..8],
                favorite.title
            );
        }
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    board.delete_favorite(uuid).await?;
    Ok(())
}

/// List favorites grouped by section, optionally for one section only
pub fn list(board: &Board, section: Option<String>, output: &Output) -> Result<()> {
    let mut views = board.view();
    if let Some(section) = section {
        let section_id = resolve_section_id(board.store(), &section)?;
        views.retain(|view| view.section.id == section_id);
    }

    output.print_view(&views);
    Ok(())
}

/// Show one favorite
pub fn show(board: &Board, id: String, output: &Output) -> Result<()> {
    let uuid = resolve_favorite_id(board.store(), &id)?;
    let favorite = board
        .store()
        .favorite(uuid)
        .with_context(|| format!("Favorite not found: {}", id))?;

    output.print_favorite(favorite, board.store().section(favorite.section_id));
    Ok(())
}

/// Search favorites by title or URL
pub fn search(board: &mut Board, query: String, output: &Output) -> Result<()> {
    board.set_query(query);
    output.print_view(&board.view());
    Ok(())
}

/// Move a favorite to the position of another favorite, in any section
pub async fn move_onto(board: &mut Board, id: String, onto: String, output: &Output) -> Result<()> {
    let dragged = resolve_favorite_id(board.store(), &id)?;
    let target = resolve_favorite_id(board.store(), &onto)?;

    board.start_drag(DragEntity::Favorite(dragged))?;
    board.set_drop_target(Some(DragEntity::Favorite(target)));

    match board.end_drag().await {
        DropOutcome::NoChange => output.message("Nothing to move."),
        DropOutcome::Applied => {
            let section_id = board
                .store()
                .favorite(dragged)
                .map(|f| f.section_id.to_string());
            list(board, section_id, output)?;
        }
        DropOutcome::Failed(e) => return Err(e.into()),
    }
    Ok(())
}

/// Open a favorite in the default browser
pub fn open(board: &Board, id: String, output: &Output) -> Result<()> {
    let uuid = resolve_favorite_id(board.store(), &id)?;
    let favorite = board
        .store()
        .favorite(uuid)
        .with_context(|| format!("Favorite not found: {}", id))?;

    open::that(&favorite.url).with_context(|| format!("Failed to open {}", favorite.url))?;
    output.message(&format!("Opened {}", favorite.url));
    Ok(())
}
