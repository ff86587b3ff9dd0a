//! Section command handlers

use anyhow::{bail, Context, Result};

use marks_core::{Board, Color, DragEntity, DropOutcome, SectionPatch};

use super::resolve_section_id;
use crate::prompt::confirm;
use crate::output::Output;

/// List sections in order
pub fn list(board: &Board, output: &Output) -> Result<()> {
    let store = board.store();
    let sections: Vec<_> = store
        .list_sections()
        .iter()
        .map(|s| (s.clone(), store.favorites_of(s.id).len()))
        .collect();

    output.print_sections(&sections);
    Ok(())
}

/// Create a section at the end of the list
pub async fn add(
    board: &mut Board,
    title: String,
    background: Option<String>,
    text: Option<String>,
    output: &Output,
) -> Result<()> {
    let mut new = board.new_section(title);
    if let Some(value) = background {
        new.background_color = parse_color(&value)?;
    }
    if let Some(value) = text {
        new.text_color = parse_color(&value)?;
    }

    let section = board.create_section(new).await?;
    output.print_section(&section);
    Ok(())
}

/// Change title or colors
pub async fn edit(
    board: &mut Board,
    id: String,
    title: Option<String>,
    background: Option<String>,
    text: Option<String>,
    output: &Output,
) -> Result<()> {
    let uuid = resolve_section_id(board.store(), &id)?;

    let patch = SectionPatch {
        title,
        background_color: background.as_deref().map(parse_color).transpose()?,
        text_color: text.as_deref().map(parse_color).transpose()?,
    };
    if patch.is_empty() {
        bail!("Nothing to change. Use --title, --bg or --fg.");
    }

    let section = board.update_section(uuid, patch).await?;
    output.print_section(&section);
    Ok(())
}

/// Delete a section and its favorites
pub async fn delete(board: &mut Board, id: String, output: &Output) -> Result<()> {
    let uuid = resolve_section_id(board.store(), &id)?;

    if output.should_prompt() {
        let store = board.store();
        if let Some(section) = store.section(uuid) {
            println!(
                "Delete section: {} - {} ({} favorite(s))",
                &section.id.to_string()[..8],
                section.title,
                store.favorites_of(uuid).len()
            );
        }
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    board.delete_section(uuid).await?;
    Ok(())
}

/// Move a section to the position of another one
pub async fn move_onto(board: &mut Board, id: String, onto: String, output: &Output) -> Result<()> {
    let dragged = resolve_section_id(board.store(), &id)?;
    let target = resolve_section_id(board.store(), &onto)?;

    board.start_drag(DragEntity::Section(dragged))?;
    board.set_drop_target(Some(DragEntity::Section(target)));

    match board.end_drag().await {
        DropOutcome::NoChange => output.message("Nothing to move."),
        DropOutcome::Applied => list(board, output)?,
        DropOutcome::Failed(e) => return Err(e.into()),
    }
    Ok(())
}

fn parse_color(value: &str) -> Result<Color> {
    Color::parse(value).with_context(|| format!("Invalid color: {}", value))
}
