//! Export and import command handlers

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use marks_core::{Board, TransferRecord};

use crate::output::Output;

/// Write all favorites as JSON records to a file or stdout
pub fn export(board: &mut Board, file: Option<PathBuf>, output: &Output) -> Result<()> {
    let records = board.export();
    let json = serde_json::to_string_pretty(&records).context("Failed to serialize favorites")?;

    match file {
        Some(path) => {
            std::fs::write(&path, json)
                .with_context(|| format!("Failed to write export file: {:?}", path))?;
            output.message(&format!(
                "Exported {} favorite(s) to {}",
                records.len(),
                path.display()
            ));
        }
        None => println!("{}", json),
    }
    Ok(())
}

/// Read JSON records from a file and add them to the board
pub async fn import(board: &mut Board, file: PathBuf, output: &Output) -> Result<()> {
    let records = read_records(&file)?;
    let report = board.import(&records).await?;
    output.print_import_report(&report);
    Ok(())
}

fn read_records(path: &Path) -> Result<Vec<TransferRecord>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read import file: {:?}", path))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Invalid import file: {:?}. Expected a JSON array of {{section, title, url}}", path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_records() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("favorites.json");
        std::fs::write(
            &path,
            r#"[{"section": "Dev", "title": "GitHub", "url": "github.com"}, {"title": "Loose", "url": "a.com"}]"#,
        )
        .unwrap();

        let records = read_records(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], TransferRecord::new("Dev", "GitHub", "github.com"));
        assert_eq!(records[1].section, "");
    }

    #[test]
    fn test_read_records_rejects_other_shapes() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("favorites.json");
        std::fs::write(&path, r#"{"section": "Dev"}"#).unwrap();

        assert!(read_records(&path).is_err());
        assert!(read_records(&temp_dir.path().join("missing.json")).is_err());
    }
}
