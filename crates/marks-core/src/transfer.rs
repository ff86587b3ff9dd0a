//! Bulk export and import
//!
//! The exchange format is a flat list of `{section, title, url}` records.
//! Sections are referenced by name so a file can move between stores.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ImportRecordError, StoreError};
use crate::links::normalize_url;
use crate::models::{Color, NewFavorite, NewSection};
use crate::store::Store;

/// Section name used when a record has none or its section is gone
pub const NO_SECTION: &str = "No Section";

/// One favorite in the exchange format
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRecord {
    #[serde(default)]
    pub section: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
}

impl TransferRecord {
    pub fn new(section: impl Into<String>, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            section: section.into(),
            title: title.into(),
            url: url.into(),
        }
    }
}

/// Outcome of an import
#[derive(Debug, Default)]
pub struct ImportReport {
    pub imported: usize,
    /// Records missing a title or URL
    pub skipped: usize,
    /// Records the store rejected
    pub failed: usize,
    pub sections_created: usize,
    pub errors: Vec<ImportRecordError>,
}

impl ImportReport {
    pub fn total(&self) -> usize {
        self.imported + self.skipped + self.failed
    }
}

/// Every favorite in display order
pub fn export(store: &Store) -> Vec<TransferRecord> {
    store
        .all_favorites()
        .into_iter()
        .map(|favorite| {
            let section = store
                .section(favorite.section_id)
                .map(|s| s.title.clone())
                .unwrap_or_else(|| NO_SECTION.to_string());
            TransferRecord::new(section, favorite.title, favorite.url)
        })
        .collect()
}

/// Import records one at a time
///
/// Sections are matched by name ignoring case and created with the given
/// colors when missing. A bad record is logged and counted; the rest of
/// the batch still runs.
pub async fn import(
    store: &mut Store,
    records: &[TransferRecord],
    background: &Color,
    text: &Color,
) -> ImportReport {
    let mut report = ImportReport::default();

    for (index, record) in records.iter().enumerate() {
        match import_record(store, index, record, background, text, &mut report).await {
            Ok(()) => report.imported += 1,
            Err(e) => {
                warn!(index, error = %e, "Skipping import record");
                match e {
                    ImportRecordError::Store { .. } => report.failed += 1,
                    _ => report.skipped += 1,
                }
                report.errors.push(e);
            }
        }
    }

    info!(
        imported = report.imported,
        skipped = report.skipped,
        failed = report.failed,
        "Import finished"
    );
    report
}

/// A record is fully validated before its section is looked up, so a
/// rejected record leaves the store untouched.
async fn import_record(
    store: &mut Store,
    index: usize,
    record: &TransferRecord,
    background: &Color,
    text: &Color,
    report: &mut ImportReport,
) -> Result<(), ImportRecordError> {
    let title = record.title.trim();
    if title.is_empty() {
        return Err(ImportRecordError::MissingTitle { index });
    }
    let url = record.url.trim();
    if url.is_empty() {
        return Err(ImportRecordError::MissingUrl { index });
    }
    let url = normalize_url(url).map_err(|e| ImportRecordError::Store {
        index,
        source: StoreError::from(e),
    })?;

    let section_name = match record.section.trim() {
        "" => NO_SECTION,
        name => name,
    };

    let section_id = match store.find_section_by_title(section_name) {
        Some(section) => section.id,
        None => {
            let new = NewSection::new(section_name).with_colors(background.clone(), text.clone());
            let section = store
                .create_section(new)
                .await
                .map_err(|source| ImportRecordError::Store { index, source })?;
            report.sections_created += 1;
            section.id
        }
    };

    // The store derives the icon from the URL host
    store
        .create_favorite(NewFavorite::new(title, url, section_id))
        .await
        .map_err(|source| ImportRecordError::Store { index, source })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::MemoryStore;

    async fn empty_store() -> (Store, MemoryStore) {
        let remote = MemoryStore::new();
        (Store::open(remote.clone()).await.unwrap(), remote)
    }

    fn colors() -> (Color, Color) {
        (Color::default_background(), Color::default_text())
    }

    #[tokio::test]
    async fn test_import_creates_sections_by_name() {
        let (mut store, _remote) = empty_store().await;
        let (bg, fg) = colors();

        let records = vec![
            TransferRecord::new("Dev", "GitHub", "github.com"),
            TransferRecord::new("dev", "Crates", "https://crates.io"),
            TransferRecord::new("", "Loose", "https://loose.example"),
        ];
        let report = import(&mut store, &records, &bg, &fg).await;

        assert_eq!(report.imported, 3);
        assert_eq!(report.sections_created, 2);
        assert_eq!(store.section_count(), 2);

        let dev = store.find_section_by_title("DEV").unwrap().id;
        let favorites = store.favorites_of(dev);
        assert_eq!(favorites.len(), 2);
        assert_eq!(favorites[0].url, "https://github.com");
        assert!(favorites[0].icon.as_deref().unwrap().contains("domain=github.com"));

        assert!(store.find_section_by_title(NO_SECTION).is_some());
    }

    #[tokio::test]
    async fn test_import_skips_bad_records_and_continues() {
        let (mut store, _remote) = empty_store().await;
        let (bg, fg) = colors();

        let records = vec![
            TransferRecord::new("Dev", "", "https://a.com"),
            TransferRecord::new("Dev", "No url", "  "),
            TransferRecord::new("Dev", "Broken", "http://"),
            TransferRecord::new("Dev", "Good", "https://good.example"),
        ];
        let report = import(&mut store, &records, &bg, &fg).await;

        assert_eq!(report.imported, 1);
        assert_eq!(report.skipped, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.total(), 4);
        assert_eq!(report.errors[2].index(), 2);
        assert_eq!(store.favorite_count(), 1);
    }

    #[tokio::test]
    async fn test_import_rejected_url_creates_no_section() {
        let (mut store, remote) = empty_store().await;
        let (bg, fg) = colors();

        let records = vec![TransferRecord::new("Fresh", "Broken", "http://")];
        let report = import(&mut store, &records, &bg, &fg).await;

        assert_eq!(report.failed, 1);
        assert_eq!(report.sections_created, 0);
        assert!(store.find_section_by_title("Fresh").is_none());
        assert!(store.is_empty());
        assert_eq!(remote.section_count(), 0);
    }

    #[tokio::test]
    async fn test_import_counts_section_even_if_favorite_fails() {
        let (mut store, remote) = empty_store().await;
        let (bg, fg) = colors();

        // The section write succeeds, the favorite write fails
        remote.fail_writes_after(Some(1));
        let records = vec![TransferRecord::new("Fresh", "A", "https://a.com")];
        let report = import(&mut store, &records, &bg, &fg).await;

        assert_eq!(report.failed, 1);
        assert_eq!(report.sections_created, store.section_count());
        assert_eq!(report.sections_created, 1);
        assert_eq!(store.favorite_count(), 0);
    }

    #[tokio::test]
    async fn test_import_counts_store_failures() {
        let (mut store, remote) = empty_store().await;
        let (bg, fg) = colors();

        remote.set_offline(true);
        let records = vec![TransferRecord::new("Dev", "A", "https://a.com")];
        let report = import(&mut store, &records, &bg, &fg).await;

        assert_eq!(report.failed, 1);
        assert!(matches!(report.errors[0], ImportRecordError::Store { index: 0, .. }));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_export_round_trips_through_import() {
        let (mut source, _remote) = empty_store().await;
        let (bg, fg) = colors();
        let records = vec![
            TransferRecord::new("News", "HN", "https://news.ycombinator.com"),
            TransferRecord::new("Dev", "GitHub", "https://github.com"),
            TransferRecord::new("News", "LWN", "https://lwn.net"),
        ];
        import(&mut source, &records, &bg, &fg).await;

        let exported = export(&source);
        assert_eq!(
            exported,
            vec![
                TransferRecord::new("News", "HN", "https://news.ycombinator.com"),
                TransferRecord::new("News", "LWN", "https://lwn.net"),
                TransferRecord::new("Dev", "GitHub", "https://github.com"),
            ]
        );

        let (mut target, _remote) = empty_store().await;
        let report = import(&mut target, &exported, &bg, &fg).await;
        assert_eq!(report.imported, 3);
        assert_eq!(export(&target), exported);
    }

    #[test]
    fn test_record_missing_fields_deserialize_empty() {
        let records: Vec<TransferRecord> =
            serde_json::from_str(r#"[{"title": "A", "url": "https://a.com"}]"#).unwrap();
        assert_eq!(records[0].section, "");
    }
}
