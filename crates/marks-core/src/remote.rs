//! Remote table store
//!
//! The store persists sections and favorites to two key-ordered tables.
//! `RemoteStore` is the seam; `SqliteStore` (in `storage`) is the on-disk
//! implementation and `MemoryStore` keeps the tables in memory.
//!
//! Neither implementation cascades: a section can only be deleted remotely
//! once none of its favorites remain.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Operation, PersistenceError, PersistenceResult, Table};
use crate::models::{Color, Favorite, Section};

/// Row of the section rank upsert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionRank {
    pub id: Uuid,
    pub title: String,
    pub background_color: Color,
    pub text_color: Color,
    pub rank: u32,
}

impl From<&Section> for SectionRank {
    fn from(section: &Section) -> Self {
        Self {
            id: section.id,
            title: section.title.clone(),
            background_color: section.background_color.clone(),
            text_color: section.text_color.clone(),
            rank: section.rank,
        }
    }
}

/// Row of the favorite rank upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteRank {
    pub id: Uuid,
    pub section_id: Uuid,
    pub rank: u32,
}

impl From<&Favorite> for FavoriteRank {
    fn from(favorite: &Favorite) -> Self {
        Self {
            id: favorite.id,
            section_id: favorite.section_id,
            rank: favorite.rank,
        }
    }
}

/// Persistence collaborator for the hierarchy store
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// All sections, by rank ascending
    async fn fetch_sections(&self) -> PersistenceResult<Vec<Section>>;

    /// Favorites by rank ascending, optionally only those of one section
    async fn fetch_favorites(&self, section_id: Option<Uuid>) -> PersistenceResult<Vec<Favorite>>;

    async fn insert_section(&self, section: &Section) -> PersistenceResult<Section>;

    async fn update_section(&self, section: &Section) -> PersistenceResult<Section>;

    async fn delete_section(&self, id: Uuid) -> PersistenceResult<()>;

    async fn insert_favorite(&self, favorite: &Favorite) -> PersistenceResult<Favorite>;

    async fn update_favorite(&self, favorite: &Favorite) -> PersistenceResult<Favorite>;

    async fn delete_favorite(&self, id: Uuid) -> PersistenceResult<()>;

    /// Write rank and orderable fields of existing sections
    async fn upsert_section_ranks(&self, ranks: &[SectionRank]) -> PersistenceResult<()>;

    /// Write rank and section of existing favorites
    async fn upsert_favorite_ranks(&self, ranks: &[FavoriteRank]) -> PersistenceResult<()>;
}

#[derive(Debug, Default)]
struct Tables {
    sections: HashMap<Uuid, Section>,
    favorites: HashMap<Uuid, Favorite>,
    /// Successful writes left before every write is rejected
    writes_left: Option<usize>,
    offline: bool,
}

/// In-memory table store
///
/// Cloning yields another handle to the same tables. Failure injection
/// (`set_offline`, `fail_writes_after`) makes rejected writes reproducible.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every request while offline
    pub fn set_offline(&self, offline: bool) {
        if let Ok(mut tables) = self.tables.lock() {
            tables.offline = offline;
        }
    }

    /// Allow `count` more writes, then reject writes; `None` lifts the limit
    pub fn fail_writes_after(&self, count: Option<usize>) {
        if let Ok(mut tables) = self.tables.lock() {
            tables.writes_left = count;
        }
    }

    pub fn section_count(&self) -> usize {
        self.tables.lock().map(|t| t.sections.len()).unwrap_or(0)
    }

    pub fn favorite_count(&self) -> usize {
        self.tables.lock().map(|t| t.favorites.len()).unwrap_or(0)
    }

    /// Favorites whose section no longer exists
    pub fn orphaned_favorites(&self) -> Vec<Favorite> {
        self.tables
            .lock()
            .map(|t| {
                t.favorites
                    .values()
                    .filter(|f| !t.sections.contains_key(&f.section_id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn read(&self, table: Table) -> PersistenceResult<MutexGuard<'_, Tables>> {
        let tables = self
            .tables
            .lock()
            .map_err(|_| PersistenceError::Unavailable("table lock poisoned".to_string()))?;
        if tables.offline {
            return Err(PersistenceError::Rejected {
                table,
                op: Operation::Fetch,
                reason: "store is offline".to_string(),
            });
        }
        Ok(tables)
    }

    fn write(&self, table: Table, op: Operation) -> PersistenceResult<MutexGuard<'_, Tables>> {
        let mut tables = self
            .tables
            .lock()
            .map_err(|_| PersistenceError::Unavailable("table lock poisoned".to_string()))?;
        if tables.offline {
            return Err(PersistenceError::Rejected {
                table,
                op,
                reason: "store is offline".to_string(),
            });
        }
        let writes_left = tables.writes_left;
        match writes_left {
            Some(0) => Err(PersistenceError::Rejected {
                table,
                op,
                reason: "write quota exhausted".to_string(),
            }),
            Some(n) => {
                tables.writes_left = Some(n - 1);
                Ok(tables)
            }
            None => Ok(tables),
        }
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn fetch_sections(&self) -> PersistenceResult<Vec<Section>> {
        let tables = self.read(Table::Sections)?;
        let mut sections: Vec<Section> = tables.sections.values().cloned().collect();
        sections.sort_by_key(|s| s.rank);
        Ok(sections)
    }

    async fn fetch_favorites(&self, section_id: Option<Uuid>) -> PersistenceResult<Vec<Favorite>> {
        let tables = self.read(Table::Favorites)?;
        let mut favorites: Vec<Favorite> = tables
            .favorites
            .values()
            .filter(|f| section_id.map_or(true, |id| f.section_id == id))
            .cloned()
            .collect();
        favorites.sort_by_key(|f| f.rank);
        Ok(favorites)
    }

    async fn insert_section(&self, section: &Section) -> PersistenceResult<Section> {
        let mut tables = self.write(Table::Sections, Operation::Insert)?;
        if tables.sections.contains_key(&section.id) {
            return Err(PersistenceError::Rejected {
                table: Table::Sections,
                op: Operation::Insert,
                reason: format!("duplicate id {}", section.id),
            });
        }
        tables.sections.insert(section.id, section.clone());
        Ok(section.clone())
    }

    async fn update_section(&self, section: &Section) -> PersistenceResult<Section> {
        let mut tables = self.write(Table::Sections, Operation::Update)?;
        match tables.sections.get_mut(&section.id) {
            Some(row) => {
                *row = section.clone();
                Ok(section.clone())
            }
            None => Err(PersistenceError::MissingRecord {
                table: Table::Sections,
                id: section.id,
            }),
        }
    }

    async fn delete_section(&self, id: Uuid) -> PersistenceResult<()> {
        let mut tables = self.write(Table::Sections, Operation::Delete)?;
        if tables.favorites.values().any(|f| f.section_id == id) {
            return Err(PersistenceError::Rejected {
                table: Table::Sections,
                op: Operation::Delete,
                reason: "section still has favorites".to_string(),
            });
        }
        tables.sections.remove(&id);
        Ok(())
    }

    async fn insert_favorite(&self, favorite: &Favorite) -> PersistenceResult<Favorite> {
        let mut tables = self.write(Table::Favorites, Operation::Insert)?;
        if !tables.sections.contains_key(&favorite.section_id) {
            return Err(PersistenceError::Rejected {
                table: Table::Favorites,
                op: Operation::Insert,
                reason: format!("unknown section {}", favorite.section_id),
            });
        }
        if tables.favorites.contains_key(&favorite.id) {
            return Err(PersistenceError::Rejected {
                table: Table::Favorites,
                op: Operation::Insert,
                reason: format!("duplicate id {}", favorite.id),
            });
        }
        tables.favorites.insert(favorite.id, favorite.clone());
        Ok(favorite.clone())
    }

    async fn update_favorite(&self, favorite: &Favorite) -> PersistenceResult<Favorite> {
        let mut tables = self.write(Table::Favorites, Operation::Update)?;
        if !tables.sections.contains_key(&favorite.section_id) {
            return Err(PersistenceError::Rejected {
                table: Table::Favorites,
                op: Operation::Update,
                reason: format!("unknown section {}", favorite.section_id),
            });
        }
        match tables.favorites.get_mut(&favorite.id) {
            Some(row) => {
                *row = favorite.clone();
                Ok(favorite.clone())
            }
            None => Err(PersistenceError::MissingRecord {
                table: Table::Favorites,
                id: favorite.id,
            }),
        }
    }

    async fn delete_favorite(&self, id: Uuid) -> PersistenceResult<()> {
        let mut tables = self.write(Table::Favorites, Operation::Delete)?;
        tables.favorites.remove(&id);
        Ok(())
    }

    async fn upsert_section_ranks(&self, ranks: &[SectionRank]) -> PersistenceResult<()> {
        let mut tables = self.write(Table::Sections, Operation::Upsert)?;
        if let Some(missing) = ranks.iter().find(|r| !tables.sections.contains_key(&r.id)) {
            return Err(PersistenceError::MissingRecord {
                table: Table::Sections,
                id: missing.id,
            });
        }
        for row in ranks {
            if let Some(section) = tables.sections.get_mut(&row.id) {
                section.title = row.title.clone();
                section.background_color = row.background_color.clone();
                section.text_color = row.text_color.clone();
                section.rank = row.rank;
            }
        }
        Ok(())
    }

    async fn upsert_favorite_ranks(&self, ranks: &[FavoriteRank]) -> PersistenceResult<()> {
        let mut tables = self.write(Table::Favorites, Operation::Upsert)?;
        if let Some(missing) = ranks.iter().find(|r| !tables.favorites.contains_key(&r.id)) {
            return Err(PersistenceError::MissingRecord {
                table: Table::Favorites,
                id: missing.id,
            });
        }
        if let Some(orphan) = ranks
            .iter()
            .find(|r| !tables.sections.contains_key(&r.section_id))
        {
            return Err(PersistenceError::Rejected {
                table: Table::Favorites,
                op: Operation::Upsert,
                reason: format!("unknown section {}", orphan.section_id),
            });
        }
        for row in ranks {
            if let Some(favorite) = tables.favorites.get_mut(&row.id) {
                favorite.section_id = row.section_id;
                favorite.rank = row.rank;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fetch_is_ordered_by_rank() {
        let store = MemoryStore::new();
        let b = Section::new("B", 1);
        let a = Section::new("A", 0);
        store.insert_section(&b).await.unwrap();
        store.insert_section(&a).await.unwrap();

        let sections = store.fetch_sections().await.unwrap();
        assert_eq!(sections[0].title, "A");
        assert_eq!(sections[1].title, "B");
    }

    #[tokio::test]
    async fn test_fetch_favorites_filters_by_section() {
        let store = MemoryStore::new();
        let s1 = Section::new("One", 0);
        let s2 = Section::new("Two", 1);
        store.insert_section(&s1).await.unwrap();
        store.insert_section(&s2).await.unwrap();
        store
            .insert_favorite(&Favorite::new("a", "https://a.com", s1.id, 0))
            .await
            .unwrap();
        store
            .insert_favorite(&Favorite::new("b", "https://b.com", s2.id, 0))
            .await
            .unwrap();

        assert_eq!(store.fetch_favorites(None).await.unwrap().len(), 2);
        let only_two = store.fetch_favorites(Some(s2.id)).await.unwrap();
        assert_eq!(only_two.len(), 1);
        assert_eq!(only_two[0].title, "b");
    }

    #[tokio::test]
    async fn test_delete_section_with_favorites_is_rejected() {
        let store = MemoryStore::new();
        let section = Section::new("Keep", 0);
        store.insert_section(&section).await.unwrap();
        let favorite = Favorite::new("a", "https://a.com", section.id, 0);
        store.insert_favorite(&favorite).await.unwrap();

        let err = store.delete_section(section.id).await.unwrap_err();
        assert!(matches!(err, PersistenceError::Rejected { .. }));

        store.delete_favorite(favorite.id).await.unwrap();
        store.delete_section(section.id).await.unwrap();
        assert_eq!(store.section_count(), 0);
        assert!(store.orphaned_favorites().is_empty());
    }

    #[tokio::test]
    async fn test_insert_favorite_requires_section() {
        let store = MemoryStore::new();
        let favorite = Favorite::new("a", "https://a.com", Uuid::new_v4(), 0);
        assert!(store.insert_favorite(&favorite).await.is_err());
        assert_eq!(store.favorite_count(), 0);
    }

    #[tokio::test]
    async fn test_fail_writes_after() {
        let store = MemoryStore::new();
        store.fail_writes_after(Some(1));

        store.insert_section(&Section::new("ok", 0)).await.unwrap();
        let err = store
            .insert_section(&Section::new("rejected", 1))
            .await
            .unwrap_err();
        assert!(err.is_recoverable());

        // Reads are unaffected
        assert_eq!(store.fetch_sections().await.unwrap().len(), 1);

        store.fail_writes_after(None);
        store.insert_section(&Section::new("again", 1)).await.unwrap();
        assert_eq!(store.section_count(), 2);
    }

    #[tokio::test]
    async fn test_offline_rejects_reads() {
        let store = MemoryStore::new();
        store.set_offline(true);
        assert!(store.fetch_sections().await.is_err());
        store.set_offline(false);
        assert!(store.fetch_sections().await.is_ok());
    }

    #[tokio::test]
    async fn test_upsert_unknown_favorite_fails() {
        let store = MemoryStore::new();
        let section = Section::new("S", 0);
        store.insert_section(&section).await.unwrap();

        let err = store
            .upsert_favorite_ranks(&[FavoriteRank {
                id: Uuid::new_v4(),
                section_id: section.id,
                rank: 0,
            }])
            .await
            .unwrap_err();
        assert!(matches!(err, PersistenceError::MissingRecord { .. }));
    }
}
