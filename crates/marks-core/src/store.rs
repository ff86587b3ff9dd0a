//! Ordered hierarchy store
//!
//! The `Store` owns the canonical in-memory sections and favorites and
//! keeps their ranks dense. Every mutator follows the same contract:
//!
//! 1. validate the input (nothing changes on a `ValidationError`)
//! 2. apply the change locally
//! 3. send the matching request to the remote table store
//! 4. on a `PersistenceError`, restore the local state from before step 2
//!    and return the error
//!
//! Rank compaction that follows a delete or a section transfer is written
//! after the main request succeeds. If that write fails the local state is
//! kept: remote ranks then have gaps but the same order, which `load`
//! densifies again.
//!
//! ## Usage
//!
//! ```ignore
//! let mut store = Store::open(SqliteStore::open(&config)?).await?;
//!
//! let work = store.create_section(NewSection::new("Work")).await?;
//! store.create_favorite(NewFavorite::new("Docs", "docs.rs", work.id)).await?;
//!
//! for favorite in store.favorites_of(work.id) { /* ... */ }
//! ```

use std::collections::HashSet;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{PersistenceError, StoreError, StoreResult, ValidationError};
use crate::links::{favicon_for, normalize_url};
use crate::models::{Favorite, FavoritePatch, NewFavorite, NewSection, Section, SectionPatch};
use crate::rank::{assign_ranks, densify, ReorderTransaction};
use crate::remote::{FavoriteRank, RemoteStore, SectionRank};

/// What `load` found in the remote store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub sections: usize,
    pub favorites: usize,
    /// Favorites skipped because their section does not exist
    pub orphans_dropped: usize,
}

/// Copy of both collections taken before a mutation
struct Snapshot {
    sections: Vec<Section>,
    favorites: Vec<Favorite>,
}

/// In-memory sections and favorites backed by a remote table store
pub struct Store {
    remote: Box<dyn RemoteStore>,
    /// Sorted by rank
    sections: Vec<Section>,
    /// Ranks are dense per section; vector order carries no meaning
    favorites: Vec<Favorite>,
}

impl Store {
    /// Create an empty store; call `load` to read the remote tables
    pub fn new(remote: impl RemoteStore + 'static) -> Self {
        Self {
            remote: Box::new(remote),
            sections: Vec::new(),
            favorites: Vec::new(),
        }
    }

    /// Create a store and load it from the remote tables
    pub async fn open(remote: impl RemoteStore + 'static) -> StoreResult<Self> {
        let mut store = Self::new(remote);
        store.load().await?;
        Ok(store)
    }

    /// Replace the local collections with the remote tables
    ///
    /// Ranks are densified and favorites of missing sections are dropped.
    /// On error the local collections are left untouched.
    pub async fn load(&mut self) -> StoreResult<LoadSummary> {
        let mut sections = self.remote.fetch_sections().await?;
        let favorites = self.remote.fetch_favorites(None).await?;

        densify(&mut sections);

        let known: HashSet<Uuid> = sections.iter().map(|s| s.id).collect();
        let (mut kept, orphans): (Vec<Favorite>, Vec<Favorite>) = favorites
            .into_iter()
            .partition(|f| known.contains(&f.section_id));

        for orphan in &orphans {
            warn!(
                id = %orphan.id,
                section = %orphan.section_id,
                "Dropping favorite that references a missing section"
            );
        }

        for section in &sections {
            densify_scope(&mut kept, section.id);
        }

        let summary = LoadSummary {
            sections: sections.len(),
            favorites: kept.len(),
            orphans_dropped: orphans.len(),
        };

        self.sections = sections;
        self.favorites = kept;

        info!(
            sections = summary.sections,
            favorites = summary.favorites,
            "Loaded store"
        );
        Ok(summary)
    }

    /// Re-read both tables, discarding local state
    pub async fn reload(&mut self) -> StoreResult<LoadSummary> {
        self.load().await
    }

    // ==================== Reads ====================

    /// All sections by rank
    pub fn list_sections(&self) -> &[Section] {
        &self.sections
    }

    /// Favorites of one section by rank
    pub fn favorites_of(&self, section_id: Uuid) -> Vec<Favorite> {
        let mut favorites: Vec<Favorite> = self
            .favorites
            .iter()
            .filter(|f| f.section_id == section_id)
            .cloned()
            .collect();
        favorites.sort_by_key(|f| f.rank);
        favorites
    }

    /// All favorites in display order: by section rank, then favorite rank
    pub fn all_favorites(&self) -> Vec<Favorite> {
        self.sections
            .iter()
            .flat_map(|section| self.favorites_of(section.id))
            .collect()
    }

    /// All favorites in storage order
    pub fn favorites(&self) -> &[Favorite] {
        &self.favorites
    }

    pub fn section(&self, id: Uuid) -> Option<&Section> {
        self.sections.iter().find(|s| s.id == id)
    }

    pub fn favorite(&self, id: Uuid) -> Option<&Favorite> {
        self.favorites.iter().find(|f| f.id == id)
    }

    /// Section whose title matches case-insensitively, ignoring surrounding whitespace
    pub fn find_section_by_title(&self, title: &str) -> Option<&Section> {
        let wanted = title.trim().to_lowercase();
        self.sections
            .iter()
            .find(|s| s.title.trim().to_lowercase() == wanted)
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    pub fn favorite_count(&self) -> usize {
        self.favorites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty() && self.favorites.is_empty()
    }

    // ==================== Section Operations ====================

    /// Create a section at the end of the list
    pub async fn create_section(&mut self, new: NewSection) -> StoreResult<Section> {
        let title = required_title(&new.title)?;

        let mut section = Section::new(title, self.sections.len() as u32);
        section.set_colors(new.background_color, new.text_color);

        let snapshot = self.snapshot();
        self.sections.push(section.clone());

        match self.remote.insert_section(&section).await {
            Ok(saved) => {
                self.replace_section(saved.clone());
                info!(id = %saved.id, title = %saved.title, "Created section");
                Ok(saved)
            }
            Err(e) => Err(self.rollback(snapshot, e, "create section")),
        }
    }

    /// Change title or colors of a section
    pub async fn update_section(&mut self, id: Uuid, patch: SectionPatch) -> StoreResult<Section> {
        let index = self.section_index(id)?;
        let title = patch.title.as_deref().map(required_title).transpose()?;

        let mut updated = self.sections[index].clone();
        if let Some(title) = title {
            updated.set_title(title);
        }
        if patch.background_color.is_some() || patch.text_color.is_some() {
            let background = patch
                .background_color
                .unwrap_or_else(|| updated.background_color.clone());
            let text = patch.text_color.unwrap_or_else(|| updated.text_color.clone());
            updated.set_colors(background, text);
        }

        let snapshot = self.snapshot();
        self.sections[index] = updated.clone();

        match self.remote.update_section(&updated).await {
            Ok(saved) => {
                self.replace_section(saved.clone());
                debug!(%id, "Updated section");
                Ok(saved)
            }
            Err(e) => Err(self.rollback(snapshot, e, "update section")),
        }
    }

    /// Delete a section and every favorite in it
    ///
    /// Favorites are deleted remotely one by one before the section itself,
    /// so the remote store never holds a favorite without its section. If a
    /// favorite delete fails, the section comes back locally with the
    /// favorites that still exist remotely. Returns the removed favorites.
    pub async fn delete_section(&mut self, id: Uuid) -> StoreResult<Vec<Favorite>> {
        self.section_index(id)?;

        let snapshot = self.snapshot();
        let removed = self.favorites_of(id);
        self.favorites.retain(|f| f.section_id != id);
        self.sections.retain(|s| s.id != id);
        let reranked = assign_ranks(&mut self.sections) > 0;

        let mut deleted: HashSet<Uuid> = HashSet::new();
        for favorite in &removed {
            if let Err(e) = self.remote.delete_favorite(favorite.id).await {
                warn!(
                    section = %id,
                    deleted = deleted.len(),
                    remaining = removed.len() - deleted.len(),
                    error = %e,
                    "Section delete interrupted, restoring section"
                );
                self.restore(snapshot);
                self.favorites.retain(|f| !deleted.contains(&f.id));
                densify_scope(&mut self.favorites, id);
                return Err(e.into());
            }
            deleted.insert(favorite.id);
        }

        if let Err(e) = self.remote.delete_section(id).await {
            warn!(section = %id, error = %e, "Section delete failed after its favorites were removed");
            self.restore(snapshot);
            self.favorites.retain(|f| f.section_id != id);
            return Err(e.into());
        }

        if reranked {
            let rows: Vec<SectionRank> = self.sections.iter().map(SectionRank::from).collect();
            self.persist_compacted_sections(&rows).await;
        }

        info!(%id, favorites = removed.len(), "Deleted section");
        Ok(removed)
    }

    /// Give sections the order of `sequence`
    ///
    /// Rank becomes the position in the sequence. Sections missing from the
    /// sequence keep their relative order after the listed ones. Only ids
    /// are read from the sequence; titles and colors come from the store.
    pub async fn reorder_sections(&mut self, sequence: Vec<Section>) -> StoreResult<()> {
        let tx = ReorderTransaction::from_sequence(sequence)?;

        let mut ordered: Vec<Section> = Vec::with_capacity(self.sections.len());
        for run in tx.runs() {
            for item in &run.items {
                let current = self
                    .section(item.id)
                    .ok_or(StoreError::SectionNotFound(item.id))?;
                ordered.push(current.clone());
            }
        }
        let listed: HashSet<Uuid> = ordered.iter().map(|s| s.id).collect();
        ordered.extend(
            self.sections
                .iter()
                .filter(|s| !listed.contains(&s.id))
                .cloned(),
        );

        if ordered
            .iter()
            .map(|s| s.id)
            .eq(self.sections.iter().map(|s| s.id))
        {
            return Ok(());
        }

        assign_ranks(&mut ordered);

        let snapshot = self.snapshot();
        self.sections = ordered;

        let rows: Vec<SectionRank> = self.sections.iter().map(SectionRank::from).collect();
        match self.remote.upsert_section_ranks(&rows).await {
            Ok(()) => {
                debug!(count = rows.len(), "Reordered sections");
                Ok(())
            }
            Err(e) => Err(self.rollback(snapshot, e, "reorder sections")),
        }
    }

    // ==================== Favorite Operations ====================

    /// Create a favorite at the end of its section
    ///
    /// A URL without a scheme gets `https://`; a missing icon is derived
    /// from the URL host.
    pub async fn create_favorite(&mut self, new: NewFavorite) -> StoreResult<Favorite> {
        let title = required_title(&new.title)?;
        let url = normalize_url(&new.url)?;
        self.require_section(new.section_id)?;

        let icon = new
            .icon
            .filter(|icon| !icon.trim().is_empty())
            .or_else(|| favicon_for(&url));

        let mut favorite = Favorite::new(title, url, new.section_id, self.count_in(new.section_id));
        favorite.icon = icon;

        let snapshot = self.snapshot();
        self.favorites.push(favorite.clone());

        match self.remote.insert_favorite(&favorite).await {
            Ok(saved) => {
                self.replace_favorite(saved.clone());
                info!(id = %saved.id, section = %saved.section_id, "Created favorite");
                Ok(saved)
            }
            Err(e) => Err(self.rollback(snapshot, e, "create favorite")),
        }
    }

    /// Change fields of a favorite
    ///
    /// A different `section_id` moves the favorite to the end of that
    /// section and closes the gap it leaves behind. A changed URL refreshes
    /// the icon unless the patch sets one.
    pub async fn update_favorite(&mut self, id: Uuid, patch: FavoritePatch) -> StoreResult<Favorite> {
        let index = self.favorite_index(id)?;
        let title = patch.title.as_deref().map(required_title).transpose()?;
        let url = patch.url.as_deref().map(normalize_url).transpose()?;
        if let Some(destination) = patch.section_id {
            self.require_section(destination)?;
        }

        let mut updated = self.favorites[index].clone();
        let source = updated.section_id;

        if let Some(title) = title {
            updated.set_title(title);
        }
        if let Some(url) = url {
            if url != updated.url {
                if patch.icon.is_none() {
                    updated.set_icon(favicon_for(&url));
                }
                updated.set_url(url);
            }
        }
        if let Some(icon) = patch.icon {
            updated.set_icon(icon.filter(|i| !i.trim().is_empty()));
        }

        let transfer = patch.section_id.filter(|&destination| destination != source);
        if let Some(destination) = transfer {
            updated.rank = self.count_in(destination);
            updated.section_id = destination;
            updated.updated_at = Utc::now();
        }

        let snapshot = self.snapshot();
        self.favorites[index] = updated.clone();
        let compacted = if transfer.is_some() {
            densify_scope(&mut self.favorites, source)
        } else {
            Vec::new()
        };

        let saved = match self.remote.update_favorite(&updated).await {
            Ok(saved) => saved,
            Err(e) => return Err(self.rollback(snapshot, e, "update favorite")),
        };
        self.replace_favorite(saved.clone());

        if !compacted.is_empty() {
            self.persist_compacted_favorites(&compacted).await;
        }

        debug!(%id, transferred = transfer.is_some(), "Updated favorite");
        Ok(saved)
    }

    /// Delete a favorite and close the gap in its section
    pub async fn delete_favorite(&mut self, id: Uuid) -> StoreResult<Favorite> {
        let index = self.favorite_index(id)?;

        let snapshot = self.snapshot();
        let removed = self.favorites.remove(index);
        let compacted = densify_scope(&mut self.favorites, removed.section_id);

        if let Err(e) = self.remote.delete_favorite(id).await {
            return Err(self.rollback(snapshot, e, "delete favorite"));
        }

        if !compacted.is_empty() {
            self.persist_compacted_favorites(&compacted).await;
        }

        info!(%id, "Deleted favorite");
        Ok(removed)
    }

    /// Give favorites the order of `sequence`
    ///
    /// The sequence is split into runs of consecutive favorites sharing a
    /// `section_id`, and each run is ranked from zero on its own. A favorite
    /// listed under a section other than its current one is transferred
    /// there. Favorites of a listed section that the run leaves out keep
    /// their relative order after it, and sections a favorite left are
    /// re-densified. Only `id` and `section_id` are read from the sequence.
    pub async fn reorder_favorites(&mut self, sequence: Vec<Favorite>) -> StoreResult<()> {
        let tx = ReorderTransaction::from_sequence(sequence)?;
        if tx.is_empty() {
            return Ok(());
        }

        for scope in tx.scopes() {
            self.require_section(scope)?;
        }
        for run in tx.runs() {
            for item in &run.items {
                self.favorite_index(item.id)?;
            }
        }

        let snapshot = self.snapshot();
        let scopes = tx.scopes();
        let runs = tx.into_ranked_runs();
        let now = Utc::now();

        let mut listed: HashSet<Uuid> = HashSet::new();
        let mut vacated: Vec<Uuid> = Vec::new();
        for run in &runs {
            for item in &run.items {
                listed.insert(item.id);
                if let Some(favorite) = self.favorites.iter_mut().find(|f| f.id == item.id) {
                    if favorite.section_id != run.scope {
                        vacated.push(favorite.section_id);
                        favorite.section_id = run.scope;
                        favorite.updated_at = now;
                    }
                    favorite.rank = item.rank;
                }
            }
        }

        for run in &runs {
            let mut leftovers: Vec<usize> = self
                .favorites
                .iter()
                .enumerate()
                .filter(|(_, f)| f.section_id == run.scope && !listed.contains(&f.id))
                .map(|(i, _)| i)
                .collect();
            if !leftovers.is_empty() {
                debug!(
                    section = %run.scope,
                    count = leftovers.len(),
                    "Appending favorites missing from reorder sequence"
                );
            }
            leftovers.sort_by_key(|&i| self.favorites[i].rank);
            for (offset, i) in leftovers.into_iter().enumerate() {
                self.favorites[i].rank = (run.items.len() + offset) as u32;
            }
        }

        for &scope in &vacated {
            if !scopes.contains(&scope) {
                densify_scope(&mut self.favorites, scope);
            }
        }

        let affected: HashSet<Uuid> = scopes.iter().chain(vacated.iter()).copied().collect();
        let rows: Vec<FavoriteRank> = self
            .favorites
            .iter()
            .filter(|f| affected.contains(&f.section_id))
            .map(FavoriteRank::from)
            .collect();

        match self.remote.upsert_favorite_ranks(&rows).await {
            Ok(()) => {
                debug!(count = rows.len(), sections = affected.len(), "Reordered favorites");
                Ok(())
            }
            Err(e) => Err(self.rollback(snapshot, e, "reorder favorites")),
        }
    }

    // ==================== Internals ====================

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            sections: self.sections.clone(),
            favorites: self.favorites.clone(),
        }
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.sections = snapshot.sections;
        self.favorites = snapshot.favorites;
    }

    /// Restore the snapshot and turn the remote error into a store error
    fn rollback(&mut self, snapshot: Snapshot, error: PersistenceError, action: &str) -> StoreError {
        warn!(action, error = %error, "Persistence failed, reverting local change");
        self.restore(snapshot);
        error.into()
    }

    async fn persist_compacted_sections(&self, rows: &[SectionRank]) {
        if let Err(e) = self.remote.upsert_section_ranks(rows).await {
            warn!(count = rows.len(), error = %e, "Failed to persist compacted section ranks");
        }
    }

    async fn persist_compacted_favorites(&self, rows: &[FavoriteRank]) {
        if let Err(e) = self.remote.upsert_favorite_ranks(rows).await {
            warn!(count = rows.len(), error = %e, "Failed to persist compacted favorite ranks");
        }
    }

    fn section_index(&self, id: Uuid) -> StoreResult<usize> {
        self.sections
            .iter()
            .position(|s| s.id == id)
            .ok_or(StoreError::SectionNotFound(id))
    }

    fn favorite_index(&self, id: Uuid) -> StoreResult<usize> {
        self.favorites
            .iter()
            .position(|f| f.id == id)
            .ok_or(StoreError::FavoriteNotFound(id))
    }

    fn require_section(&self, id: Uuid) -> Result<(), ValidationError> {
        if id.is_nil() {
            return Err(ValidationError::MissingSection);
        }
        if self.section(id).is_none() {
            return Err(ValidationError::UnknownSection(id));
        }
        Ok(())
    }

    fn count_in(&self, section_id: Uuid) -> u32 {
        self.favorites
            .iter()
            .filter(|f| f.section_id == section_id)
            .count() as u32
    }

    fn replace_section(&mut self, saved: Section) {
        if let Some(slot) = self.sections.iter_mut().find(|s| s.id == saved.id) {
            *slot = saved;
        }
    }

    fn replace_favorite(&mut self, saved: Favorite) {
        if let Some(slot) = self.favorites.iter_mut().find(|f| f.id == saved.id) {
            *slot = saved;
        }
    }
}

/// Trim a title and reject it if nothing is left
fn required_title(title: &str) -> Result<String, ValidationError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ValidationError::MissingTitle);
    }
    Ok(title.to_string())
}

/// Densify the favorites of one section in place; returns the rows that changed
fn densify_scope(favorites: &mut [Favorite], section_id: Uuid) -> Vec<FavoriteRank> {
    let mut members: Vec<usize> = favorites
        .iter()
        .enumerate()
        .filter(|(_, f)| f.section_id == section_id)
        .map(|(i, _)| i)
        .collect();
    members.sort_by_key(|&i| favorites[i].rank);

    let mut changed = Vec::new();
    for (position, index) in members.into_iter().enumerate() {
        let favorite = &mut favorites[index];
        if favorite.rank != position as u32 {
            favorite.rank = position as u32;
            changed.push(FavoriteRank::from(&*favorite));
        }
    }
    changed
}
