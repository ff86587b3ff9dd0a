//! Board session
//!
//! `Board` is what a front end talks to. It owns the store together with the
//! session-only state around it (drag gesture, notifications, search query,
//! collapsed sections) and turns every store outcome into a notification.
//! Errors are still returned so callers can react to them.

use std::collections::HashSet;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::drag::{DragController, DragEntity, DragError, DragState, DropInstruction, DropZone, Point};
use crate::error::{StoreError, StoreResult};
use crate::models::{
    Color, Favorite, FavoritePatch, NewFavorite, NewSection, Section, SectionPatch,
};
use crate::notify::{Notification, Notifier};
use crate::search::{self, SectionView};
use crate::store::{LoadSummary, Store};
use crate::transfer::{self, ImportReport, TransferRecord};

/// Result of finishing a drag gesture
#[derive(Debug)]
pub enum DropOutcome {
    /// No target, dropped on itself, or ids did not resolve
    NoChange,
    Applied,
    /// The store rejected the reorder and rolled it back
    Failed(StoreError),
}

impl DropOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, DropOutcome::Applied)
    }
}

pub struct Board {
    store: Store,
    drag: DragController,
    notifier: Notifier,
    collapsed: HashSet<Uuid>,
    query: String,
    background: Color,
    text: Color,
}

impl Board {
    /// Session with notification and color settings from `config`
    pub fn new(store: Store, config: &Config) -> Self {
        Self {
            store,
            drag: DragController::new(),
            notifier: Notifier::from_config(config),
            collapsed: HashSet::new(),
            query: String::new(),
            background: config.default_background.clone(),
            text: config.default_text.clone(),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    // ==================== Loading ====================

    /// Load the store from the remote tables
    ///
    /// "Data loaded" is only announced when the board had nothing yet.
    pub async fn load(&mut self) -> StoreResult<LoadSummary> {
        let first_load = self.store.is_empty();
        let result = self.store.load().await;
        match &result {
            Ok(summary) => {
                self.prune_collapsed();
                if summary.orphans_dropped > 0 {
                    self.notifier.warning(format!(
                        "Skipped {} favorites without a section",
                        summary.orphans_dropped
                    ));
                }
                if first_load {
                    self.notifier.success("Data loaded");
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to load data");
                self.notifier.error("Failed to load data");
            }
        }
        result
    }

    // ==================== Sections ====================

    pub async fn create_section(&mut self, new: NewSection) -> StoreResult<Section> {
        let result = self.store.create_section(new).await;
        self.report(result, "Section added", "Failed to add section")
    }

    /// Section input carrying the board's default colors
    pub fn new_section(&self, title: impl Into<String>) -> NewSection {
        NewSection::new(title).with_colors(self.background.clone(), self.text.clone())
    }

    /// Create a section with the board's default colors
    pub async fn create_section_titled(&mut self, title: &str) -> StoreResult<Section> {
        let new = self.new_section(title);
        self.create_section(new).await
    }

    pub async fn update_section(&mut self, id: Uuid, patch: SectionPatch) -> StoreResult<Section> {
        let result = self.store.update_section(id, patch).await;
        self.report(result, "Section updated", "Failed to update section")
    }

    pub async fn delete_section(&mut self, id: Uuid) -> StoreResult<Vec<Favorite>> {
        let result = self.store.delete_section(id).await;
        if result.is_ok() {
            self.collapsed.remove(&id);
        }
        self.report(result, "Section deleted", "Failed to delete section")
    }

    pub async fn reorder_sections(&mut self, sequence: Vec<Section>) -> StoreResult<()> {
        let result = self.store.reorder_sections(sequence).await;
        self.report_reorder(result, "Failed to reorder sections")
    }

    // ==================== Favorites ====================

    pub async fn create_favorite(&mut self, new: NewFavorite) -> StoreResult<Favorite> {
        let result = self.store.create_favorite(new).await;
        self.report(result, "Favorite added", "Failed to add favorite")
    }

    pub async fn update_favorite(&mut self, id: Uuid, patch: FavoritePatch) -> StoreResult<Favorite> {
        let result = self.store.update_favorite(id, patch).await;
        self.report(result, "Favorite updated", "Failed to update favorite")
    }

    pub async fn delete_favorite(&mut self, id: Uuid) -> StoreResult<Favorite> {
        let result = self.store.delete_favorite(id).await;
        self.report(result, "Favorite deleted", "Failed to delete favorite")
    }

    pub async fn reorder_favorites(&mut self, sequence: Vec<Favorite>) -> StoreResult<()> {
        let result = self.store.reorder_favorites(sequence).await;
        self.report_reorder(result, "Failed to reorder favorites")
    }

    /// Apply the two corrected sequences of a cross-section move
    async fn transfer_favorite(&mut self, sequence: Vec<Favorite>) -> StoreResult<()> {
        let result = self.store.reorder_favorites(sequence).await;
        self.report_reorder(result, "Failed to move favorite to another section")
    }

    // ==================== Drag ====================

    pub fn drag_state(&self) -> DragState {
        self.drag.state()
    }

    pub fn drop_target(&self) -> Option<DragEntity> {
        self.drag.drop_target()
    }

    pub fn set_drop_zones(&mut self, zones: Vec<DropZone>) {
        self.drag.set_drop_zones(zones);
    }

    pub fn start_drag(&mut self, entity: DragEntity) -> Result<(), DragError> {
        self.drag.start(entity)
    }

    pub fn hover(&mut self, pointer: Point) -> Option<DragEntity> {
        self.drag.hover(pointer)
    }

    pub fn set_drop_target(&mut self, target: Option<DragEntity>) {
        self.drag.set_drop_target(target);
    }

    pub fn cancel_drag(&mut self) {
        self.drag.cancel();
    }

    /// Finish the gesture and apply the reorder it produced
    pub async fn end_drag(&mut self) -> DropOutcome {
        let Some(instruction) = self.drag.end(&self.store) else {
            return DropOutcome::NoChange;
        };

        let result = match instruction {
            DropInstruction::ReorderSections(sequence) => self.reorder_sections(sequence).await,
            DropInstruction::ReorderFavorites(sequence) => self.reorder_favorites(sequence).await,
            DropInstruction::TransferFavorite(sequence) => self.transfer_favorite(sequence).await,
        };

        match result {
            Ok(()) => DropOutcome::Applied,
            Err(e) => DropOutcome::Failed(e),
        }
    }

    // ==================== Search ====================

    /// Set the search query; dragging is disabled while it is not empty
    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
        self.drag.set_enabled(!self.is_searching());
        debug!(query = %self.query, "Search query changed");
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn is_searching(&self) -> bool {
        !self.query.is_empty()
    }

    /// Sections and favorites to display for the current query
    pub fn view(&self) -> Vec<SectionView> {
        search::project(self.store.list_sections(), self.store.favorites(), &self.query)
    }

    // ==================== Collapsed sections ====================

    /// Flip a section between collapsed and expanded; returns the new state
    pub fn toggle_collapsed(&mut self, section_id: Uuid) -> bool {
        if self.collapsed.remove(&section_id) {
            false
        } else {
            self.collapsed.insert(section_id)
        }
    }

    pub fn is_collapsed(&self, section_id: Uuid) -> bool {
        self.collapsed.contains(&section_id)
    }

    fn prune_collapsed(&mut self) {
        let store = &self.store;
        self.collapsed.retain(|id| store.section(*id).is_some());
    }

    // ==================== Transfer ====================

    pub fn export(&mut self) -> Vec<TransferRecord> {
        let records = transfer::export(&self.store);
        self.notifier.success("Data exported");
        records
    }

    /// Import records, then reload from the remote tables
    pub async fn import(&mut self, records: &[TransferRecord]) -> StoreResult<ImportReport> {
        let report = transfer::import(&mut self.store, records, &self.background, &self.text).await;

        if let Err(e) = self.store.reload().await {
            warn!(error = %e, "Reload after import failed");
            self.notifier.error("Failed to import data");
            return Err(e);
        }
        self.prune_collapsed();

        if report.skipped + report.failed > 0 {
            self.notifier.warning(format!(
                "Skipped {} of {} records",
                report.skipped + report.failed,
                report.total()
            ));
        }
        self.notifier.success("Data imported");
        Ok(report)
    }

    // ==================== Notifications ====================

    /// Notifications still on screen
    pub fn notifications(&mut self) -> Vec<Notification> {
        self.notifier.visible()
    }

    /// Take every pending notification
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        self.notifier.drain()
    }

    pub fn dismiss(&mut self, id: u64) -> bool {
        self.notifier.dismiss(id)
    }

    /// Reorders are silent on success
    fn report_reorder(&mut self, result: StoreResult<()>, failure: &str) -> StoreResult<()> {
        if let Err(e) = &result {
            warn!(error = %e, "{}", failure);
            self.notifier.error(failure);
        }
        result
    }

    /// Post a success or failure notification for a store result
    fn report<T>(&mut self, result: StoreResult<T>, success: &str, failure: &str) -> StoreResult<T> {
        match &result {
            Ok(_) => {
                self.notifier.success(success);
            }
            Err(StoreError::Validation(e)) => {
                self.notifier.warning(e.to_string());
            }
            Err(e) => {
                debug!(error = %e, "{}", failure);
                self.notifier.error(failure);
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::NotificationKind;
    use crate::remote::MemoryStore;

    async fn board() -> (Board, MemoryStore) {
        let remote = MemoryStore::new();
        let mut board = Board::new(Store::new(remote.clone()), &Config::default());
        board.load().await.unwrap();
        board.take_notifications();
        (board, remote)
    }

    fn messages(board: &mut Board) -> Vec<String> {
        board
            .take_notifications()
            .into_iter()
            .map(|n| n.message)
            .collect()
    }

    #[tokio::test]
    async fn test_data_loaded_only_on_first_load() {
        let remote = MemoryStore::new();
        let mut board = Board::new(Store::new(remote), &Config::default());

        board.load().await.unwrap();
        assert_eq!(messages(&mut board), vec!["Data loaded"]);

        board.create_section_titled("Work").await.unwrap();
        board.take_notifications();

        board.load().await.unwrap();
        assert!(messages(&mut board).is_empty());
    }

    #[tokio::test]
    async fn test_failed_load_notifies_error() {
        let remote = MemoryStore::new();
        remote.set_offline(true);
        let mut board = Board::new(Store::new(remote), &Config::default());

        assert!(board.load().await.is_err());
        let notifications = board.take_notifications();
        assert_eq!(notifications[0].kind, NotificationKind::Error);
        assert_eq!(notifications[0].message, "Failed to load data");
    }

    #[tokio::test]
    async fn test_crud_posts_success_notifications() {
        let (mut board, _remote) = board().await;

        let section = board.create_section_titled("Dev").await.unwrap();
        assert_eq!(messages(&mut board), vec!["Section added"]);

        let favorite = board
            .create_favorite(NewFavorite::new("Docs", "docs.rs", section.id))
            .await
            .unwrap();
        assert_eq!(messages(&mut board), vec!["Favorite added"]);

        let patch = FavoritePatch {
            title: Some("Docs.rs".to_string()),
            ..Default::default()
        };
        board.update_favorite(favorite.id, patch).await.unwrap();
        assert_eq!(messages(&mut board), vec!["Favorite updated"]);

        board.delete_favorite(favorite.id).await.unwrap();
        assert_eq!(messages(&mut board), vec!["Favorite deleted"]);

        board.delete_section(section.id).await.unwrap();
        assert_eq!(messages(&mut board), vec!["Section deleted"]);
    }

    #[tokio::test]
    async fn test_visible_notifications_are_capped() {
        let (mut board, _remote) = board().await;
        let section = board.create_section_titled("Dev").await.unwrap();
        let favorite = board
            .create_favorite(NewFavorite::new("Docs", "docs.rs", section.id))
            .await
            .unwrap();
        board.delete_favorite(favorite.id).await.unwrap();
        board.delete_section(section.id).await.unwrap();

        let visible: Vec<String> = board.notifications().into_iter().map(|n| n.message).collect();
        assert_eq!(visible, vec!["Favorite added", "Favorite deleted", "Section deleted"]);
    }

    #[tokio::test]
    async fn test_validation_failure_warns_with_reason() {
        let (mut board, _remote) = board().await;

        assert!(board.create_section_titled(" ").await.is_err());
        let notifications = board.take_notifications();
        assert_eq!(notifications[0].kind, NotificationKind::Warning);
        assert_eq!(notifications[0].message, "Title is required");
    }

    #[tokio::test]
    async fn test_persistence_failure_notifies_and_rolls_back() {
        let (mut board, remote) = board().await;
        let section = board.create_section_titled("Dev").await.unwrap();
        board.take_notifications();

        remote.set_offline(true);
        let patch = SectionPatch {
            title: Some("Renamed".to_string()),
            ..Default::default()
        };
        assert!(board.update_section(section.id, patch).await.is_err());

        assert_eq!(board.store().section(section.id).unwrap().title, "Dev");
        assert_eq!(messages(&mut board), vec!["Failed to update section"]);
    }

    #[tokio::test]
    async fn test_drag_transfer_between_sections() {
        let (mut board, _remote) = board().await;
        let s1 = board.create_section_titled("S1").await.unwrap();
        let s2 = board.create_section_titled("S2").await.unwrap();
        let f1 = board
            .create_favorite(NewFavorite::new("F1", "https://one.example", s1.id))
            .await
            .unwrap();
        board
            .create_favorite(NewFavorite::new("F2", "https://two.example", s1.id))
            .await
            .unwrap();
        let f3 = board
            .create_favorite(NewFavorite::new("F3", "https://three.example", s2.id))
            .await
            .unwrap();

        board.start_drag(DragEntity::Favorite(f1.id)).unwrap();
        board.set_drop_target(Some(DragEntity::Favorite(f3.id)));
        assert!(board.end_drag().await.is_applied());

        let in_s2: Vec<String> = board
            .store()
            .favorites_of(s2.id)
            .into_iter()
            .map(|f| f.title)
            .collect();
        assert_eq!(in_s2, vec!["F1", "F3"]);
        assert_eq!(board.drag_state(), DragState::Idle);
    }

    #[tokio::test]
    async fn test_failed_drag_notifies() {
        let (mut board, remote) = board().await;
        let s1 = board.create_section_titled("S1").await.unwrap();
        let s2 = board.create_section_titled("S2").await.unwrap();
        let f1 = board
            .create_favorite(NewFavorite::new("F1", "https://one.example", s1.id))
            .await
            .unwrap();
        let f2 = board
            .create_favorite(NewFavorite::new("F2", "https://two.example", s2.id))
            .await
            .unwrap();
        board.take_notifications();

        remote.set_offline(true);
        board.start_drag(DragEntity::Favorite(f1.id)).unwrap();
        board.set_drop_target(Some(DragEntity::Favorite(f2.id)));
        assert!(matches!(board.end_drag().await, DropOutcome::Failed(_)));

        assert_eq!(
            messages(&mut board),
            vec!["Failed to move favorite to another section"]
        );
        assert_eq!(board.store().favorite(f1.id).unwrap().section_id, s1.id);
    }

    #[tokio::test]
    async fn test_drag_without_target_is_no_change() {
        let (mut board, _remote) = board().await;
        let s1 = board.create_section_titled("S1").await.unwrap();
        let s2 = board.create_section_titled("S2").await.unwrap();
        for (title, url, section) in [
            ("F1", "https://one.example", s1.id),
            ("F2", "https://two.example", s1.id),
            ("F3", "https://three.example", s2.id),
        ] {
            board
                .create_favorite(NewFavorite::new(title, url, section))
                .await
                .unwrap();
        }
        board.take_notifications();

        let sections_before = board.store().list_sections().to_vec();
        let favorites_before = board.store().all_favorites();
        let f1 = board.store().favorites_of(s1.id)[0].id;

        board.start_drag(DragEntity::Section(s1.id)).unwrap();
        assert!(matches!(board.end_drag().await, DropOutcome::NoChange));
        board.start_drag(DragEntity::Favorite(f1)).unwrap();
        assert!(matches!(board.end_drag().await, DropOutcome::NoChange));

        assert_eq!(board.store().list_sections(), sections_before.as_slice());
        assert_eq!(board.store().all_favorites(), favorites_before);
        assert_eq!(board.drag_state(), DragState::Idle);
        assert!(board.take_notifications().is_empty());
    }

    #[tokio::test]
    async fn test_reorder_notifies_only_on_failure() {
        let (mut board, remote) = board().await;
        let a = board.create_section_titled("A").await.unwrap();
        let b = board.create_section_titled("B").await.unwrap();
        let x = board
            .create_favorite(NewFavorite::new("X", "https://x.example", a.id))
            .await
            .unwrap();
        let y = board
            .create_favorite(NewFavorite::new("Y", "https://y.example", a.id))
            .await
            .unwrap();
        board.take_notifications();

        let reversed: Vec<Section> = board.store().list_sections().iter().rev().cloned().collect();
        board.reorder_sections(reversed).await.unwrap();
        assert_eq!(board.store().list_sections()[0].id, b.id);
        assert!(board.take_notifications().is_empty());

        remote.set_offline(true);
        let sequence = vec![
            board.store().favorite(y.id).unwrap().clone(),
            board.store().favorite(x.id).unwrap().clone(),
        ];
        assert!(board.reorder_favorites(sequence).await.is_err());
        assert_eq!(messages(&mut board), vec!["Failed to reorder favorites"]);
        assert_eq!(board.store().favorites_of(a.id)[0].id, x.id);
    }

    #[tokio::test]
    async fn test_search_disables_drag() {
        let (mut board, _remote) = board().await;
        let section = board.create_section_titled("Dev").await.unwrap();
        board
            .create_favorite(NewFavorite::new("GitHub", "github.com", section.id))
            .await
            .unwrap();
        board
            .create_favorite(NewFavorite::new("Crates", "crates.io", section.id))
            .await
            .unwrap();

        board.set_query("GIT");
        assert!(board.is_searching());
        assert_eq!(
            board.start_drag(DragEntity::Section(section.id)),
            Err(DragError::Disabled)
        );

        let view = board.view();
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].favorites.len(), 1);

        // Whitespace is a query too
        board.set_query(" ");
        assert!(board.is_searching());
        assert!(board.view().is_empty());

        board.set_query("");
        assert!(board.start_drag(DragEntity::Section(section.id)).is_ok());
        assert_eq!(board.view()[0].favorites.len(), 2);
    }

    #[tokio::test]
    async fn test_toggle_collapsed() {
        let (mut board, _remote) = board().await;
        let section = board.create_section_titled("S").await.unwrap();

        assert!(!board.is_collapsed(section.id));
        assert!(board.toggle_collapsed(section.id));
        assert!(board.is_collapsed(section.id));
        assert!(!board.toggle_collapsed(section.id));

        board.toggle_collapsed(section.id);
        board.delete_section(section.id).await.unwrap();
        assert!(!board.is_collapsed(section.id));
    }

    #[tokio::test]
    async fn test_import_reloads_and_reports() {
        let (mut board, _remote) = board().await;

        let records = vec![
            TransferRecord::new("Dev", "GitHub", "github.com"),
            TransferRecord::new("Dev", "", "https://missing-title.example"),
        ];
        let report = board.import(&records).await.unwrap();

        assert_eq!(report.imported, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(board.store().favorite_count(), 1);

        let notifications = messages(&mut board);
        assert!(notifications.contains(&"Data imported".to_string()));
        assert!(notifications.contains(&"Skipped 1 of 2 records".to_string()));

        let exported = board.export();
        assert_eq!(exported, vec![TransferRecord::new("Dev", "GitHub", "https://github.com")]);
    }
}
