//! Drag gesture state machine
//!
//! A gesture starts on a section or favorite, follows the pointer over
//! registered drop zones and ends with at most one reorder instruction.
//! Nothing here touches the store; the caller applies the instruction.
//!
//! ```text
//! Idle --start--> Dragging --hover--> Dragging --end/cancel--> Idle
//! ```

use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::models::{Favorite, Section};
use crate::rank::array_move;
use crate::store::Store;

/// Something that can be dragged or dropped on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DragEntity {
    Section(Uuid),
    Favorite(Uuid),
}

impl DragEntity {
    pub fn id(&self) -> Uuid {
        match self {
            DragEntity::Section(id) | DragEntity::Favorite(id) => *id,
        }
    }

    fn same_kind(&self, other: &DragEntity) -> bool {
        matches!(
            (self, other),
            (DragEntity::Section(_), DragEntity::Section(_))
                | (DragEntity::Favorite(_), DragEntity::Favorite(_))
        )
    }
}

/// Current gesture
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DragState {
    #[default]
    Idle,
    DraggingSection(Uuid),
    DraggingFavorite(Uuid),
}

impl DragState {
    pub fn is_dragging(&self) -> bool {
        !matches!(self, DragState::Idle)
    }

    fn active(&self) -> Option<DragEntity> {
        match *self {
            DragState::Idle => None,
            DragState::DraggingSection(id) => Some(DragEntity::Section(id)),
            DragState::DraggingFavorite(id) => Some(DragEntity::Favorite(id)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn distance_squared(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }
}

/// Axis-aligned box, origin at the top-left corner
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// Area where an entity can be dropped
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DropZone {
    pub entity: DragEntity,
    pub rect: Rect,
}

/// Reorder produced by a completed gesture
#[derive(Debug, Clone, PartialEq)]
pub enum DropInstruction {
    /// Full section list in its new order
    ReorderSections(Vec<Section>),
    /// One section's favorites in their new order
    ReorderFavorites(Vec<Favorite>),
    /// Source section followed by destination section, the moved favorite
    /// already tagged with the destination
    TransferFavorite(Vec<Favorite>),
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum DragError {
    #[error("A drag gesture is already in progress")]
    AlreadyDragging,

    #[error("Dragging is disabled while searching")]
    Disabled,
}

/// Tracks one gesture at a time
#[derive(Debug, Clone)]
pub struct DragController {
    state: DragState,
    drop_target: Option<DragEntity>,
    zones: Vec<DropZone>,
    enabled: bool,
}

impl Default for DragController {
    fn default() -> Self {
        Self::new()
    }
}

impl DragController {
    pub fn new() -> Self {
        Self {
            state: DragState::Idle,
            drop_target: None,
            zones: Vec::new(),
            enabled: true,
        }
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    /// Entity currently under the pointer, if any
    pub fn drop_target(&self) -> Option<DragEntity> {
        self.drop_target
    }

    /// Replace the registered drop zones
    pub fn set_drop_zones(&mut self, zones: Vec<DropZone>) {
        self.zones = zones;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Disabling also discards a gesture in progress
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.cancel();
        }
    }

    pub fn start(&mut self, entity: DragEntity) -> Result<(), DragError> {
        if !self.enabled {
            return Err(DragError::Disabled);
        }
        if self.state.is_dragging() {
            return Err(DragError::AlreadyDragging);
        }

        self.state = match entity {
            DragEntity::Section(id) => DragState::DraggingSection(id),
            DragEntity::Favorite(id) => DragState::DraggingFavorite(id),
        };
        self.drop_target = None;
        debug!(?entity, "Drag started");
        Ok(())
    }

    /// Track the pointer; the drop target becomes the closest zone center
    /// of the dragged entity's kind
    pub fn hover(&mut self, pointer: Point) -> Option<DragEntity> {
        let active = self.state.active()?;

        self.drop_target = self
            .zones
            .iter()
            .filter(|zone| zone.entity.same_kind(&active))
            .map(|zone| (zone.entity, zone.rect.center().distance_squared(&pointer)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(entity, _)| entity);
        self.drop_target
    }

    /// Set the drop target directly, for callers that do their own hit testing
    pub fn set_drop_target(&mut self, target: Option<DragEntity>) {
        if self.state.is_dragging() {
            self.drop_target = target;
        }
    }

    /// Discard the gesture
    pub fn cancel(&mut self) {
        if self.state.is_dragging() {
            debug!("Drag cancelled");
        }
        self.state = DragState::Idle;
        self.drop_target = None;
    }

    /// Finish the gesture and work out the reorder it asks for
    ///
    /// Always returns to `Idle`. `None` means nothing should change.
    pub fn end(&mut self, store: &Store) -> Option<DropInstruction> {
        let active = self.state.active();
        let target = self.drop_target;
        self.cancel();

        match (active?, target?) {
            (DragEntity::Section(id), DragEntity::Section(over)) => {
                resolve_section_drop(store.list_sections(), id, over)
                    .map(DropInstruction::ReorderSections)
            }
            (DragEntity::Favorite(id), DragEntity::Favorite(over)) => {
                resolve_favorite_drop(store, id, over)
            }
            _ => None,
        }
    }
}

/// Move section `id` to the position of section `over`
pub fn resolve_section_drop(sections: &[Section], id: Uuid, over: Uuid) -> Option<Vec<Section>> {
    if id == over {
        return None;
    }
    let from = sections.iter().position(|s| s.id == id)?;
    let to = sections.iter().position(|s| s.id == over)?;
    Some(array_move(sections.to_vec(), from, to))
}

/// Move favorite `id` to the position of favorite `over`
///
/// Within one section this is a plain move. Across sections the favorite
/// leaves its source list and is inserted into the destination at the
/// target's position.
pub fn resolve_favorite_drop(store: &Store, id: Uuid, over: Uuid) -> Option<DropInstruction> {
    if id == over {
        return None;
    }
    let dragged = store.favorite(id)?;
    let target = store.favorite(over)?;

    if dragged.section_id == target.section_id {
        let siblings = store.favorites_of(dragged.section_id);
        let from = siblings.iter().position(|f| f.id == id)?;
        let to = siblings.iter().position(|f| f.id == over)?;
        return Some(DropInstruction::ReorderFavorites(array_move(siblings, from, to)));
    }

    let mut source = store.favorites_of(dragged.section_id);
    source.retain(|f| f.id != id);

    let mut destination = store.favorites_of(target.section_id);
    let position = destination
        .iter()
        .position(|f| f.id == over)
        .unwrap_or(0);

    let mut moved = dragged.clone();
    moved.section_id = target.section_id;
    destination.insert(position, moved);

    source.extend(destination);
    Some(DropInstruction::TransferFavorite(source))
}
