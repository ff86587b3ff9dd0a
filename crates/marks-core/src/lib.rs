//! MARKS Core Library
//!
//! This crate provides the core of MARKS, a bookmarks board: favorites
//! (titled URLs) grouped into colored sections, both kept in a user-defined
//! order.
//!
//! # Architecture
//!
//! - **Store**: canonical in-memory hierarchy with dense ranks, written
//!   through to a remote table store and rolled back when a write fails
//! - **RemoteStore**: async table API; `SqliteStore` for real use,
//!   `MemoryStore` for tests
//! - **Board**: session wrapper adding drag gestures, search, collapsed
//!   sections and notifications
//!
//! # Quick Start
//!
//! ```text
//! let config = Config::load()?;
//! let mut board = Board::new(Store::new(SqliteStore::open(&config)?), &config);
//! board.load().await?;
//!
//! let work = board.create_section_titled("Work").await?;
//! board.create_favorite(NewFavorite::new("Docs", "docs.rs", work.id)).await?;
//! ```
//!
//! # Modules
//!
//! - `store`: ordered hierarchy store (main entry point)
//! - `board`: session state and notifications around the store
//! - `drag`: drag gesture state machine
//! - `search`: filtered read-only projection
//! - `notify`: transient notifications
//! - `transfer`: bulk export and import
//! - `models`: sections, favorites and their inputs
//! - `rank`: rank arithmetic and reorder transactions
//! - `links`: URL normalization, icons and title suggestions
//! - `remote`: remote table store trait and in-memory implementation
//! - `storage`: SQLite table store
//! - `config`: application configuration
//! - `error`: error types

pub mod board;
pub mod config;
pub mod drag;
pub mod error;
pub mod links;
pub mod models;
pub mod notify;
pub mod rank;
pub mod remote;
pub mod search;
pub mod storage;
pub mod store;
pub mod transfer;

pub use board::{Board, DropOutcome};
pub use config::Config;
pub use drag::{DragController, DragEntity, DragError, DragState, DropInstruction};
pub use error::{ImportRecordError, PersistenceError, StoreError, StoreResult, ValidationError};
pub use models::{
    Color, Favorite, FavoritePatch, NewFavorite, NewSection, Section, SectionPatch,
};
pub use notify::{Notification, NotificationKind, Notifier};
pub use remote::{MemoryStore, RemoteStore};
pub use search::SectionView;
pub use storage::SqliteStore;
pub use store::{LoadSummary, Store};
pub use transfer::{ImportReport, TransferRecord};
