//! Storage layer
//!
//! SQLite implementation of the remote table store.
//!
//! ## Tables
//!
//! - `sections` - Section records, ordered by `rank`
//! - `favorites` - Favorite records, ordered by `rank` within `section_id`

pub mod schema;
pub mod sqlite;

pub use schema::{init_schema, needs_init, SCHEMA_VERSION};
pub use sqlite::SqliteStore;
