//! SQLite table store
//!
//! Implements `RemoteStore` on a local SQLite database. Every request is a
//! short synchronous statement; upserts run inside one transaction so a
//! rejected row leaves the table unchanged.

use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{PersistenceError, PersistenceResult, Table};
use crate::models::{Color, Favorite, Section};
use crate::remote::{FavoriteRank, RemoteStore, SectionRank};
use crate::storage::schema::{init_schema, needs_init};

const SECTION_COLUMNS: &str =
    "id, title, background_color, text_color, rank, created_at, updated_at";

const FAVORITE_COLUMNS: &str = "id, title, url, icon, section_id, rank, created_at, updated_at";

/// Table store backed by SQLite
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create the database in the configured data directory
    pub fn open(config: &Config) -> Result<Self> {
        let path = config.database_path();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {:?}", parent))?;
        }

        let conn = Connection::open(&path)
            .with_context(|| format!("Failed to open SQLite database at {:?}", path))?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        if needs_init(&conn) {
            init_schema(&conn).context("Failed to initialize SQLite schema")?;
        }

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> PersistenceResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| PersistenceError::Unavailable("database lock poisoned".to_string()))
    }
}

#[async_trait]
impl RemoteStore for SqliteStore {
    async fn fetch_sections(&self) -> PersistenceResult<Vec<Section>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM sections ORDER BY rank ASC",
            SECTION_COLUMNS
        ))?;
        let rows = stmt.query_map([], SectionRow::from_row)?;

        let mut sections = Vec::new();
        for row in rows {
            sections.push(row?.into_section()?);
        }
        Ok(sections)
    }

    async fn fetch_favorites(&self, section_id: Option<Uuid>) -> PersistenceResult<Vec<Favorite>> {
        let conn = self.conn()?;
        let rows: Vec<FavoriteRow> = match section_id {
            Some(id) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM favorites WHERE section_id = ? ORDER BY rank ASC",
                    FAVORITE_COLUMNS
                ))?;
                let rows = stmt.query_map(params![id.to_string()], FavoriteRow::from_row)?;
                let collected = rows.collect::<rusqlite::Result<Vec<_>>>()?;
                collected
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM favorites ORDER BY rank ASC",
                    FAVORITE_COLUMNS
                ))?;
                let rows = stmt.query_map([], FavoriteRow::from_row)?;
                let collected = rows.collect::<rusqlite::Result<Vec<_>>>()?;
                collected
            }
        };

        rows.into_iter().map(FavoriteRow::into_favorite).collect()
    }

    async fn insert_section(&self, section: &Section) -> PersistenceResult<Section> {
        let conn = self.conn()?;
        conn.execute(
            &format!(
                "INSERT INTO sections ({}) VALUES (?, ?, ?, ?, ?, ?, ?)",
                SECTION_COLUMNS
            ),
            params![
                section.id.to_string(),
                section.title,
                section.background_color.as_str(),
                section.text_color.as_str(),
                section.rank,
                section.created_at.timestamp_millis(),
                section.updated_at.timestamp_millis(),
            ],
        )?;
        debug!(id = %section.id, "inserted section");
        Ok(section.clone())
    }

    async fn update_section(&self, section: &Section) -> PersistenceResult<Section> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE sections SET title = ?, background_color = ?, text_color = ?, rank = ?, updated_at = ? WHERE id = ?",
            params![
                section.title,
                section.background_color.as_str(),
                section.text_color.as_str(),
                section.rank,
                section.updated_at.timestamp_millis(),
                section.id.to_string(),
            ],
        )?;
        if updated == 0 {
            return Err(PersistenceError::MissingRecord {
                table: Table::Sections,
                id: section.id,
            });
        }
        Ok(section.clone())
    }

    async fn delete_section(&self, id: Uuid) -> PersistenceResult<()> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM sections WHERE id = ?", params![id.to_string()])?;
        debug!(%id, "deleted section");
        Ok(())
    }

    async fn insert_favorite(&self, favorite: &Favorite) -> PersistenceResult<Favorite> {
        let conn = self.conn()?;
        conn.execute(
            &format!(
                "INSERT INTO favorites ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                FAVORITE_COLUMNS
            ),
            params![
                favorite.id.to_string(),
                favorite.title,
                favorite.url,
                favorite.icon,
                favorite.section_id.to_string(),
                favorite.rank,
                favorite.created_at.timestamp_millis(),
                favorite.updated_at.timestamp_millis(),
            ],
        )?;
        debug!(id = %favorite.id, section = %favorite.section_id, "inserted favorite");
        Ok(favorite.clone())
    }

    async fn update_favorite(&self, favorite: &Favorite) -> PersistenceResult<Favorite> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE favorites SET title = ?, url = ?, icon = ?, section_id = ?, rank = ?, updated_at = ? WHERE id = ?",
            params![
                favorite.title,
                favorite.url,
                favorite.icon,
                favorite.section_id.to_string(),
                favorite.rank,
                favorite.updated_at.timestamp_millis(),
                favorite.id.to_string(),
            ],
        )?;
        if updated == 0 {
            return Err(PersistenceError::MissingRecord {
                table: Table::Favorites,
                id: favorite.id,
            });
        }
        Ok(favorite.clone())
    }

    async fn delete_favorite(&self, id: Uuid) -> PersistenceResult<()> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM favorites WHERE id = ?", params![id.to_string()])?;
        Ok(())
    }

    async fn upsert_section_ranks(&self, ranks: &[SectionRank]) -> PersistenceResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let now = Utc::now().timestamp_millis();
        for row in ranks {
            tx.execute(
                "INSERT INTO sections (id, title, background_color, text_color, rank, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
                 ON CONFLICT(id) DO UPDATE SET
                    title = excluded.title,
                    background_color = excluded.background_color,
                    text_color = excluded.text_color,
                    rank = excluded.rank",
                params![
                    row.id.to_string(),
                    row.title,
                    row.background_color.as_str(),
                    row.text_color.as_str(),
                    row.rank,
                    now,
                ],
            )?;
        }
        tx.commit()?;
        debug!(count = ranks.len(), "upserted section ranks");
        Ok(())
    }

    async fn upsert_favorite_ranks(&self, ranks: &[FavoriteRank]) -> PersistenceResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        for row in ranks {
            let updated = tx.execute(
                "UPDATE favorites SET section_id = ?, rank = ? WHERE id = ?",
                params![row.section_id.to_string(), row.rank, row.id.to_string()],
            )?;
            if updated == 0 {
                // Dropping the transaction rolls it back
                return Err(PersistenceError::MissingRecord {
                    table: Table::Favorites,
                    id: row.id,
                });
            }
        }
        tx.commit()?;
        debug!(count = ranks.len(), "upserted favorite ranks");
        Ok(())
    }
}

impl SqliteStore {
    /// Look up one favorite directly (diagnostics and tests)
    pub fn favorite_row(&self, id: Uuid) -> PersistenceResult<Option<Favorite>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                &format!("SELECT {} FROM favorites WHERE id = ?", FAVORITE_COLUMNS),
                params![id.to_string()],
                FavoriteRow::from_row,
            )
            .optional()?;
        row.map(FavoriteRow::into_favorite).transpose()
    }
}

/// Raw section row before conversion
struct SectionRow {
    id: String,
    title: String,
    background_color: String,
    text_color: String,
    rank: i64,
    created_at: i64,
    updated_at: i64,
}

impl SectionRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            background_color: row.get(2)?,
            text_color: row.get(3)?,
            rank: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }

    fn into_section(self) -> PersistenceResult<Section> {
        let corrupt = |details: String| PersistenceError::CorruptRow {
            table: Table::Sections,
            details,
        };
        Ok(Section {
            id: parse_id(&self.id).map_err(corrupt)?,
            title: self.title,
            background_color: Color::parse(&self.background_color)
                .map_err(|e| corrupt(e.to_string()))?,
            text_color: Color::parse(&self.text_color).map_err(|e| corrupt(e.to_string()))?,
            rank: parse_rank(self.rank).map_err(corrupt)?,
            created_at: parse_timestamp(self.created_at).map_err(corrupt)?,
            updated_at: parse_timestamp(self.updated_at).map_err(corrupt)?,
        })
    }
}

/// Raw favorite row before conversion
struct FavoriteRow {
    id: String,
    title: String,
    url: String,
    icon: Option<String>,
    section_id: String,
    rank: i64,
    created_at: i64,
    updated_at: i64,
}

impl FavoriteRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            url: row.get(2)?,
            icon: row.get(3)?,
            section_id: row.get(4)?,
            rank: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }

    fn into_favorite(self) -> PersistenceResult<Favorite> {
        let corrupt = |details: String| PersistenceError::CorruptRow {
            table: Table::Favorites,
            details,
        };
        Ok(Favorite {
            id: parse_id(&self.id).map_err(corrupt)?,
            title: self.title,
            url: self.url,
            icon: self.icon,
            section_id: parse_id(&self.section_id).map_err(corrupt)?,
            rank: parse_rank(self.rank).map_err(corrupt)?,
            created_at: parse_timestamp(self.created_at).map_err(corrupt)?,
            updated_at: parse_timestamp(self.updated_at).map_err(corrupt)?,
        })
    }
}

fn parse_id(value: &str) -> Result<Uuid, String> {
    Uuid::parse_str(value).map_err(|e| format!("bad id '{}': {}", value, e))
}

fn parse_rank(value: i64) -> Result<u32, String> {
    u32::try_from(value).map_err(|_| format!("rank out of range: {}", value))
}

fn parse_timestamp(millis: i64) -> Result<DateTime<Utc>, String> {
    DateTime::from_timestamp_millis(millis).ok_or_else(|| format!("bad timestamp: {}", millis))
}
