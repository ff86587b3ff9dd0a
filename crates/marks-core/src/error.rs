//! Error handling
//!
//! Typed errors for the hierarchy store, the remote table store and bulk
//! import. Each carries a descriptive message; persistence errors also
//! provide recovery suggestions for the caller to surface.

use std::fmt;

use thiserror::Error;
use uuid::Uuid;

/// Logical table in the remote store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Sections,
    Favorites,
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Table::Sections => write!(f, "sections"),
            Table::Favorites => write!(f, "favorites"),
        }
    }
}

/// Kind of request issued to the remote store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Fetch,
    Insert,
    Update,
    Delete,
    Upsert,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Fetch => "fetch",
            Operation::Insert => "insert",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::Upsert => "upsert",
        };
        write!(f, "{}", name)
    }
}

/// A required field is missing or malformed
///
/// Raised before any mutation is attempted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Title is required")]
    MissingTitle,

    #[error("URL is required")]
    MissingUrl,

    #[error("Section is required")]
    MissingSection,

    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Invalid color '{0}': expected #rrggbb")]
    InvalidColor(String),

    #[error("Section does not exist: {0}")]
    UnknownSection(Uuid),

    /// A reorder sequence lists one section's favorites in two separate runs
    #[error("Reorder sequence splits section {0} into non-adjacent runs")]
    SplitScope(Uuid),

    #[error("Reorder sequence lists {0} more than once")]
    DuplicateEntry(Uuid),
}

/// The remote store rejected a request
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// The store refused the request
    #[error("Remote store rejected {op} on '{table}': {reason}")]
    Rejected {
        table: Table,
        op: Operation,
        reason: String,
    },

    /// The record addressed by id does not exist remotely
    #[error("Record {id} not found in '{table}'")]
    MissingRecord { table: Table, id: Uuid },

    /// Stored data could not be decoded into a record
    #[error("Corrupt row in '{table}': {details}")]
    CorruptRow { table: Table, details: String },

    /// The store cannot be reached at all
    #[error("Remote store unavailable: {0}")]
    Unavailable(String),

    /// SQLite error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl PersistenceError {
    /// Check if retrying the same request later may succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            PersistenceError::Unavailable(_) | PersistenceError::Rejected { .. }
        )
    }

    /// Get a recovery suggestion for this error
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            PersistenceError::Unavailable(_) => Some("Check the data directory and try again."),
            PersistenceError::MissingRecord { .. } => {
                Some("The record was removed elsewhere. Reload to refresh the local copy.")
            }
            PersistenceError::CorruptRow { .. } => {
                Some("The database contains unreadable rows. Export what loads and re-import into a fresh data directory.")
            }
            _ => None,
        }
    }
}

/// Errors returned by store operations
#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("Section not found: {0}")]
    SectionNotFound(Uuid),

    #[error("Favorite not found: {0}")]
    FavoriteNotFound(Uuid),
}

impl StoreError {
    /// Whether the error came from the remote store
    pub fn is_persistence(&self) -> bool {
        matches!(self, StoreError::Persistence(_))
    }

    /// What the user can do about a failed save or load
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            StoreError::Persistence(e) => e.recovery_suggestion().or_else(|| {
                e.is_recoverable()
                    .then_some("The change was not saved. Try again later.")
            }),
            _ => None,
        }
    }
}

/// A single bulk-import record could not be imported
#[derive(Error, Debug)]
pub enum ImportRecordError {
    #[error("Record {index}: missing title")]
    MissingTitle { index: usize },

    #[error("Record {index}: missing URL")]
    MissingUrl { index: usize },

    #[error("Record {index} could not be imported: {source}")]
    Store {
        index: usize,
        #[source]
        source: StoreError,
    },
}

impl ImportRecordError {
    /// Position of the offending record in the input
    pub fn index(&self) -> usize {
        match self {
            ImportRecordError::MissingTitle { index }
            | ImportRecordError::MissingUrl { index }
            | ImportRecordError::Store { index, .. } => *index,
        }
    }
}

/// Result type for remote store requests
pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
