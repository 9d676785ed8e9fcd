//! Local persistence for the trust ledger.
//!
//! Everything lives in a single `SQLite` database:
//!
//! ```text
//! workspaces, projects, workspace_members, profiles   # scoping and access
//! tasks, documents                                    # raw activity (read-only to the ledger)
//! ledger_entries                                      # synthesized and manual entries
//! ```
//!
//! Ledger entries derived from a task or document carry their source in
//! `(source_type, source_id)`. A unique index over the scope and source makes
//! a second synthesis of the same records a no-op.

mod activity;
mod ledger;
mod workspace;

use std::{fs, io, path::PathBuf, time::Duration};

use rusqlite::Connection;
use uuid::Uuid;

pub use ledger::SynthesisWrite;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("project not found: {0}")]
    ProjectNotFound(Uuid),

    #[error("corrupt storage: {0}")]
    Corrupt(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = core::result::Result<T, StorageError>;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS workspaces (
    id           TEXT PRIMARY KEY,
    name         TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS projects (
    id           TEXT PRIMARY KEY,
    workspace_id TEXT NOT NULL,
    name         TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS workspace_members (
    workspace_id TEXT NOT NULL,
    user_id      TEXT NOT NULL,
    status       TEXT NOT NULL,
    PRIMARY KEY (workspace_id, user_id)
);
CREATE TABLE IF NOT EXISTS profiles (
    user_id      TEXT PRIMARY KEY,
    display_name TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS tasks (
    id           TEXT PRIMARY KEY,
    title        TEXT NOT NULL,
    status       TEXT NOT NULL,
    priority     TEXT,
    workspace_id TEXT NOT NULL,
    project_id   TEXT,
    assigned_to  TEXT,
    created_by   TEXT,
    created_at   TEXT NOT NULL,
    updated_at   TEXT
);
CREATE TABLE IF NOT EXISTS documents (
    id           TEXT PRIMARY KEY,
    title        TEXT NOT NULL,
    doc_type     TEXT,
    status       TEXT,
    workspace_id TEXT NOT NULL,
    project_id   TEXT,
    uploaded_by  TEXT,
    created_at   TEXT NOT NULL,
    updated_at   TEXT
);
CREATE TABLE IF NOT EXISTS ledger_entries (
    id           TEXT PRIMARY KEY,
    workspace_id TEXT NOT NULL,
    project_id   TEXT,
    user_id      TEXT NOT NULL,
    action       TEXT NOT NULL,
    description  TEXT NOT NULL,
    trust_points INTEGER NOT NULL,
    action_date  TEXT,
    metadata     TEXT NOT NULL,
    source_type  TEXT,
    source_id    TEXT,
    created_at   TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS ledger_entries_scope
    ON ledger_entries (workspace_id, project_id);
CREATE UNIQUE INDEX IF NOT EXISTS ledger_entries_source
    ON ledger_entries (workspace_id, COALESCE(project_id, ''), source_type, source_id)
    WHERE source_id IS NOT NULL;
";

/// `SQLite`-backed datastore for activity records and ledger entries.
pub struct Storage {
    conn: Connection,
}

impl Storage {
    /// Opens (or creates) the database at `path` and applies the schema.
    ///
    /// The parent directory is created if it doesn't exist.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&path)?;
        // Concurrent synthesizers wait on each other's write lock instead of failing.
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Returns the default database path: `~/.trustledger/ledger.sqlite`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".trustledger").join("ledger.sqlite"))
    }
}

// ── Column helpers ──

fn parse_uuid(value: &str, column: &str) -> Result<Uuid> {
    value
        .parse::<Uuid>()
        .map_err(|e| StorageError::Corrupt(format!("invalid {column}: {e}")))
}

fn parse_opt_uuid(value: Option<String>, column: &str) -> Result<Option<Uuid>> {
    value.as_deref().map(|v| parse_uuid(v, column)).transpose()
}

fn parse_timestamp(value: &str, column: &str) -> Result<jiff::Timestamp> {
    value
        .parse::<jiff::Timestamp>()
        .map_err(|e| StorageError::Corrupt(format!("invalid {column}: {e}")))
}

fn parse_opt_timestamp(value: Option<String>, column: &str) -> Result<Option<jiff::Timestamp>> {
    value.as_deref().map(|v| parse_timestamp(v, column)).transpose()
}
