//! SQLite issue store utilities.
//!
//! Runtime defaults:
//! - `journal_mode = WAL` so readers do not block the single writer
//! - `busy_timeout = 5s` so a second relocation waits for the first instead
//!   of failing immediately
//! - `foreign_keys = ON` so `moved_to_id` can only point at a real issue

pub mod migrations;
pub mod schema;
pub mod store;

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::{path::Path, time::Duration};

/// Busy timeout used for store connections.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Directory holding the store and project config, relative to the project root.
pub const FERRY_DIR: &str = ".ferry";

/// Store file name inside [`FERRY_DIR`].
pub const STORE_FILE: &str = "ferry.db";

/// Path of the store database for a project root.
#[must_use]
pub fn store_path(project_root: &Path) -> std::path::PathBuf {
    project_root.join(FERRY_DIR).join(STORE_FILE)
}

/// Open (or create) the store database, apply runtime pragmas, and migrate
/// schema to the latest version.
///
/// # Errors
///
/// Returns an error if opening/configuring/migrating the database fails.
pub fn open_store(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create store directory {}", parent.display()))?;
    }

    let mut conn =
        Connection::open(path).with_context(|| format!("open store database {}", path.display()))?;

    configure_connection(&conn).context("configure sqlite pragmas")?;
    migrations::migrate(&mut conn).context("apply store migrations")?;

    Ok(conn)
}

/// Open an existing store, returning `None` when the file does not exist.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be opened or migrated.
pub fn try_open_store(path: &Path) -> Result<Option<Connection>> {
    if !path.exists() {
        return Ok(None);
    }
    open_store(path).map(Some)
}

/// Open a migrated in-memory store.
///
/// # Errors
///
/// Returns an error if configuring or migrating fails.
pub fn open_in_memory() -> Result<Connection> {
    let mut conn = Connection::open_in_memory().context("open in-memory store")?;
    configure_connection(&conn).context("configure sqlite pragmas")?;
    migrations::migrate(&mut conn).context("apply store migrations")?;
    Ok(conn)
}

fn configure_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    let _journal_mode: String =
        conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)?;
    Ok(())
}
