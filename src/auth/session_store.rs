//! Session Storage
//! Mission: Remember the latest token issued to each username

use crate::db::Database;
use anyhow::{Context, Result};
use rusqlite::{params, OptionalExtension};
use tracing::debug;

/// Write-mostly bookkeeping: token validation never consults this table.
#[derive(Clone)]
pub struct SessionStore {
    db: Database,
}

impl SessionStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Insert or overwrite the session for `username`
    pub fn upsert(&self, username: &str, token: &str) -> Result<()> {
        self.db
            .conn()
            .execute(
                "INSERT OR REPLACE INTO sessions (username, token) VALUES (?1, ?2)",
                params![username, token],
            )
            .context("Failed to store session")?;

        debug!("Session stored for {}", username);
        Ok(())
    }

    /// Latest token issued to `username`
    pub fn latest_token(&self, username: &str) -> Result<Option<String>> {
        self.db
            .conn()
            .query_row(
                "SELECT token FROM sessions WHERE username = ?1",
                params![username],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to read session")
    }

    #[cfg(test)]
    pub fn count(&self) -> Result<i64> {
        self.db
            .conn()
            .query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))
            .context("Failed to count sessions")
    }
}
