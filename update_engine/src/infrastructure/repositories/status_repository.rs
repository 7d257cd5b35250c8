// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Status Repository
//!
//! The one persisted fact the core needs across restarts:
//! `last_checked_unix_s`, the last successfully activated slot, and the
//! last error kind, if any. A single row in a single `sqlx`-backed SQLite
//! table -- no migration framework, no repository trait hierarchy beyond
//! what one row needs, mirroring a conventional `infrastructure/repositories`
//! module scaled down to this core's actual persistence surface.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;

use update_engine_domain::UpdateError;

/// The persisted snapshot `GetStatus` falls back to immediately after
/// process start, before a fresh check has run.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedStatus {
    pub last_checked_unix_s: i64,
    pub last_successful_slot: Option<String>,
    pub last_error_kind: Option<String>,
}

impl Default for PersistedStatus {
    fn default() -> Self {
        Self {
            last_checked_unix_s: 0,
            last_successful_slot: None,
            last_error_kind: None,
        }
    }
}

pub struct StatusRepository {
    pool: SqlitePool,
}

impl StatusRepository {
    pub async fn connect(db_path: &str) -> Result<Self, UpdateError> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite://{db_path}"))
            .map_err(|e| UpdateError::PersistenceError(format!("parsing {db_path}: {e}")))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| UpdateError::PersistenceError(format!("connecting to {db_path}: {e}")))?;

        let repository = Self { pool };
        repository.ensure_schema().await?;
        Ok(repository)
    }

    async fn ensure_schema(&self) -> Result<(), UpdateError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS status (
                id INTEGER PRIMARY KEY CHECK (id = 0),
                last_checked_unix_s INTEGER NOT NULL,
                last_successful_slot TEXT,
                last_error_kind TEXT
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| UpdateError::PersistenceError(format!("creating status table: {e}")))?;
        Ok(())
    }

    /// Read the single status row, or the zero value if none has ever
    /// been written.
    pub async fn load(&self) -> Result<PersistedStatus, UpdateError> {
        let row = sqlx::query("SELECT last_checked_unix_s, last_successful_slot, last_error_kind FROM status WHERE id = 0")
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| UpdateError::PersistenceError(format!("loading status: {e}")))?;

        match row {
            Some(row) => Ok(PersistedStatus {
                last_checked_unix_s: row.get("last_checked_unix_s"),
                last_successful_slot: row.get("last_successful_slot"),
                last_error_kind: row.get("last_error_kind"),
            }),
            None => Ok(PersistedStatus::default()),
        }
    }

    /// Upsert the single status row.
    pub async fn save(&self, status: &PersistedStatus) -> Result<(), UpdateError> {
        sqlx::query(
            "INSERT INTO status (id, last_checked_unix_s, last_successful_slot, last_error_kind)
             VALUES (0, ?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET
                last_checked_unix_s = excluded.last_checked_unix_s,
                last_successful_slot = excluded.last_successful_slot,
                last_error_kind = excluded.last_error_kind",
        )
        .bind(status.last_checked_unix_s)
        .bind(&status.last_successful_slot)
        .bind(&status.last_error_kind)
        .execute(&self.pool)
        .await
        .map_err(|e| UpdateError::PersistenceError(format!("saving status: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn repo_in_temp_dir() -> (StatusRepository, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("status.db");
        let repo = StatusRepository::connect(db_path.to_str().unwrap()).await.unwrap();
        (repo, dir)
    }

    #[tokio::test]
    async fn load_before_any_save_returns_the_zero_value() {
        let (repo, _dir) = repo_in_temp_dir().await;
        let status = repo.load().await.unwrap();
        assert_eq!(status, PersistedStatus::default());
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let (repo, _dir) = repo_in_temp_dir().await;
        let status = PersistedStatus {
            last_checked_unix_s: 1_700_000_000,
            last_successful_slot: Some("B".to_string()),
            last_error_kind: None,
        };
        repo.save(&status).await.unwrap();

        assert_eq!(repo.load().await.unwrap(), status);
    }

    #[tokio::test]
    async fn save_twice_overwrites_the_single_row() {
        let (repo, _dir) = repo_in_temp_dir().await;
        repo.save(&PersistedStatus {
            last_checked_unix_s: 1,
            last_successful_slot: Some("A".to_string()),
            last_error_kind: None,
        })
        .await
        .unwrap();
        repo.save(&PersistedStatus {
            last_checked_unix_s: 2,
            last_successful_slot: Some("B".to_string()),
            last_error_kind: Some("transport".to_string()),
        })
        .await
        .unwrap();

        let status = repo.load().await.unwrap();
        assert_eq!(status.last_checked_unix_s, 2);
        assert_eq!(status.last_successful_slot, Some("B".to_string()));
    }
}
