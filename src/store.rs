// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Paste storage.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions},
    Row,
};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Paste id {0} already exists")]
    Conflict(String),

    #[error("Corrupt row for paste {id}: {reason}")]
    Corrupt { id: String, reason: &'static str },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// A paste about to be stored.
#[derive(Debug, Clone, Copy)]
pub struct NewPaste<'a> {
    pub id: &'a str,
    pub created_at: DateTime<Utc>,
    pub country_code: &'a str,
    pub content: &'a [u8],
}

/// A stored paste.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paste {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub views: i64,
    pub content: Vec<u8>,
}

#[async_trait]
pub trait PasteStore: Send + Sync {
    /// Store a new paste. Fails with [`StoreError::Conflict`] if the id is taken.
    async fn insert(&self, paste: NewPaste<'_>) -> Result<(), StoreError>;

    async fn fetch(&self, id: &str) -> Result<Option<Paste>, StoreError>;

    /// Count a view and stamp the view time.
    async fn record_view(&self, id: &str, at: DateTime<Utc>) -> Result<(), StoreError>;
}

/// SQLite-backed paste store.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    db: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `path` in WAL mode.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let opts = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);
        let db = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(opts)
            .await?;

        init_db(&db).await?;
        Ok(Self { db })
    }

    /// Private in-memory database, mainly for tests.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let opts = SqliteConnectOptions::from_str("sqlite::memory:")?;
        // Every connection to :memory: is a separate database, so keep one
        // connection alive for the lifetime of the pool.
        let db = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(opts)
            .await?;

        init_db(&db).await?;
        Ok(Self { db })
    }
}

async fn init_db(db: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS pastes (
            id TEXT PRIMARY KEY,
            created_at INTEGER NOT NULL,
            country_code TEXT NOT NULL,
            views INTEGER NOT NULL DEFAULT 0,
            last_view INTEGER DEFAULT NULL,
            content BLOB NOT NULL
        ) STRICT",
    )
    .execute(db)
    .await?;
    Ok(())
}

#[async_trait]
impl PasteStore for SqliteStore {
    async fn insert(&self, paste: NewPaste<'_>) -> Result<(), StoreError> {
        let res = sqlx::query(
            "INSERT INTO pastes (id, created_at, country_code, content) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(paste.id)
        .bind(paste.created_at.timestamp_millis())
        .bind(paste.country_code)
        .bind(paste.content)
        .execute(&self.db)
        .await;

        match res {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
                Err(StoreError::Conflict(paste.id.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn fetch(&self, id: &str) -> Result<Option<Paste>, StoreError> {
        let row = sqlx::query("SELECT created_at, views, content FROM pastes WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let created_at: i64 = row.try_get("created_at")?;
        let created_at = DateTime::from_timestamp_millis(created_at).ok_or_else(|| {
            StoreError::Corrupt {
                id: id.to_string(),
                reason: "created_at out of range",
            }
        })?;

        Ok(Some(Paste {
            id: id.to_string(),
            created_at,
            views: row.try_get("views")?,
            content: row.try_get("content")?,
        }))
    }

    async fn record_view(&self, id: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        sqlx::query("UPDATE pastes SET views = views + 1, last_view = ?1 WHERE id = ?2")
            .bind(at.timestamp_millis())
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(())
    }
}
