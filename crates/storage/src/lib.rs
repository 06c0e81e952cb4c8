//! SQLite-backed scan store
//!
//! Persists finished aggregate scans: target, combined transcript and a
//! JSON metadata document (findings, summary, key points, errors).

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::{debug, info};

use titan_common::{ScanRecord, ScanStore, ScanSummary};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS scans (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    target      TEXT NOT NULL,
    raw_output  TEXT NOT NULL,
    metadata    TEXT NOT NULL,
    created_at  TEXT NOT NULL
)
"#;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://titan.db";

pub struct SqliteScanStore {
    pool: SqlitePool,
}

impl SqliteScanStore {
    /// Open (creating if needed) the database at `url` and apply the schema.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .with_context(|| format!("invalid database url: {}", url))?
            .create_if_missing(true);

        // every in-memory connection is its own database
        let pool_options = if url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(4)
        };
        let pool = pool_options
            .connect_with(options)
            .await
            .with_context(|| format!("cannot open database {}", url))?;

        let store = Self { pool };
        store.migrate().await?;
        info!(url, "scan store ready");
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(SCHEMA)
            .execute(&self.pool)
            .await
            .context("cannot create scans table")?;
        Ok(())
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("bad created_at value: {}", raw))?
        .with_timezone(&Utc))
}

#[async_trait]
impl ScanStore for SqliteScanStore {
    async fn save(&self, target: &str, raw_output: &str, metadata: &Value) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO scans (target, raw_output, metadata, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(target)
        .bind(raw_output)
        .bind(metadata.to_string())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .context("cannot save scan")?;

        let id = result.last_insert_rowid();
        debug!(id, target, "scan saved");
        Ok(id)
    }

    async fn list_history(&self, limit: u32) -> Result<Vec<ScanSummary>> {
        let rows: Vec<(i64, String, String)> =
            sqlx::query_as("SELECT id, target, created_at FROM scans ORDER BY id DESC LIMIT ?")
                .bind(i64::from(limit))
                .fetch_all(&self.pool)
                .await
                .context("cannot list scan history")?;

        rows.into_iter()
            .map(|(id, target, created_at)| {
                Ok(ScanSummary {
                    id,
                    target,
                    created_at: parse_timestamp(&created_at)?,
                })
            })
            .collect()
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<ScanRecord>> {
        let row: Option<(i64, String, String, String, String)> = sqlx::query_as(
            "SELECT id, target, raw_output, metadata, created_at FROM scans WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("cannot load scan {}", id))?;

        let Some((id, target, raw_output, metadata, created_at)) = row else {
            return Ok(None);
        };
        Ok(Some(ScanRecord {
            id,
            target,
            raw_output,
            metadata: serde_json::from_str(&metadata)
                .with_context(|| format!("scan {} has corrupt metadata", id))?,
            created_at: parse_timestamp(&created_at)?,
        }))
    }
}
