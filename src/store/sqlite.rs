//! SQLite-backed [`MemoryStore`].
//!
//! Vectors are stored as little-endian f32 BLOBs; similarity is
//! computed in Rust over a full table read and the top-k kept. That is
//! a brute-force search — fine at the scale this store targets, and it
//! keeps the storage engine a plain SQLite file with WAL.

use std::path::Path;
use std::str::FromStr;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;

use crate::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use crate::models::{ChunkPayload, IndexedPoint};

use super::{Distance, IngestJob, JobStatus, MemoryStore, ScoredPoint, COLLECTION};

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `path`.
    pub async fn connect(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.create_schema().await?;
        Ok(store)
    }

    async fn create_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS collections (
                name TEXT PRIMARY KEY,
                dims INTEGER NOT NULL,
                metric TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS points (
                id TEXT PRIMARY KEY,
                vector BLOB NOT NULL,
                text TEXT NOT NULL,
                filename TEXT NOT NULL,
                page_number INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                dates_json TEXT NOT NULL DEFAULT '[]',
                entities_json TEXT NOT NULL DEFAULT '[]'
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_points_filename ON points(filename)")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS ingest_jobs (
                id TEXT PRIMARY KEY,
                filename TEXT NOT NULL,
                status TEXT NOT NULL,
                error TEXT,
                chunk_count INTEGER,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn row_to_point(row: &sqlx::sqlite::SqliteRow) -> Result<IndexedPoint> {
    let created_at: String = row.get("created_at");
    let dates_json: String = row.get("dates_json");
    let entities_json: String = row.get("entities_json");
    let blob: Vec<u8> = row.get("vector");
    let page_number: i64 = row.get("page_number");

    Ok(IndexedPoint {
        id: row.get("id"),
        vector: blob_to_vec(&blob),
        payload: ChunkPayload {
            text: row.get("text"),
            filename: row.get("filename"),
            page_number: page_number as u32,
            created_at: DateTime::parse_from_rfc3339(&created_at)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
            dates: serde_json::from_str(&dates_json).unwrap_or_default(),
            entities: serde_json::from_str(&entities_json).unwrap_or_default(),
        },
    })
}

#[async_trait]
impl MemoryStore for SqliteStore {
    async fn ensure_collection(&self, dims: usize, metric: Distance) -> Result<()> {
        let existing = sqlx::query("SELECT dims, metric FROM collections WHERE name = ?")
            .bind(COLLECTION)
            .fetch_optional(&self.pool)
            .await?;

        match existing {
            Some(row) => {
                let have_dims: i64 = row.get("dims");
                let have_metric: String = row.get("metric");
                if have_dims as usize != dims {
                    bail!(
                        "collection '{}' has dimension {} but {} was requested; \
                         changing the embedding model requires a new collection",
                        COLLECTION,
                        have_dims,
                        dims
                    );
                }
                if have_metric != metric.as_str() {
                    bail!(
                        "collection '{}' uses metric '{}' but '{}' was requested",
                        COLLECTION,
                        have_metric,
                        metric.as_str()
                    );
                }
            }
            None => {
                sqlx::query("INSERT INTO collections (name, dims, metric) VALUES (?, ?, ?)")
                    .bind(COLLECTION)
                    .bind(dims as i64)
                    .bind(metric.as_str())
                    .execute(&self.pool)
                    .await?;
            }
        }

        Ok(())
    }

    async fn upsert(&self, points: &[IndexedPoint]) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for point in points {
            sqlx::query(
                r#"
                INSERT INTO points (id, vector, text, filename, page_number, created_at, dates_json, entities_json)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    vector = excluded.vector,
                    text = excluded.text,
                    filename = excluded.filename,
                    page_number = excluded.page_number,
                    created_at = excluded.created_at,
                    dates_json = excluded.dates_json,
                    entities_json = excluded.entities_json
                "#,
            )
            .bind(&point.id)
            .bind(vec_to_blob(&point.vector))
            .bind(&point.payload.text)
            .bind(&point.payload.filename)
            .bind(point.payload.page_number as i64)
            .bind(point.payload.created_at.to_rfc3339())
            .bind(serde_json::to_string(&point.payload.dates)?)
            .bind(serde_json::to_string(&point.payload.entities)?)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        Ok(())
    }

    async fn search(&self, query_vector: &[f32], k: usize) -> Result<Vec<ScoredPoint>> {
        // A mismatched query vector would score every point 0.0;
        // fail loudly instead.
        let existing = sqlx::query("SELECT dims FROM collections WHERE name = ?")
            .bind(COLLECTION)
            .fetch_optional(&self.pool)
            .await?;
        if let Some(row) = existing {
            let have_dims: i64 = row.get("dims");
            if have_dims as usize != query_vector.len() {
                bail!(
                    "query vector has dimension {} but collection '{}' has {}",
                    query_vector.len(),
                    COLLECTION,
                    have_dims
                );
            }
        }

        let rows = sqlx::query("SELECT * FROM points")
            .fetch_all(&self.pool)
            .await?;

        let mut hits = Vec::with_capacity(rows.len());
        for row in &rows {
            let point = row_to_point(row)?;
            let score = cosine_similarity(query_vector, &point.vector) as f64;
            hits.push(ScoredPoint { point, score });
        }

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(k);

        Ok(hits)
    }

    async fn scan(&self, limit: usize) -> Result<Vec<IndexedPoint>> {
        let rows = sqlx::query("SELECT * FROM points LIMIT ?")
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_point).collect()
    }

    async fn count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM points")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    async fn count_documents(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(DISTINCT filename) FROM points")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    async fn create_job(&self, job: &IngestJob) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO ingest_jobs (id, filename, status, error, chunk_count, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&job.id)
        .bind(&job.filename)
        .bind(job.status.name())
        .bind(match &job.status {
            JobStatus::Failed { reason } => Some(reason.clone()),
            _ => None,
        })
        .bind(job.chunk_count.map(|c| c as i64))
        .bind(job.created_at)
        .bind(job.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_job(
        &self,
        id: &str,
        status: JobStatus,
        chunk_count: Option<u32>,
    ) -> Result<()> {
        let error = match &status {
            JobStatus::Failed { reason } => Some(reason.clone()),
            _ => None,
        };

        sqlx::query(
            r#"
            UPDATE ingest_jobs
            SET status = ?, error = ?, chunk_count = COALESCE(?, chunk_count), updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(status.name())
        .bind(error)
        .bind(chunk_count.map(|c| c as i64))
        .bind(chrono::Utc::now().timestamp())
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_job(&self, id: &str) -> Result<Option<IngestJob>> {
        let row = sqlx::query("SELECT * FROM ingest_jobs WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let status_name: String = row.get("status");
        let error: Option<String> = row.get("error");
        let status = match status_name.as_str() {
            "queued" => JobStatus::Queued,
            "processing" => JobStatus::Processing,
            "succeeded" => JobStatus::Succeeded,
            "failed" => JobStatus::Failed {
                reason: error.unwrap_or_else(|| "unknown".to_string()),
            },
            other => bail!("unknown job status in database: {}", other),
        };

        let chunk_count: Option<i64> = row.get("chunk_count");

        Ok(Some(IngestJob {
            id: row.get("id"),
            filename: row.get("filename"),
            status,
            chunk_count: chunk_count.map(|c| c as u32),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }))
    }
}
