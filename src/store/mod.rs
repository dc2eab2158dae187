//! Memory store abstraction.
//!
//! The [`MemoryStore`] trait defines the vector-index capability the
//! pipeline relies on: idempotent collection setup, upsert-by-id,
//! k-nearest-neighbor search under cosine similarity, and a bounded
//! unordered scan backing the timeline/graph/consolidation views.
//!
//! Ingestion jobs are persisted alongside the points so that a
//! fire-and-forget upload leaves an observable record instead of an
//! invisible failure mode.
//!
//! Backends: [`sqlite::SqliteStore`] (durable) and
//! [`memory::InMemoryStore`] (tests). Implementations must be
//! `Send + Sync`; upsert and search must be safe under concurrent calls
//! from multiple in-flight requests.

pub mod memory;
pub mod sqlite;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

use crate::models::IndexedPoint;

/// Fixed collection name. The vector dimensionality is bound to the
/// embedding model in use; switching models requires a new collection.
pub const COLLECTION: &str = "legal_memory";

/// Distance metric for nearest-neighbor search. Only cosine is
/// implemented; the metric is still recorded with the collection so a
/// mismatch is detected rather than silently ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Distance {
    Cosine,
}

impl Distance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Distance::Cosine => "cosine",
        }
    }
}

/// A search hit: the stored point plus its similarity to the query.
#[derive(Debug, Clone)]
pub struct ScoredPoint {
    pub point: IndexedPoint,
    pub score: f64,
}

/// Lifecycle state of a background ingestion job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Processing,
    Succeeded,
    Failed { reason: String },
}

impl JobStatus {
    pub fn name(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed { .. } => "failed",
        }
    }
}

/// Persisted record of one document's ingestion.
#[derive(Debug, Clone, Serialize)]
pub struct IngestJob {
    pub id: String,
    pub filename: String,
    pub status: JobStatus,
    /// Chunks written, known once the job succeeds.
    pub chunk_count: Option<u32>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl IngestJob {
    pub fn queued(id: String, filename: String) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            id,
            filename,
            status: JobStatus::Queued,
            chunk_count: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Durable index of (id, vector, payload) triples with job tracking.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Create the collection if absent. Idempotent. Fails when an
    /// existing collection has a different vector dimensionality or
    /// metric.
    async fn ensure_collection(&self, dims: usize, metric: Distance) -> Result<()>;

    /// Write all points with upsert-by-id semantics: re-upserting an id
    /// replaces its prior vector and payload. No-op on an empty slice.
    async fn upsert(&self, points: &[IndexedPoint]) -> Result<()>;

    /// Up to `k` nearest neighbors by cosine similarity, best first.
    /// Returns fewer than `k` when the index is small, and an empty
    /// sequence on an empty index. Fails when the query vector's
    /// dimensionality differs from the collection's.
    async fn search(&self, query_vector: &[f32], k: usize) -> Result<Vec<ScoredPoint>>;

    /// Unordered bulk read of up to `limit` points. Points beyond the
    /// limit are not visible to callers and there is no pagination
    /// cursor. Not a substitute for search.
    async fn scan(&self, limit: usize) -> Result<Vec<IndexedPoint>>;

    /// Total number of indexed points.
    async fn count(&self) -> Result<u64>;

    /// Number of distinct source documents.
    async fn count_documents(&self) -> Result<u64>;

    /// Record a new ingestion job.
    async fn create_job(&self, job: &IngestJob) -> Result<()>;

    /// Transition a job's status, optionally recording the chunk count.
    async fn update_job(
        &self,
        id: &str,
        status: JobStatus,
        chunk_count: Option<u32>,
    ) -> Result<()>;

    /// Fetch a job by id.
    async fn get_job(&self, id: &str) -> Result<Option<IngestJob>>;
}
