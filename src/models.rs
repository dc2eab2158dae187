//! Core data models for the ingestion and retrieval pipeline.
//!
//! These types represent the pages, chunks, and derived views that flow
//! from PDF extraction through the memory store to query responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One page of extracted PDF text. Ephemeral — consumed by the chunker.
#[derive(Debug, Clone)]
pub struct DocumentPage {
    /// 1-based page number.
    pub page_number: u32,
    pub text: String,
}

/// Payload stored alongside a chunk's vector in the memory store.
///
/// Everything from [`Chunk`] except the embedding itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkPayload {
    pub text: String,
    pub filename: String,
    pub page_number: u32,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub dates: Vec<String>,
    #[serde(default)]
    pub entities: Vec<String>,
}

/// A page-attributed text segment produced during ingestion.
///
/// `chunk_id` is the storage key and stays stable once assigned.
/// Re-ingesting the same document mints new ids — there is no
/// content-based dedup.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub chunk_id: String,
    pub text: String,
    pub filename: String,
    pub page_number: u32,
    pub created_at: DateTime<Utc>,
    pub dates: Vec<String>,
    pub entities: Vec<String>,
    /// Attached after batch embedding; `None` until then.
    pub embedding: Option<Vec<f32>>,
}

impl Chunk {
    pub fn payload(&self) -> ChunkPayload {
        ChunkPayload {
            text: self.text.clone(),
            filename: self.filename.clone(),
            page_number: self.page_number,
            created_at: self.created_at,
            dates: self.dates.clone(),
            entities: self.entities.clone(),
        }
    }
}

/// Persisted form of a chunk inside the memory store.
#[derive(Debug, Clone)]
pub struct IndexedPoint {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: ChunkPayload,
}

/// A citable retrieval result, produced per query and never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct SourceCitation {
    pub text: String,
    pub filename: String,
    pub page_number: u32,
    pub score: f64,
}

/// A group of chunks consolidated by source document. Derived view,
/// recomputed on demand.
#[derive(Debug, Clone, Serialize)]
pub struct ConsolidatedGroup {
    pub id: String,
    pub summary: String,
    pub member_count: usize,
    pub source: String,
}

/// One extracted date occurrence, expanded from a chunk's `dates` list.
#[derive(Debug, Clone, Serialize)]
pub struct TimelineEvent {
    pub date: String,
    pub event: String,
    pub source: String,
    pub chunk_id: String,
}
