//! In-memory [`MemoryStore`] for tests.
//!
//! `HashMap`s behind `std::sync::RwLock`; vector search is brute-force
//! cosine over everything stored. Mirrors the SQLite backend's
//! semantics, including the loud dimension-mismatch failure.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::embedding::cosine_similarity;
use crate::models::IndexedPoint;

use super::{Distance, IngestJob, JobStatus, MemoryStore, ScoredPoint, COLLECTION};

#[derive(Default)]
pub struct InMemoryStore {
    collection: RwLock<Option<(usize, Distance)>>,
    points: RwLock<HashMap<String, IndexedPoint>>,
    jobs: RwLock<HashMap<String, IngestJob>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    async fn ensure_collection(&self, dims: usize, metric: Distance) -> Result<()> {
        let mut collection = self.collection.write().unwrap();
        match *collection {
            Some((have_dims, _)) if have_dims != dims => {
                bail!(
                    "collection '{}' has dimension {} but {} was requested",
                    COLLECTION,
                    have_dims,
                    dims
                );
            }
            Some(_) => {}
            None => *collection = Some((dims, metric)),
        }
        Ok(())
    }

    async fn upsert(&self, points: &[IndexedPoint]) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }
        let mut stored = self.points.write().unwrap();
        for point in points {
            stored.insert(point.id.clone(), point.clone());
        }
        Ok(())
    }

    async fn search(&self, query_vector: &[f32], k: usize) -> Result<Vec<ScoredPoint>> {
        if let Some((dims, _)) = *self.collection.read().unwrap() {
            if dims != query_vector.len() {
                bail!(
                    "query vector has dimension {} but collection '{}' has {}",
                    query_vector.len(),
                    COLLECTION,
                    dims
                );
            }
        }
        let stored = self.points.read().unwrap();
        let mut hits: Vec<ScoredPoint> = stored
            .values()
            .map(|point| ScoredPoint {
                score: cosine_similarity(query_vector, &point.vector) as f64,
                point: point.clone(),
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(k);
        Ok(hits)
    }

    async fn scan(&self, limit: usize) -> Result<Vec<IndexedPoint>> {
        let stored = self.points.read().unwrap();
        Ok(stored.values().take(limit).cloned().collect())
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.points.read().unwrap().len() as u64)
    }

    async fn count_documents(&self) -> Result<u64> {
        let stored = self.points.read().unwrap();
        let files: std::collections::HashSet<&str> = stored
            .values()
            .map(|p| p.payload.filename.as_str())
            .collect();
        Ok(files.len() as u64)
    }

    async fn create_job(&self, job: &IngestJob) -> Result<()> {
        self.jobs
            .write()
            .unwrap()
            .insert(job.id.clone(), job.clone());
        Ok(())
    }

    async fn update_job(
        &self,
        id: &str,
        status: JobStatus,
        chunk_count: Option<u32>,
    ) -> Result<()> {
        let mut jobs = self.jobs.write().unwrap();
        if let Some(job) = jobs.get_mut(id) {
            job.status = status;
            if chunk_count.is_some() {
                job.chunk_count = chunk_count;
            }
            job.updated_at = chrono::Utc::now().timestamp();
        }
        Ok(())
    }

    async fn get_job(&self, id: &str) -> Result<Option<IngestJob>> {
        Ok(self.jobs.read().unwrap().get(id).cloned())
    }
}
