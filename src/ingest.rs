//! Document ingestion pipeline.
//!
//! Write path: PDF → pages → chunks → metadata + embeddings → memory
//! store. Pages are processed in page order and chunk order within a
//! page is preserved; there is no ordering guarantee across documents
//! ingested concurrently.
//!
//! Uploads run this pipeline as a detached background task tracked by a
//! persisted [`IngestJob`](crate::store::IngestJob): failures are never
//! surfaced to the upload caller (that call returned long ago), only
//! logged and recorded on the job.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::chunker;
use crate::context::AppContext;
use crate::metadata;
use crate::models::{Chunk, DocumentPage, IndexedPoint};
use crate::pdf;
use crate::store::{Distance, JobStatus, MemoryStore};

pub struct IngestOutcome {
    pub pages: usize,
    pub chunks: usize,
}

/// Ingest one PDF from disk. Synchronous variant used by the CLI.
pub async fn ingest_document(ctx: &AppContext, path: &Path, filename: &str) -> Result<IngestOutcome> {
    // Configuration errors before any file work.
    ctx.require_embedder()?;

    let pages = pdf::extract_pages(path)
        .with_context(|| format!("extraction stage failed for {}", filename))?;
    ingest_pages(ctx, pages, filename).await
}

/// Ingest already-extracted pages: chunk, enrich, embed, upsert.
pub async fn ingest_pages(
    ctx: &AppContext,
    pages: Vec<DocumentPage>,
    filename: &str,
) -> Result<IngestOutcome> {
    let embedder = ctx.require_embedder()?;
    let page_count = pages.len();

    let mut chunks = build_chunks(ctx, &pages, filename).await;
    if chunks.is_empty() {
        // A document that yields no text stores zero chunks. Accepted;
        // visible in logs and on the job record's chunk count.
        warn!(file = filename, "document produced no chunks");
        return Ok(IngestOutcome {
            pages: page_count,
            chunks: 0,
        });
    }

    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let vectors = embedder
        .embed(&texts)
        .await
        .with_context(|| format!("embedding stage failed for {}", filename))?;
    if vectors.len() != chunks.len() {
        bail!(
            "embedder returned {} vectors for {} chunks",
            vectors.len(),
            chunks.len()
        );
    }
    for (chunk, vector) in chunks.iter_mut().zip(vectors) {
        chunk.embedding = Some(vector);
    }

    ctx.store
        .ensure_collection(embedder.dims(), Distance::Cosine)
        .await
        .with_context(|| format!("index stage failed for {}", filename))?;

    let points: Vec<IndexedPoint> = chunks
        .iter()
        .map(|chunk| IndexedPoint {
            id: chunk.chunk_id.clone(),
            vector: chunk.embedding.clone().unwrap_or_default(),
            payload: chunk.payload(),
        })
        .collect();

    ctx.store
        .upsert(&points)
        .await
        .with_context(|| format!("index stage failed for {}", filename))?;

    Ok(IngestOutcome {
        pages: page_count,
        chunks: points.len(),
    })
}

/// Chunk each page and attach best-effort metadata. Chunk order follows
/// page order, so `page_number` is non-decreasing across the result.
async fn build_chunks(ctx: &AppContext, pages: &[DocumentPage], filename: &str) -> Vec<Chunk> {
    let chunking = &ctx.config.chunking;
    let mut chunks = Vec::new();

    for page in pages {
        for text in chunker::split_page(page, chunking.chunk_size, chunking.overlap) {
            let meta = metadata::extract(
                ctx.llm.as_deref(),
                &text,
                ctx.config.llm.max_extract_chars,
            )
            .await;

            chunks.push(Chunk {
                chunk_id: Uuid::new_v4().to_string(),
                text,
                filename: filename.to_string(),
                page_number: page.page_number,
                created_at: Utc::now(),
                dates: meta.dates,
                entities: meta.entities,
                embedding: None,
            });
        }
    }

    chunks
}

/// Entry point for the detached upload task. Transitions the job
/// through processing to succeeded or failed, logging with filename and
/// stage context. The staged upload file is removed on success; on
/// failure it may remain, which is logged rather than hidden.
pub async fn run_background_ingest(
    ctx: Arc<AppContext>,
    path: PathBuf,
    filename: String,
    job_id: String,
) {
    if let Err(e) = ctx
        .store
        .update_job(&job_id, JobStatus::Processing, None)
        .await
    {
        error!(job = %job_id, error = %e, "failed to mark job processing");
    }

    match ingest_document(&ctx, &path, &filename).await {
        Ok(outcome) => {
            info!(
                file = %filename,
                pages = outcome.pages,
                chunks = outcome.chunks,
                "document ingested"
            );
            if let Err(e) = ctx
                .store
                .update_job(&job_id, JobStatus::Succeeded, Some(outcome.chunks as u32))
                .await
            {
                error!(job = %job_id, error = %e, "failed to mark job succeeded");
            }
            if let Err(e) = std::fs::remove_file(&path) {
                warn!(file = %path.display(), error = %e, "failed to remove staged upload");
            }
        }
        Err(e) => {
            error!(file = %filename, error = %e, "background ingestion failed");
            if path.exists() {
                warn!(file = %path.display(), "staged upload left behind after failure");
            }
            if let Err(update_err) = ctx
                .store
                .update_job(
                    &job_id,
                    JobStatus::Failed {
                        reason: e.to_string(),
                    },
                    None,
                )
                .await
            {
                error!(job = %job_id, error = %update_err, "failed to mark job failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::embedding::Embedder;
    use crate::llm::LanguageModel;
    use crate::retrieve::retrieve;
    use crate::store::memory::InMemoryStore;
    use async_trait::async_trait;

    /// Deterministic letter-frequency embedder: identical text embeds
    /// to an identical vector, so an exact match scores 1.0.
    struct HistogramEmbedder;

    #[async_trait]
    impl Embedder for HistogramEmbedder {
        fn model_name(&self) -> &str {
            "histogram"
        }
        fn dims(&self) -> usize {
            26
        }
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    let mut v = vec![0.0f32; 26];
                    for c in t.to_lowercase().chars() {
                        if c.is_ascii_lowercase() {
                            v[(c as u8 - b'a') as usize] += 1.0;
                        }
                    }
                    v
                })
                .collect())
        }
    }

    struct FixedModel(&'static str);

    #[async_trait]
    impl LanguageModel for FixedModel {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct OutageModel;

    #[async_trait]
    impl LanguageModel for OutageModel {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            anyhow::bail!("simulated outage")
        }
    }

    fn test_config() -> Config {
        toml::from_str(
            r#"
[db]
path = "/tmp/unused.sqlite"

[server]
bind = "127.0.0.1:0"
"#,
        )
        .unwrap()
    }

    fn test_context(llm: Option<Arc<dyn LanguageModel>>) -> AppContext {
        AppContext {
            config: test_config(),
            store: Arc::new(InMemoryStore::new()),
            embedder: Some(Arc::new(HistogramEmbedder)),
            llm,
        }
    }

    fn page(n: u32, text: &str) -> DocumentPage {
        DocumentPage {
            page_number: n,
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn one_page_agreement_scenario() {
        let model = FixedModel(
            r#"{"dates": ["2024-01-15"], "entities": ["Acme Corp", "Beta LLC"]}"#,
        );
        let ctx = test_context(Some(Arc::new(model)));

        let outcome = ingest_pages(
            &ctx,
            vec![page(
                1,
                "Agreement dated 2024-01-15 between Acme Corp and Beta LLC.",
            )],
            "agreement.pdf",
        )
        .await
        .unwrap();

        assert_eq!(outcome.chunks, 1);

        let points = ctx.store.scan(10).await.unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].payload.page_number, 1);
        assert_eq!(points[0].payload.filename, "agreement.pdf");
        assert!(!points[0].payload.dates.is_empty());
        assert!(points[0].payload.entities.contains(&"Acme Corp".to_string()));
        assert!(points[0].payload.entities.contains(&"Beta LLC".to_string()));
    }

    #[tokio::test]
    async fn ingested_chunk_is_retrievable_as_top_hit() {
        let ctx = test_context(None);
        let text = "Agreement dated 2024-01-15 between Acme Corp and Beta LLC.";
        ingest_pages(&ctx, vec![page(1, text)], "agreement.pdf")
            .await
            .unwrap();

        // Same text, same embedder: round-trip must score ~1.0.
        let citations = retrieve(
            ctx.store.as_ref(),
            ctx.embedder.as_deref().unwrap(),
            text,
            5,
        )
        .await
        .unwrap();

        assert_eq!(citations.len(), 1);
        assert_eq!(citations[0].filename, "agreement.pdf");
        assert!(citations[0].score >= 0.99);
    }

    #[tokio::test]
    async fn metadata_outage_does_not_block_ingestion() {
        let ctx = test_context(Some(Arc::new(OutageModel)));
        let outcome = ingest_pages(
            &ctx,
            vec![page(1, "Some clause text."), page(2, "Another clause.")],
            "contract.pdf",
        )
        .await
        .unwrap();

        assert_eq!(outcome.chunks, 2);
        let points = ctx.store.scan(10).await.unwrap();
        assert!(points.iter().all(|p| p.payload.dates.is_empty()));
        assert!(points.iter().all(|p| p.payload.entities.is_empty()));
    }

    #[tokio::test]
    async fn page_numbers_are_monotonic_across_chunks() {
        let ctx = test_context(None);
        let long = "The parties agree to the following terms. ".repeat(60);
        let pages = vec![page(1, &long), page(2, &long), page(3, "Short closing page.")];

        let chunks = build_chunks(&ctx, &pages, "contract.pdf").await;
        assert!(chunks.len() > 3);
        for pair in chunks.windows(2) {
            assert!(pair[0].page_number <= pair[1].page_number);
        }
        // No chunk spans two pages: every chunk's text comes from one page.
        assert!(chunks
            .iter()
            .filter(|c| c.page_number == 3)
            .all(|c| c.text == "Short closing page."));
    }

    #[tokio::test]
    async fn empty_pages_yield_zero_chunks() {
        let ctx = test_context(None);
        let outcome = ingest_pages(&ctx, vec![page(1, "   \n  ")], "blank.pdf")
            .await
            .unwrap();
        assert_eq!(outcome.chunks, 0);
        assert_eq!(ctx.store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn reingesting_mints_new_ids() {
        let ctx = test_context(None);
        let pages = vec![page(1, "Identical content.")];
        ingest_pages(&ctx, pages.clone(), "doc.pdf").await.unwrap();
        ingest_pages(&ctx, pages, "doc.pdf").await.unwrap();

        // No dedup by content: both ingests are stored.
        assert_eq!(ctx.store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn background_ingest_records_failure() {
        let ctx = Arc::new(test_context(None));
        let job = crate::store::IngestJob::queued("job-x".to_string(), "gone.pdf".to_string());
        ctx.store.create_job(&job).await.unwrap();

        run_background_ingest(
            ctx.clone(),
            PathBuf::from("/nonexistent/gone.pdf"),
            "gone.pdf".to_string(),
            "job-x".to_string(),
        )
        .await;

        let job = ctx.store.get_job("job-x").await.unwrap().unwrap();
        assert!(matches!(job.status, JobStatus::Failed { .. }));
    }
}
