//! Query-time retrieval.
//!
//! Embeds the query with the same embedder used at ingestion time (a
//! hard invariant — mixing embedding functions between write and read
//! paths silently corrupts relevance), searches the memory store, and
//! shapes the hits into citable source records in rank order.

use anyhow::Result;

use crate::embedding::{embed_query, Embedder};
use crate::models::SourceCitation;
use crate::store::MemoryStore;

/// Retrieve up to `k` citations for `query`, best match first.
///
/// An empty index yields an empty sequence, not an error.
pub async fn retrieve(
    store: &dyn MemoryStore,
    embedder: &dyn Embedder,
    query: &str,
    k: usize,
) -> Result<Vec<SourceCitation>> {
    let query_vector = embed_query(embedder, query).await?;
    let hits = store.search(&query_vector, k).await?;

    Ok(hits
        .into_iter()
        .map(|hit| SourceCitation {
            text: hit.point.payload.text,
            filename: hit.point.payload.filename,
            page_number: hit.point.payload.page_number,
            score: hit.score,
        })
        .collect())
}
