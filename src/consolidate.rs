//! Memory consolidation: grouping indexed chunks by source document.
//!
//! Consolidation is a view, not a mutation — groups are recomputed on
//! demand from a bounded scan and never persisted. Grouping is an exact
//! filename match; the `threshold` parameter is accepted for a future
//! similarity-based strategy and currently unused. Because the backing
//! scan is unordered and bounded, group membership can vary across
//! calls on large indexes — a known limitation, not a correctness bug.

use std::collections::BTreeMap;

use anyhow::Result;
use uuid::Uuid;

use crate::models::ConsolidatedGroup;
use crate::store::MemoryStore;

pub async fn consolidate(
    store: &dyn MemoryStore,
    scan_limit: usize,
    _threshold: f64,
) -> Result<Vec<ConsolidatedGroup>> {
    let points = store.scan(scan_limit).await?;

    let mut groups: BTreeMap<String, usize> = BTreeMap::new();
    for point in &points {
        *groups.entry(point.payload.filename.clone()).or_default() += 1;
    }

    Ok(groups
        .into_iter()
        .map(|(filename, member_count)| ConsolidatedGroup {
            id: Uuid::new_v4().to_string(),
            summary: format!(
                "Consolidated memory of {} chunks from {}.",
                member_count, filename
            ),
            member_count,
            source: filename,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChunkPayload, IndexedPoint};
    use crate::store::memory::InMemoryStore;
    use chrono::Utc;

    fn indexed(id: &str, filename: &str) -> IndexedPoint {
        IndexedPoint {
            id: id.to_string(),
            vector: vec![1.0, 0.0],
            payload: ChunkPayload {
                text: format!("chunk {}", id),
                filename: filename.to_string(),
                page_number: 1,
                created_at: Utc::now(),
                dates: Vec::new(),
                entities: Vec::new(),
            },
        }
    }

    #[tokio::test]
    async fn one_group_per_distinct_filename() {
        let store = InMemoryStore::new();
        store
            .upsert(&[
                indexed("a1", "alpha.pdf"),
                indexed("a2", "alpha.pdf"),
                indexed("a3", "alpha.pdf"),
                indexed("b1", "beta.pdf"),
            ])
            .await
            .unwrap();

        let groups = consolidate(&store, 100, 0.75).await.unwrap();
        assert_eq!(groups.len(), 2);

        let alpha = groups.iter().find(|g| g.source == "alpha.pdf").unwrap();
        let beta = groups.iter().find(|g| g.source == "beta.pdf").unwrap();
        assert_eq!(alpha.member_count, 3);
        assert_eq!(beta.member_count, 1);
        assert!(alpha.summary.contains("3 chunks from alpha.pdf"));
    }

    #[tokio::test]
    async fn empty_index_yields_no_groups() {
        let store = InMemoryStore::new();
        assert!(consolidate(&store, 100, 0.75).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn scan_bound_caps_membership() {
        let store = InMemoryStore::new();
        for i in 0..30 {
            store
                .upsert(&[indexed(&format!("c{}", i), "big.pdf")])
                .await
                .unwrap();
        }
        let groups = consolidate(&store, 10, 0.5).await.unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].member_count, 10);
    }
}
