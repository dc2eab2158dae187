//! Semantic graph view.
//!
//! Emits a node/edge element list in the shape graph front-ends
//! (Cytoscape and friends) consume: nodes are chunks, edges link chunks
//! from the same source document. With a query, the node set is the
//! query's nearest neighbors; without one, a bounded unordered sample.
//!
//! Edge enumeration is O(n²) over the node set. The node cap
//! (`retrieval.graph_limit`, ~20) is what keeps that acceptable; raise
//! it with care.

use anyhow::Result;
use serde::Serialize;

use crate::embedding::{embed_query, Embedder};
use crate::models::IndexedPoint;
use crate::store::MemoryStore;

/// Leading characters of chunk text carried on each node.
const NODE_TEXT_CHARS: usize = 50;

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum GraphElement {
    Node { data: NodeData },
    Edge { data: EdgeData },
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeData {
    pub id: String,
    pub label: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EdgeData {
    pub source: String,
    pub target: String,
}

/// Build graph elements. `query` narrows the node set to relevant
/// chunks and requires an embedder; otherwise a scan sample is used.
pub async fn build_graph(
    store: &dyn MemoryStore,
    embedder: Option<&dyn Embedder>,
    query: Option<&str>,
    limit: usize,
) -> Result<Vec<GraphElement>> {
    let points: Vec<IndexedPoint> = match query {
        Some(q) if !q.trim().is_empty() => {
            let embedder = embedder
                .ok_or_else(|| anyhow::anyhow!("graph query requires embeddings to be enabled"))?;
            let query_vector = embed_query(embedder, q).await?;
            store
                .search(&query_vector, limit)
                .await?
                .into_iter()
                .map(|hit| hit.point)
                .collect()
        }
        _ => store.scan(limit).await?,
    };

    let mut elements: Vec<GraphElement> = points
        .iter()
        .map(|p| GraphElement::Node {
            data: NodeData {
                id: p.id.clone(),
                label: p.payload.filename.clone(),
                text: p.payload.text.chars().take(NODE_TEXT_CHARS).collect(),
            },
        })
        .collect();

    // Same-document edges only; each unordered pair once.
    for (i, a) in points.iter().enumerate() {
        for b in points.iter().skip(i + 1) {
            if a.payload.filename == b.payload.filename {
                elements.push(GraphElement::Edge {
                    data: EdgeData {
                        source: a.id.clone(),
                        target: b.id.clone(),
                    },
                });
            }
        }
    }

    Ok(elements)
}
