//! # Casefile
//!
//! A memory engine for legal documents.
//!
//! Casefile ingests PDF filings page by page, chunks and embeds the
//! text, enriches each chunk with LLM-extracted dates and entities, and
//! serves semantic retrieval with grounded answer synthesis plus
//! derived timeline, graph, and consolidation views over the stored
//! memory.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────┐   ┌───────────────┐   ┌──────────┐
//! │  PDFs   │──▶│   Pipeline     │──▶│  SQLite   │
//! │ uploads │   │ Chunk+Meta+Emb │   │  vectors  │
//! └─────────┘   └───────────────┘   └────┬─────┘
//!                                        │
//!                    ┌───────────────────┤
//!                    ▼                   ▼
//!               ┌──────────┐       ┌──────────┐
//!               │   CLI    │       │   HTTP   │
//!               │(casefile)│       │ /api/v1  │
//!               └──────────┘       └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! casefile init                    # create database
//! casefile ingest brief.pdf        # chunk, enrich, embed, store
//! casefile query "filing deadline" # retrieve and synthesize
//! casefile timeline                # chronological events
//! casefile serve                   # start HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`pdf`] | Per-page PDF text extraction |
//! | [`chunker`] | Overlapping boundary-aware chunking |
//! | [`metadata`] | LLM date/entity extraction |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`store`] | Vector memory store (SQLite + in-memory) |
//! | [`ingest`] | Document ingestion pipeline |
//! | [`retrieve`] | Semantic nearest-neighbor retrieval |
//! | [`synthesize`] | Grounded answer synthesis |
//! | [`timeline`] | Chronological event view |
//! | [`graph`] | Semantic node/edge view |
//! | [`consolidate`] | Per-document consolidation summaries |
//! | [`server`] | JSON HTTP server |

pub mod chunker;
pub mod config;
pub mod consolidate;
pub mod context;
pub mod embedding;
pub mod graph;
pub mod ingest;
pub mod llm;
pub mod metadata;
pub mod models;
pub mod pdf;
pub mod retrieve;
pub mod server;
pub mod store;
pub mod synthesize;
pub mod timeline;
