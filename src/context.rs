//! Application context: one explicit bundle of shared services.
//!
//! Constructed once at process start and passed to request handlers and
//! CLI commands. There are no process-wide singletons — tests build a
//! context around the in-memory store and fake model clients.

use std::sync::Arc;

use anyhow::Result;

use crate::config::Config;
use crate::embedding::{self, Embedder};
use crate::llm::{self, LanguageModel};
use crate::store::sqlite::SqliteStore;
use crate::store::MemoryStore;

pub struct AppContext {
    pub config: Config,
    pub store: Arc<dyn MemoryStore>,
    /// Absent when the embedding provider is disabled. Ingestion and
    /// query paths require it and fail with a clear message without it;
    /// timeline, graph, and consolidation views do not.
    pub embedder: Option<Arc<dyn Embedder>>,
    /// Absent when the llm provider is disabled: metadata stays empty
    /// and synthesis is unavailable.
    pub llm: Option<Arc<dyn LanguageModel>>,
}

impl AppContext {
    /// Build the production context: SQLite store plus the configured
    /// embedding and language-model providers.
    pub async fn from_config(config: Config) -> Result<Self> {
        let store = SqliteStore::connect(&config.db.path).await?;

        let embedder: Option<Arc<dyn Embedder>> = if config.embedding.is_enabled() {
            Some(Arc::from(embedding::create_embedder(&config.embedding)?))
        } else {
            None
        };

        let llm: Option<Arc<dyn LanguageModel>> =
            llm::create_model(&config.llm)?.map(Arc::from);

        Ok(Self {
            config,
            store: Arc::new(store),
            embedder,
            llm,
        })
    }

    /// The embedder, or a configuration error for paths that need one.
    pub fn require_embedder(&self) -> Result<&dyn Embedder> {
        self.embedder
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("embeddings are disabled; set [embedding] in config"))
    }
}
