//! # Casefile CLI (`casefile`)
//!
//! The `casefile` binary is the primary interface for the document
//! memory engine. It provides commands for database initialization,
//! PDF ingestion, semantic query, the derived views, and starting the
//! HTTP server.
//!
//! ## Usage
//!
//! ```bash
//! casefile --config ./config/casefile.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `casefile init` | Create the SQLite database and schema |
//! | `casefile ingest <file>` | Ingest one PDF into the memory store |
//! | `casefile query "<q>"` | Retrieve chunks and synthesize an answer |
//! | `casefile timeline` | Print chronological events from stored metadata |
//! | `casefile graph` | Print the semantic graph as JSON |
//! | `casefile consolidate` | Print per-document consolidation summaries |
//! | `casefile job <id>` | Show one ingestion job |
//! | `casefile stats` | Show memory store counts |
//! | `casefile serve` | Start the HTTP server |

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use casefile::config;
use casefile::consolidate::consolidate;
use casefile::context::AppContext;
use casefile::graph::build_graph;
use casefile::ingest;
use casefile::retrieve::retrieve;
use casefile::server;
use casefile::store::sqlite::SqliteStore;
use casefile::store::MemoryStore;
use casefile::synthesize::synthesize_answer;
use casefile::timeline::build_timeline;

/// Casefile CLI — a memory engine for legal documents.
///
/// All commands accept a `--config` flag pointing to a TOML
/// configuration file. See `config/casefile.example.toml` for a full
/// example.
#[derive(Parser)]
#[command(
    name = "casefile",
    about = "Casefile — a memory engine for legal documents",
    version,
    long_about = "Casefile ingests PDF filings page by page, chunks and embeds the text, \
    enriches each chunk with extracted dates and entities, and serves semantic retrieval \
    with grounded answer synthesis plus timeline, graph, and consolidation views."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/casefile.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and all required tables.
    /// Idempotent — running it multiple times is safe.
    Init,

    /// Ingest one PDF into the memory store.
    ///
    /// Extracts text page by page, chunks it, attaches extracted
    /// metadata, embeds, and stores the result. Requires an embedding
    /// provider to be configured.
    Ingest {
        /// Path to the PDF file.
        file: PathBuf,
    },

    /// Retrieve matching chunks and synthesize an answer.
    Query {
        /// The question to ask.
        query: String,

        /// Print citations only, skipping answer synthesis.
        #[arg(long)]
        no_synthesize: bool,

        /// Maximum number of citations to retrieve.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Print chronological events extracted from stored metadata.
    Timeline,

    /// Print the semantic graph (nodes and edges) as JSON.
    Graph {
        /// Center the graph on chunks relevant to this query.
        #[arg(long)]
        query: Option<String>,
    },

    /// Print per-document consolidation summaries.
    Consolidate {
        /// Similarity threshold (accepted for API compatibility).
        #[arg(long, default_value_t = 0.75)]
        threshold: f64,
    },

    /// Show the status of one ingestion job.
    Job {
        /// Job id returned by the upload endpoint.
        id: String,
    },

    /// Show memory store counts.
    Stats,

    /// Start the HTTP server.
    ///
    /// Binds to the address configured in `[server].bind` and serves
    /// the `/api/v1` endpoints.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            SqliteStore::connect(&cfg.db.path).await?;
            println!("Database initialized at {}", cfg.db.path.display());
            return Ok(());
        }
        _ => {}
    }

    let ctx = Arc::new(AppContext::from_config(cfg).await?);

    match cli.command {
        Commands::Init => unreachable!(),
        Commands::Ingest { file } => {
            let filename = file
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("document.pdf")
                .to_string();
            let outcome = ingest::ingest_document(&ctx, &file, &filename).await?;
            println!(
                "Ingested {}: {} pages, {} chunks.",
                filename, outcome.pages, outcome.chunks
            );
        }
        Commands::Query {
            query,
            no_synthesize,
            limit,
        } => {
            let embedder = ctx.require_embedder()?;
            let k = limit.unwrap_or(ctx.config.retrieval.top_k);
            let sources = retrieve(ctx.store.as_ref(), embedder, &query, k).await?;

            if !no_synthesize {
                let answer = synthesize_answer(ctx.llm.as_deref(), &query, &sources).await;
                println!("{}\n", answer);
            }
            if sources.is_empty() {
                println!("No matching chunks.");
            }
            for (i, s) in sources.iter().enumerate() {
                println!(
                    "{}. [{:.4}] {} p.{}\n   {}",
                    i + 1,
                    s.score,
                    s.filename,
                    s.page_number,
                    s.text
                );
            }
        }
        Commands::Timeline => {
            let events =
                build_timeline(ctx.store.as_ref(), ctx.config.retrieval.scan_limit).await?;
            if events.is_empty() {
                println!("No dated events in the memory store.");
            }
            for e in &events {
                println!("{}  {}  ({})", e.date, e.event, e.source);
            }
        }
        Commands::Graph { query } => {
            let elements = build_graph(
                ctx.store.as_ref(),
                ctx.embedder.as_deref(),
                query.as_deref(),
                ctx.config.retrieval.graph_limit,
            )
            .await?;
            println!("{}", serde_json::to_string_pretty(&elements)?);
        }
        Commands::Consolidate { threshold } => {
            let groups = consolidate(
                ctx.store.as_ref(),
                ctx.config.retrieval.scan_limit,
                threshold,
            )
            .await?;
            println!("Consolidated {} groups.", groups.len());
            for g in &groups {
                println!("  {} ({} chunks) — {}", g.source, g.member_count, g.summary);
            }
        }
        Commands::Job { id } => match ctx.store.get_job(&id).await? {
            Some(job) => println!("{}", serde_json::to_string_pretty(&job)?),
            None => anyhow::bail!("no job with id: {}", id),
        },
        Commands::Stats => {
            let documents = ctx.store.count_documents().await?;
            let chunks = ctx.store.count().await?;
            println!("Memory store: {} documents, {} chunks", documents, chunks);
            println!("Database: {}", ctx.config.db.path.display());
        }
        Commands::Serve => {
            server::run_server(ctx).await?;
        }
    }

    Ok(())
}
