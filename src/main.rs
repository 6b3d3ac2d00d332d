// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Process entry point: loads configuration, assembles the dependency
//! container, and serves the HTTP surface.

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use trade_core::AgentFactory;
use trade_http::AppState;
use trade_ingest::{HttpObjectStore, IngestService};
use trade_memory::{EmbeddingVectorSearch, HttpEmbedder, MemoryService, ModelSummarizer, SqliteVectorStore};

#[derive(Parser, Debug)]
#[command(name = "trade-gateway", about = "Trade assistant AI gateway", version)]
struct Cli {
    /// Explicit config file path, overriding the discovered search path.
    #[arg(long, env = "TRADE_GATEWAY_CONFIG")]
    config: Option<std::path::PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))).init();

    let cli = Cli::parse();
    let config = trade_config::load(cli.config.as_deref())?;

    let model: Arc<dyn trade_model::ModelProvider> = Arc::from(trade_model::from_config(&config.model)?);

    let vector_store_path = config.vector_store.path.clone().unwrap_or_else(|| "trade_vectors.db".to_string());
    let vector_store: Arc<dyn trade_memory::VectorStoreAdapter> = Arc::new(SqliteVectorStore::open(&vector_store_path)?);
    let embedder: Arc<dyn trade_memory::Embedder> = Arc::new(HttpEmbedder::from_config(&config.embedding));
    let summarizer: Arc<dyn trade_memory::Summarizer> = Arc::new(ModelSummarizer::new(model.clone()));

    let memory = Arc::new(MemoryService::new(vector_store.clone(), embedder.clone(), summarizer, config.collections.knowledge.clone()));

    let relational_path = std::env::var("TRADE_RELATIONAL_DB_PATH").unwrap_or_else(|_| "trade_relational.db".to_string());
    let relational: Arc<dyn trade_http::store::RelationalStore> = Arc::new(trade_http::store::SqliteRelationalStore::open(&relational_path)?);

    let knowledge_search: Arc<dyn trade_tools::VectorSearch> =
        Arc::new(EmbeddingVectorSearch { store: vector_store.clone(), embedder: embedder.clone() });

    let agent_factory = Arc::new(AgentFactory {
        prompts: Arc::new(trade_prompts::PromptRegistry::from_config(&config.prompt_registry)),
        knowledge_search: knowledge_search.clone(),
        user_doc_search: knowledge_search,
        knowledge_collection: config.collections.knowledge.clone(),
        user_documents_collection: config.collections.user_documents.clone(),
        web_search_api_key: config.web_search.api_key.clone(),
        model_id: config.model.name.clone(),
    });

    let ingest = HttpObjectStore::from_config(&config.object_store)
        .map(|os| Arc::new(IngestService::new(Arc::new(os), vector_store, embedder)));

    let state = AppState { config: Arc::new(config.clone()), agent_factory, model, memory, relational, ingest };

    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!(%addr, "trade gateway listening");

    let router = trade_http::build_router(state);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
