//! Docrag Service - Main Entry Point
//!
//! Document ingestion and retrieval-augmented answering over HTTP.

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use docrag::api::handlers::{self, AppState};
use docrag::clients::{CompletionClient, Embedder, OpenAiCompletion, OpenAiEmbedder};
use docrag::pipeline::DocumentProcessor;
use docrag::rag::AnswerComposer;
use docrag::store::{ChunkStore, DocumentStore, HttpDataStore, HttpObjectStore, ObjectStore};
use docrag::types::AppConfig;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "docrag=info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env();

    info!("Starting docrag service v{}", env!("CARGO_PKG_VERSION"));
    info!(
        chunk_size = config.chunking.chunk_size,
        chunk_overlap = config.chunking.chunk_overlap,
        "Chunking budgets loaded"
    );
    if config.openai_api_key.is_empty() {
        warn!("OPENAI_API_KEY is not set; embedding and chat calls will fail");
    }

    // Wire up stores and model-service clients
    let datastore = Arc::new(HttpDataStore::new(&config.datastore_url));
    let documents: Arc<dyn DocumentStore> = datastore.clone();
    let chunks: Arc<dyn ChunkStore> = datastore;
    let objects: Arc<dyn ObjectStore> = Arc::new(HttpObjectStore::new(&config.storage_url));
    let embedder: Arc<dyn Embedder> = Arc::new(OpenAiEmbedder::new(&config));
    let completion: Arc<dyn CompletionClient> = Arc::new(OpenAiCompletion::new(&config));

    let processor = DocumentProcessor::new(
        documents.clone(),
        chunks.clone(),
        objects,
        embedder.clone(),
        &config,
    );
    let composer = AnswerComposer::new(documents.clone(), chunks, embedder, completion, &config);

    let state = Arc::new(AppState {
        processor,
        composer,
        documents,
    });

    // Build HTTP routes
    let app = Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Ingestion pipeline (also the reprocess trigger)
        .route("/documents/process", post(handlers::process_document))
        .route("/documents/:document_id", get(handlers::get_document))
        // Retrieval
        .route("/chat", post(handlers::chat))
        .route("/search", post(handlers::search))
        // State
        .with_state(state)
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    // Start server
    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3030);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
