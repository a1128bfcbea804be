mod config;
mod db;
mod guard;
mod routes;
mod services;
mod session;
mod state;
mod store;

use std::sync::Arc;

use crate::session::memory::MemoryAuthBackend;
use crate::store::{DocumentStore, MemoryDocumentStore, PgDocumentStore};

#[tokio::main]
async fn main() {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("failed to load .env: {e}");
        }
    }
    tracing_subscriber::fmt::init();

    let config = config::AppConfig::from_env();
    let port = config.port;

    // Postgres when configured, otherwise an in-process store.
    let store: Arc<dyn DocumentStore> = match &config.database_url {
        Some(url) => {
            let pool = db::init_pool(url, config.db_max_connections)
                .await
                .expect("database init failed");
            tracing::info!(max_connections = config.db_max_connections, "postgres document store ready");
            Arc::new(PgDocumentStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; documents are kept in memory");
            Arc::new(MemoryDocumentStore::new())
        }
    };

    let state = state::AppState::new(config, store, Arc::new(MemoryAuthBackend::new()));

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "clubhouse listening");
    axum::serve(listener, app).await.expect("server failed");
}
