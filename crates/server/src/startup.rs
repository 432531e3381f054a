use std::{env, net::SocketAddr, sync::Arc};

use axum::Router;
use common::utils::logging::init_logging_default;
use dotenvy::dotenv;
use tower_http::cors::CorsLayer;
use tracing::info;

use service::{groups::NodeGroupStore, storage::json_file_kv::JsonFileKv};

use crate::routes::{self, ServerState};

/// Initialize logging via shared common utils
fn init_logging() {
    init_logging_default();
}

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

/// Load host/port from configs or env vars, with sensible fallbacks
fn load_bind_addr() -> anyhow::Result<SocketAddr> {
    let (host, port) = match configs::load_default() {
        Ok(cfg) => {
            let s = cfg.server;
            (s.host, s.port)
        }
        Err(_) => {
            let host = env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
            let port = env::var("SERVER_PORT")
                .ok()
                .and_then(|p| p.parse::<u16>().ok())
                .unwrap_or(8081);
            (host, port)
        }
    };
    Ok(format!("{}:{}", host, port).parse()?)
}

/// KV file path from configs or the `STORAGE_PATH` env var.
fn load_storage_path() -> String {
    match configs::load_default() {
        Ok(mut cfg) => {
            cfg.storage.normalize_from_env();
            cfg.storage.path
        }
        Err(_) => env::var("STORAGE_PATH").unwrap_or_else(|_| "data/kv.json".to_string()),
    }
}

/// Public entry: build the app and run the HTTP server
pub async fn run() -> anyhow::Result<()> {
    dotenv().ok();
    init_logging();

    let storage_path = load_storage_path();
    common::env::ensure_env("frontend", &storage_path).await?;

    // The KV adapter owns the file; the group store serializes mutations on
    // top of it.
    let kv = JsonFileKv::new(&storage_path).await?;
    let state = ServerState { groups: Arc::new(NodeGroupStore::new(kv)) };

    let cors = build_cors();
    let app: Router = routes::build_router(state, cors);

    let addr = load_bind_addr()?;
    info!(%addr, %storage_path, "starting node group server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
