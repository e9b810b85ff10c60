use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use clap::Parser;
use tokio::sync::RwLock;

use tagdeck::adminconfig::{AdminConfig, now_ts};
use tagdeck::model::ALL_TAB;

const SECRET_HEADER: &str = "x-admin-secret";
const RECORD_FILE: &str = "admin-config.json";

#[derive(Clone)]
struct AppState {
    data_dir: PathBuf,

    // Stored hash of the shared write secret.
    secret_hash: String,

    record: Arc<RwLock<AdminConfig>>,
}

#[derive(Parser)]
#[command(name = "tagdeck-admin")]
#[command(about = "tagdeck shared admin-config service (development)", long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:8080")]
    addr: SocketAddr,

    /// Write bound address to this file (dev/test convenience)
    #[arg(long)]
    addr_file: Option<PathBuf>,

    /// Data directory holding the config record
    #[arg(long, default_value = "./tagdeck-admin-data")]
    data_dir: PathBuf,

    /// Shared secret required by POST /admin-config
    #[arg(long, default_value = "dev")]
    secret: String,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{:#}", err);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    std::fs::create_dir_all(&args.data_dir)
        .with_context(|| format!("create data dir {}", args.data_dir.display()))?;

    let record = load_record(&args.data_dir);

    let state = AppState {
        data_dir: args.data_dir,
        secret_hash: hash_secret(&args.secret),
        record: Arc::new(RwLock::new(record)),
    };

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/admin-config", get(get_config).post(post_config))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(args.addr)
        .await
        .with_context(|| format!("bind {}", args.addr))?;

    let local_addr = listener.local_addr().context("read listener local addr")?;
    eprintln!("tagdeck-admin listening on {}", local_addr);

    if let Some(addr_file) = &args.addr_file {
        std::fs::write(addr_file, local_addr.to_string())
            .with_context(|| format!("write addr file {}", addr_file.display()))?;
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

async fn healthz() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

async fn get_config(State(state): State<AppState>) -> Json<AdminConfig> {
    Json(state.record.read().await.clone())
}

/// Partial update; present fields are merged independently into the stored
/// record.
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateRequest {
    #[serde(default)]
    hidden_tabs: Option<Vec<String>>,

    #[serde(default)]
    game_categories: Option<BTreeMap<String, String>>,
}

async fn post_config(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<UpdateRequest>,
) -> Result<Json<AdminConfig>, Response> {
    let Some(value) = headers.get(SECRET_HEADER) else {
        return Err(unauthorized());
    };
    let Ok(value) = value.to_str() else {
        return Err(unauthorized());
    };
    if hash_secret(value) != state.secret_hash {
        return Err(unauthorized());
    }

    let mut record = state.record.write().await;
    if let Some(hidden) = payload.hidden_tabs {
        record.hidden_tabs = hidden;
        record.hidden_tabs.retain(|t| t != ALL_TAB);
    }
    if let Some(categories) = payload.game_categories {
        record.game_categories.extend(categories);
    }
    record.last_updated = now_ts();

    if let Err(err) = persist_record(&state.data_dir, &record) {
        return Err(internal_error(err));
    }

    Ok(Json(record.clone()))
}

fn hash_secret(secret: &str) -> String {
    blake3::hash(secret.as_bytes()).to_hex().to_string()
}

fn load_record(data_dir: &Path) -> AdminConfig {
    let path = data_dir.join(RECORD_FILE);
    if !path.exists() {
        return AdminConfig::default();
    }
    match std::fs::read(&path) {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(record) => record,
            Err(err) => {
                tracing::warn!("failed to parse {}: {err}; starting fresh", path.display());
                AdminConfig::default()
            }
        },
        Err(err) => {
            tracing::warn!("failed to read {}: {err}; starting fresh", path.display());
            AdminConfig::default()
        }
    }
}

fn persist_record(data_dir: &Path, record: &AdminConfig) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(record).context("serialize admin config")?;
    let path = data_dir.join(RECORD_FILE);
    let tmp = path.with_extension(format!("tmp.{}", std::process::id()));
    std::fs::write(&tmp, &bytes).with_context(|| format!("write temp file {}", tmp.display()))?;
    std::fs::rename(&tmp, &path)
        .with_context(|| format!("rename {} -> {}", tmp.display(), path.display()))?;
    Ok(())
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({"error": "unauthorized"})),
    )
        .into_response()
}

fn internal_error(err: anyhow::Error) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({"error": err.to_string()})),
    )
        .into_response()
}
