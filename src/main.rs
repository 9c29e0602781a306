use anyhow::{Context, Result};
use aws_config::{BehaviorVersion, Region};
use axum::Router;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::{io::ErrorKind, path::Path, str::FromStr, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use url::Url;

mod config;
mod errors;
mod handlers;
mod models;
mod routes;
mod services;
mod state;

use services::{
    callback_client::HttpCallbackSender, face_client::HttpFaceService,
    mapping_store::SqliteMappingStore, object_store::S3CompatObjectStore,
};
use state::{AppState, Collaborators};

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config + migrate flag ---
    let (cfg, migrate) = config::AppConfig::from_env_and_args()?;

    tracing::info!(
        collection = %cfg.collection_id,
        bucket = %cfg.upload_bucket,
        log_stream = %cfg.log_stream_name,
        "Starting face-index"
    );

    // --- Initialize SQLite connection ---
    let db_url = &cfg.database_url;
    tracing::debug!("Connecting using raw URL => {}", db_url);

    // Create parent directory if needed
    let db_path = db_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .trim_start_matches("file:");
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
            tracing::info!("Created missing directory {:?}", parent);
        }
    }

    let db = Arc::new(
        SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(SqliteConnectOptions::from_str(db_url)?.create_if_missing(true))
            .await?,
    );
    let mapping_store = SqliteMappingStore::new(db);

    // --- Handle migration mode ---
    if migrate {
        let applied = mapping_store.run_migrations().await?;
        tracing::info!("Database migration complete ({} statements).", applied);
        return Ok(()); // exit after migration
    }

    // --- Outbound clients ---
    let http = reqwest::Client::builder()
        .timeout(cfg.dependency_timeout())
        .build()
        .context("building HTTP client")?;
    let face_service_url = Url::parse(&cfg.face_service_url)
        .with_context(|| format!("parsing face service url `{}`", cfg.face_service_url))?;
    let sdk_config = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(cfg.object_store_region.clone()))
        .load()
        .await;
    let s3 = aws_sdk_s3::Client::from_conf(
        aws_sdk_s3::config::Builder::from(&sdk_config)
            .endpoint_url(&cfg.object_store_url)
            .force_path_style(true)
            .build(),
    );

    let deps = Collaborators {
        faces: Arc::new(HttpFaceService::new(http.clone(), face_service_url)),
        objects: Arc::new(S3CompatObjectStore::new(s3, cfg.upload_bucket.clone())),
        mappings: Arc::new(mapping_store),
        callbacks: Arc::new(HttpCallbackSender::new(http)),
    };

    // --- Build router ---
    let app: Router = routes::routes::routes().with_state(AppState::new(&cfg, deps));

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
