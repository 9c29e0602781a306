use anyhow::{Context, Result};
use clap::Parser;
use std::{env, str::FromStr, time::Duration};
use uuid::Uuid;

use crate::services::recognition_service::DEFAULT_MATCH_THRESHOLD;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Face collection every enrollment and search is scoped to.
    pub collection_id: String,
    /// Bucket presigned uploads land in.
    pub upload_bucket: String,
    /// Key prefix for uploaded images, including the trailing `/`.
    pub upload_prefix: String,
    /// Origin that serves uploaded images to browsers.
    pub public_base_url: String,
    /// S3-compatible endpoint. Credentials come from the standard AWS chain.
    pub object_store_url: String,
    pub object_store_region: String,
    pub face_service_url: String,
    pub match_threshold: f32,
    pub dependency_timeout_secs: u64,
    /// Identifies this process in provisioning callbacks.
    pub log_stream_name: String,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Face enrollment and recognition API")]
pub struct Args {
    /// Host to bind to (overrides FACE_INDEX_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides FACE_INDEX_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Database URL (overrides FACE_INDEX_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Face collection id (overrides FACE_INDEX_COLLECTION_ID)
    #[arg(long)]
    pub collection_id: Option<String>,

    /// Face service base URL (overrides FACE_INDEX_FACE_SERVICE_URL)
    #[arg(long)]
    pub face_service_url: Option<String>,

    /// Object store endpoint (overrides FACE_INDEX_OBJECT_STORE_URL)
    #[arg(long)]
    pub object_store_url: Option<String>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3000,
            database_url: "sqlite://./data/meta/face_index.db".into(),
            collection_id: "face-index".into(),
            upload_bucket: "face-uploads".into(),
            upload_prefix: "index/static/".into(),
            public_base_url: "http://localhost:9000/face-uploads".into(),
            object_store_url: "http://localhost:9000".into(),
            object_store_region: "us-east-1".into(),
            face_service_url: "http://localhost:8500".into(),
            match_threshold: DEFAULT_MATCH_THRESHOLD,
            dependency_timeout_secs: 5,
            log_stream_name: format!("face-index/{}", Uuid::new_v4()),
        }
    }
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        // Parse CLI once
        let args = Args::parse();
        let defaults = Self::default();

        // --- Environment fallback ---
        let cfg = Self {
            host: args
                .host
                .unwrap_or(env_or("FACE_INDEX_HOST", defaults.host)?),
            port: match args.port {
                Some(port) => port,
                None => env_or("FACE_INDEX_PORT", defaults.port)?,
            },
            database_url: args
                .database_url
                .unwrap_or(env_or("FACE_INDEX_DATABASE_URL", defaults.database_url)?),
            collection_id: args
                .collection_id
                .unwrap_or(env_or("FACE_INDEX_COLLECTION_ID", defaults.collection_id)?),
            upload_bucket: env_or("FACE_INDEX_UPLOAD_BUCKET", defaults.upload_bucket)?,
            upload_prefix: env_or("FACE_INDEX_UPLOAD_PREFIX", defaults.upload_prefix)?,
            public_base_url: env_or("FACE_INDEX_PUBLIC_BASE_URL", defaults.public_base_url)?,
            object_store_url: args.object_store_url.unwrap_or(env_or(
                "FACE_INDEX_OBJECT_STORE_URL",
                defaults.object_store_url,
            )?),
            object_store_region: env_or(
                "FACE_INDEX_OBJECT_STORE_REGION",
                defaults.object_store_region,
            )?,
            face_service_url: args.face_service_url.unwrap_or(env_or(
                "FACE_INDEX_FACE_SERVICE_URL",
                defaults.face_service_url,
            )?),
            match_threshold: env_or("FACE_INDEX_MATCH_THRESHOLD", defaults.match_threshold)?,
            dependency_timeout_secs: env_or(
                "FACE_INDEX_DEPENDENCY_TIMEOUT_SECS",
                defaults.dependency_timeout_secs,
            )?,
            log_stream_name: env_or("FACE_INDEX_LOG_STREAM_NAME", defaults.log_stream_name)?,
        };

        Ok((cfg, args.migrate))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn dependency_timeout(&self) -> Duration {
        Duration::from_secs(self.dependency_timeout_secs)
    }
}

/// Read and parse an environment variable, falling back to `default` when unset.
fn env_or<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) => value
            .parse::<T>()
            .with_context(|| format!("parsing {} value `{}`", name, value)),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("reading {}", name)),
    }
}
