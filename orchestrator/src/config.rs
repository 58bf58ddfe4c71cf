//! Configuración del orquestador: variables de entorno con defaults locales,
//! pisadas por los flags de la CLI y validadas antes de correr nada.

use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use common::{ChunkStore, FsStore};
use reqwest::Url;
use thiserror::Error;

use crate::retry::RetryPolicy;

pub const DEFAULT_BUCKET: &str = "split-bucket";
pub const DEFAULT_INPUT_KEY: &str = "input.txt";
pub const DEFAULT_MAPPER_URL: &str = "http://localhost:8081";
pub const DEFAULT_REDUCER_URL: &str = "http://localhost:8082";
pub const DEFAULT_STORE_DIR: &str = "/data/store";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_SCALE_SEQUENCE: [usize; 5] = [1, 2, 3, 5, 10];

/// - En Docker: SPLIT_BUCKET=<bucket del compose>
/// - Local: default "split-bucket"
pub fn default_bucket() -> String {
    env::var("SPLIT_BUCKET").unwrap_or_else(|_| DEFAULT_BUCKET.to_string())
}

pub fn default_input_key() -> String {
    env::var("INPUT_KEY").unwrap_or_else(|_| DEFAULT_INPUT_KEY.to_string())
}

/// MAPPER_URLS admite varias URLs separadas por coma.
pub fn default_mapper_urls() -> String {
    env::var("MAPPER_URLS").unwrap_or_else(|_| DEFAULT_MAPPER_URL.to_string())
}

pub fn default_reducer_url() -> String {
    env::var("REDUCER_URL").unwrap_or_else(|_| DEFAULT_REDUCER_URL.to_string())
}

/// "1,2,3,5,10"
pub fn default_scale_sequence() -> String {
    DEFAULT_SCALE_SEQUENCE
        .iter()
        .map(usize::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

pub fn default_store_dir() -> String {
    env::var("STORE_DIR").unwrap_or_else(|_| DEFAULT_STORE_DIR.to_string())
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("la cantidad de chunks debe ser mayor a 0")]
    ZeroChunks,

    #[error("max_attempts debe ser mayor a 0")]
    ZeroAttempts,

    #[error("no hay ningún mapper configurado")]
    NoMappers,

    #[error("URL inválida '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("el bucket no puede ser vacío")]
    EmptyBucket,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    /// `{root}/{bucket}/{key}`
    Fs { root: PathBuf },
    S3 {
        region: String,
        endpoint: Option<String>,
    },
}

impl StoreConfig {
    pub async fn open(&self) -> anyhow::Result<Arc<dyn ChunkStore>> {
        match self {
            StoreConfig::Fs { root } => Ok(Arc::new(FsStore::new(root.clone()))),
            #[cfg(feature = "s3")]
            StoreConfig::S3 { region, endpoint } => {
                let store = common::S3Store::connect(region, endpoint.clone()).await;
                Ok(Arc::new(store))
            }
            #[cfg(not(feature = "s3"))]
            StoreConfig::S3 { region, .. } => {
                anyhow::bail!("compilado sin la feature `s3` (region={region})")
            }
        }
    }
}

/// Todo lo que necesita una corrida, ya validado.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub bucket: String,
    pub input_key: String,
    pub mapper_urls: Vec<String>,
    pub reducer_url: String,
    pub store: StoreConfig,
    pub retry: RetryPolicy,
    pub request_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            bucket: DEFAULT_BUCKET.to_string(),
            input_key: DEFAULT_INPUT_KEY.to_string(),
            mapper_urls: vec![DEFAULT_MAPPER_URL.to_string()],
            reducer_url: DEFAULT_REDUCER_URL.to_string(),
            store: StoreConfig::Fs {
                root: PathBuf::from(DEFAULT_STORE_DIR),
            },
            retry: RetryPolicy::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl OrchestratorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bucket.trim().is_empty() {
            return Err(ConfigError::EmptyBucket);
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }
        if self.mapper_urls.is_empty() {
            return Err(ConfigError::NoMappers);
        }
        for url in self.mapper_urls.iter().chain(std::iter::once(&self.reducer_url)) {
            check_url(url)?;
        }
        Ok(())
    }
}

/// "http://a:8081, http://b:8081," -> ["http://a:8081", "http://b:8081"]
pub fn parse_url_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.trim_end_matches('/').to_string())
        .collect()
}

/// "1,2,3,5,10" -> [1, 2, 3, 5, 10]; un 0 es error de configuración.
pub fn parse_chunk_counts(raw: &str) -> Result<Vec<usize>, ConfigError> {
    let mut counts = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let n: usize = part.parse().map_err(|_| ConfigError::ZeroChunks)?;
        check_chunks(n)?;
        counts.push(n);
    }
    if counts.is_empty() {
        return Err(ConfigError::ZeroChunks);
    }
    Ok(counts)
}

pub fn check_chunks(n: usize) -> Result<usize, ConfigError> {
    if n == 0 {
        return Err(ConfigError::ZeroChunks);
    }
    Ok(n)
}

fn check_url(raw: &str) -> Result<(), ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::InvalidUrl {
            url: raw.to_string(),
            reason: format!("esquema no soportado: {other}"),
        }),
    }
}
