use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_BIND: &str = "0.0.0.0:8080";
pub const DEFAULT_METRICS_BIND: &str = "0.0.0.0:9090";
pub const DEFAULT_PG_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_PG_CONNECT_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_PG_ACQUIRE_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectoryBackend {
    Memory,
    Postgres,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PostgresConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_acquire_timeout_ms")]
    pub acquire_timeout_ms: u64,
}

fn default_max_connections() -> u32 {
    DEFAULT_PG_MAX_CONNECTIONS
}

fn default_connect_timeout_ms() -> u64 {
    DEFAULT_PG_CONNECT_TIMEOUT_MS
}

fn default_acquire_timeout_ms() -> u64 {
    DEFAULT_PG_ACQUIRE_TIMEOUT_MS
}

// Tender service configuration sourced from environment variables.
#[derive(Debug, Clone)]
pub struct TendersConfig {
    pub bind_addr: SocketAddr,
    pub metrics_bind: SocketAddr,
    pub storage: StorageBackend,
    pub directory: DirectoryBackend,
    pub postgres: Option<PostgresConfig>,
    pub directory_seed: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct TendersConfigOverride {
    bind_addr: Option<String>,
    metrics_bind: Option<String>,
    storage: Option<StorageBackend>,
    directory: Option<DirectoryBackend>,
    postgres: Option<PostgresConfig>,
    directory_seed: Option<PathBuf>,
}

impl TendersConfig {
    pub fn from_env() -> Result<Self> {
        let bind_addr = std::env::var("SERVER_ADDRESS")
            .unwrap_or_else(|_| DEFAULT_BIND.to_string())
            .parse()
            .with_context(|| "parse SERVER_ADDRESS")?;
        let metrics_bind = std::env::var("TENDERS_METRICS_BIND")
            .unwrap_or_else(|_| DEFAULT_METRICS_BIND.to_string())
            .parse()
            .with_context(|| "parse TENDERS_METRICS_BIND")?;
        let storage = match std::env::var("TENDERS_STORAGE") {
            Ok(value) => parse_storage(&value)?,
            Err(_) => StorageBackend::Memory,
        };
        let directory = match std::env::var("TENDERS_DIRECTORY") {
            Ok(value) => parse_directory(&value)?,
            Err(_) => DirectoryBackend::Postgres,
        };
        let postgres = match std::env::var("POSTGRES_CONN") {
            Ok(url) => Some(PostgresConfig {
                url,
                max_connections: env_number("POSTGRES_MAX_CONNECTIONS")?
                    .unwrap_or(DEFAULT_PG_MAX_CONNECTIONS),
                connect_timeout_ms: env_number("POSTGRES_CONNECT_TIMEOUT_MS")?
                    .unwrap_or(DEFAULT_PG_CONNECT_TIMEOUT_MS),
                acquire_timeout_ms: env_number("POSTGRES_ACQUIRE_TIMEOUT_MS")?
                    .unwrap_or(DEFAULT_PG_ACQUIRE_TIMEOUT_MS),
            }),
            Err(_) => None,
        };
        let directory_seed = std::env::var("TENDERS_DIRECTORY_SEED")
            .ok()
            .map(PathBuf::from);
        Ok(Self {
            bind_addr,
            metrics_bind,
            storage,
            directory,
            postgres,
            directory_seed,
        })
    }

    pub fn from_env_or_yaml() -> Result<Self> {
        let mut config = Self::from_env()?;
        if let Ok(path) = std::env::var("TENDERS_CONFIG") {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("read TENDERS_CONFIG: {path}"))?;
            let override_cfg: TendersConfigOverride =
                serde_yaml::from_str(&contents).with_context(|| "parse tenders config yaml")?;
            config.apply(override_cfg)?;
        }
        Ok(config)
    }

    fn apply(&mut self, override_cfg: TendersConfigOverride) -> Result<()> {
        if let Some(value) = override_cfg.bind_addr {
            self.bind_addr = value.parse().with_context(|| "parse bind_addr")?;
        }
        if let Some(value) = override_cfg.metrics_bind {
            self.metrics_bind = value.parse().with_context(|| "parse metrics_bind")?;
        }
        if let Some(value) = override_cfg.storage {
            self.storage = value;
        }
        if let Some(value) = override_cfg.directory {
            self.directory = value;
        }
        if let Some(value) = override_cfg.postgres {
            self.postgres = Some(value);
        }
        if let Some(value) = override_cfg.directory_seed {
            self.directory_seed = Some(value);
        }
        Ok(())
    }

    /// True when any configured backend needs a Postgres pool.
    pub fn needs_postgres(&self) -> bool {
        self.storage == StorageBackend::Postgres || self.directory == DirectoryBackend::Postgres
    }
}

fn parse_storage(value: &str) -> Result<StorageBackend> {
    match value.trim().to_ascii_lowercase().as_str() {
        "memory" => Ok(StorageBackend::Memory),
        "postgres" => Ok(StorageBackend::Postgres),
        other => bail!("unknown TENDERS_STORAGE backend: {other}"),
    }
}

fn parse_directory(value: &str) -> Result<DirectoryBackend> {
    match value.trim().to_ascii_lowercase().as_str() {
        "memory" => Ok(DirectoryBackend::Memory),
        "postgres" => Ok(DirectoryBackend::Postgres),
        other => bail!("unknown TENDERS_DIRECTORY backend: {other}"),
    }
}

fn env_number<T>(key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(value) => value
            .parse()
            .map(Some)
            .with_context(|| format!("parse {key}")),
        Err(_) => Ok(None),
    }
}
