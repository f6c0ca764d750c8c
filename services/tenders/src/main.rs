//! Tender service HTTP entry point.
//!
//! # Purpose
//! Wires configuration, storage, the directory, and the HTTP router, then
//! starts the API server and the metrics listener.
//!
//! # Notes
//! The `build_state` helper keeps wiring testable and minimizes main setup logic.
use anyhow::Context;
use std::future::Future;
use std::sync::Arc;
use tenders::app::{AppState, build_router};
use tenders::config::{self, DirectoryBackend, StorageBackend, TendersConfig};
use tenders::directory::Directory;
use tenders::directory::memory::InMemoryDirectory;
use tenders::directory::postgres::PostgresDirectory;
use tenders::observability;
use tenders::store::TenderStore;
use tenders::store::memory::InMemoryTenderStore;
use tenders::store::postgres::{PostgresTenderStore, connect_pool};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = TendersConfig::from_env_or_yaml().context("tenders config")?;
    run_with_shutdown(config, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await
}

async fn run_with_shutdown<F>(config: TendersConfig, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let metrics_handle = observability::init_observability("tenders")?;
    let state = build_state(&config).await?;
    tracing::info!(
        storage = state.store.backend_name(),
        durable = state.store.is_durable(),
        directory = state.directory.backend_name(),
        "backends ready"
    );
    let metrics_task = tokio::spawn(observability::serve_metrics(
        metrics_handle,
        config.metrics_bind,
    ));

    let app = build_router(state);
    let addr = config.bind_addr;
    tracing::info!(%addr, "tenders listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tokio::pin!(shutdown);
    tokio::select! {
        result = axum::serve(listener, app.into_make_service()) => {
            result?;
        }
        _ = &mut shutdown => {
            tracing::info!("shutdown requested");
        }
    }

    metrics_task.abort();
    let _ = metrics_task.await;
    Ok(())
}

async fn build_state(config: &TendersConfig) -> anyhow::Result<AppState> {
    let pool = if config.needs_postgres() {
        let pg = config
            .postgres
            .as_ref()
            .context("postgres configuration missing")?;
        Some(connect_pool(pg).await.context("connect to postgres")?)
    } else {
        None
    };

    let store: Arc<dyn TenderStore> = match (config.storage, &pool) {
        (StorageBackend::Memory, _) => Arc::new(InMemoryTenderStore::new()),
        (StorageBackend::Postgres, Some(pool)) => {
            Arc::new(PostgresTenderStore::with_pool(pool.clone(), true).await?)
        }
        (StorageBackend::Postgres, None) => anyhow::bail!("postgres configuration missing"),
    };

    let directory: Arc<dyn Directory> = match (config.directory, &pool) {
        (DirectoryBackend::Memory, _) => match &config.directory_seed {
            Some(path) => Arc::new(InMemoryDirectory::from_yaml_file(path)?),
            None => {
                tracing::warn!("in-memory directory has no seed; every username is unknown");
                Arc::new(InMemoryDirectory::new())
            }
        },
        (DirectoryBackend::Postgres, Some(pool)) => Arc::new(PostgresDirectory::new(pool.clone())),
        (DirectoryBackend::Postgres, None) => anyhow::bail!("postgres configuration missing"),
    };

    Ok(AppState { store, directory })
}
