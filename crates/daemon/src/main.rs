//! Healthcheck Daemon - Main Entry Point
//! JSON-RPC server in front of the batch task coordinators

mod config;
mod telemetry;

use anyhow::Result;
use config::DaemonConfig;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

// Import workspace crates
use healthcheck_api_rpc::{RpcServer, RpcServerConfig};
use healthcheck_core::application::{Backends, BatchTaskService};
use healthcheck_core::port::id_provider::UuidProvider;
use healthcheck_core::port::time_provider::SystemTimeProvider;
use healthcheck_infra_memory::{InMemoryCache, InMemoryDocumentStore, InMemoryMessageBroker};
use healthcheck_infra_sqlite::{create_pool, run_migrations, SqliteTaskStore};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize logging (json for production, pretty for development)
    let log_format =
        std::env::var("HEALTHCHECK_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("healthcheck=info"))?;

    let fmt_layer = match log_format.as_str() {
        "json" => fmt::layer().json().boxed(),
        _ => fmt::layer().pretty().boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(telemetry::otel_layer()?)
        .init();

    info!("Healthcheck daemon v{} starting...", VERSION);

    // 2. Load configuration
    let config = DaemonConfig::from_env()?;
    info!(
        db_path = %config.db_path,
        phase_timeout_ms = config.coordinator.phase_timeout.as_millis() as u64,
        compensation_timeout_ms = config.coordinator.compensation_timeout.as_millis() as u64,
        "Configuration loaded"
    );

    // 3. Initialize database
    if let Some(parent) = std::path::Path::new(&config.db_path).parent() {
        if !config.db_path.starts_with("sqlite:") && !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    let pool = create_pool(&config.database_url()).await?;
    run_migrations(&pool).await?;

    // 4. Setup dependencies (DI wiring)
    let backends = Backends {
        store: Arc::new(SqliteTaskStore::new(pool.clone())),
        cache: Arc::new(InMemoryCache::new()),
        documents: Arc::new(InMemoryDocumentStore::new()),
        broker: Arc::new(InMemoryMessageBroker::new()),
    };
    let service = Arc::new(BatchTaskService::from_backends(
        backends,
        Arc::new(UuidProvider),
        Arc::new(SystemTimeProvider),
        config.coordinator,
    ));

    // 5. Start JSON-RPC server
    let rpc_config = RpcServerConfig {
        host: config.rpc_host.clone(),
        port: config.rpc_port,
    };
    let (rpc_handle, addr) = RpcServer::new(rpc_config, service)
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("RPC server start failed: {}", e))?;

    info!(addr = %addr, "System ready. Press Ctrl+C to shutdown");

    // 6. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;

    info!("Shutdown signal received. Exiting gracefully...");

    // 7. Graceful shutdown
    rpc_handle
        .stop()
        .map_err(|e| anyhow::anyhow!("RPC server stop failed: {}", e))?;
    rpc_handle.stopped().await;
    pool.close().await;
    telemetry::shutdown();

    info!("Shutdown complete.");

    Ok(())
}
