pub mod api;
pub mod config;
pub mod convert;
pub mod error;
pub mod logic;
pub mod model;
pub mod store;

use axum::Router;
use std::sync::Arc;

use crate::api::{create_router, Frontend};
use crate::config::{AppConfig, StoreBackend};
use crate::convert::ApiVersions;
use crate::logic::{ClusterProvisioner, LoggingProvisioner, MutationOrchestrator, OperationTracker};
use crate::store::{MemoryStore, PostgresStore, Store};

pub use error::{FrontendError, StoreError};
pub use model::*;

/// Router over `store` with every supported API version registered.
pub fn create_app<S: Store>(
    store: Arc<S>,
    provisioner: Arc<dyn ClusterProvisioner>,
    config: &AppConfig,
) -> Router {
    let retry = config.retry_config();
    let tracker = OperationTracker::new(store.clone(), retry.clone(), config.operation_ttl());
    let orchestrator = MutationOrchestrator::new(
        store,
        tracker,
        provisioner,
        retry,
        config.server.location.clone(),
    );
    let frontend = Frontend::new(ApiVersions::default(), orchestrator);
    create_router::<S>().with_state(Arc::new(frontend))
}

/// Build the router for the configured backend.
pub async fn build_app(config: &AppConfig) -> anyhow::Result<Router> {
    let provisioner: Arc<dyn ClusterProvisioner> = Arc::new(LoggingProvisioner);
    match config.database.backend {
        StoreBackend::Memory => Ok(create_app(Arc::new(MemoryStore::new()), provisioner, config)),
        StoreBackend::Postgres => {
            let database_url = config.database_url()?;
            let max_connections = config.database.max_connections.unwrap_or(20);
            let postgres_store = PostgresStore::new(&database_url, max_connections).await?;
            postgres_store.migrate().await?;
            Ok(create_app(Arc::new(postgres_store), provisioner, config))
        }
    }
}

// Function for integration testing
pub async fn run_server() -> anyhow::Result<()> {
    use axum::serve;
    use tokio::net::TcpListener;

    dotenvy::dotenv().ok();

    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();

    let config = AppConfig::load()?;
    let app = build_app(&config).await?;

    let listener = TcpListener::bind(&config.server_address()).await?;
    serve(listener, app).await?;

    Ok(())
}
