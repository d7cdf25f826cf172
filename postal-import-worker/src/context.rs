use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::catalog::CatalogClient;
use crate::config::Config;
use crate::error::ImportError;
use crate::sink::{BatchWriter, Destination, MemoryDestination, PostgresDestination};

/// Constructed once by the entrypoint and passed by parameter into the
/// orchestrator; there is no ambient/global destination client.
pub struct AppContext {
    pub config: Config,
    pub catalog: CatalogClient,
    pub writer: BatchWriter,
}

impl AppContext {
    pub async fn new(config: &Config, dry_run: bool) -> Result<Self, ImportError> {
        let catalog = CatalogClient::new(
            &config.catalog_base_url,
            Duration::from_secs(config.catalog_timeout_seconds),
        )?;

        let destination: Arc<dyn Destination> = if dry_run {
            info!("dry run: writing to the in-memory destination");
            Arc::new(MemoryDestination::default())
        } else {
            let pool = PgPoolOptions::new()
                .max_connections(config.max_pg_connections)
                .connect(&config.database_url)
                .await
                .map_err(|e| {
                    ImportError::Configuration(format!("cannot connect to destination: {e}"))
                })?;
            Arc::new(PostgresDestination::new(pool))
        };

        Ok(Self {
            config: config.clone(),
            catalog,
            writer: BatchWriter::new(destination),
        })
    }

    /// Wire ctrl-c to a cancellation token. The orchestrator checks it every
    /// iteration, so shutdown lands on a page boundary.
    pub fn spawn_shutdown_listener(&self) -> CancellationToken {
        let token = CancellationToken::new();
        let cancel = token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("shutdown signal received, finishing the current page");
                cancel.cancel();
            }
        });
        token
    }
}
