use std::sync::Arc;

use rcpt_image::ResizeOrchestrator;
use rcpt_store::{JsonFileStore, ReceiptStore};
use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::build_router;
use crate::uploads::UploadDir;
use crate::workflow::ReceiptService;

/// Receipt upload server.
pub struct ReceiptServer {
    config: ServerConfig,
}

impl ReceiptServer {
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Validate the config, create the upload directory, and load the store.
    pub async fn service(&self) -> ServerResult<Arc<ReceiptService>> {
        self.config.validate()?;

        let uploads = UploadDir::new(&self.config.upload_dir);
        uploads.ensure().await?;
        tracing::info!(upload_dir = %uploads.root().display(), "upload directory ready");

        let store = JsonFileStore::open(&self.config.store_path, self.config.persist_policy)?;
        tracing::info!(
            store = %self.config.store_path.display(),
            receipts = store.len()?,
            policy = ?store.policy(),
            "receipt store loaded"
        );

        let orchestrator =
            ResizeOrchestrator::new(self.config.max_concurrent_resizes, self.config.jpeg_quality);
        Ok(Arc::new(ReceiptService::new(
            Arc::new(store),
            orchestrator,
            uploads,
            self.config.resize_timeout(),
        )))
    }

    /// Build the router (useful for testing).
    pub async fn router(&self) -> ServerResult<axum::Router> {
        Ok(build_router(self.service().await?, self.config.max_upload_bytes))
    }

    /// Start serving requests until Ctrl-C.
    pub async fn serve(self) -> ServerResult<()> {
        let app = self.router().await?;
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        tracing::info!("receipt server listening on {}", self.config.bind_addr);
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "could not listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
