use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::matrix::{MatrixEngine, MatrixError};
use crate::repositories::UserStore;
use crate::settings::Settings;

pub mod http;
pub mod matrix;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Internal error: {0}")]
    Internal(String),
    #[error("Communication error: {0} - {1}")]
    Communication(String, String),
    #[error(transparent)]
    Matrix(#[from] MatrixError),
}

#[async_trait]
pub trait RequestHandler<T>: Send + Sync + 'static
where
    T: Send + 'static,
{
    async fn handle_request(&self, request: T);
}

#[async_trait]
pub trait Service<T, H>: Send + Sync + 'static
where
    T: Send + 'static,
    H: RequestHandler<T> + Clone + Send,
{
    async fn run(&mut self, handler: H, receiver: &mut mpsc::Receiver<T>) {
        while let Some(request) = receiver.recv().await {
            let handler = handler.clone();

            tokio::spawn(async move {
                handler.handle_request(request).await;
            });
        }
    }
}

pub async fn start_services(
    store: Arc<dyn UserStore>,
    settings: Settings,
    listen: &str,
) -> Result<(), anyhow::Error> {
    let engine = MatrixEngine::new(store, settings.matrix.max_retries);
    let (matrix_tx, mut matrix_rx) = mpsc::channel(settings.matrix.request_buffer);

    let mut matrix_service = matrix::MatrixService::new();

    log::info!("Starting matrix service.");
    let handler = matrix::MatrixRequestHandler::new(engine);
    handler
        .start_reconcile_task(
            Duration::from_secs(settings.matrix.reconcile_interval_secs),
            settings.matrix.reconcile_batch_size,
        )
        .await;
    tokio::spawn(async move {
        matrix_service.run(handler, &mut matrix_rx).await;
    });

    log::info!("Starting HTTP server.");
    http::start_http_server(listen, matrix_tx).await
}
