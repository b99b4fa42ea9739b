use std::sync::Arc;
use std::error::Error;
use tokio::net::TcpListener;
use axum::{Router, extract::DefaultBodyLimit, routing::{get, post}};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::classifier::Classifier;
use crate::config::ServerConfig;
use super::routes;

/// State shared by all handlers
#[derive(Clone)]
pub struct AppState {
    pub classifier: Arc<Classifier>,
    /// Fixed base URL for the frontend, overriding the forwarding headers
    pub public_url: Option<String>,
}

/// Builds the application router.
///
/// Any origin may call the API, so the frontend also works when it is
/// hosted somewhere else.
pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(routes::frontend))
        .route("/ping", get(routes::ping))
        .route("/predict", post(routes::predict))
        .route("/health/model", get(routes::model_health))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// API Server for classification requests
pub struct ApiServer {
    state: AppState,
    config: ServerConfig,
}

impl ApiServer {
    pub fn new(classifier: Arc<Classifier>, config: ServerConfig) -> Self {
        info!("Creating new API server on {}:{}", config.host, config.port);
        Self {
            state: AppState {
                classifier,
                public_url: config.public_url.clone(),
            },
            config,
        }
    }

    /// Loads the model on the blocking pool before traffic arrives.
    ///
    /// A failure here is only logged; the next request retries the load.
    pub async fn preload(&self) {
        let classifier = Arc::clone(&self.state.classifier);
        let outcome = tokio::task::spawn_blocking(move || classifier.loader().get_model()).await;
        match outcome {
            Ok(Ok(model)) => info!(size_bytes = model.size_bytes(), "Model preloaded"),
            Ok(Err(e)) => warn!("Model preload failed, will retry on first request: {}", e),
            Err(e) => warn!("Model preload task failed: {}", e),
        }
    }

    pub async fn start(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        if self.config.preload_model {
            self.preload().await;
        }

        let app = router(self.state.clone(), self.config.max_upload_bytes);

        info!("Starting server on {}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind((self.config.host.as_str(), self.config.port)).await?;

        info!("Server started successfully");
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        info!("Server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
