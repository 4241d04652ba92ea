use crate::commands;
use crate::config::AppConfig;
use crate::error::AppError;
use crate::services::classifier::model_manager::ModelManager;
use crate::services::fetcher::Fetcher;
use crate::services::progress::LogProgress;
use crate::services::verdict::VerdictExtractor;
use crate::state::AppState;
use std::sync::Arc;
use tracing::{error, info, warn};

pub async fn run(config: AppConfig) -> Result<(), AppError> {
    let models = ModelManager::new(config.generator.clone());
    let state = AppState {
        models: models.clone(),
        extractor: Arc::new(VerdictExtractor::new(&config.verdict)),
    };

    // Bind first so the page can show loading progress
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| AppError {
        message: format!("Failed to bind {}: {}", addr, e),
    })?;
    info!("Scam message predictor listening on http://{}", addr);

    tokio::spawn(bootstrap(models, config));

    axum::serve(listener, commands::router(state))
        .await
        .map_err(|e| AppError {
            message: format!("Server error: {}", e),
        })
}

/// Fetch missing artifacts when allowed, then load the model once
async fn bootstrap(models: ModelManager, config: AppConfig) {
    if !models.is_downloaded() && config.generator.auto_download {
        info!(dir = %models.model_dir().display(), "Model files missing, downloading");
        match Fetcher::new(&config.fetch) {
            Ok(fetcher) => {
                let summary = models.download_missing(&fetcher, &LogProgress::default()).await;
                info!("{}", summary);
            }
            Err(e) => error!(error = %e, "Cannot download model files"),
        }
    }

    if !models.is_downloaded() {
        warn!(
            dir = %models.model_dir().display(),
            "Model files missing; run `scam-predictor download` and restart"
        );
        return;
    }

    info!("Loading model...");
    if let Err(e) = models.load_model().await {
        error!(error = %e, "Failed to load model");
    }
}
