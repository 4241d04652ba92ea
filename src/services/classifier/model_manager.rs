use crate::config::GeneratorConfig;
use crate::error::AppError;
use crate::models::classify_types::ModelStatus;
use crate::models::download_types::DownloadSummary;
use crate::services::classifier::generator::{OnnxGenerator, TextGenerator};
use crate::services::fetcher::{FetchOptions, Fetcher};
use crate::services::progress::ProgressReporter;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Owns the generative model for the lifetime of the process.
///
/// Created once at startup and handed to the request path through the app
/// state; requests only ever get a shared read-only handle to the generator.
#[derive(Clone)]
pub struct ModelManager {
    config: GeneratorConfig,
    generator: Arc<RwLock<Option<Arc<dyn TextGenerator>>>>,
    loading: Arc<Mutex<bool>>,
    error: Arc<Mutex<Option<String>>>,
}

impl ModelManager {
    pub fn new(config: GeneratorConfig) -> Self {
        Self {
            config,
            generator: Arc::new(RwLock::new(None)),
            loading: Arc::new(Mutex::new(false)),
            error: Arc::new(Mutex::new(None)),
        }
    }

    /// Manager with an already-built generator, bypassing file loading
    pub fn with_generator(config: GeneratorConfig, generator: Arc<dyn TextGenerator>) -> Self {
        let manager = Self::new(config);
        manager.install(generator);
        manager
    }

    pub fn model_dir(&self) -> &PathBuf {
        &self.config.model_dir
    }

    /// Every manifest file plus the three the loader opens directly
    fn required_files(&self) -> Vec<PathBuf> {
        let runtime = [
            &self.config.model_file,
            &self.config.tokenizer_file,
            &self.config.config_file,
        ];
        let mut files: Vec<PathBuf> = self
            .config
            .files
            .iter()
            .map(|entry| &entry.file)
            .chain(runtime)
            .map(|name| self.config.model_dir.join(name))
            .collect();
        files.sort();
        files.dedup();
        files
    }

    pub fn is_downloaded(&self) -> bool {
        self.required_files().iter().all(|p| p.exists())
    }

    pub fn is_ready(&self) -> bool {
        self.generator.read().map(|g| g.is_some()).unwrap_or(false)
    }

    pub async fn is_loading(&self) -> bool {
        *self.loading.lock().await
    }

    pub async fn get_error(&self) -> Option<String> {
        self.error.lock().await.clone()
    }

    pub async fn status(&self) -> ModelStatus {
        ModelStatus {
            downloaded: self.is_downloaded(),
            loading: self.is_loading().await,
            ready: self.is_ready(),
            error: self.get_error().await,
        }
    }

    /// Shared handle to the loaded generator
    pub fn generator(&self) -> Result<Arc<dyn TextGenerator>, AppError> {
        self.generator
            .read()
            .map_err(|_| AppError::from("Model lock poisoned"))?
            .clone()
            .ok_or_else(|| "Model not loaded".into())
    }

    fn install(&self, generator: Arc<dyn TextGenerator>) {
        if let Ok(mut slot) = self.generator.write() {
            *slot = Some(generator);
        }
    }

    /// Fetch whichever manifest files are missing from the model directory
    pub async fn download_missing(&self, fetcher: &Fetcher, reporter: &dyn ProgressReporter) -> DownloadSummary {
        fetcher
            .fetch_all(
                &self.config.files,
                &self.config.model_dir,
                FetchOptions { skip_existing: true },
                reporter,
            )
            .await
    }

    pub async fn load_model(&self) -> Result<(), AppError> {
        if self.is_ready() {
            return Ok(());
        }

        {
            let mut loading = self.loading.lock().await;
            if *loading {
                return Err("Model is already loading".into());
            }
            *loading = true;
        }

        *self.error.lock().await = None;

        let config = self.config.clone();
        let result = tokio::task::spawn_blocking(move || OnnxGenerator::load(&config))
            .await
            .map_err(|e| AppError {
                message: format!("Failed to spawn model loading task: {}", e),
            })
            .and_then(|loaded| loaded);

        *self.loading.lock().await = false;

        match result {
            Ok(generator) => {
                self.install(Arc::new(generator));
                info!(dir = %self.config.model_dir.display(), "Model loaded");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Model failed to load");
                *self.error.lock().await = Some(e.message.clone());
                Err(e)
            }
        }
    }
}
