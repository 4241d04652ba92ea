use crate::config::{AppConfig, ManifestEntry};
use crate::error::AppError;
use crate::models::download_types::DownloadSummary;
use crate::services::fetcher::{FetchOptions, Fetcher};
use crate::services::progress::ConsoleProgress;
use clap::ValueEnum;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ArtifactTarget {
    /// Llama-3.2-1B-Instruct files for the analysis form
    Generator,
    /// Sequence-classification files for `classify`
    Classifier,
}

impl ArtifactTarget {
    pub fn manifest<'a>(&self, config: &'a AppConfig) -> (&'a [ManifestEntry], &'a Path) {
        match self {
            ArtifactTarget::Generator => (&config.generator.files, &config.generator.model_dir),
            ArtifactTarget::Classifier => (&config.classifier.files, &config.classifier.model_dir),
        }
    }
}

pub async fn run(
    config: &AppConfig,
    target: ArtifactTarget,
    dir: Option<PathBuf>,
    options: FetchOptions,
) -> Result<DownloadSummary, AppError> {
    let (manifest, default_dir) = target.manifest(config);
    let dir = dir.unwrap_or_else(|| default_dir.to_path_buf());

    let fetcher = Fetcher::new(&config.fetch)?;
    println!(
        "Downloading {} model files ({} entries) into {}...",
        match target {
            ArtifactTarget::Generator => "Llama-3.2-1B-Instruct",
            ArtifactTarget::Classifier => "fraud text classifier",
        },
        manifest.len(),
        dir.display()
    );

    let summary = fetcher
        .fetch_all(manifest, &dir, options, &ConsoleProgress::new())
        .await;

    println!("\nDownload complete! {}.", summary);
    for failed in summary.failures() {
        println!(
            "  {}: {}",
            failed.task.file_name,
            failed.error.as_deref().unwrap_or("unknown error")
        );
    }

    Ok(summary)
}
