//! Sequential, fault-isolated download of a manifest of model artifacts.
//!
//! Bytes stream into `<destination>.part` and are renamed into place only once
//! the transfer is complete, so a destination file exists iff its outcome
//! succeeded.

use crate::config::{FetchConfig, ManifestEntry};
use crate::error::AppError;
use crate::models::download_types::{DownloadOutcome, DownloadStatus, DownloadSummary, DownloadTask};
use crate::services::progress::ProgressReporter;
use futures::StreamExt;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, Default)]
pub struct FetchOptions {
    /// Report entries whose destination already exists as skipped
    pub skip_existing: bool,
}

pub struct Fetcher {
    client: reqwest::Client,
    chunk_size: usize,
}

/// Byte counters of the transfer in flight
#[derive(Default)]
struct Transfer {
    transferred: u64,
    expected: Option<u64>,
}

impl Fetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .read_timeout(Duration::from_secs(config.read_timeout_secs))
            .user_agent(concat!("scam-predictor/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            chunk_size: config.chunk_size.max(1),
        })
    }

    /// Resolve manifest entries against the artifact directory, keeping order
    pub fn tasks(manifest: &[ManifestEntry], dir: &Path) -> Vec<DownloadTask> {
        manifest
            .iter()
            .map(|entry| DownloadTask {
                file_name: entry.file.clone(),
                url: entry.url.clone(),
                destination: dir.join(&entry.file),
            })
            .collect()
    }

    /// Fetch every entry, one at a time. Never aborts early: each failure is
    /// recorded in its outcome and the next entry proceeds.
    pub async fn fetch_all(
        &self,
        manifest: &[ManifestEntry],
        dir: &Path,
        options: FetchOptions,
        reporter: &dyn ProgressReporter,
    ) -> DownloadSummary {
        if let Err(e) = tokio::fs::create_dir_all(dir).await {
            // Every entry will fail on its own with a precise detail
            warn!(dir = %dir.display(), error = %e, "Failed to create artifact directory");
        }

        let mut summary = DownloadSummary::default();
        for task in Self::tasks(manifest, dir) {
            let outcome = if options.skip_existing && task.destination.exists() {
                debug!(file = %task.file_name, "Already present, skipping");
                DownloadOutcome {
                    task,
                    status: DownloadStatus::Skipped,
                    bytes_transferred: 0,
                    expected_bytes: None,
                    error: None,
                }
            } else {
                self.fetch_one(task, reporter).await
            };

            reporter.finished(&outcome);
            summary.outcomes.push(outcome);
        }

        info!(
            succeeded = summary.succeeded(),
            total = summary.total(),
            "Artifact fetch finished"
        );
        summary
    }

    async fn fetch_one(&self, task: DownloadTask, reporter: &dyn ProgressReporter) -> DownloadOutcome {
        info!(file = %task.file_name, url = %task.url, "Downloading artifact");
        reporter.started(&task);

        let mut transfer = Transfer::default();
        let result = self.stream_to_disk(&task, reporter, &mut transfer).await;

        match result {
            Ok(()) => {
                info!(file = %task.file_name, bytes = transfer.transferred, "Artifact downloaded");
                DownloadOutcome {
                    task,
                    status: DownloadStatus::Completed,
                    bytes_transferred: transfer.transferred,
                    expected_bytes: transfer.expected,
                    error: None,
                }
            }
            Err(e) => {
                warn!(file = %task.file_name, error = %e, "Artifact download failed");
                let part = task.partial_path();
                if part.exists() {
                    if let Err(rm) = tokio::fs::remove_file(&part).await {
                        warn!(path = %part.display(), error = %rm, "Failed to remove partial file");
                    }
                }
                DownloadOutcome {
                    task,
                    status: DownloadStatus::Failed,
                    bytes_transferred: transfer.transferred,
                    expected_bytes: transfer.expected,
                    error: Some(e.message),
                }
            }
        }
    }

    async fn stream_to_disk(
        &self,
        task: &DownloadTask,
        reporter: &dyn ProgressReporter,
        transfer: &mut Transfer,
    ) -> Result<(), AppError> {
        if let Some(parent) = task.destination.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| AppError {
                message: format!("Failed to create directory {}: {}", parent.display(), e),
            })?;
        }

        let response = self.client.get(&task.url).send().await.map_err(|e| AppError {
            message: format!("Request to {} failed: {}", task.url, e),
        })?;

        if !response.status().is_success() {
            return Err(format!("Failed to download {}: HTTP {}", task.url, response.status()).into());
        }

        transfer.expected = response.content_length();
        reporter.advanced(task, 0, transfer.expected);

        let part = task.partial_path();
        let mut file = tokio::fs::File::create(&part).await.map_err(|e| AppError {
            message: format!("Failed to create file {}: {}", part.display(), e),
        })?;

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| AppError {
                message: format!("Transfer interrupted after {} bytes: {}", transfer.transferred, e),
            })?;

            for piece in chunk.chunks(self.chunk_size) {
                file.write_all(piece).await.map_err(|e| AppError {
                    message: format!("Failed to write to file {}: {}", part.display(), e),
                })?;
                transfer.transferred += piece.len() as u64;
                reporter.advanced(task, transfer.transferred, transfer.expected);
            }
        }

        file.flush().await?;
        drop(file);

        if let Some(expected) = transfer.expected {
            if transfer.transferred != expected {
                return Err(format!(
                    "Incomplete download: received {} of {} bytes",
                    transfer.transferred, expected
                )
                .into());
            }
        }

        tokio::fs::rename(&part, &task.destination).await.map_err(|e| AppError {
            message: format!("Failed to move {} into place: {}", part.display(), e),
        })?;

        Ok(())
    }
}
