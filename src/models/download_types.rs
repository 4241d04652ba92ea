use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// One manifest entry resolved against the artifact directory
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct DownloadTask {
    pub file_name: String,
    pub url: String,
    pub destination: PathBuf,
}

impl DownloadTask {
    /// Where bytes land while the transfer is in flight
    pub fn partial_path(&self) -> PathBuf {
        let mut name = self.destination.clone().into_os_string();
        name.push(".part");
        PathBuf::from(name)
    }
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DownloadStatus {
    Completed,
    /// Destination already present, nothing fetched
    Skipped,
    Failed,
}

#[derive(Debug, Serialize, Clone)]
pub struct DownloadOutcome {
    pub task: DownloadTask,
    pub status: DownloadStatus,
    pub bytes_transferred: u64,
    /// Content-Length reported by the server, if any
    pub expected_bytes: Option<u64>,
    pub error: Option<String>,
}

impl DownloadOutcome {
    pub fn succeeded(&self) -> bool {
        self.status != DownloadStatus::Failed
    }
}

#[derive(Debug, Serialize, Clone, Default)]
pub struct DownloadSummary {
    pub outcomes: Vec<DownloadOutcome>,
}

impl DownloadSummary {
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.succeeded()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &DownloadOutcome> {
        self.outcomes.iter().filter(|o| !o.succeeded())
    }

    pub fn all_succeeded(&self) -> bool {
        self.succeeded() == self.total()
    }
}

impl fmt::Display for DownloadSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} files downloaded successfully",
            self.succeeded(),
            self.total()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(name: &str, status: DownloadStatus) -> DownloadOutcome {
        DownloadOutcome {
            task: DownloadTask {
                file_name: name.to_string(),
                url: format!("http://localhost/{}", name),
                destination: PathBuf::from("model_files").join(name),
            },
            status,
            bytes_transferred: 0,
            expected_bytes: None,
            error: (status == DownloadStatus::Failed).then(|| "HTTP 404".to_string()),
        }
    }

    #[test]
    fn test_summary_counts_skipped_as_success() {
        let summary = DownloadSummary {
            outcomes: vec![
                outcome("a", DownloadStatus::Completed),
                outcome("b", DownloadStatus::Skipped),
                outcome("c", DownloadStatus::Failed),
            ],
        };
        assert_eq!(summary.succeeded(), 2);
        assert_eq!(summary.total(), 3);
        assert_eq!(summary.failures().count(), 1);
        assert_eq!(summary.to_string(), "2/3 files downloaded successfully");
    }

    #[test]
    fn test_partial_path_keeps_extension() {
        let task = outcome("model.onnx", DownloadStatus::Completed).task;
        assert_eq!(task.partial_path(), PathBuf::from("model_files/model.onnx.part"));
    }
}
