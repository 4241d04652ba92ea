mod common;

use common::{dead_addr, file_server, payload, spawn, spawn_truncating, Event, RecordingProgress};
use scam_predictor::config::{AppConfig, FetchConfig, ManifestEntry};
use scam_predictor::models::download_types::DownloadStatus;
use scam_predictor::services::fetcher::{FetchOptions, Fetcher};
use tempfile::TempDir;

fn fetch_config() -> FetchConfig {
    FetchConfig {
        connect_timeout_secs: 5,
        read_timeout_secs: 30,
        ..AppConfig::default().fetch
    }
}

fn entry(file: &str, url: String) -> ManifestEntry {
    ManifestEntry {
        file: file.to_string(),
        url,
    }
}

#[tokio::test]
async fn test_failures_are_isolated_per_file() {
    let addr = spawn(file_server()).await;
    let dead = dead_addr().await;
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("model_files");

    let manifest = vec![
        entry("config.json", format!("http://{}/bytes/10", addr)),
        entry("model.safetensors", format!("http://{}/bytes/100000", addr)),
        entry("tokenizer.json", format!("http://{}/missing", addr)),
        entry("tokenizer_config.json", format!("http://{}/bytes/20000", addr)),
        entry("special_tokens_map.json", format!("http://{}/bytes/10", dead)),
    ];

    let progress = RecordingProgress::default();
    let fetcher = Fetcher::new(&fetch_config()).unwrap();
    let summary = fetcher
        .fetch_all(&manifest, &dir, FetchOptions::default(), &progress)
        .await;

    assert_eq!(summary.total(), 5);
    assert_eq!(summary.succeeded(), 3);
    assert_eq!(summary.to_string(), "3/5 files downloaded successfully");

    let failed: Vec<&str> = summary.failures().map(|o| o.task.file_name.as_str()).collect();
    assert_eq!(failed, vec!["tokenizer.json", "special_tokens_map.json"]);
    for outcome in summary.failures() {
        assert!(!outcome.error.as_deref().unwrap_or("").is_empty());
        assert!(!outcome.task.destination.exists());
        assert!(!outcome.task.partial_path().exists());
    }
    assert!(summary.outcomes[2].error.as_deref().unwrap().contains("404"));

    for (name, size) in [("config.json", 10), ("model.safetensors", 100_000), ("tokenizer_config.json", 20_000)] {
        let outcome = summary.outcomes.iter().find(|o| o.task.file_name == name).unwrap();
        assert_eq!(outcome.status, DownloadStatus::Completed);
        assert_eq!(outcome.bytes_transferred, size as u64);
        assert_eq!(outcome.expected_bytes, Some(size as u64));
        assert_eq!(std::fs::read(dir.join(name)).unwrap(), payload(size));
        assert!(!outcome.task.partial_path().exists());
    }

    // Manifest order is kept and every task ends exactly once
    let finished: Vec<Event> = progress
        .events()
        .into_iter()
        .filter(|e| matches!(e, Event::Finished(..)))
        .collect();
    assert_eq!(finished.len(), 5);
    assert_eq!(finished[0], Event::Finished("config.json".to_string(), true));
    assert_eq!(finished[2], Event::Finished("tokenizer.json".to_string(), false));
}

#[tokio::test]
async fn test_progress_is_reported_per_chunk() {
    let addr = spawn(file_server()).await;
    let tmp = TempDir::new().unwrap();
    let manifest = vec![entry("model.onnx", format!("http://{}/bytes/100000", addr))];

    let progress = RecordingProgress::default();
    let config = fetch_config();
    let chunk = config.chunk_size as u64;
    let fetcher = Fetcher::new(&config).unwrap();
    fetcher
        .fetch_all(&manifest, tmp.path(), FetchOptions::default(), &progress)
        .await;

    let advances = progress.advances_for("model.onnx");
    assert_eq!(advances.first(), Some(&0));
    assert_eq!(advances.last(), Some(&100_000));
    assert!(advances.len() >= (100_000 / chunk) as usize);
    for pair in advances.windows(2) {
        assert!(pair[1] >= pair[0]);
        assert!(pair[1] - pair[0] <= chunk);
    }
    assert!(progress
        .events()
        .iter()
        .any(|e| *e == Event::Advanced("model.onnx".to_string(), 100_000, Some(100_000))));
}

#[tokio::test]
async fn test_unknown_length_is_accepted() {
    let addr = spawn(file_server()).await;
    let tmp = TempDir::new().unwrap();
    let manifest = vec![entry("model.onnx_data", format!("http://{}/stream/30000", addr))];

    let fetcher = Fetcher::new(&fetch_config()).unwrap();
    let summary = fetcher
        .fetch_all(&manifest, tmp.path(), FetchOptions::default(), &RecordingProgress::default())
        .await;

    let outcome = &summary.outcomes[0];
    assert_eq!(outcome.status, DownloadStatus::Completed);
    assert_eq!(outcome.expected_bytes, None);
    assert_eq!(outcome.bytes_transferred, 30_000);
    assert_eq!(std::fs::read(tmp.path().join("model.onnx_data")).unwrap(), payload(30_000));
}

#[tokio::test]
async fn test_directory_creation_is_idempotent() {
    let addr = spawn(file_server()).await;
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("a").join("b").join("model_files");
    let manifest = vec![
        entry("config.json", format!("http://{}/bytes/64", addr)),
        entry("onnx/model.onnx", format!("http://{}/bytes/4096", addr)),
        entry("tokenizer.json", format!("http://{}/missing", addr)),
    ];

    let fetcher = Fetcher::new(&fetch_config()).unwrap();
    let first = fetcher
        .fetch_all(&manifest, &dir, FetchOptions::default(), &RecordingProgress::default())
        .await;
    let second = fetcher
        .fetch_all(&manifest, &dir, FetchOptions::default(), &RecordingProgress::default())
        .await;

    assert!(dir.join("onnx").join("model.onnx").exists());
    let partition = |s: &scam_predictor::models::download_types::DownloadSummary| {
        s.outcomes.iter().map(|o| o.succeeded()).collect::<Vec<_>>()
    };
    assert_eq!(partition(&first), vec![true, true, false]);
    assert_eq!(partition(&first), partition(&second));
}

#[tokio::test]
async fn test_skip_existing_leaves_files_alone() {
    let dead = dead_addr().await;
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("config.json"), b"local copy").unwrap();

    let manifest = vec![
        entry("config.json", format!("http://{}/config.json", dead)),
        entry("model.onnx", format!("http://{}/model.onnx", dead)),
    ];

    let fetcher = Fetcher::new(&fetch_config()).unwrap();
    let summary = fetcher
        .fetch_all(
            &manifest,
            tmp.path(),
            FetchOptions { skip_existing: true },
            &RecordingProgress::default(),
        )
        .await;

    assert_eq!(summary.outcomes[0].status, DownloadStatus::Skipped);
    assert_eq!(summary.outcomes[1].status, DownloadStatus::Failed);
    assert_eq!(summary.to_string(), "1/2 files downloaded successfully");
    assert_eq!(std::fs::read(tmp.path().join("config.json")).unwrap(), b"local copy");
}

#[tokio::test]
async fn test_short_body_removes_partial_file() {
    let addr = spawn_truncating(10_000, 4096).await;
    let tmp = TempDir::new().unwrap();
    let manifest = vec![entry("model.onnx_data", format!("http://{}/model.onnx_data", addr))];

    let fetcher = Fetcher::new(&fetch_config()).unwrap();
    let summary = fetcher
        .fetch_all(&manifest, tmp.path(), FetchOptions::default(), &RecordingProgress::default())
        .await;

    let outcome = &summary.outcomes[0];
    assert_eq!(outcome.status, DownloadStatus::Failed);
    assert!(!outcome.error.as_deref().unwrap_or("").is_empty());
    assert!(outcome.bytes_transferred <= 4096);
    assert_eq!(outcome.expected_bytes, Some(10_000));
    assert!(!outcome.task.destination.exists());
    assert!(!outcome.task.partial_path().exists());
    assert_eq!(summary.to_string(), "0/1 files downloaded successfully");
}

#[tokio::test]
async fn test_slow_transfer_outlives_read_timeout() {
    let addr = spawn(file_server()).await;
    let tmp = TempDir::new().unwrap();
    // Four reads 600 ms apart: 2.4 s overall, never 2 s without data
    let manifest = vec![entry("model.onnx_data", format!("http://{}/trickle/4/600", addr))];

    let config = FetchConfig {
        read_timeout_secs: 2,
        ..fetch_config()
    };
    let fetcher = Fetcher::new(&config).unwrap();
    let summary = fetcher
        .fetch_all(&manifest, tmp.path(), FetchOptions::default(), &RecordingProgress::default())
        .await;

    let outcome = &summary.outcomes[0];
    assert_eq!(outcome.status, DownloadStatus::Completed, "{:?}", outcome.error);
    assert_eq!(outcome.bytes_transferred, 4096);
    assert!(outcome.task.destination.exists());
}

#[tokio::test]
async fn test_stalled_transfer_fails_cleanly() {
    let addr = spawn(file_server()).await;
    let tmp = TempDir::new().unwrap();
    let manifest = vec![
        entry("model.onnx_data", format!("http://{}/trickle/2/2500", addr)),
        entry("config.json", format!("http://{}/bytes/32", addr)),
    ];

    let config = FetchConfig {
        read_timeout_secs: 1,
        ..fetch_config()
    };
    let fetcher = Fetcher::new(&config).unwrap();
    let summary = fetcher
        .fetch_all(&manifest, tmp.path(), FetchOptions::default(), &RecordingProgress::default())
        .await;

    let stalled = &summary.outcomes[0];
    assert_eq!(stalled.status, DownloadStatus::Failed);
    assert!(!stalled.task.destination.exists());
    assert!(!stalled.task.partial_path().exists());
    assert_eq!(summary.outcomes[1].status, DownloadStatus::Completed);
}
