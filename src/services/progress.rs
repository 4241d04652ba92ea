//! Progress sinks for the artifact fetcher.

use crate::models::download_types::{DownloadOutcome, DownloadStatus, DownloadTask};
use std::io::Write;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Receives fetcher events. `advanced` fires after every chunk written.
pub trait ProgressReporter: Send + Sync {
    fn started(&self, task: &DownloadTask);
    fn advanced(&self, task: &DownloadTask, transferred: u64, total: Option<u64>);
    fn finished(&self, outcome: &DownloadOutcome);
}

const UNKNOWN_TOTAL_STEP: u64 = 1024 * 1024;

/// Redraw marker: percent when the total is known, MiB otherwise
fn redraw_mark(transferred: u64, total: Option<u64>) -> u64 {
    match total {
        Some(total) if total > 0 => transferred.saturating_mul(100) / total,
        _ => transferred / UNKNOWN_TOTAL_STEP,
    }
}

/// Human-readable byte count using 1024-based units
pub fn human_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

pub fn progress_line(file_name: &str, transferred: u64, total: Option<u64>) -> String {
    match total {
        Some(total) if total > 0 => format!(
            "{}: {} / {} ({}%)",
            file_name,
            human_bytes(transferred),
            human_bytes(total),
            transferred.saturating_mul(100) / total
        ),
        _ => format!("{}: {}", file_name, human_bytes(transferred)),
    }
}

/// Longest gap between two console redraws while bytes keep arriving
const REDRAW_INTERVAL: Duration = Duration::from_millis(100);

/// Last console redraw: its mark and when it happened
#[derive(Debug, Default)]
struct Redraw {
    mark: Option<u64>,
    at: Option<Instant>,
}

impl Redraw {
    /// Redraw on a new mark, on completion, or once the interval has elapsed
    fn due(&self, mark: u64, complete: bool, now: Instant) -> bool {
        if complete || self.mark != Some(mark) {
            return true;
        }
        match self.at {
            Some(at) => now.duration_since(at) >= REDRAW_INTERVAL,
            None => true,
        }
    }
}

/// Terminal reporter on stderr with an in-place progress line
#[derive(Default)]
pub struct ConsoleProgress {
    last: Mutex<Redraw>,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressReporter for ConsoleProgress {
    fn started(&self, task: &DownloadTask) {
        if let Ok(mut last) = self.last.lock() {
            *last = Redraw::default();
        }
        eprintln!("Downloading {}...", task.file_name);
    }

    fn advanced(&self, task: &DownloadTask, transferred: u64, total: Option<u64>) {
        let mark = redraw_mark(transferred, total);
        let complete = total == Some(transferred);
        let now = Instant::now();
        let Ok(mut last) = self.last.lock() else {
            return;
        };
        if !last.due(mark, complete, now) {
            return;
        }
        *last = Redraw {
            mark: Some(mark),
            at: Some(now),
        };

        let mut stderr = std::io::stderr().lock();
        let _ = write!(stderr, "\r{}", progress_line(&task.file_name, transferred, total));
        let _ = stderr.flush();
    }

    fn finished(&self, outcome: &DownloadOutcome) {
        let name = &outcome.task.file_name;
        match outcome.status {
            DownloadStatus::Completed => eprintln!("\nDownloaded {} successfully!", name),
            DownloadStatus::Skipped => eprintln!("{} already present, skipped", name),
            DownloadStatus::Failed => eprintln!(
                "\nError downloading {}: {}",
                name,
                outcome.error.as_deref().unwrap_or("unknown error")
            ),
        }
    }
}

/// Reporter for non-interactive contexts, emits tracing events only
#[derive(Default)]
pub struct LogProgress {
    last_mark: Mutex<Option<u64>>,
}

impl ProgressReporter for LogProgress {
    fn started(&self, task: &DownloadTask) {
        if let Ok(mut last) = self.last_mark.lock() {
            *last = None;
        }
        info!(file = %task.file_name, "Download started");
    }

    fn advanced(&self, task: &DownloadTask, transferred: u64, total: Option<u64>) {
        let mark = redraw_mark(transferred, total);
        if let Ok(mut last) = self.last_mark.lock() {
            if *last != Some(mark) {
                *last = Some(mark);
                debug!(file = %task.file_name, transferred, total = ?total, "Download progress");
            }
        }
    }

    fn finished(&self, outcome: &DownloadOutcome) {
        match &outcome.error {
            None => info!(
                file = %outcome.task.file_name,
                status = ?outcome.status,
                bytes = outcome.bytes_transferred,
                "Download finished"
            ),
            Some(err) => warn!(file = %outcome.task.file_name, error = %err, "Download failed"),
        }
    }
}
