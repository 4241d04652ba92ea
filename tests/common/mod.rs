#![allow(dead_code)]

use axum::body::Body;
use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use scam_predictor::models::download_types::{DownloadOutcome, DownloadTask};
use scam_predictor::services::progress::ProgressReporter;
use std::net::SocketAddr;
use std::sync::Mutex;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Deterministic payload of `len` bytes
pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

async fn serve_file(Path(size): Path<usize>) -> Vec<u8> {
    payload(size)
}

async fn serve_stream(Path(size): Path<usize>) -> Response {
    // No Content-Length: the body is a stream of two chunks
    let data = payload(size);
    let (a, b) = data.split_at(size / 2);
    let chunks: Vec<Result<Vec<u8>, std::io::Error>> = vec![Ok(a.to_vec()), Ok(b.to_vec())];
    Body::from_stream(futures::stream::iter(chunks)).into_response()
}

/// `count` chunks of 1 KiB, each sent after `gap_ms`
async fn serve_trickle(Path((count, gap_ms)): Path<(usize, u64)>) -> Response {
    let chunks = futures::stream::unfold(0usize, move |sent| async move {
        if sent == count {
            return None;
        }
        tokio::time::sleep(Duration::from_millis(gap_ms)).await;
        Some((Ok::<_, std::io::Error>(payload(1024)), sent + 1))
    });
    Body::from_stream(chunks).into_response()
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

pub fn file_server() -> Router {
    Router::new()
        .route("/bytes/{size}", get(serve_file))
        .route("/stream/{size}", get(serve_stream))
        .route("/trickle/{count}/{gap_ms}", get(serve_trickle))
        .route("/missing", get(not_found))
}

pub async fn spawn(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// Raw HTTP server that announces `declared` bytes, sends `sent`, then hangs up
pub async fn spawn_truncating(declared: usize, sent: usize) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let mut request = [0u8; 4096];
            let _ = socket.read(&mut request).await;
            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                declared
            );
            let _ = socket.write_all(head.as_bytes()).await;
            let _ = socket.write_all(&payload(sent)).await;
            let _ = socket.shutdown().await;
        }
    });
    addr
}

/// Address nothing listens on
pub async fn dead_addr() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Started(String),
    Advanced(String, u64, Option<u64>),
    Finished(String, bool),
}

#[derive(Default)]
pub struct RecordingProgress {
    pub events: Mutex<Vec<Event>>,
}

impl RecordingProgress {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn advances_for(&self, file: &str) -> Vec<u64> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Advanced(name, transferred, _) if name == file => Some(transferred),
                _ => None,
            })
            .collect()
    }
}

impl ProgressReporter for RecordingProgress {
    fn started(&self, task: &DownloadTask) {
        self.events.lock().unwrap().push(Event::Started(task.file_name.clone()));
    }

    fn advanced(&self, task: &DownloadTask, transferred: u64, total: Option<u64>) {
        self.events
            .lock()
            .unwrap()
            .push(Event::Advanced(task.file_name.clone(), transferred, total));
    }

    fn finished(&self, outcome: &DownloadOutcome) {
        self.events
            .lock()
            .unwrap()
            .push(Event::Finished(outcome.task.file_name.clone(), outcome.succeeded()));
    }
}
