use crate::error::AppError;
use ort::execution_providers::{CPUExecutionProvider, CUDAExecutionProvider, ExecutionProvider};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use std::path::Path;
use tokenizers::Tokenizer;
use tracing::{info, warn};

pub struct SessionOptions {
    pub use_gpu: bool,
    pub require_gpu: bool,
    pub intra_threads: usize,
}

/// Build an ONNX Runtime session, preferring CUDA when `use_gpu` is set
pub fn build_session(model_path: &Path, options: &SessionOptions) -> Result<Session, AppError> {
    let _ = ort::init().with_name("scam-predictor").commit();

    if options.require_gpu {
        let available = CUDAExecutionProvider::default().is_available().unwrap_or(false);
        if !available {
            return Err("No CUDA GPU detected. Cannot load model on GPU as requested.".into());
        }
    }

    let mut builder = Session::builder()
        .map_err(|e| AppError { message: format!("Failed to create session builder: {}", e) })?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| AppError { message: format!("Failed to set optimization level: {}", e) })?
        .with_intra_threads(options.intra_threads.max(1))
        .map_err(|e| AppError { message: format!("Failed to set intra threads: {}", e) })?;

    if options.use_gpu {
        builder = builder.with_execution_providers([
            CUDAExecutionProvider::default().build(),
            CPUExecutionProvider::default().build(),
        ]).map_err(|e| AppError { message: format!("Failed to register GPU execution providers: {}", e) })?;
    } else {
        builder = builder.with_execution_providers([
            CPUExecutionProvider::default().build(),
        ]).map_err(|e| AppError { message: format!("Failed to register CPU execution provider: {}", e) })?;
    }

    info!(path = %model_path.display(), use_gpu = options.use_gpu, "Loading ONNX model");

    builder.commit_from_file(model_path).map_err(|e| AppError {
        message: format!("Failed to load ONNX model {}: {}", model_path.display(), e),
    })
}

pub fn load_tokenizer(path: &Path) -> Result<Tokenizer, AppError> {
    Tokenizer::from_file(path).map_err(|e| AppError {
        message: format!("Failed to load tokenizer {}: {}", path.display(), e),
    })
}

pub fn read_model_config(path: &Path) -> Result<serde_json::Value, AppError> {
    let content = std::fs::read_to_string(path).map_err(|e| AppError {
        message: format!("Failed to read config file {}: {}", path.display(), e),
    })?;

    serde_json::from_str(&content).map_err(|e| AppError {
        message: format!("Failed to parse config JSON: {}", e),
    })
}

/// Labels ordered by id from a Hugging Face `id2label` map
pub fn labels_from_config(config: &serde_json::Value) -> Option<Vec<String>> {
    let id2label = config["id2label"].as_object()?;

    let mut labels: Vec<(usize, String)> = id2label
        .iter()
        .filter_map(|(k, v)| {
            let idx = k.parse::<usize>().ok()?;
            let label = v.as_str().unwrap_or("unknown").to_string();
            Some((idx, label))
        })
        .collect();
    if labels.is_empty() {
        warn!("Config id2label has no usable entries");
        return None;
    }
    labels.sort_by_key(|(idx, _)| *idx);
    Some(labels.into_iter().map(|(_, label)| label).collect())
}

pub fn input_names(session: &Session) -> Vec<String> {
    session.inputs().iter().map(|i| i.name().to_string()).collect()
}

/// Index of the highest score, first one on ties
pub fn argmax(scores: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (idx, &score) in scores.iter().enumerate() {
        match best {
            Some((_, top)) if score <= top => {}
            _ => best = Some((idx, score)),
        }
    }
    best.map(|(idx, _)| idx)
}

pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max_logit = logits
        .iter()
        .fold(f32::NEG_INFINITY, |a, &b| a.max(b));

    let exp_sum: f32 = logits.iter().map(|&x| (x - max_logit).exp()).sum();
    logits
        .iter()
        .map(|&x| (x - max_logit).exp() / exp_sum)
        .collect()
}
