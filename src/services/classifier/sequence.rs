//! Binary sequence classification (`0: not fraud`, `1: fraud`).

use crate::config::ClassifierConfig;
use crate::error::AppError;
use crate::models::classify_types::TextPrediction;
use crate::services::classifier::inference::{self, SessionOptions};
use ndarray::Array2;
use ort::session::{Session, SessionInputValue};
use ort::value::Value;
use std::borrow::Cow;
use std::sync::Mutex;
use tokenizers::{Tokenizer, TruncationParams};
use tracing::{debug, info};

pub const FRAUD_LABEL_ID: usize = 1;

const DEFAULT_LABELS: [&str; 2] = ["not_fraud", "fraud"];

pub struct SequenceClassifier {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    labels: Vec<String>,
    has_token_type_ids: bool,
}

impl SequenceClassifier {
    pub fn load(config: &ClassifierConfig, use_gpu: bool) -> Result<Self, AppError> {
        let dir = &config.model_dir;

        let mut tokenizer = inference::load_tokenizer(&dir.join(&config.tokenizer_file))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: config.max_length,
                ..Default::default()
            }))
            .map_err(|e| AppError {
                message: format!("Failed to configure truncation: {}", e),
            })?;
        tokenizer.with_padding(None);

        let config_path = dir.join(&config.config_file);
        let labels = if config_path.exists() {
            inference::labels_from_config(&inference::read_model_config(&config_path)?)
        } else {
            None
        }
        .unwrap_or_else(|| DEFAULT_LABELS.iter().map(|s| s.to_string()).collect());

        let session = inference::build_session(
            &dir.join(&config.model_file),
            &SessionOptions {
                use_gpu,
                require_gpu: false,
                intra_threads: config.intra_threads,
            },
        )?;
        let has_token_type_ids = inference::input_names(&session)
            .iter()
            .any(|n| n == "token_type_ids");

        info!(labels = ?labels, "Sequence classifier loaded");

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            labels,
            has_token_type_ids,
        })
    }

    pub fn classify(&self, text: &str) -> Result<TextPrediction, AppError> {
        let encoding = self.tokenizer.encode(text, true)?;
        let seq = encoding.get_ids().len();
        let to_i64 = |values: &[u32]| values.iter().map(|&v| v as i64).collect::<Vec<_>>();

        let shaped = |values: Vec<i64>| {
            Array2::from_shape_vec((1, seq), values).map_err(|e| AppError {
                message: format!("Failed to create tensor: {}", e),
            })
        };

        let mut inputs: Vec<(Cow<'static, str>, SessionInputValue<'static>)> = vec![
            ("input_ids".into(), Value::from_array(shaped(to_i64(encoding.get_ids()))?)?.into()),
            (
                "attention_mask".into(),
                Value::from_array(shaped(to_i64(encoding.get_attention_mask()))?)?.into(),
            ),
        ];
        if self.has_token_type_ids {
            inputs.push((
                "token_type_ids".into(),
                Value::from_array(shaped(to_i64(encoding.get_type_ids()))?)?.into(),
            ));
        }

        let mut session = self
            .session
            .lock()
            .map_err(|_| AppError::from("Model lock poisoned"))?;

        let outputs = session.run(inputs).map_err(|e| AppError {
            message: format!("Inference failed: {}", e),
        })?;

        let output_value = outputs.values().next().ok_or_else(|| AppError {
            message: "Model produced no outputs".to_string(),
        })?;

        let (_, data) = output_value.try_extract_tensor::<f32>().map_err(|e| AppError {
            message: format!("Failed to extract output tensor: {}", e),
        })?;

        debug!(tokens = seq, logits = ?data, "Classifier logits");
        interpret_logits(data, &self.labels)
    }
}

/// Pick the highest-scoring label; no threshold, no calibration
pub fn interpret_logits(logits: &[f32], labels: &[String]) -> Result<TextPrediction, AppError> {
    let label_id = inference::argmax(logits).ok_or_else(|| AppError::from("Empty logits"))?;
    let probabilities = inference::softmax(logits);

    let label = labels
        .get(label_id)
        .cloned()
        .unwrap_or_else(|| format!("class_{}", label_id));

    Ok(TextPrediction {
        label_id,
        label,
        is_fraud: label_id == FRAUD_LABEL_ID,
        confidence: probabilities[label_id],
    })
}
