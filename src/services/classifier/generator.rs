//! Greedy text generation with a decoder-only ONNX export.
//!
//! Handles both export flavours: plain graphs that take the full sequence on
//! every step, and graphs with `past_key_values.*` inputs whose `present.*`
//! outputs are fed back so each step only processes the newest token.

use crate::config::GeneratorConfig;
use crate::error::AppError;
use crate::services::classifier::inference::{self, SessionOptions};
use ndarray::{Array2, Array4, ArrayD};
use ort::session::{Session, SessionInputValue};
use ort::value::Value;
use std::borrow::Cow;
use std::sync::Mutex;
use tokenizers::Tokenizer;
use tracing::{debug, info};

const PAST_PREFIX: &str = "past_key_values.";
const PRESENT_PREFIX: &str = "present.";

/// Produces the full decoded text (prompt included) for a prompt.
///
/// The request path only depends on this trait, so tests substitute a fake.
pub trait TextGenerator: Send + Sync {
    fn generate(&self, prompt: &str) -> Result<String, AppError>;
}

/// Key/value cache geometry, read from the model's `config.json`
struct CacheLayout {
    /// (input name, matching output name) per cache tensor
    tensors: Vec<(String, String)>,
    kv_heads: usize,
    head_dim: usize,
}

pub struct OnnxGenerator {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    max_new_tokens: usize,
    stop_ids: Vec<u32>,
    has_attention_mask: bool,
    has_position_ids: bool,
    logits_output: String,
    cache: Option<CacheLayout>,
}

impl OnnxGenerator {
    pub fn load(config: &GeneratorConfig) -> Result<Self, AppError> {
        let dir = &config.model_dir;
        let tokenizer = inference::load_tokenizer(&dir.join(&config.tokenizer_file))?;
        let model_config = inference::read_model_config(&dir.join(&config.config_file))?;

        let session = inference::build_session(
            &dir.join(&config.model_file),
            &SessionOptions {
                use_gpu: config.use_gpu,
                require_gpu: config.require_gpu,
                intra_threads: config.intra_threads,
            },
        )?;

        let names = inference::input_names(&session);
        let outputs: Vec<String> = session.outputs().iter().map(|o| o.name().to_string()).collect();
        let logits_output = outputs
            .iter()
            .find(|name| name.as_str() == "logits")
            .or_else(|| outputs.first())
            .cloned()
            .ok_or_else(|| AppError::from("Model declares no outputs"))?;
        let cache = cache_layout(&names, &model_config)?;

        let mut stop_ids: Vec<u32> = config
            .stop_tokens
            .iter()
            .filter_map(|t| tokenizer.token_to_id(t))
            .collect();
        stop_ids.extend(eos_ids(&model_config));
        stop_ids.sort_unstable();
        stop_ids.dedup();

        info!(
            inputs = names.len(),
            kv_cache = cache.is_some(),
            stop_ids = ?stop_ids,
            "Generator ready"
        );

        Ok(Self {
            has_attention_mask: names.iter().any(|n| n == "attention_mask"),
            has_position_ids: names.iter().any(|n| n == "position_ids"),
            logits_output,
            session: Mutex::new(session),
            tokenizer,
            max_new_tokens: config.max_new_tokens,
            stop_ids,
            cache,
        })
    }

    fn step_inputs(
        &self,
        ids: &[i64],
        past: Option<Vec<ArrayD<f32>>>,
    ) -> Result<Vec<(Cow<'static, str>, SessionInputValue<'static>)>, AppError> {
        let total = ids.len();
        // With a warm cache only the newest token goes through the graph
        let offset = if past.is_some() { total - 1 } else { 0 };
        let step_ids = ids[offset..].to_vec();
        let seq = step_ids.len();

        let mut inputs: Vec<(Cow<'static, str>, SessionInputValue<'static>)> = Vec::new();

        let input_ids = Array2::from_shape_vec((1, seq), step_ids)
            .map_err(|e| AppError { message: format!("Failed to shape input ids: {}", e) })?;
        inputs.push(("input_ids".into(), Value::from_array(input_ids)?.into()));

        if self.has_attention_mask {
            let mask = Array2::<i64>::ones((1, total));
            inputs.push(("attention_mask".into(), Value::from_array(mask)?.into()));
        }

        if self.has_position_ids {
            let positions: Vec<i64> = (offset as i64..total as i64).collect();
            let positions = Array2::from_shape_vec((1, seq), positions)
                .map_err(|e| AppError { message: format!("Failed to shape position ids: {}", e) })?;
            inputs.push(("position_ids".into(), Value::from_array(positions)?.into()));
        }

        if let Some(layout) = &self.cache {
            let mut past = past.map(Vec::into_iter);
            for (input_name, _) in &layout.tensors {
                let tensor = match past.as_mut().and_then(Iterator::next) {
                    Some(tensor) => tensor,
                    None => Array4::<f32>::zeros((1, layout.kv_heads, 0, layout.head_dim)).into_dyn(),
                };
                inputs.push((input_name.clone().into(), Value::from_array(tensor)?.into()));
            }
        }

        Ok(inputs)
    }
}

impl TextGenerator for OnnxGenerator {
    fn generate(&self, prompt: &str) -> Result<String, AppError> {
        // The prompt carries its own <|begin_of_text|>
        let encoding = self.tokenizer.encode(prompt, false)?;
        let mut ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
        if ids.is_empty() {
            return Err("Prompt produced no tokens".into());
        }
        let prompt_len = ids.len();

        let mut session = self
            .session
            .lock()
            .map_err(|_| AppError::from("Model lock poisoned"))?;

        let mut past: Option<Vec<ArrayD<f32>>> = None;
        for _ in 0..self.max_new_tokens {
            let inputs = self.step_inputs(&ids, past.take())?;
            let outputs = session.run(inputs).map_err(|e| AppError {
                message: format!("Inference failed: {}", e),
            })?;

            let logits = outputs.get(self.logits_output.as_str()).ok_or_else(|| AppError {
                message: format!("Model output {} missing", self.logits_output),
            })?;
            let (shape, data) = logits.try_extract_tensor::<f32>().map_err(|e| AppError {
                message: format!("Failed to extract logits: {}", e),
            })?;

            let vocab = shape.last().copied().unwrap_or(0).max(0) as usize;
            if vocab == 0 || data.len() < vocab {
                return Err("Logits tensor has no vocabulary dimension".into());
            }
            let last_row = &data[data.len() - vocab..];
            let next = inference::argmax(last_row).ok_or_else(|| AppError::from("Empty logits"))? as u32;

            if let Some(layout) = &self.cache {
                let mut present = Vec::with_capacity(layout.tensors.len());
                for (_, output_name) in &layout.tensors {
                    let value = outputs.get(output_name.as_str()).ok_or_else(|| AppError {
                        message: format!("Model output {} missing", output_name),
                    })?;
                    let array = value.try_extract_array::<f32>().map_err(|e| AppError {
                        message: format!("Failed to extract {}: {}", output_name, e),
                    })?;
                    present.push(array.to_owned());
                }
                past = Some(present);
            }
            drop(outputs);

            if self.stop_ids.contains(&next) {
                break;
            }
            ids.push(next as i64);
        }

        debug!(
            prompt_tokens = prompt_len,
            new_tokens = ids.len() - prompt_len,
            "Generation finished"
        );

        let all: Vec<u32> = ids.iter().map(|&id| id as u32).collect();
        // Special tokens stay so the assistant header survives into the text
        let text = self.tokenizer.decode(&all, false)?;
        Ok(text)
    }
}

fn cache_layout(
    input_names: &[String],
    model_config: &serde_json::Value,
) -> Result<Option<CacheLayout>, AppError> {
    let tensors: Vec<(String, String)> = input_names
        .iter()
        .filter_map(|name| {
            let suffix = name.strip_prefix(PAST_PREFIX)?;
            Some((name.clone(), format!("{}{}", PRESENT_PREFIX, suffix)))
        })
        .collect();

    if tensors.is_empty() {
        return Ok(None);
    }

    let field = |key: &str| model_config[key].as_u64().map(|v| v as usize);
    let heads = field("num_attention_heads").ok_or_else(|| AppError {
        message: "Model config missing num_attention_heads".to_string(),
    })?;
    let kv_heads = field("num_key_value_heads").unwrap_or(heads);
    let head_dim = match field("head_dim") {
        Some(dim) => dim,
        None => {
            let hidden = field("hidden_size").ok_or_else(|| AppError {
                message: "Model config missing hidden_size".to_string(),
            })?;
            hidden / heads.max(1)
        }
    };

    Ok(Some(CacheLayout {
        tensors,
        kv_heads,
        head_dim,
    }))
}

/// `eos_token_id` may be a single id or a list
fn eos_ids(model_config: &serde_json::Value) -> Vec<u32> {
    match &model_config["eos_token_id"] {
        serde_json::Value::Number(n) => n.as_u64().map(|v| vec![v as u32]).unwrap_or_default(),
        serde_json::Value::Array(items) => items
            .iter()
            .filter_map(|v| v.as_u64().map(|v| v as u32))
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_layout_pairs_inputs_with_outputs() {
        let names: Vec<String> = ["input_ids", "attention_mask", "past_key_values.0.key", "past_key_values.0.value"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let config = serde_json::json!({
            "num_attention_heads": 32,
            "num_key_value_heads": 8,
            "hidden_size": 2048
        });

        let layout = cache_layout(&names, &config).unwrap().unwrap();
        assert_eq!(layout.kv_heads, 8);
        assert_eq!(layout.head_dim, 64);
        assert_eq!(
            layout.tensors[1],
            ("past_key_values.0.value".to_string(), "present.0.value".to_string())
        );
    }

    #[test]
    fn test_no_cache_inputs_means_no_layout() {
        let names = vec!["input_ids".to_string()];
        assert!(cache_layout(&names, &serde_json::json!({})).unwrap().is_none());
    }

    #[test]
    fn test_cache_requires_head_count() {
        let names = vec!["past_key_values.0.key".to_string()];
        assert!(cache_layout(&names, &serde_json::json!({})).is_err());
    }

    #[test]
    fn test_eos_ids_accepts_number_or_list() {
        assert_eq!(eos_ids(&serde_json::json!({ "eos_token_id": 128009 })), vec![128009]);
        assert_eq!(
            eos_ids(&serde_json::json!({ "eos_token_id": [128001, 128008] })),
            vec![128001, 128008]
        );
        assert!(eos_ids(&serde_json::json!({})).is_empty());
    }
}
