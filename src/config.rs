//! Configuration management for the scam predictor
//!
//! Layering: built-in defaults, then an optional TOML file, then
//! `SCAM_PREDICTOR__SECTION__KEY` environment variables.

use crate::error::AppError;
use crate::services::verdict::ReasoningSpan;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file picked up when no `--config` flag is given
pub const DEFAULT_CONFIG_PATH: &str = "config/scam-predictor.toml";

const ENV_PREFIX: &str = "SCAM_PREDICTOR";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub fetch: FetchConfig,
    pub generator: GeneratorConfig,
    pub classifier: ClassifierConfig,
    pub verdict: VerdictConfig,
    pub logging: LoggingConfig,
}

/// HTTP surface of the interactive flow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Artifact fetcher tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Largest slice written to disk between two progress updates
    pub chunk_size: usize,
    pub connect_timeout_secs: u64,
    /// Longest stall allowed between two reads; no cap on the whole transfer
    pub read_timeout_secs: u64,
}

/// One manifest line: destination file name and where to fetch it from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ManifestEntry {
    pub file: String,
    pub url: String,
}

/// Generative model used by the interactive form
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    pub model_dir: PathBuf,
    /// ONNX graph file name inside `model_dir`
    pub model_file: String,
    pub tokenizer_file: String,
    pub config_file: String,
    pub max_new_tokens: usize,
    /// Generation stops at the first of these tokens
    pub stop_tokens: Vec<String>,
    pub use_gpu: bool,
    /// Refuse to load when no CUDA device is usable
    pub require_gpu: bool,
    pub intra_threads: usize,
    /// Fetch missing manifest files when the server starts
    pub auto_download: bool,
    pub files: Vec<ManifestEntry>,
}

/// Discriminative classifier used by the `classify` command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    pub model_dir: PathBuf,
    pub model_file: String,
    pub tokenizer_file: String,
    pub config_file: String,
    pub max_length: usize,
    pub intra_threads: usize,
    pub files: Vec<ManifestEntry>,
}

/// Verdict extraction policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerdictConfig {
    /// Confidence reported for FRAUD when the answer carries no percentage
    pub fraud_fallback: u8,
    /// Confidence reported for LEGITIMATE when the answer carries no percentage
    pub legitimate_fallback: u8,
    pub reasoning_span: ReasoningSpan,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl AppConfig {
    /// Load configuration, reading `path` or the default file when it exists
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let file = match path {
            Some(p) => {
                if !p.exists() {
                    return Err(format!("Config file not found: {}", p.display()).into());
                }
                Some(p.to_path_buf())
            }
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_PATH);
                default.exists().then_some(default)
            }
        };

        let env = Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true);
        Self::build(file.as_deref(), env)
    }

    fn build(file: Option<&Path>, env: Environment) -> Result<Self, AppError> {
        let mut builder = Config::builder().add_source(Config::try_from(&AppConfig::default())?);
        if let Some(file) = file {
            builder = builder.add_source(File::from(file));
        }

        let config = builder.add_source(env).build()?;
        let parsed: AppConfig = config.try_deserialize()?;
        parsed.validate()?;
        Ok(parsed)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.fetch.chunk_size == 0 {
            return Err("fetch.chunk_size must be greater than zero".into());
        }
        if self.fetch.read_timeout_secs == 0 {
            return Err("fetch.read_timeout_secs must be greater than zero".into());
        }
        if self.verdict.fraud_fallback > 100 || self.verdict.legitimate_fallback > 100 {
            return Err("verdict fallbacks must be within 0..=100".into());
        }
        if self.generator.max_new_tokens == 0 {
            return Err("generator.max_new_tokens must be greater than zero".into());
        }
        Ok(())
    }
}

fn hf_entry(file: &str, repo: &str, remote_path: &str) -> ManifestEntry {
    ManifestEntry {
        file: file.to_string(),
        url: format!("https://huggingface.co/{}/resolve/main/{}", repo, remote_path),
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        const LLAMA_REPO: &str = "onnx-community/Llama-3.2-1B-Instruct";
        const CLASSIFIER_REPO: &str = "austinb/fraud_text_detection";

        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8501,
            },
            fetch: FetchConfig {
                chunk_size: 8 * 1024,
                connect_timeout_secs: 30,
                read_timeout_secs: 60,
            },
            generator: GeneratorConfig {
                model_dir: PathBuf::from("model_files"),
                model_file: "model.onnx".to_string(),
                tokenizer_file: "tokenizer.json".to_string(),
                config_file: "config.json".to_string(),
                max_new_tokens: 200,
                stop_tokens: vec!["<|eot_id|>".to_string(), "<|end_of_text|>".to_string()],
                use_gpu: true,
                require_gpu: false,
                intra_threads: 4,
                auto_download: false,
                files: vec![
                    hf_entry("config.json", LLAMA_REPO, "config.json"),
                    hf_entry("model.onnx", LLAMA_REPO, "onnx/model.onnx"),
                    hf_entry("model.onnx_data", LLAMA_REPO, "onnx/model.onnx_data"),
                    hf_entry("tokenizer.json", LLAMA_REPO, "tokenizer.json"),
                    hf_entry("tokenizer_config.json", LLAMA_REPO, "tokenizer_config.json"),
                    hf_entry("special_tokens_map.json", LLAMA_REPO, "special_tokens_map.json"),
                ],
            },
            classifier: ClassifierConfig {
                model_dir: PathBuf::from("classifier_files"),
                model_file: "model.onnx".to_string(),
                tokenizer_file: "tokenizer.json".to_string(),
                config_file: "config.json".to_string(),
                max_length: 512,
                intra_threads: 4,
                files: vec![
                    hf_entry("config.json", CLASSIFIER_REPO, "config.json"),
                    hf_entry("model.onnx", CLASSIFIER_REPO, "onnx/model.onnx"),
                    hf_entry("tokenizer.json", CLASSIFIER_REPO, "tokenizer.json"),
                ],
            },
            verdict: VerdictConfig {
                fraud_fallback: 75,
                legitimate_fallback: 25,
                reasoning_span: ReasoningSpan::ToEnd,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }
}
