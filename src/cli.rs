use crate::commands::download::ArtifactTarget;
use crate::config::AppConfig;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "scam-predictor", version, about = "Scam message predictor")]
pub struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true, env = "SCAM_PREDICTOR_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the fraud analysis form
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
        #[arg(long)]
        model_dir: Option<PathBuf>,
        /// Run inference on the CPU only
        #[arg(long)]
        cpu: bool,
        /// Fetch missing model files before loading
        #[arg(long)]
        auto_download: bool,
    },
    /// Download model artifacts listed in the manifest
    Download {
        #[arg(long, value_enum, default_value_t = ArtifactTarget::Generator)]
        target: ArtifactTarget,
        /// Destination directory, defaults to the target's model_dir
        #[arg(long)]
        dir: Option<PathBuf>,
        /// Leave files that already exist untouched
        #[arg(long)]
        skip_existing: bool,
    },
    /// Classify a text with the sequence-classification model
    Classify {
        /// Text to classify; a sample transcript is used when omitted
        text: Option<String>,
        #[arg(long, conflicts_with = "text")]
        file: Option<PathBuf>,
        #[arg(long)]
        model_dir: Option<PathBuf>,
        #[arg(long)]
        cpu: bool,
        /// Print the prediction as JSON
        #[arg(long)]
        json: bool,
    },
}

impl Command {
    /// Fold command-line flags over the loaded configuration
    pub fn apply_overrides(&self, config: &mut AppConfig) {
        match self {
            Command::Serve {
                host,
                port,
                model_dir,
                cpu,
                auto_download,
            } => {
                if let Some(host) = host {
                    config.server.host = host.clone();
                }
                if let Some(port) = port {
                    config.server.port = *port;
                }
                if let Some(dir) = model_dir {
                    config.generator.model_dir = dir.clone();
                }
                if *cpu {
                    config.generator.use_gpu = false;
                    config.generator.require_gpu = false;
                }
                if *auto_download {
                    config.generator.auto_download = true;
                }
            }
            Command::Classify { model_dir: Some(dir), .. } => {
                config.classifier.model_dir = dir.clone();
            }
            _ => {}
        }
    }
}
