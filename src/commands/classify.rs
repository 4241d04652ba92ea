use crate::config::ClassifierConfig;
use crate::error::AppError;
use crate::models::classify_types::TextPrediction;
use crate::services::classifier::sequence::SequenceClassifier;
use std::path::PathBuf;
use tracing::info;

pub const SAMPLE_TRANSCRIPT: &str = "Hi, this is John from XYZ bank security department. We are calling to inform you that we have been suspicious activities on your account Are you aware of any recent transaction? We have noticed a charge of $1,200 made at overseas location just for a few hours ago It's a huge and suspicious and we want to ensure it wasn't you who made this purchase Alright, no worries. We can block this transaction for you But before we proceed I need to verify some information for security purpose Could you please confirm the last four digits of your bank account number? Thank you.Now, I just make sure that we cancel the transaction immediately";

pub enum Input {
    Text(String),
    File(PathBuf),
    Sample,
}

impl Input {
    pub async fn read(self) -> Result<String, AppError> {
        match self {
            Input::Text(text) => Ok(text),
            Input::File(path) => tokio::fs::read_to_string(&path).await.map_err(|e| AppError {
                message: format!("Failed to read {}: {}", path.display(), e),
            }),
            Input::Sample => Ok(SAMPLE_TRANSCRIPT.to_string()),
        }
    }
}

pub fn verdict_line(prediction: &TextPrediction) -> &'static str {
    if prediction.is_fraud {
        "The transcript is fraudulent."
    } else {
        "The transcript is not fraudulent."
    }
}

pub async fn run(config: &ClassifierConfig, input: Input, use_gpu: bool) -> Result<TextPrediction, AppError> {
    let text = input.read().await?;
    if text.trim().is_empty() {
        return Err("Nothing to classify: input text is empty".into());
    }

    let config = config.clone();
    let prediction = tokio::task::spawn_blocking(move || {
        let classifier = SequenceClassifier::load(&config, use_gpu)?;
        classifier.classify(&text)
    })
    .await
    .map_err(|e| AppError {
        message: format!("Task join failed: {}", e),
    })??;

    info!(
        label = %prediction.label,
        confidence = prediction.confidence,
        "Transcript classified"
    );
    Ok(prediction)
}
