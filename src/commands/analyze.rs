use crate::error::AppError;
use crate::models::classify_types::ModelStatus;
use crate::models::verdict_types::{AnalysisRequest, ModelVerdict};
use crate::services::prompt::build_fraud_prompt;
use crate::state::AppState;
use crate::views::{self, Panel};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Json, Response};
use axum::Form;
use serde::Deserialize;
use std::time::Instant;
use tracing::{info, warn};

pub const EMPTY_INPUT_MESSAGE: &str = "Please enter a message to analyze.";

#[derive(Debug, Deserialize)]
pub struct AnalyzeForm {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug)]
pub enum AnalyzeError {
    EmptyInput,
    ModelNotReady,
    Failed(AppError),
}

impl AnalyzeError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AnalyzeError::EmptyInput => StatusCode::BAD_REQUEST,
            AnalyzeError::ModelNotReady => StatusCode::SERVICE_UNAVAILABLE,
            AnalyzeError::Failed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> String {
        match self {
            AnalyzeError::EmptyInput => EMPTY_INPUT_MESSAGE.to_string(),
            AnalyzeError::ModelNotReady => "Model not loaded. Please wait for it to finish loading.".to_string(),
            AnalyzeError::Failed(e) => e.message.clone(),
        }
    }
}

/// Prompt the model with one message and turn its answer into a verdict
pub async fn analyze_text(state: &AppState, text: &str) -> Result<ModelVerdict, AnalyzeError> {
    if text.trim().is_empty() {
        return Err(AnalyzeError::EmptyInput);
    }

    let generator = state
        .models
        .generator()
        .map_err(|_| AnalyzeError::ModelNotReady)?;

    let prompt = build_fraud_prompt(text);
    let started = Instant::now();

    let output = tokio::task::spawn_blocking(move || generator.generate(&prompt))
        .await
        .map_err(|e| AnalyzeError::Failed(format!("Task join failed: {}", e).into()))?
        .map_err(AnalyzeError::Failed)?;

    let verdict = state.extractor.extract(&output);
    info!(
        classification = %verdict.classification,
        confidence = verdict.confidence,
        source = ?verdict.confidence_source,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Message analyzed"
    );
    Ok(verdict)
}

pub async fn index(State(state): State<AppState>) -> Html<String> {
    let status = state.models.status().await;
    Html(views::render_page(&status, "", None))
}

pub async fn status(State(state): State<AppState>) -> Json<ModelStatus> {
    Json(state.models.status().await)
}

pub async fn analyze_form(
    State(state): State<AppState>,
    Form(form): Form<AnalyzeForm>,
) -> (StatusCode, Html<String>) {
    let result = analyze_text(&state, &form.message).await;
    let status = state.models.status().await;

    match result {
        Ok(verdict) => (
            StatusCode::OK,
            Html(views::render_page(&status, &form.message, Some(Panel::Verdict(&verdict)))),
        ),
        Err(AnalyzeError::EmptyInput) => (
            StatusCode::BAD_REQUEST,
            Html(views::render_page(&status, &form.message, Some(Panel::Warning(EMPTY_INPUT_MESSAGE)))),
        ),
        Err(e) => {
            warn!(error = %e.message(), "Analysis failed");
            let message = e.message();
            (
                e.status_code(),
                Html(views::render_page(&status, &form.message, Some(Panel::Error(&message)))),
            )
        }
    }
}

pub async fn analyze_json(
    State(state): State<AppState>,
    Json(request): Json<AnalysisRequest>,
) -> Response {
    match analyze_text(&state, &request.text).await {
        Ok(verdict) => Json(verdict).into_response(),
        Err(e) => (
            e.status_code(),
            Json(serde_json::json!({ "error": e.message() })),
        )
            .into_response(),
    }
}
