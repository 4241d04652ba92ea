use serde::Serialize;

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ModelStatus {
    pub downloaded: bool,
    pub loading: bool,
    pub ready: bool,
    pub error: Option<String>,
}

/// Output of the discriminative classifier for one text
#[derive(Debug, Serialize, Clone)]
pub struct TextPrediction {
    pub label_id: usize,
    pub label: String,
    pub is_fraud: bool,
    /// Softmax probability of the chosen label, informational only
    pub confidence: f32,
}
