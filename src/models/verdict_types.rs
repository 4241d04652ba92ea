use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Classification {
    Fraud,
    Legitimate,
}

impl Classification {
    pub fn is_fraud(&self) -> bool {
        matches!(self, Classification::Fraud)
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Classification::Fraud => write!(f, "FRAUD"),
            Classification::Legitimate => write!(f, "LEGITIMATE"),
        }
    }
}

/// Whether the confidence came from the model's text or the fixed policy value
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceSource {
    Parsed,
    Fallback,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnalysisRequest {
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ModelVerdict {
    pub classification: Classification,
    /// Always within 0..=100
    pub confidence: u8,
    pub confidence_source: ConfidenceSource,
    pub reasoning: String,
    pub raw_output: String,
}
