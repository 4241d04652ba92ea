//! Turns a generative model's free-text answer into a [`ModelVerdict`].
//!
//! The model is asked for a JSON object but rarely returns one verbatim, so
//! extraction is a chain of permissive heuristics. It never fails: every
//! input, including the empty string, yields a verdict.

use crate::config::VerdictConfig;
use crate::models::verdict_types::{Classification, ConfidenceSource, ModelVerdict};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Header that opens the assistant turn in the Llama 3 chat format
pub const ASSISTANT_MARKER: &str = "<|start_header_id|>assistant<|end_header_id|>";

const FRAUD_KEYWORD: &str = "FRAUD";
const REASONING_KEYWORD: &str = "reasoning";

pub const DEFAULT_FRAUD_FALLBACK: u8 = 75;
pub const DEFAULT_LEGITIMATE_FALLBACK: u8 = 25;

static PERCENTAGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"([0-9]+)%").expect("valid regex"));

/// How much text after the `reasoning` keyword is reported
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasoningSpan {
    /// Keyword included, through the end of the answer
    #[default]
    ToEnd,
    /// Only the value of a `"reasoning": "..."` field
    FieldValue,
}

#[derive(Debug, Clone)]
pub struct VerdictExtractor {
    fraud_fallback: u8,
    legitimate_fallback: u8,
    reasoning_span: ReasoningSpan,
}

impl Default for VerdictExtractor {
    fn default() -> Self {
        Self {
            fraud_fallback: DEFAULT_FRAUD_FALLBACK,
            legitimate_fallback: DEFAULT_LEGITIMATE_FALLBACK,
            reasoning_span: ReasoningSpan::ToEnd,
        }
    }
}

impl VerdictExtractor {
    pub fn new(config: &VerdictConfig) -> Self {
        Self {
            fraud_fallback: config.fraud_fallback.min(100),
            legitimate_fallback: config.legitimate_fallback.min(100),
            reasoning_span: config.reasoning_span,
        }
    }

    pub fn extract(&self, text: &str) -> ModelVerdict {
        let answer = answer_span(text);

        let classification = if answer.to_ascii_uppercase().contains(FRAUD_KEYWORD) {
            Classification::Fraud
        } else {
            Classification::Legitimate
        };

        let (confidence, confidence_source) = match parse_percentage(answer) {
            Some(value) => (value, ConfidenceSource::Parsed),
            None => {
                let fallback = match classification {
                    Classification::Fraud => self.fraud_fallback,
                    Classification::Legitimate => self.legitimate_fallback,
                };
                (fallback, ConfidenceSource::Fallback)
            }
        };

        ModelVerdict {
            classification,
            confidence,
            confidence_source,
            reasoning: self.reasoning(answer),
            raw_output: text.to_string(),
        }
    }

    fn reasoning(&self, answer: &str) -> String {
        // ASCII lowercasing keeps byte offsets aligned with `answer`
        let Some(start) = answer.to_ascii_lowercase().find(REASONING_KEYWORD) else {
            return answer.to_string();
        };

        match self.reasoning_span {
            ReasoningSpan::ToEnd => answer[start..].to_string(),
            ReasoningSpan::FieldValue => field_value(&answer[start + REASONING_KEYWORD.len()..])
                .map(str::to_string)
                .unwrap_or_else(|| answer[start..].to_string()),
        }
    }
}

/// Extract a verdict with the default fallback policy
pub fn extract_verdict(text: &str) -> ModelVerdict {
    VerdictExtractor::default().extract(text)
}

/// Text after the last assistant header, or the whole text when there is none
fn answer_span(text: &str) -> &str {
    match text.rfind(ASSISTANT_MARKER) {
        Some(idx) => text[idx + ASSISTANT_MARKER.len()..].trim(),
        None => text.trim(),
    }
}

/// First `<integer>%` in the text, clamped to 0..=100
fn parse_percentage(text: &str) -> Option<u8> {
    let digits = PERCENTAGE.captures(text)?.get(1)?.as_str();
    // Digit runs too long for u32 are far above 100 anyway
    let value = digits.parse::<u32>().unwrap_or(u32::MAX);
    Some(value.min(100) as u8)
}

/// Value of a `reasoning` field, given the text right after the keyword
fn field_value(rest: &str) -> Option<&str> {
    let rest = rest.trim_start_matches(|c: char| c == '"' || c == '\'' || c.is_whitespace());
    let rest = rest.strip_prefix(':')?;
    let rest = rest.trim_start();

    let value = match rest.strip_prefix('"') {
        Some(quoted) => {
            let mut escaped = false;
            let mut end = quoted.len();
            for (idx, c) in quoted.char_indices() {
                match c {
                    '\\' if !escaped => escaped = true,
                    '"' if !escaped => {
                        end = idx;
                        break;
                    }
                    _ => escaped = false,
                }
            }
            &quoted[..end]
        }
        None => rest.trim_end_matches(|c: char| c == '}' || c.is_whitespace()),
    };

    let value = value.trim();
    (!value.is_empty()).then_some(value)
}
