//! Server-rendered HTML for the analysis form.

use crate::models::classify_types::ModelStatus;
use crate::models::verdict_types::{ConfidenceSource, ModelVerdict};

const FRAUD_COLOR: &str = "#ff4b4b";
const LEGIT_COLOR: &str = "#00cc00";

const STYLE: &str = r#"
body { font-family: sans-serif; background: #f0f2f6; margin: 0; }
main { max-width: 860px; margin: 0 auto; padding: 24px; }
.header { background: #ff4b4b; color: white; padding: 20px; border-radius: 10px; text-align: center; }
.banner { padding: 12px; border-radius: 8px; margin: 16px 0; }
.banner.info { background: #e8f4fc; }
.banner.warn { background: #fff4d6; }
.banner.error { background: #fde2e2; }
textarea { width: 100%; min-height: 200px; box-sizing: border-box; }
button { width: 100%; padding: 10px; margin-top: 8px; }
.result-card { background: white; padding: 20px; border-radius: 10px; margin-top: 20px; }
.fraud { color: #ff4b4b; }
.legitimate { color: #00cc00; }
.percentage-bar { height: 30px; background: #e0e0e0; border-radius: 15px; overflow: hidden; margin: 20px 0; }
.percentage-fill { height: 100%; color: white; font-weight: bold; text-align: center; line-height: 30px; }
.reasoning { background: #e8f4fc; padding: 15px; border-radius: 8px; white-space: pre-wrap; }
"#;

/// What to show under the form
pub enum Panel<'a> {
    Verdict(&'a ModelVerdict),
    Warning(&'a str),
    Error(&'a str),
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn status_banner(status: &ModelStatus) -> String {
    if status.ready {
        return String::new();
    }
    match &status.error {
        Some(err) => format!(
            r#"<div class="banner error">Model failed to load: {}</div>"#,
            escape_html(err)
        ),
        None if status.loading => {
            r#"<div class="banner info">Loading model... This may take a minute.</div>"#.to_string()
        }
        None if !status.downloaded => {
            r#"<div class="banner warn">Model files are missing. Run <code>scam-predictor download</code> first.</div>"#
                .to_string()
        }
        None => r#"<div class="banner info">Model is not loaded yet.</div>"#.to_string(),
    }
}

fn verdict_card(verdict: &ModelVerdict) -> String {
    let heading = if verdict.classification.is_fraud() {
        r#"<h2 class="fraud">FRAUD DETECTED</h2>"#
    } else {
        r#"<h2 class="legitimate">SEEMS LEGITIMATE</h2>"#
    };
    let color = if verdict.confidence > 50 { FRAUD_COLOR } else { LEGIT_COLOR };
    let note = match verdict.confidence_source {
        ConfidenceSource::Parsed => "",
        ConfidenceSource::Fallback => r#"<p><small>No percentage in the model answer, showing the default estimate.</small></p>"#,
    };

    format!(
        r#"<div class="result-card">{heading}
<div class="percentage-bar"><div class="percentage-fill" style="width:{pct}%;background-color:{color}">{pct}% Fraud Probability</div></div>{note}
<h3>Reasoning:</h3>
<div class="reasoning">{reasoning}</div>
</div>"#,
        heading = heading,
        pct = verdict.confidence,
        color = color,
        note = note,
        reasoning = escape_html(&verdict.reasoning),
    )
}

pub fn render_page(status: &ModelStatus, message: &str, panel: Option<Panel<'_>>) -> String {
    let disabled = if status.ready { "" } else { " disabled" };
    let panel = match panel {
        Some(Panel::Verdict(verdict)) => verdict_card(verdict),
        Some(Panel::Warning(text)) => format!(r#"<div class="banner warn">{}</div>"#, escape_html(text)),
        Some(Panel::Error(text)) => format!(
            r#"<div class="banner error">Error during analysis: {}</div>"#,
            escape_html(text)
        ),
        None => String::new(),
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>Scam Message Predictor</title><style>{style}</style></head>
<body><main>
<div class="header"><h1>Scam Message Predictor</h1><p>Powered by Llama-3.2-1B-Instruct</p></div>
{banner}
<h3>Enter Message for Fraud Analysis</h3>
<form method="post" action="/analyze">
<textarea name="message" placeholder="Enter the text message, email, or conversation to analyze for fraud...">{message}</textarea>
<button type="submit"{disabled}>Analyze for Fraud</button>
</form>
{panel}
</main></body>
</html>"#,
        style = STYLE,
        banner = status_banner(status),
        message = escape_html(message),
        disabled = disabled,
        panel = panel,
    )
}
