//! Plain-text results report

use super::ResultsSession;
use crate::config::ServiceConfig;
use crate::models::AnalysisResult;
use crate::utils::format_number;
use serde_json::Value;
use std::fmt::Write;

const DEFAULT_NEXT_STEPS: &str = "Review results with a human expert; do not self-diagnose.";

/// Width of a full-scale (100) contribution bar in characters
const BAR_CHARS: f64 = 20.0;

/// One row of the contribution chart
#[derive(Debug, Clone, PartialEq)]
pub struct ContributionBar {
    pub name: String,
    /// Numeric value, 0 when the service sent something else
    pub value: f64,
    /// Bar length in percent, `min(|value|, 100)`
    pub width: f64,
    pub positive: bool,
}

pub fn contribution_bars(result: &AnalysisResult) -> Vec<ContributionBar> {
    result
        .contribution_values()
        .into_iter()
        .map(|(name, value)| ContributionBar {
            name,
            value,
            width: value.abs().min(100.0),
            positive: value >= 0.0,
        })
        .collect()
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn percent(value: Option<f64>) -> String {
    value
        .map(format_number)
        .unwrap_or_else(|| "--".to_string())
}

/// Render everything the results view shows for a session.
pub fn render_report(session: &ResultsSession, config: &ServiceConfig) -> String {
    let result = session.result();
    let mut out = String::new();

    // Writing into a String cannot fail
    let _ = writeln!(
        out,
        "Risk Level: {}",
        result.risk_level.as_deref().unwrap_or("n/a")
    );
    let _ = writeln!(out, "Risk Score: {}%", percent(result.risk_score()));
    if let Some(confidence) = result.confidence() {
        let _ = writeln!(out, "Confidence: {}%", format_number(confidence));
    }
    if let Some(explanation) = result.explanation.as_deref() {
        let _ = writeln!(out, "{}", explanation);
    }
    let _ = writeln!(
        out,
        "Suggested Next Steps: {}",
        result
            .next_steps
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(DEFAULT_NEXT_STEPS)
    );

    if let Some(contributions) = result.contributions.as_ref() {
        let listed: Vec<String> = contributions
            .iter()
            .map(|(k, v)| format!("{}: {}", k, display_value(v)))
            .collect();
        let _ = writeln!(out, "Modal Contributions: {}", listed.join(", "));
    }
    if let Some(sensors) = result.sensors.as_ref().filter(|s| !s.is_empty()) {
        let listed: Vec<String> = sensors
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| format!("{}: {}", k, display_value(v)))
            .collect();
        let _ = writeln!(out, "Sensor Summary: {}", listed.join(", "));
    }

    match session.heatmap_url(config) {
        Some(url) => {
            let _ = writeln!(out, "Heatmap: {}", url);
        }
        None => {
            let _ = writeln!(out, "Heatmap not available.");
        }
    }

    let _ = writeln!(out, "\nModal contributions");
    let bars = contribution_bars(result);
    if bars.is_empty() {
        let _ = writeln!(out, "  No contributions provided.");
    }
    let name_width = bars.iter().map(|b| b.name.len()).max().unwrap_or(0);
    for bar in &bars {
        let chars = (bar.width / 100.0 * BAR_CHARS).round() as usize;
        let mark = if bar.positive { "+" } else { "-" };
        let _ = writeln!(
            out,
            "  {:<name_w$} {:<bar_w$} {:>6.1}",
            bar.name,
            mark.repeat(chars),
            bar.value,
            name_w = name_width,
            bar_w = BAR_CHARS as usize
        );
    }

    let bundle = session.explainability();
    if !bundle.is_empty() {
        let _ = writeln!(out, "\nExplainability");
        if let Some(shap) = &bundle.shap {
            let _ = writeln!(out, "  SHAP Top Features: {}", shap.summary());
        }
        if let Some(lime) = &bundle.lime {
            let _ = writeln!(out, "  LIME Local Factors: {}", lime.summary());
        }
        if let Some(cf) = &bundle.counterfactual {
            let _ = writeln!(out, "  Counterfactual Suggestion: {}", cf.summary());
        }
    }
    if let Some(error) = session.explain_error() {
        let _ = writeln!(out, "  Explainability error: {}", error);
    }

    let _ = writeln!(out, "\nMedical Disclaimer: {}", result.disclaimer());
    let _ = write!(
        out,
        "Session: {}",
        session.opened().format("%H:%M:%S UTC")
    );
    out
}
