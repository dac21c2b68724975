//! Analysis result returned by `POST /analyze`

use crate::utils::coerce_number;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Shown when the service does not send its own disclaimer
pub const DEFAULT_DISCLAIMER: &str =
    "This system is for academic and research purposes only and does not provide medical diagnosis.";

/// Risk assessment for one submission.
///
/// Every member is optional on the wire; the service is trusted for shape but
/// not for completeness. Values are held as received, so `contributions`
/// keeps the service's key order and exports echo what was sent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AnalysisResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<String>,

    /// 0-100, as sent. Read through [`AnalysisResult::risk_score`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_score: Option<Value>,

    /// 0-100, as sent. Read through [`AnalysisResult::confidence`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_steps: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disclaimer: Option<String>,

    /// Service-relative path of the explanation heatmap
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heatmap_url: Option<String>,

    /// Modality name -> signed influence on the score
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contributions: Option<Map<String, Value>>,

    /// Echo of the submitted vitals
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensors: Option<Map<String, Value>>,
}

impl AnalysisResult {
    /// Numeric risk score; `"41"` counts, `"n/a"` does not.
    pub fn risk_score(&self) -> Option<f64> {
        self.risk_score.as_ref().and_then(coerce_number)
    }

    pub fn confidence(&self) -> Option<f64> {
        self.confidence.as_ref().and_then(coerce_number)
    }

    pub fn disclaimer(&self) -> &str {
        self.disclaimer
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .unwrap_or(DEFAULT_DISCLAIMER)
    }

    pub fn has_contributions(&self) -> bool {
        self.contributions.as_ref().is_some_and(|c| !c.is_empty())
    }

    /// Contribution entries with their numeric value (0 when not numeric)
    pub fn contribution_values(&self) -> Vec<(String, f64)> {
        self.contributions
            .iter()
            .flatten()
            .map(|(name, value)| (name.clone(), coerce_number(value).unwrap_or(0.0)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_full_result() {
        let result: AnalysisResult = serde_json::from_value(json!({
            "risk_level": "Moderate",
            "risk_score": 41,
            "confidence": "87.5",
            "explanation": "Elevated heart rate",
            "heatmap_url": "/static/heatmaps/abc.png",
            "contributions": {"face": 12.5, "voice": -2, "symptoms": 30},
            "sensors": {"heart_rate": 92}
        }))
        .unwrap();

        assert_eq!(result.risk_level.as_deref(), Some("Moderate"));
        assert_eq!(result.risk_score(), Some(41.0));
        assert_eq!(result.confidence(), Some(87.5));
        assert_eq!(result.confidence, Some(json!("87.5")));
        assert_eq!(result.disclaimer(), DEFAULT_DISCLAIMER);

        let names: Vec<String> = result
            .contribution_values()
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(names, vec!["face", "voice", "symptoms"]);
    }

    #[test]
    fn test_parse_sparse_result() {
        let result: AnalysisResult =
            serde_json::from_value(json!({"risk_score": null, "confidence": "n/a"})).unwrap();
        assert_eq!(result.risk_score(), None);
        assert_eq!(result.confidence(), None);
        assert_eq!(result.confidence, Some(json!("n/a")));
        assert!(!result.has_contributions());
    }

    #[test]
    fn test_custom_disclaimer() {
        let result = AnalysisResult {
            disclaimer: Some("Research use only".to_string()),
            ..Default::default()
        };
        assert_eq!(result.disclaimer(), "Research use only");
    }
}
