//! Explainability inputs and outputs

use super::analysis::AnalysisResult;
use crate::utils::{
    coerce_number, decodable_items, json_number, lenient_number, lenient_string, scalar_text,
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Ordered numeric input for the explainability endpoints.
///
/// Built from the numeric contributions in service order; when there are
/// none it falls back to `[risk_score]` (or `[0]`).
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector(Vec<f64>);

impl FeatureVector {
    pub fn from_result(result: &AnalysisResult) -> Self {
        let from_contributions: Vec<f64> = result
            .contributions
            .iter()
            .flatten()
            .filter_map(|(_, value)| coerce_number(value))
            .collect();

        if !from_contributions.is_empty() {
            return Self(from_contributions);
        }

        Self(vec![result.risk_score().unwrap_or(0.0)])
    }

    pub fn values(&self) -> &[f64] {
        &self.0
    }

    /// JSON array for the `features_json` form field, e.g. `[12.5,-3]`
    pub fn to_json(&self) -> String {
        let numbers: Vec<Value> = self
            .0
            .iter()
            .map(|v| json_number(*v).map(Value::Number).unwrap_or(Value::Null))
            .collect();
        Value::Array(numbers).to_string()
    }
}

// Explainability payloads are decoded field by field: a member of the wrong
// type reads as empty instead of rejecting the whole response.

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    #[serde(default, deserialize_with = "lenient_string")]
    pub feature_name: String,
    #[serde(
        default,
        deserialize_with = "lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub importance: Option<f64>,
}

/// Global feature importances
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShapReport {
    #[serde(default, deserialize_with = "importance_list")]
    pub importances: Vec<FeatureImportance>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Local `(feature, weight)` pairs around this prediction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LimeReport {
    #[serde(default, deserialize_with = "weighted_pairs")]
    pub local_features: Vec<(String, f64)>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(default, deserialize_with = "lenient_string")]
    pub feature: String,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

/// Suggested changes that would move the prediction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CounterfactualReport {
    #[serde(
        default,
        deserialize_with = "recommendation_list",
        skip_serializing_if = "Option::is_none"
    )]
    pub recommendations: Option<Vec<Recommendation>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn importance_list<'de, D>(deserializer: D) -> Result<Vec<FeatureImportance>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(decodable_items(value).unwrap_or_default())
}

fn recommendation_list<'de, D>(deserializer: D) -> Result<Option<Vec<Recommendation>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(decodable_items(value))
}

/// `[name, weight, ...]` entries; trailing elements are ignored and entries
/// without a name and a numeric weight are skipped.
fn weighted_pairs<'de, D>(deserializer: D) -> Result<Vec<(String, f64)>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let Some(Value::Array(entries)) = value else {
        return Ok(Vec::new());
    };
    Ok(entries
        .iter()
        .filter_map(|entry| {
            let pair = entry.as_array()?;
            let name = scalar_text(pair.first()?)?;
            let weight = coerce_number(pair.get(1)?)?;
            Some((name, weight))
        })
        .collect())
}

impl ShapReport {
    pub fn summary(&self) -> String {
        join_or_na(self.importances.iter().map(|i| i.feature_name.clone()))
    }
}

impl LimeReport {
    pub fn summary(&self) -> String {
        join_or_na(
            self.local_features
                .iter()
                .map(|(name, weight)| format!("{} ({:.2})", name, weight)),
        )
    }
}

impl CounterfactualReport {
    pub fn summary(&self) -> String {
        match &self.recommendations {
            Some(recs) => recs
                .iter()
                .map(|r| r.feature.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            None => "See recovery/boundary details".to_string(),
        }
    }
}

fn join_or_na(items: impl Iterator<Item = String>) -> String {
    let joined = items.collect::<Vec<_>>().join(", ");
    if joined.is_empty() {
        "n/a".to_string()
    } else {
        joined
    }
}

/// Accumulated output of one explainability run.
///
/// Members fill in step order; a failed step leaves its own member and all
/// later ones empty but never clears an earlier one.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExplainabilityBundle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shap: Option<ShapReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lime: Option<LimeReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counterfactual: Option<CounterfactualReport>,
}

impl ExplainabilityBundle {
    pub fn is_empty(&self) -> bool {
        self.shap.is_none() && self.lime.is_none() && self.counterfactual.is_none()
    }

    pub fn is_complete(&self) -> bool {
        self.shap.is_some() && self.lime.is_some() && self.counterfactual.is_some()
    }
}
