//! Raw JSON dump of the held result

use super::{ExportArtifact, ExportSnapshot};
use crate::error::Result;
use serde::Serialize;
use serde_json::{Map, Value};

pub const RAW_JSON_FILE_NAME: &str = "healthmorph-raw.json";

/// Fixed subset of the held result, in export order, values as the service
/// sent them. Absent members are left out.
#[derive(Serialize)]
struct RawExport<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    risk_level: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    risk_score: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    confidence: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    explanation: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_steps: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    contributions: Option<&'a Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sensors: Option<&'a Map<String, Value>>,
    timestamp: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    heatmap_url: Option<&'a str>,
}

pub fn encode_raw_json(snapshot: &ExportSnapshot<'_>) -> Result<ExportArtifact> {
    let result = snapshot.result;
    let export = RawExport {
        risk_level: result.risk_level.as_deref(),
        risk_score: result.risk_score.as_ref(),
        confidence: result.confidence.as_ref(),
        explanation: result.explanation.as_deref(),
        next_steps: result.next_steps.as_deref(),
        contributions: result.contributions.as_ref(),
        sensors: result.sensors.as_ref(),
        timestamp: snapshot.timestamp,
        heatmap_url: result.heatmap_url.as_deref(),
    };

    Ok(ExportArtifact {
        file_name: RAW_JSON_FILE_NAME,
        content_type: "application/json",
        bytes: serde_json::to_vec_pretty(&export)?,
    })
}
