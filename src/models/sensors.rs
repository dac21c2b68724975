//! Vital-sign readings
//!
//! Readings arrive as free text from the user. Compaction turns them into the
//! `sensors` form field: only readings that parse as numbers survive, the rest
//! are left out of the object entirely.

use crate::utils::{json_number, parse_numeric};
use serde::Serialize;
use serde_json::Number;

/// Raw, user-typed vitals. Empty strings mean "not provided".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SensorReadings {
    pub heart_rate: String,
    pub systolic_bp: String,
    pub diastolic_bp: String,
    pub temperature: String,
    pub spo2: String,
}

/// Compacted vitals as sent to the service
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SensorPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heart_rate: Option<Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub systolic_bp: Option<Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diastolic_bp: Option<Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spo2: Option<Number>,
}

impl SensorReadings {
    /// Drop blank and non-numeric readings.
    pub fn compact(&self) -> SensorPayload {
        let reading = |raw: &str| parse_numeric(raw).and_then(json_number);

        SensorPayload {
            heart_rate: reading(&self.heart_rate),
            systolic_bp: reading(&self.systolic_bp),
            diastolic_bp: reading(&self.diastolic_bp),
            temperature: reading(&self.temperature),
            spo2: reading(&self.spo2),
        }
    }
}

impl SensorPayload {
    /// Number of readings that survived compaction
    pub fn len(&self) -> usize {
        [
            &self.heart_rate,
            &self.systolic_bp,
            &self.diastolic_bp,
            &self.temperature,
            &self.spo2,
        ]
        .iter()
        .filter(|v| v.is_some())
        .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_json(&self) -> String {
        // A struct of optional numbers always serializes
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compact_drops_blank_and_invalid() {
        let readings = SensorReadings {
            heart_rate: "72".to_string(),
            systolic_bp: String::new(),
            temperature: "abc".to_string(),
            ..Default::default()
        };

        let payload = readings.compact();
        assert_eq!(payload.len(), 1);
        assert_eq!(payload.to_json(), r#"{"heart_rate":72}"#);
    }

    #[test]
    fn test_compact_keeps_field_order() {
        let readings = SensorReadings {
            heart_rate: " 88 ".to_string(),
            systolic_bp: "120".to_string(),
            diastolic_bp: "80".to_string(),
            temperature: "37.2".to_string(),
            spo2: "97".to_string(),
        };

        assert_eq!(
            readings.compact().to_json(),
            r#"{"heart_rate":88,"systolic_bp":120,"diastolic_bp":80,"temperature":37.2,"spo2":97}"#
        );
    }

    #[test]
    fn test_no_readings_is_empty_object() {
        let payload = SensorReadings::default().compact();
        assert!(payload.is_empty());
        assert_eq!(payload.to_json(), "{}");
    }
}
