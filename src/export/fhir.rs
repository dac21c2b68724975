//! FHIR Observation export
//!
//! The Observation document is built by the service; the client only posts
//! the headline values and saves whatever JSON comes back.

use super::{ExportArtifact, ExportSnapshot};
use crate::api::{Endpoint, FormPayload, Transport};
use crate::error::{ClientError, Result};
use crate::utils::{format_number, PendingFlag};
use serde_json::Value;
use std::sync::Arc;

pub const FHIR_FILE_NAME: &str = "healthmorph-observation.json";

/// Placeholder subject until patients are identified for real
pub const FHIR_SUBJECT_ID: &str = "subject-001";

pub struct FhirExporter {
    transport: Arc<dyn Transport>,
    exporting: PendingFlag,
}

impl FhirExporter {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            exporting: PendingFlag::new(),
        }
    }

    pub fn is_exporting(&self) -> bool {
        self.exporting.is_pending()
    }

    /// Request the Observation and pretty-print it verbatim.
    ///
    /// Any failure becomes `ClientError::Export`; nothing is retried.
    pub async fn export(&self, snapshot: &ExportSnapshot<'_>) -> Result<ExportArtifact> {
        let _guard = self
            .exporting
            .try_begin()
            .ok_or(ClientError::Busy("FHIR export"))?;

        let result = snapshot.result;
        let form = FormPayload::new()
            .text("risk_level", result.risk_level.clone().unwrap_or_default())
            .text(
                "risk_score",
                result.risk_score().map(format_number).unwrap_or_default(),
            )
            .text("subject_id", FHIR_SUBJECT_ID);

        let response = self
            .transport
            .post_form(Endpoint::ExportFhir, form)
            .await
            .map_err(|e| ClientError::Export(format!("FHIR export failed: {}", e)))?;

        if !response.is_success() {
            tracing::warn!(status = response.status, "FHIR export rejected");
            return Err(ClientError::Export(format!(
                "Export failed (HTTP {})",
                response.status
            )));
        }

        let document: Value = response
            .json()
            .map_err(|e| ClientError::Export(format!("FHIR export failed: {}", e)))?;

        Ok(ExportArtifact {
            file_name: FHIR_FILE_NAME,
            content_type: "application/json",
            bytes: serde_json::to_vec_pretty(&document)?,
        })
    }
}
