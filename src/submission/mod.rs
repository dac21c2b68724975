//! Analysis submission
//!
//! Validates the user's inputs, assembles the `/analyze` form and runs the
//! single request. The parsed [`AnalysisResult`] is the only thing handed on
//! to the results side.

use crate::api::{Attachment, Endpoint, FormPayload, MediaKind, Transport};
use crate::error::{ClientError, Result};
use crate::models::{AnalysisResult, SensorReadings};
use crate::utils::PendingFlag;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Files picked for one analysis, not yet read
#[derive(Debug, Clone, Default)]
pub struct AttachmentPaths {
    pub image: Option<PathBuf>,
    pub voice: Option<PathBuf>,
    pub video: Option<PathBuf>,
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false)
}

async fn load_optional(path: Option<&Path>, kind: MediaKind) -> Result<Option<Attachment>> {
    match path {
        Some(path) => Ok(Some(Attachment::load(path, kind).await?)),
        None => Ok(None),
    }
}

/// Everything the user can provide for one analysis
#[derive(Debug, Clone, Default)]
pub struct AnalysisInputs {
    /// Required
    pub image: Option<Attachment>,
    /// Required, must contain non-whitespace text
    pub symptoms: String,
    pub questionnaire: String,
    pub voice: Option<Attachment>,
    pub video: Option<Attachment>,
    pub sensors: SensorReadings,
}

impl AnalysisInputs {
    /// Read the picked files and assemble the inputs.
    ///
    /// Follows the same order as [`validate`](Self::validate): a missing or
    /// unreadable image path reports the missing image, then blank symptoms,
    /// and only then are any files read.
    pub async fn from_files(
        paths: &AttachmentPaths,
        symptoms: String,
        questionnaire: String,
        sensors: SensorReadings,
    ) -> Result<Self> {
        let image_path = paths.image.as_deref().ok_or(ClientError::MissingImage)?;
        if !is_file(image_path).await {
            return Err(ClientError::MissingImage);
        }
        if symptoms.trim().is_empty() {
            return Err(ClientError::MissingSymptoms);
        }

        let inputs = Self {
            image: Some(Attachment::load(image_path, MediaKind::FaceImage).await?),
            symptoms,
            questionnaire,
            voice: load_optional(paths.voice.as_deref(), MediaKind::Voice).await?,
            video: load_optional(paths.video.as_deref(), MediaKind::Video).await?,
            sensors,
        };
        Ok(inputs)
    }

    /// First violation wins: the image is checked before the symptoms.
    pub fn validate(&self) -> Result<()> {
        if self.image.is_none() {
            return Err(ClientError::MissingImage);
        }
        if self.symptoms.trim().is_empty() {
            return Err(ClientError::MissingSymptoms);
        }
        Ok(())
    }

    /// Validate and assemble the multipart form.
    ///
    /// Optional text is sent only when non-blank, optional files only when
    /// attached. `sensors` is always present, holding just the readings that
    /// parsed as numbers.
    pub fn to_form(&self) -> Result<FormPayload> {
        self.validate()?;
        let image = self.image.clone().ok_or(ClientError::MissingImage)?;

        let mut form = FormPayload::new()
            .file("image", image)
            .text("symptoms", self.symptoms.as_str());

        let questionnaire = self.questionnaire.trim();
        if !questionnaire.is_empty() {
            form = form.text("questionnaire", questionnaire);
        }
        if let Some(voice) = &self.voice {
            form = form.file("voice", voice.clone());
        }
        if let Some(video) = &self.video {
            form = form.file("video", video.clone());
        }

        Ok(form.text("sensors", self.sensors.compact().to_json()))
    }
}

/// Runs submissions against the analysis service, one at a time
pub struct SubmissionCoordinator {
    transport: Arc<dyn Transport>,
    submitting: PendingFlag,
}

impl SubmissionCoordinator {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            submitting: PendingFlag::new(),
        }
    }

    /// True while a request is in flight; the submit trigger is disabled then.
    pub fn is_submitting(&self) -> bool {
        self.submitting.is_pending()
    }

    /// Submit one analysis.
    ///
    /// Validation errors return before any network activity. Otherwise exactly
    /// one request is made and the submitting flag is cleared on every path.
    pub async fn submit(&self, inputs: &AnalysisInputs) -> Result<AnalysisResult> {
        let form = inputs.to_form()?;

        let _guard = self
            .submitting
            .try_begin()
            .ok_or(ClientError::Busy("Analysis"))?;

        tracing::info!(
            parts = ?form.names(),
            sensors = inputs.sensors.compact().len(),
            "Submitting analysis"
        );

        let response = self.transport.post_form(Endpoint::Analyze, form).await?;

        if !response.is_success() {
            let body = response.text();
            let message = if body.trim().is_empty() {
                "Request failed".to_string()
            } else {
                body
            };
            tracing::warn!(status = response.status, "Analysis rejected");
            return Err(ClientError::Request {
                status: response.status,
                message,
            });
        }

        let result: AnalysisResult = response.json()?;
        tracing::info!(
            risk_level = result.risk_level.as_deref().unwrap_or("n/a"),
            risk_score = ?result.risk_score(),
            "Analysis complete"
        );
        Ok(result)
    }
}
