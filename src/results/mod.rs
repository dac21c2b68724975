//! Results orchestration
//!
//! A results view is opened with whatever the submission handed over. With a
//! result it becomes a [`ResultsSession`]; without one it is the empty view,
//! which only offers the way back to a new analysis.

mod explain;
mod report;

pub use explain::{ExplainOutcome, ExplainStep, ExplainabilityPipeline, EXPLAIN_SEQUENCE};
pub use report::render_report;

use crate::api::Transport;
use crate::config::ServiceConfig;
use crate::error::{ClientError, Result};
use crate::export::{
    encode_csv, encode_raw_json, ExportArtifact, ExportFormat, ExportSnapshot, FhirExporter,
};
use crate::models::{AnalysisResult, ExplainabilityBundle};
use chrono::{DateTime, SecondsFormat, Utc};
use std::sync::Arc;

/// Shown by the empty view
pub const RECOVERY_HINT: &str = "No results found. Please run an analysis.";

/// What the results view shows
#[derive(Debug)]
pub enum ResultsView {
    Ready(ResultsSession),
    Empty,
}

impl ResultsView {
    /// Open the view from the submission hand-off.
    pub fn open(handoff: Option<AnalysisResult>) -> Self {
        match handoff {
            Some(result) => ResultsView::Ready(ResultsSession::new(result)),
            None => {
                tracing::info!("Results opened without an analysis");
                ResultsView::Empty
            }
        }
    }

    pub fn session(&self) -> Option<&ResultsSession> {
        match self {
            ResultsView::Ready(session) => Some(session),
            ResultsView::Empty => None,
        }
    }

    pub fn session_mut(&mut self) -> Result<&mut ResultsSession> {
        match self {
            ResultsView::Ready(session) => Ok(session),
            ResultsView::Empty => Err(ClientError::NoResults),
        }
    }

    /// Recovery text for the empty view
    pub fn recovery_hint(&self) -> Option<&'static str> {
        match self {
            ResultsView::Ready(_) => None,
            ResultsView::Empty => Some(RECOVERY_HINT),
        }
    }
}

/// State of one results view. The result itself never changes.
#[derive(Debug)]
pub struct ResultsSession {
    result: AnalysisResult,
    opened_at: DateTime<Utc>,
    timestamp: String,
    explainability: ExplainabilityBundle,
    explain_error: Option<String>,
}

impl ResultsSession {
    pub fn new(result: AnalysisResult) -> Self {
        Self::opened_at(result, Utc::now())
    }

    pub fn opened_at(result: AnalysisResult, opened_at: DateTime<Utc>) -> Self {
        Self {
            result,
            opened_at,
            timestamp: opened_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            explainability: ExplainabilityBundle::default(),
            explain_error: None,
        }
    }

    pub fn result(&self) -> &AnalysisResult {
        &self.result
    }

    pub fn opened(&self) -> DateTime<Utc> {
        self.opened_at
    }

    /// Session timestamp shared by every export
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn snapshot(&self) -> ExportSnapshot<'_> {
        ExportSnapshot {
            result: &self.result,
            timestamp: &self.timestamp,
        }
    }

    pub fn explainability(&self) -> &ExplainabilityBundle {
        &self.explainability
    }

    /// Message of the last failed explainability run, cleared by the next run
    pub fn explain_error(&self) -> Option<&str> {
        self.explain_error.as_deref()
    }

    pub fn heatmap_url(&self, config: &ServiceConfig) -> Option<String> {
        self.result
            .heatmap_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .map(|url| config.resolve(url))
    }

    /// Fold a run into the displayed bundle. Members the run produced replace
    /// older ones; members it did not reach keep what an earlier run showed.
    fn absorb(&mut self, outcome: ExplainOutcome) -> Result<()> {
        let ExplainOutcome { bundle, error, .. } = outcome;
        if bundle.shap.is_some() {
            self.explainability.shap = bundle.shap;
        }
        if bundle.lime.is_some() {
            self.explainability.lime = bundle.lime;
        }
        if bundle.counterfactual.is_some() {
            self.explainability.counterfactual = bundle.counterfactual;
        }

        match error {
            Some(err) => {
                self.explain_error = Some(err.to_string());
                Err(err)
            }
            None => Ok(()),
        }
    }
}

/// Drives explainability and exports for results sessions
pub struct ResultsOrchestrator {
    pipeline: ExplainabilityPipeline,
    fhir: FhirExporter,
}

impl ResultsOrchestrator {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            pipeline: ExplainabilityPipeline::new(Arc::clone(&transport)),
            fhir: FhirExporter::new(transport),
        }
    }

    pub fn is_explaining(&self) -> bool {
        self.pipeline.is_pending()
    }

    pub fn is_exporting(&self) -> bool {
        self.fhir.is_exporting()
    }

    /// Run the full explainability sequence for the session.
    ///
    /// On failure the partial bundle is already in the session when the
    /// error is returned.
    pub async fn explain(&self, session: &mut ResultsSession) -> Result<()> {
        session.explain_error = None;
        let outcome = self.pipeline.run(&session.result).await?;
        session.absorb(outcome)
    }

    pub async fn export(
        &self,
        session: &ResultsSession,
        format: ExportFormat,
    ) -> Result<ExportArtifact> {
        let snapshot = session.snapshot();
        match format {
            ExportFormat::Csv => encode_csv(&snapshot),
            ExportFormat::RawJson => encode_raw_json(&snapshot),
            ExportFormat::Fhir => self.fhir.export(&snapshot).await,
        }
    }
}
