pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod export;
pub mod models;
pub mod results;
pub mod submission;
pub mod utils;

pub use api::{Attachment, HttpTransport, MediaKind, Transport};
pub use config::ServiceConfig;
pub use error::{ClientError, Result};
pub use export::{ExportArtifact, ExportFormat};
pub use models::{AnalysisResult, ExplainabilityBundle, FeatureVector, SensorReadings};
pub use results::{ResultsOrchestrator, ResultsSession, ResultsView};
pub use submission::{AnalysisInputs, AttachmentPaths, SubmissionCoordinator};

use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Load `.env` and install the log subscriber. Safe to call more than once.
pub fn init() {
    // Current directory first, then the parent (running from a subfolder)
    if dotenvy::dotenv().is_err() {
        let _ = dotenvy::from_path("../.env");
    }

    // RUST_LOG=debug for per-request logs
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,healthmorph=info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

/// Both workflows wired to one transport
pub struct HealthMorphClient {
    config: ServiceConfig,
    submission: SubmissionCoordinator,
    results: ResultsOrchestrator,
}

impl HealthMorphClient {
    pub fn new(config: ServiceConfig) -> Result<Self> {
        let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(&config)?);
        Ok(Self::with_transport(config, transport))
    }

    pub fn with_transport(config: ServiceConfig, transport: Arc<dyn Transport>) -> Self {
        tracing::debug!(api_base = %config.api_base, timeout = ?config.timeout, "Client ready");
        Self {
            submission: SubmissionCoordinator::new(Arc::clone(&transport)),
            results: ResultsOrchestrator::new(transport),
            config,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn submission(&self) -> &SubmissionCoordinator {
        &self.submission
    }

    pub fn results(&self) -> &ResultsOrchestrator {
        &self.results
    }

    /// Submit and open the results view with the outcome.
    pub async fn analyze(&self, inputs: &AnalysisInputs) -> Result<ResultsView> {
        let result = self.submission.submit(inputs).await?;
        Ok(ResultsView::open(Some(result)))
    }
}
