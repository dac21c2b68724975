//! Explainability pipeline
//!
//! Three steps run strictly one after another against the same feature
//! vector: SHAP, LIME, counterfactual. The first failing step ends the run;
//! whatever earlier steps produced is kept in the outcome.

use crate::api::{Endpoint, FormPayload, RawResponse, Transport};
use crate::error::{ClientError, Result};
use crate::models::{AnalysisResult, ExplainabilityBundle, FeatureVector};
use crate::utils::PendingFlag;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

/// Marker sent with the counterfactual request
const COUNTERFACTUAL_ANALYSIS_TYPE: &str = "recovery";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExplainStep {
    Shap,
    Lime,
    Counterfactual,
}

/// Execution order of a run
pub const EXPLAIN_SEQUENCE: [ExplainStep; 3] =
    [ExplainStep::Shap, ExplainStep::Lime, ExplainStep::Counterfactual];

impl ExplainStep {
    pub fn endpoint(&self) -> Endpoint {
        match self {
            ExplainStep::Shap => Endpoint::ExplainShap,
            ExplainStep::Lime => Endpoint::ExplainLime,
            ExplainStep::Counterfactual => Endpoint::ExplainCounterfactual,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ExplainStep::Shap => "SHAP",
            ExplainStep::Lime => "LIME",
            ExplainStep::Counterfactual => "Counterfactual",
        }
    }

    /// Top-level key wrapping the method's output in the response
    fn response_key(&self) -> &'static str {
        match self {
            ExplainStep::Shap => "shap",
            ExplainStep::Lime => "lime",
            ExplainStep::Counterfactual => "counterfactual",
        }
    }

    fn form(&self, features_json: &str) -> FormPayload {
        let form = FormPayload::new().text("features_json", features_json);
        match self {
            ExplainStep::Counterfactual => form.text("analysis_type", COUNTERFACTUAL_ANALYSIS_TYPE),
            _ => form,
        }
    }

    /// Parse a successful response into the bundle slot for this step.
    ///
    /// Only a body that is not JSON at all fails the step.
    fn store(&self, response: &RawResponse, bundle: &mut ExplainabilityBundle) -> Result<()> {
        let body: Value = response.json()?;
        let key = self.response_key();
        match self {
            ExplainStep::Shap => bundle.shap = Some(unwrap_method(&body, key)),
            ExplainStep::Lime => bundle.lime = Some(unwrap_method(&body, key)),
            ExplainStep::Counterfactual => bundle.counterfactual = Some(unwrap_method(&body, key)),
        }
        Ok(())
    }

    fn failure(&self, message: impl Into<String>) -> ClientError {
        ClientError::Explain {
            step: self.label(),
            message: message.into(),
        }
    }
}

/// A response without the method key, or with something other than an
/// object under it, still counts as an (empty) answer.
fn unwrap_method<T: DeserializeOwned + Default>(body: &Value, key: &str) -> T {
    match body.get(key) {
        Some(inner) if !inner.is_null() => serde_json::from_value(inner.clone())
            .unwrap_or_else(|e| {
                tracing::debug!(method = key, error = %e, "Unexpected explainability payload");
                T::default()
            }),
        _ => T::default(),
    }
}

/// Result of one run: the bundle so far and, if the run stopped early, why
#[derive(Debug)]
pub struct ExplainOutcome {
    pub bundle: ExplainabilityBundle,
    pub error: Option<ClientError>,
    /// Steps that were actually attempted, in order
    pub attempted: Vec<ExplainStep>,
}

impl ExplainOutcome {
    pub fn is_complete(&self) -> bool {
        self.error.is_none() && self.bundle.is_complete()
    }
}

pub struct ExplainabilityPipeline {
    transport: Arc<dyn Transport>,
    pending: PendingFlag,
}

impl ExplainabilityPipeline {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            pending: PendingFlag::new(),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_pending()
    }

    /// Run all three steps from the beginning.
    ///
    /// Only `Busy` is returned as `Err`; request failures are reported in the
    /// outcome next to the partial bundle.
    pub async fn run(&self, result: &AnalysisResult) -> Result<ExplainOutcome> {
        let _guard = self
            .pending
            .try_begin()
            .ok_or(ClientError::Busy("Explainability"))?;

        let features = FeatureVector::from_result(result);
        let features_json = features.to_json();
        tracing::info!(features = %features_json, "Requesting explainability");

        let mut outcome = ExplainOutcome {
            bundle: ExplainabilityBundle::default(),
            error: None,
            attempted: Vec::with_capacity(EXPLAIN_SEQUENCE.len()),
        };

        for step in EXPLAIN_SEQUENCE {
            outcome.attempted.push(step);
            if let Err(err) = self.run_step(step, &features_json, &mut outcome.bundle).await {
                tracing::warn!(step = step.label(), error = %err, "Explainability step failed");
                outcome.error = Some(err);
                break;
            }
            tracing::debug!(step = step.label(), "Explainability step complete");
        }

        Ok(outcome)
    }

    async fn run_step(
        &self,
        step: ExplainStep,
        features_json: &str,
        bundle: &mut ExplainabilityBundle,
    ) -> Result<()> {
        let response = self
            .transport
            .post_form(step.endpoint(), step.form(features_json))
            .await
            .map_err(|e| step.failure(e.to_string()))?;

        if !response.is_success() {
            let body = response.text();
            let message = if body.trim().is_empty() {
                format!("HTTP {}", response.status)
            } else {
                format!("HTTP {}: {}", response.status, body.trim())
            };
            return Err(step.failure(message));
        }

        step.store(&response, bundle)
            .map_err(|e| step.failure(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::RecordingTransport;
    use serde_json::json;

    const SHAP_BODY: &str = r#"{"shap":{"importances":[{"feature_name":"face","importance":0.6}]}}"#;
    const LIME_BODY: &str = r#"{"lime":{"local_features":[["voice",0.25]]}}"#;
    const CF_BODY: &str = r#"{"counterfactual":{"recommendations":[{"feature":"heart_rate"}]}}"#;

    fn sample_result() -> AnalysisResult {
        AnalysisResult {
            risk_score: Some(json!(41)),
            contributions: json!({"face": 12.5, "voice": "bad", "symptoms": -3})
                .as_object()
                .cloned(),
            ..Default::default()
        }
    }

    fn pipeline(transport: &Arc<RecordingTransport>) -> ExplainabilityPipeline {
        ExplainabilityPipeline::new(transport.clone() as Arc<dyn Transport>)
    }

    #[tokio::test]
    async fn test_full_run_in_order() {
        let transport = Arc::new(
            RecordingTransport::new()
                .respond(Endpoint::ExplainShap, 200, SHAP_BODY)
                .respond(Endpoint::ExplainLime, 200, LIME_BODY)
                .respond(Endpoint::ExplainCounterfactual, 200, CF_BODY),
        );
        let pipeline = pipeline(&transport);

        let outcome = pipeline.run(&sample_result()).await.unwrap();
        assert!(outcome.is_complete());
        assert_eq!(
            transport.endpoints(),
            vec![
                Endpoint::ExplainShap,
                Endpoint::ExplainLime,
                Endpoint::ExplainCounterfactual
            ]
        );
        assert_eq!(outcome.bundle.shap.unwrap().summary(), "face");
        assert!(!pipeline.is_pending());
    }

    #[tokio::test]
    async fn test_every_step_gets_same_features() {
        let transport = Arc::new(
            RecordingTransport::new()
                .respond(Endpoint::ExplainShap, 200, SHAP_BODY)
                .respond(Endpoint::ExplainLime, 200, LIME_BODY)
                .respond(Endpoint::ExplainCounterfactual, 200, CF_BODY),
        );
        pipeline(&transport).run(&sample_result()).await.unwrap();

        let calls = transport.calls();
        for (_, form) in &calls {
            assert_eq!(form.text_value("features_json"), Some("[12.5,-3]"));
        }
        assert_eq!(calls[0].1.text_value("analysis_type"), None);
        assert_eq!(calls[2].1.text_value("analysis_type"), Some("recovery"));
    }

    #[tokio::test]
    async fn test_lime_failure_keeps_shap_and_stops() {
        let transport = Arc::new(
            RecordingTransport::new()
                .respond(Endpoint::ExplainShap, 200, SHAP_BODY)
                .respond(Endpoint::ExplainLime, 500, "")
                .respond(Endpoint::ExplainCounterfactual, 200, CF_BODY),
        );
        let pipeline = pipeline(&transport);

        let outcome = pipeline.run(&sample_result()).await.unwrap();
        assert!(outcome.bundle.shap.is_some());
        assert!(outcome.bundle.lime.is_none());
        assert!(outcome.bundle.counterfactual.is_none());
        assert_eq!(transport.count(Endpoint::ExplainCounterfactual), 0);
        assert_eq!(
            outcome.error.unwrap().to_string(),
            "LIME request failed: HTTP 500"
        );
        assert_eq!(outcome.attempted, vec![ExplainStep::Shap, ExplainStep::Lime]);
        assert!(!pipeline.is_pending());
    }

    #[tokio::test]
    async fn test_transport_failure_on_first_step() {
        let transport = Arc::new(
            RecordingTransport::new().fail(Endpoint::ExplainShap, "connection reset"),
        );

        let outcome = pipeline(&transport).run(&sample_result()).await.unwrap();
        assert!(outcome.bundle.is_empty());
        assert_eq!(transport.endpoints(), vec![Endpoint::ExplainShap]);
        assert_eq!(
            outcome.error.unwrap().to_string(),
            "SHAP request failed: connection reset"
        );
    }

    #[tokio::test]
    async fn test_rerun_restarts_from_first_step() {
        let transport = Arc::new(
            RecordingTransport::new()
                .respond(Endpoint::ExplainShap, 200, SHAP_BODY)
                .respond(Endpoint::ExplainLime, 200, LIME_BODY)
                .respond(Endpoint::ExplainCounterfactual, 503, "busy"),
        );
        let pipeline = pipeline(&transport);

        let first = pipeline.run(&sample_result()).await.unwrap();
        assert!(first.error.is_some());

        transport.set_reply(Endpoint::ExplainCounterfactual, 200, CF_BODY);
        let second = pipeline.run(&sample_result()).await.unwrap();
        assert!(second.is_complete());
        assert_eq!(transport.count(Endpoint::ExplainShap), 2);
        assert_eq!(transport.count(Endpoint::ExplainCounterfactual), 2);
    }

    #[tokio::test]
    async fn test_response_without_method_key() {
        let transport = Arc::new(
            RecordingTransport::new()
                .respond(Endpoint::ExplainShap, 200, "{}")
                .respond(Endpoint::ExplainLime, 200, "{}")
                .respond(Endpoint::ExplainCounterfactual, 200, "{}"),
        );

        let outcome = pipeline(&transport).run(&sample_result()).await.unwrap();
        assert!(outcome.is_complete());
        assert_eq!(outcome.bundle.shap.unwrap().summary(), "n/a");
    }

    #[tokio::test]
    async fn test_loosely_typed_payload_does_not_stop_the_run() {
        let transport = Arc::new(
            RecordingTransport::new()
                .respond(
                    Endpoint::ExplainShap,
                    200,
                    r#"{"shap":{"importances":[{"feature_name":"face","importance":"0.4"}]}}"#,
                )
                .respond(Endpoint::ExplainLime, 200, r#"{"lime":"unavailable"}"#)
                .respond(Endpoint::ExplainCounterfactual, 200, CF_BODY),
        );

        let outcome = pipeline(&transport).run(&sample_result()).await.unwrap();
        assert!(outcome.error.is_none());
        assert_eq!(
            transport.endpoints(),
            vec![
                Endpoint::ExplainShap,
                Endpoint::ExplainLime,
                Endpoint::ExplainCounterfactual
            ]
        );
        let shap = outcome.bundle.shap.unwrap();
        assert_eq!(shap.importances[0].importance, Some(0.4));
        assert_eq!(outcome.bundle.lime.unwrap().summary(), "n/a");
    }

    #[tokio::test]
    async fn test_non_json_success_body_fails_the_step() {
        let transport = Arc::new(
            RecordingTransport::new()
                .respond(Endpoint::ExplainShap, 200, "<html>oops</html>")
                .respond(Endpoint::ExplainLime, 200, LIME_BODY),
        );

        let outcome = pipeline(&transport).run(&sample_result()).await.unwrap();
        assert!(outcome.bundle.is_empty());
        assert_eq!(transport.endpoints(), vec![Endpoint::ExplainShap]);
        assert!(outcome
            .error
            .unwrap()
            .to_string()
            .starts_with("SHAP request failed: Failed to parse response"));
    }

    #[tokio::test]
    async fn test_busy_pipeline_makes_no_calls() {
        let transport = Arc::new(RecordingTransport::new());
        let pipeline = pipeline(&transport);

        let _held = pipeline.pending.try_begin().unwrap();
        let err = pipeline.run(&sample_result()).await.unwrap_err();
        assert!(matches!(err, ClientError::Busy(_)));
        assert!(transport.calls().is_empty());
    }
}
