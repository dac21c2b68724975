//! Data exchanged with the analysis service

mod analysis;
mod explain;
mod sensors;

pub use analysis::{AnalysisResult, DEFAULT_DISCLAIMER};
pub use explain::{
    CounterfactualReport, ExplainabilityBundle, FeatureImportance, FeatureVector, LimeReport,
    Recommendation, ShapReport,
};
pub use sensors::{SensorPayload, SensorReadings};
