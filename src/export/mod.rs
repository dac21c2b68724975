//! Result exports
//!
//! All encoders read the same immutable snapshot: the held analysis result
//! plus the session timestamp taken when the results view was opened.
//! CSV and raw JSON are produced locally; FHIR is generated by the service.

mod csv;
mod fhir;
mod raw;

pub use self::csv::{encode_csv, CSV_FILE_NAME};
pub use fhir::{FhirExporter, FHIR_FILE_NAME, FHIR_SUBJECT_ID};
pub use raw::{encode_raw_json, RAW_JSON_FILE_NAME};

use crate::error::{ClientError, Result};
use crate::models::AnalysisResult;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Read-only view of what the exports encode
#[derive(Debug, Clone, Copy)]
pub struct ExportSnapshot<'a> {
    pub result: &'a AnalysisResult,
    /// ISO-8601 UTC, fixed for the lifetime of one results view
    pub timestamp: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    RawJson,
    Fhir,
}

impl FromStr for ExportFormat {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" | "raw" => Ok(ExportFormat::RawJson),
            "fhir" => Ok(ExportFormat::Fhir),
            other => Err(ClientError::Config(format!(
                "Unknown export format '{}' (expected csv, json or fhir)",
                other
            ))),
        }
    }
}

/// An encoded file ready to be written
#[derive(Debug, Clone, PartialEq)]
pub struct ExportArtifact {
    pub file_name: &'static str,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

impl ExportArtifact {
    /// Write the artifact into `dir`, replacing any previous export of the
    /// same kind.
    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(self.file_name);
        fs::write(&path, &self.bytes)?;
        tracing::info!(path = %path.display(), bytes = self.bytes.len(), "Export written");
        Ok(path)
    }
}
