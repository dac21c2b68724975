//! Two-column CSV summary

use super::{ExportArtifact, ExportSnapshot};
use crate::error::{ClientError, Result};
use crate::utils::format_number;
use csv::{QuoteStyle, Terminator, WriterBuilder};

pub const CSV_FILE_NAME: &str = "healthmorph-results.csv";

/// Encode the fixed `Field,Value` table.
///
/// Rows: Risk Level, Risk Score, Confidence, Timestamp, Explanation. Every
/// cell is quoted and a missing value is an empty quoted string. Lines are
/// `\n`-separated with no trailing newline. Writing to memory cannot fail in
/// practice; the `Result` only carries the csv writer's signature.
pub fn encode_csv(snapshot: &ExportSnapshot<'_>) -> Result<ExportArtifact> {
    let result = snapshot.result;
    let number = |v: Option<f64>| v.map(format_number).unwrap_or_default();

    let rows: [[String; 2]; 6] = [
        ["Field".into(), "Value".into()],
        ["Risk Level".into(), result.risk_level.clone().unwrap_or_default()],
        ["Risk Score".into(), number(result.risk_score())],
        ["Confidence".into(), number(result.confidence())],
        ["Timestamp".into(), snapshot.timestamp.to_string()],
        ["Explanation".into(), result.explanation.clone().unwrap_or_default()],
    ];

    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    for row in &rows {
        writer.write_record(row)?;
    }

    let mut bytes = writer
        .into_inner()
        .map_err(|e| ClientError::Export(format!("CSV export failed: {}", e)))?;
    if bytes.last() == Some(&b'\n') {
        bytes.pop();
    }

    Ok(ExportArtifact {
        file_name: CSV_FILE_NAME,
        content_type: "text/csv",
        bytes,
    })
}
