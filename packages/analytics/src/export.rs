//! CSV and JSON export of the filtered record set.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use crime_dash_analytics_models::{DerivedView, FilterSelection};
use crime_dash_crime_models::Incident;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use thiserror::Error;

/// Errors that can occur while exporting.
#[derive(Debug, Error)]
pub enum ExportError {
    /// CSV encoding failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON encoding failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Writing the output failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Export document format.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ExportFormat {
    Csv,
    #[default]
    Json,
}

impl ExportFormat {
    /// MIME type of the encoded document.
    #[must_use]
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Csv => "text/csv",
            Self::Json => "application/json",
        }
    }

    /// File name used when none is given.
    #[must_use]
    pub const fn default_filename(self) -> &'static str {
        match self {
            Self::Csv => "crime_analytics.csv",
            Self::Json => "crime_analytics.json",
        }
    }
}

/// One CSV line.
#[derive(Debug, Serialize)]
struct IncidentRow<'a> {
    id: &'a str,
    category: &'a str,
    label: &'a str,
    timestamp: String,
    latitude: f64,
    longitude: f64,
    area: &'a str,
    cell_id: &'a str,
    description: &'a str,
}

impl<'a> From<&'a Incident> for IncidentRow<'a> {
    fn from(incident: &'a Incident) -> Self {
        Self {
            id: &incident.id,
            category: incident.category.as_str(),
            label: incident.category.label(),
            timestamp: incident.timestamp.format("%Y-%m-%dT%H:%M:%S").to_string(),
            latitude: incident.location.latitude,
            longitude: incident.location.longitude,
            area: incident.area.as_deref().unwrap_or_default(),
            cell_id: incident.cell_id.as_deref().unwrap_or_default(),
            description: incident.description.as_deref().unwrap_or_default(),
        }
    }
}

/// Encodes records as CSV with a header row and every field quoted.
///
/// An empty record set produces an empty document.
///
/// # Errors
///
/// * If CSV encoding fails
pub fn to_csv(records: &[Incident]) -> Result<Vec<u8>, ExportError> {
    if records.is_empty() {
        return Ok(vec![]);
    }

    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .from_writer(vec![]);

    for record in records {
        writer.serialize(IncidentRow::from(record))?;
    }

    writer.into_inner().map_err(|e| ExportError::Io(e.into_error()))
}

/// The JSON export document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    /// Selection the data was filtered with.
    pub filters: FilterSelection,
    /// Filtered records.
    pub data: Vec<Incident>,
    /// Aggregates of the filtered records.
    pub stats: DerivedView,
    /// RFC 3339 export time.
    pub export_date: String,
}

/// Encodes the filtered view as a pretty-printed JSON document.
///
/// # Errors
///
/// * If JSON encoding fails
pub fn to_json(
    selection: &FilterSelection,
    records: &[Incident],
    stats: &DerivedView,
    exported_at: DateTime<Utc>,
) -> Result<Vec<u8>, ExportError> {
    let document = ExportDocument {
        filters: selection.clone(),
        data: records.to_vec(),
        stats: stats.clone(),
        export_date: exported_at.to_rfc3339_opts(SecondsFormat::Millis, true),
    };
    Ok(serde_json::to_vec_pretty(&document)?)
}

/// Encodes in `format`.
///
/// # Errors
///
/// * If encoding fails
pub fn encode(
    format: ExportFormat,
    selection: &FilterSelection,
    records: &[Incident],
    stats: &DerivedView,
    exported_at: DateTime<Utc>,
) -> Result<Vec<u8>, ExportError> {
    match format {
        ExportFormat::Csv => to_csv(records),
        ExportFormat::Json => to_json(selection, records, stats, exported_at),
    }
}

/// Writes an encoded document to `path`.
///
/// # Errors
///
/// * If the file cannot be written
pub fn write_to_file(path: &Path, bytes: &[u8]) -> Result<(), ExportError> {
    std::fs::write(path, bytes)?;
    log::info!("Exported {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;

    use super::*;
    use crate::filter::tests::incident;
    use crate::stats::derive_view;

    #[test]
    fn csv_quotes_every_field() {
        let mut record = incident("7", "theft", "2024-11-15T14:05:00");
        record.description = Some("said \"hi\", left".to_string());
        let csv = String::from_utf8(to_csv(&[record]).unwrap()).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            r#""id","category","label","timestamp","latitude","longitude","area","cell_id","description""#
        );
        assert_eq!(
            lines.next().unwrap(),
            r#""7","theft","Theft","2024-11-15T14:05:00","43.25","76.9","","","said ""hi"", left""#
        );
        assert!(lines.next().is_none());
    }

    #[test]
    fn csv_of_nothing_is_empty() {
        assert!(to_csv(&[]).unwrap().is_empty());
    }

    #[test]
    fn json_document_has_expected_keys() {
        let records = vec![incident("1", "drugs", "2024-11-15T14:05:00")];
        let stats = derive_view(&records, 5);
        let exported_at = Utc.with_ymd_and_hms(2024, 12, 1, 8, 30, 0).unwrap();
        let bytes = to_json(&FilterSelection::default(), &records, &stats, exported_at).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["exportDate"], "2024-12-01T08:30:00.000Z");
        assert_eq!(value["filters"]["period"], "all");
        assert_eq!(value["data"][0]["category"], "drugs");
        assert_eq!(value["stats"]["totalCount"], 1);
    }

    #[test]
    fn parses_format_tokens() {
        assert_eq!("CSV".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!("json".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert!("xml".parse::<ExportFormat>().is_err());
        assert_eq!(ExportFormat::Csv.content_type(), "text/csv");
    }
}
