//! Validation and sanitization of raw incident records.
//!
//! [`validate`] reports every defect without changing anything;
//! [`sanitize`] drops defective records and converts the rest to the
//! canonical [`Incident`] shape. Both use the same checks, so a record is
//! reported valid exactly when it survives sanitization.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Offset as _, Utc};
use crime_dash_analytics_models::ValidationReport;
use crime_dash_crime_models::{Category, Incident, Location};
use crime_dash_source_models::{RawIncident, RawScalar};
use strum_macros::Display;
use thiserror::Error;

/// Coordinate axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Axis {
    Latitude,
    Longitude,
}

/// A reason a raw record cannot become an [`Incident`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RecordDefect {
    #[error("missing id")]
    MissingId,

    #[error("missing timestamp")]
    MissingTimestamp,

    #[error("unparseable timestamp '{0}'")]
    UnparseableTimestamp(String),

    #[error("missing {0}")]
    MissingCoordinate(Axis),

    #[error("non-numeric {0}")]
    NonNumericCoordinate(Axis),

    #[error("zero {0}")]
    ZeroCoordinate(Axis),
}

/// Parses a source timestamp into local wall-clock time.
///
/// Timestamps carrying an offset are converted to `local`; naive
/// timestamps and bare dates are taken as already local.
#[must_use]
pub fn parse_timestamp(text: &str, local: &FixedOffset) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(local).naive_local());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

fn coordinate(field: Option<&RawScalar>, axis: Axis) -> Result<f64, RecordDefect> {
    let Some(raw) = field else {
        return Err(RecordDefect::MissingCoordinate(axis));
    };
    let value = raw
        .as_f64()
        .ok_or(RecordDefect::NonNumericCoordinate(axis))?;
    if value == 0.0 {
        return Err(RecordDefect::ZeroCoordinate(axis));
    }
    Ok(value)
}

/// Converts one raw record, collecting every defect it has.
///
/// # Errors
///
/// * If the record has any [`RecordDefect`]
pub fn to_incident(raw: &RawIncident, local: &FixedOffset) -> Result<Incident, Vec<RecordDefect>> {
    let mut defects = Vec::new();

    let id = raw.id_text();
    if id.is_none() {
        defects.push(RecordDefect::MissingId);
    }

    let timestamp = match raw.timestamp_text() {
        None => {
            defects.push(RecordDefect::MissingTimestamp);
            None
        }
        Some(text) => {
            let parsed = parse_timestamp(text, local);
            if parsed.is_none() {
                defects.push(RecordDefect::UnparseableTimestamp(text.to_string()));
            }
            parsed
        }
    };

    let latitude = coordinate(raw.latitude_field(), Axis::Latitude)
        .map_err(|e| defects.push(e))
        .ok();
    let longitude = coordinate(raw.longitude_field(), Axis::Longitude)
        .map_err(|e| defects.push(e))
        .ok();

    match (id, timestamp, latitude, longitude) {
        (Some(id), Some(timestamp), Some(latitude), Some(longitude)) if defects.is_empty() => {
            Ok(Incident {
                id,
                category: raw.category_code().map(Category::parse).unwrap_or_default(),
                timestamp,
                location: Location {
                    latitude,
                    longitude,
                },
                area: raw.area_name().map(String::from),
                cell_id: raw.cell_ref().map(String::from),
                description: raw
                    .description
                    .as_deref()
                    .map(str::trim)
                    .filter(|d| !d.is_empty())
                    .map(String::from),
            })
        }
        _ => Err(defects),
    }
}

/// Reports every defect in `records`. Never fails.
#[must_use]
pub fn validate(records: &[RawIncident]) -> ValidationReport {
    validate_with_offset(records, &Utc.fix())
}

/// [`validate`] with a local UTC offset for timestamp conversion.
#[must_use]
pub fn validate_with_offset(records: &[RawIncident], local: &FixedOffset) -> ValidationReport {
    let mut errors = Vec::new();
    let mut valid_count = 0;

    for (index, raw) in records.iter().enumerate() {
        match to_incident(raw, local) {
            Ok(_) => valid_count += 1,
            Err(defects) => {
                errors.extend(defects.iter().map(|d| format!("record {index}: {d}")));
            }
        }
    }

    ValidationReport {
        valid: errors.is_empty(),
        errors,
        valid_count,
        total_count: records.len(),
    }
}

/// Drops defective records and converts the rest, keeping input order.
#[must_use]
pub fn sanitize(records: &[RawIncident]) -> Vec<Incident> {
    sanitize_with_offset(records, &Utc.fix())
}

/// [`sanitize`] with a local UTC offset for timestamp conversion.
#[must_use]
pub fn sanitize_with_offset(records: &[RawIncident], local: &FixedOffset) -> Vec<Incident> {
    let incidents: Vec<Incident> = records
        .iter()
        .filter_map(|raw| to_incident(raw, local).ok())
        .collect();

    let dropped = records.len() - incidents.len();
    if dropped > 0 {
        log::debug!(
            "sanitize: dropped {dropped} of {} records",
            records.len()
        );
    }

    incidents
}
