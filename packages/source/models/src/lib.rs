#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Wire formats for raw incident and grid cell records.
//!
//! The incident service is loose about field names and value types: the
//! same concept can arrive under several keys, ids can be numbers or
//! strings, and coordinates are sometimes quoted. These types accept all
//! of that. The accessor methods resolve each concept to a single value
//! so the sanitizer can produce the canonical
//! [`crime_dash_crime_models::Incident`].

use std::collections::BTreeMap;

use crime_dash_crime_models::{GridCell, Location};
use serde::{Deserialize, Serialize};

/// A scalar JSON value of unreliable type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawScalar {
    /// An integer.
    Int(i64),
    /// A floating point number.
    Float(f64),
    /// A string, possibly holding a number.
    Text(String),
    /// Anything else (booleans, objects, arrays).
    Other(serde_json::Value),
}

impl RawScalar {
    /// Returns a non-empty string form of numbers and strings. A numeric
    /// zero counts as missing.
    #[must_use]
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Int(0) => None,
            Self::Float(v) if *v == 0.0 => None,
            Self::Int(v) => Some(v.to_string()),
            Self::Float(v) => Some(v.to_string()),
            Self::Text(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            Self::Other(_) => None,
        }
    }

    /// Returns a finite numeric value, parsing strings if needed.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            Self::Int(v) => *v as f64,
            Self::Float(v) => *v,
            Self::Text(s) => s.trim().parse::<f64>().ok()?,
            Self::Other(_) => return None,
        };
        value.is_finite().then_some(value)
    }
}

/// An incident record as delivered by the incident service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawIncident {
    /// Record identifier.
    pub id: Option<RawScalar>,
    /// Crime type code (primary key name).
    pub crime_type: Option<String>,
    /// Crime type code (legacy key name).
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Crime type code (alternate key name).
    pub category: Option<String>,
    /// Occurrence time (primary key name).
    pub date: Option<String>,
    /// Record creation time, used when `date` is absent.
    pub created_at: Option<String>,
    /// Occurrence time (alternate key name).
    pub timestamp: Option<String>,
    /// Latitude (primary key name).
    pub latitude: Option<RawScalar>,
    /// Latitude (short key name).
    pub lat: Option<RawScalar>,
    /// Longitude (primary key name).
    pub longitude: Option<RawScalar>,
    /// Longitude (short key name).
    pub lng: Option<RawScalar>,
    /// District name (primary key name).
    pub district: Option<String>,
    /// District name (alternate key name).
    pub area: Option<String>,
    /// Grid cell reference (primary key name).
    pub hex_id: Option<String>,
    /// Grid cell reference (alternate key name).
    pub cell_id: Option<String>,
    /// Free-text description.
    pub description: Option<String>,
}

/// Returns the first non-blank string among the candidates.
fn first_text<'a>(candidates: &[&'a Option<String>]) -> Option<&'a str> {
    candidates
        .iter()
        .copied()
        .filter_map(Option::as_deref)
        .map(str::trim)
        .find(|s| !s.is_empty())
}

impl RawIncident {
    /// Resolved record id.
    #[must_use]
    pub fn id_text(&self) -> Option<String> {
        self.id.as_ref().and_then(RawScalar::as_text)
    }

    /// Resolved category code.
    #[must_use]
    pub fn category_code(&self) -> Option<&str> {
        first_text(&[&self.crime_type, &self.kind, &self.category])
    }

    /// Resolved timestamp text (`date`, then `created_at`, then
    /// `timestamp`).
    #[must_use]
    pub fn timestamp_text(&self) -> Option<&str> {
        first_text(&[&self.date, &self.created_at, &self.timestamp])
    }

    /// Latitude as delivered (`latitude`, then `lat`).
    #[must_use]
    pub fn latitude_field(&self) -> Option<&RawScalar> {
        self.latitude.as_ref().or(self.lat.as_ref())
    }

    /// Longitude as delivered (`longitude`, then `lng`).
    #[must_use]
    pub fn longitude_field(&self) -> Option<&RawScalar> {
        self.longitude.as_ref().or(self.lng.as_ref())
    }

    /// Resolved district name.
    #[must_use]
    pub fn area_name(&self) -> Option<&str> {
        first_text(&[&self.district, &self.area])
    }

    /// Resolved grid cell reference.
    #[must_use]
    pub fn cell_ref(&self) -> Option<&str> {
        first_text(&[&self.hex_id, &self.cell_id])
    }
}

/// A grid cell record as delivered by the incident service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawGridCell {
    /// Cell identifier.
    pub id: Option<RawScalar>,
    /// Center latitude.
    #[serde(alias = "latitude")]
    pub lat: Option<RawScalar>,
    /// Center longitude.
    #[serde(alias = "longitude")]
    pub lng: Option<RawScalar>,
    /// District name.
    #[serde(alias = "area")]
    pub district: Option<String>,
    /// Nearby street address.
    pub address: Option<String>,
}

impl RawGridCell {
    /// Converts to a [`GridCell`], or `None` if the id or either center
    /// coordinate is missing.
    #[must_use]
    pub fn to_grid_cell(&self) -> Option<GridCell> {
        let cell_id = self.id.as_ref().and_then(RawScalar::as_text)?;
        let latitude = self.lat.as_ref().and_then(RawScalar::as_f64)?;
        let longitude = self.lng.as_ref().and_then(RawScalar::as_f64)?;
        Some(GridCell {
            cell_id,
            center: Location {
                latitude,
                longitude,
            },
            area: first_text(&[&self.district]).map(String::from),
            address: first_text(&[&self.address]).map(String::from),
        })
    }
}

/// One page of the paginated incident listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IncidentPage {
    /// Records on this page.
    #[serde(default)]
    pub results: Vec<RawIncident>,
    /// URL of the next page, `None` on the last page.
    pub next: Option<String>,
}

/// Server-side narrowing hints forwarded as query parameters.
///
/// Hints only reduce transfer size. The dashboard always re-applies its
/// own filters to whatever the source returns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchHints {
    params: BTreeMap<String, String>,
}

impl FetchHints {
    /// No hints.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Parameters in key order.
    pub fn params(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_synonymous_fields() {
        let raw: RawIncident = serde_json::from_str(
            r#"{
                "id": 7,
                "type": "theft",
                "created_at": "2024-12-01T10:30:00Z",
                "lat": "43.25",
                "lng": 76.9,
                "area": "Medeu",
                "cell_id": "hex_001"
            }"#,
        )
        .unwrap();

        assert_eq!(raw.id_text().as_deref(), Some("7"));
        assert_eq!(raw.category_code(), Some("theft"));
        assert_eq!(raw.timestamp_text(), Some("2024-12-01T10:30:00Z"));
        assert_eq!(raw.latitude_field().and_then(RawScalar::as_f64), Some(43.25));
        assert_eq!(raw.longitude_field().and_then(RawScalar::as_f64), Some(76.9));
        assert_eq!(raw.area_name(), Some("Medeu"));
        assert_eq!(raw.cell_ref(), Some("hex_001"));
    }

    #[test]
    fn primary_field_wins_over_fallback() {
        let raw = RawIncident {
            crime_type: Some("drugs".to_string()),
            kind: Some("theft".to_string()),
            date: Some("2024-01-01".to_string()),
            created_at: Some("2023-01-01".to_string()),
            ..RawIncident::default()
        };
        assert_eq!(raw.category_code(), Some("drugs"));
        assert_eq!(raw.timestamp_text(), Some("2024-01-01"));
    }

    #[test]
    fn blank_strings_count_as_missing() {
        let raw = RawIncident {
            id: Some(RawScalar::Text("  ".to_string())),
            date: Some(String::new()),
            latitude: Some(RawScalar::Text("abc".to_string())),
            ..RawIncident::default()
        };
        assert!(raw.id_text().is_none());
        assert!(raw.timestamp_text().is_none());
        assert_eq!(
            raw.latitude_field(),
            Some(&RawScalar::Text("abc".to_string()))
        );
        assert!(raw.latitude_field().and_then(RawScalar::as_f64).is_none());
    }

    #[test]
    fn converts_grid_cells() {
        let raw: RawGridCell = serde_json::from_str(
            r#"{"id": "hex_003", "lat": 43.25, "lng": 76.90, "district": "Auezov"}"#,
        )
        .unwrap();
        let cell = raw.to_grid_cell().unwrap();
        assert_eq!(cell.cell_id, "hex_003");
        assert_eq!(cell.area.as_deref(), Some("Auezov"));
        assert!(cell.address.is_none());

        let missing: RawGridCell = serde_json::from_str(r#"{"id": "hex_004"}"#).unwrap();
        assert!(missing.to_grid_cell().is_none());
    }

    #[test]
    fn zero_ids_count_as_missing() {
        assert!(RawScalar::Int(0).as_text().is_none());
        assert!(RawScalar::Float(0.0).as_text().is_none());
        assert_eq!(RawScalar::Text("0".to_string()).as_text().as_deref(), Some("0"));
        assert_eq!(RawScalar::Int(-3).as_text().as_deref(), Some("-3"));

        let raw: RawIncident = serde_json::from_str(r#"{"id": 0}"#).unwrap();
        assert!(raw.id_text().is_none());
    }

    #[test]
    fn listing_page_tolerates_extra_fields() {
        let page: IncidentPage =
            serde_json::from_str(r#"{"count": 120, "next": "/crimes/?page=2"}"#).unwrap();
        assert!(page.results.is_empty());
        assert_eq!(page.next.as_deref(), Some("/crimes/?page=2"));
        assert_eq!(FetchHints::none().params().count(), 0);
    }
}
