#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Crime type taxonomy, incident and grid cell types.
//!
//! This crate defines the canonical shape that every record has once it
//! has passed the sanitizer. Downstream filtering and statistics code only
//! ever sees these types, never the source-specific wire format.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Area label used in aggregates when an incident has no district.
pub const UNKNOWN_AREA: &str = "unknown";

/// The fixed set of crime types the dashboard knows how to label.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CrimeType {
    /// Unlawful taking of property
    Theft,
    /// Taking property by force or threat
    Robbery,
    /// Physical attack
    Assault,
    /// Deception for financial gain
    Fraud,
    /// Willful destruction of property
    Vandalism,
    /// Narcotics offenses
    Drugs,
    /// Missing or unclassified type
    Unknown,
}

impl CrimeType {
    /// Human-readable label shown in charts and legends.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Theft => "Theft",
            Self::Robbery => "Robbery",
            Self::Assault => "Assault",
            Self::Fraud => "Fraud",
            Self::Vandalism => "Vandalism",
            Self::Drugs => "Drug offenses",
            Self::Unknown => "Unknown",
        }
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Theft,
            Self::Robbery,
            Self::Assault,
            Self::Fraud,
            Self::Vandalism,
            Self::Drugs,
            Self::Unknown,
        ]
    }
}

/// The category of an incident.
///
/// Codes outside the [`CrimeType`] enumeration are kept verbatim in
/// [`Category::Other`] so that filtering and grouping still distinguish
/// them, but they are labeled as unknown for display.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    /// One of the known crime types.
    Known(CrimeType),
    /// An unrecognized category code, preserved as received.
    Other(String),
}

impl Category {
    /// Parses a raw category code. Never fails: unknown codes become
    /// [`Category::Other`].
    #[must_use]
    pub fn parse(code: &str) -> Self {
        code.parse::<CrimeType>()
            .map_or_else(|_| Self::Other(code.to_string()), Self::Known)
    }

    /// The canonical code (`"theft"`, `"drugs"`, or the verbatim unknown
    /// code).
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Known(crime_type) => crime_type.as_ref(),
            Self::Other(code) => code,
        }
    }

    /// Display label. Unrecognized codes are labeled as unknown.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Known(crime_type) => crime_type.label(),
            Self::Other(_) => CrimeType::Unknown.label(),
        }
    }

    /// Whether this is the narcotics category.
    #[must_use]
    pub const fn is_narcotics(&self) -> bool {
        matches!(self, Self::Known(CrimeType::Drugs))
    }
}

impl Default for Category {
    fn default() -> Self {
        Self::Known(CrimeType::Unknown)
    }
}

impl From<CrimeType> for Category {
    fn from(value: CrimeType) -> Self {
        Self::Known(value)
    }
}

impl From<String> for Category {
    fn from(value: String) -> Self {
        match value.parse::<CrimeType>() {
            Ok(crime_type) => Self::Known(crime_type),
            Err(_) => Self::Other(value),
        }
    }
}

impl From<Category> for String {
    fn from(value: Category) -> Self {
        match value {
            Category::Known(crime_type) => crime_type.to_string(),
            Category::Other(code) => code,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A WGS84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

/// A validated crime incident.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
    /// Unique identifier from the data source.
    pub id: String,
    /// Crime category.
    pub category: Category,
    /// When the incident occurred, in the dashboard's local wall-clock time.
    pub timestamp: NaiveDateTime,
    /// Where the incident occurred.
    pub location: Location,
    /// Administrative district name.
    pub area: Option<String>,
    /// Grid cell this incident falls into.
    pub cell_id: Option<String>,
    /// Free-text description.
    pub description: Option<String>,
}

impl Incident {
    /// The district used for grouping, falling back to [`UNKNOWN_AREA`].
    #[must_use]
    pub fn area_or_unknown(&self) -> &str {
        self.area.as_deref().unwrap_or(UNKNOWN_AREA)
    }
}

/// A fixed spatial bucket used for density visualization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridCell {
    /// Unique cell key.
    pub cell_id: String,
    /// Cell centroid.
    pub center: Location,
    /// Administrative district the cell belongs to.
    pub area: Option<String>,
    /// Street address near the cell center, if the source provides one.
    pub address: Option<String>,
}
