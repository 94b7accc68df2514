#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Filter selection, history and derived view types for the crime
//! dashboard.
//!
//! Everything here is plain data. The computations that produce these
//! values live in `crime_dash_analytics`.

pub mod filter;
pub mod history;

use chrono::NaiveDate;
use crime_dash_crime_models::{Category, GridCell};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

pub use filter::{
    ALL_TOKEN, CategoryFilter, FilterPatch, FilterSelection, Period, Preset, TimeOfDay,
    TimeOfDayFilter,
};
pub use history::{DEFAULT_HISTORY_CAPACITY, FilterHistory};

/// Number of categories in the default top-categories ranking.
pub const DEFAULT_TOP_LIMIT: usize = 5;

/// Default hotspot ratio threshold.
pub const DEFAULT_HOTSPOT_THRESHOLD: f64 = 0.8;

/// Incident count for one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryStat {
    /// Category code.
    pub category: Category,
    /// Display label.
    pub label: String,
    /// Number of incidents.
    pub count: u64,
    /// Share of the filtered set, 0-100.
    pub percentage: f64,
}

/// Incident count for one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: u64,
}

/// Incident count for one time-of-day bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeOfDayStat {
    /// Bucket.
    pub bucket: TimeOfDay,
    /// Chart label including the hour range.
    pub label: String,
    /// Number of incidents.
    pub count: u64,
    /// Share of the filtered set, 0-100.
    pub percentage: f64,
}

/// Incident count for one district.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaStat {
    /// District name, or `"unknown"`.
    pub area: String,
    /// Number of incidents.
    pub count: u64,
    /// Share of the filtered set, 0-100.
    pub percentage: f64,
}

/// Direction of a trend.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    #[default]
    Stable,
}

impl TrendDirection {
    /// Direction of a percent change.
    #[must_use]
    pub fn of(percent_change: f64) -> Self {
        if percent_change > 0.0 {
            Self::Increasing
        } else if percent_change < 0.0 {
            Self::Decreasing
        } else {
            Self::Stable
        }
    }
}

/// Change between the first and second half of the daily series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendSummary {
    /// Percent change of the mean daily count.
    pub percent_change: f64,
    pub direction: TrendDirection,
    /// Percent change from the previous week with records to the latest
    /// one. Zero with fewer than two such weeks.
    pub week_over_week: f64,
}

/// Every aggregate the dashboard shows for the current selection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedView {
    /// Size of the filtered set.
    pub total_count: u64,
    /// Most frequent categories, descending.
    pub top_categories: Vec<CategoryStat>,
    /// Per-day counts, ascending by date.
    pub daily_series: Vec<DailyCount>,
    /// Always the four buckets, in display order.
    pub time_of_day: Vec<TimeOfDayStat>,
    /// Per-district counts, descending.
    pub area_distribution: Vec<AreaStat>,
    pub trend: TrendSummary,
}

/// A grid cell with its density for the current selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellDensity {
    /// The cell.
    #[serde(flatten)]
    pub cell: GridCell,
    /// Filtered incidents in this cell.
    pub incident_count: u64,
    /// Heat intensity in `0.0..=1.0`.
    pub intensity: f64,
}

/// Count thresholds and intensity values for heat tiers.
///
/// A count of zero is always intensity zero. Counts up to `low_max` map
/// to `low`, up to `medium_max` to `medium`, and everything above to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntensityTiers {
    /// Upper bound (inclusive) of the low tier.
    pub low_max: u64,
    /// Upper bound (inclusive) of the medium tier.
    pub medium_max: u64,
    /// Intensity of the low tier.
    pub low: f64,
    /// Intensity of the medium tier.
    pub medium: f64,
}

impl Default for IntensityTiers {
    fn default() -> Self {
        Self {
            low_max: 10,
            medium_max: 25,
            low: 0.3,
            medium: 0.6,
        }
    }
}

/// Invalid [`IntensityTiers`] configuration.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TiersError {
    /// Thresholds are not ascending.
    #[error("intensity thresholds must ascend (low_max {low_max} > medium_max {medium_max})")]
    Thresholds {
        /// Configured low threshold.
        low_max: u64,
        /// Configured medium threshold.
        medium_max: u64,
    },
    /// Intensity values are not non-decreasing within `0.0..=1.0`.
    #[error("intensity values must be non-decreasing within 0.0..=1.0")]
    Values,
}

impl IntensityTiers {
    /// Checks that intensity never decreases as the count grows.
    ///
    /// # Errors
    ///
    /// * If `low_max` is greater than `medium_max`
    /// * If the intensity values are out of range or decreasing
    pub fn validate(&self) -> Result<(), TiersError> {
        if self.low_max > self.medium_max {
            return Err(TiersError::Thresholds {
                low_max: self.low_max,
                medium_max: self.medium_max,
            });
        }
        let ordered = 0.0 <= self.low && self.low <= self.medium && self.medium <= 1.0;
        if !ordered {
            return Err(TiersError::Values);
        }
        Ok(())
    }
}

/// Outcome of validating a batch of raw records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    /// Whether every record passed.
    pub valid: bool,
    /// One message per defect, referencing the record position.
    pub errors: Vec<String>,
    /// Records without defects.
    pub valid_count: usize,
    /// Records examined.
    pub total_count: usize,
}

impl ValidationReport {
    /// Records with at least one defect.
    #[must_use]
    pub const fn invalid_count(&self) -> usize {
        self.total_count - self.valid_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tiers_are_valid() {
        assert_eq!(IntensityTiers::default().validate(), Ok(()));
    }

    #[test]
    fn rejects_decreasing_tiers() {
        let tiers = IntensityTiers {
            low: 0.7,
            medium: 0.5,
            ..IntensityTiers::default()
        };
        assert_eq!(tiers.validate(), Err(TiersError::Values));

        let tiers = IntensityTiers {
            low_max: 30,
            medium_max: 20,
            ..IntensityTiers::default()
        };
        assert!(matches!(
            tiers.validate(),
            Err(TiersError::Thresholds { .. })
        ));
    }

    #[test]
    fn trend_direction_from_sign() {
        assert_eq!(TrendDirection::of(12.5), TrendDirection::Increasing);
        assert_eq!(TrendDirection::of(-3.0), TrendDirection::Decreasing);
        assert_eq!(TrendDirection::of(0.0), TrendDirection::Stable);
    }

    #[test]
    fn derived_view_serializes_camel_case() {
        let json = serde_json::to_value(DerivedView::default()).unwrap();
        assert!(json.get("totalCount").is_some());
        assert!(json.get("dailySeries").is_some());
        assert!(json.get("areaDistribution").is_some());
    }
}
