//! Filter tokens and the immutable filter selection.
//!
//! Every token round-trips through its string form, which is what the
//! HTTP API, the config file and the export document carry.

use crime_dash_crime_models::{Category, CrimeType};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// The token meaning "no restriction".
pub const ALL_TOKEN: &str = "all";

/// Fixed time-of-day buckets, in display order.
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
pub enum TimeOfDay {
    /// 06:00 to 12:00
    Morning,
    /// 12:00 to 18:00
    Afternoon,
    /// 18:00 to 22:00
    Evening,
    /// 22:00 to 06:00
    Night,
}

impl TimeOfDay {
    /// All buckets in display order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Morning, Self::Afternoon, Self::Evening, Self::Night]
    }

    /// Chart label including the hour range.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Morning => "Morning (06:00-12:00)",
            Self::Afternoon => "Afternoon (12:00-18:00)",
            Self::Evening => "Evening (18:00-22:00)",
            Self::Night => "Night (22:00-06:00)",
        }
    }
}

/// Time-of-day filter token.
///
/// `day` and `night` are coarse halves; the remaining tokens select a
/// single bucket. The `night` token covers both the evening and night
/// buckets, so the night bucket on its own is not selectable.
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
pub enum TimeOfDayFilter {
    /// No restriction
    #[default]
    All,
    /// Morning and afternoon
    Day,
    /// Evening and night
    Night,
    /// Morning only
    Morning,
    /// Afternoon only
    Afternoon,
    /// Evening only
    Evening,
}

impl TimeOfDayFilter {
    /// Whether a record in `bucket` passes this filter.
    #[must_use]
    pub const fn admits(self, bucket: TimeOfDay) -> bool {
        match self {
            Self::All => true,
            Self::Day => matches!(bucket, TimeOfDay::Morning | TimeOfDay::Afternoon),
            Self::Night => matches!(bucket, TimeOfDay::Evening | TimeOfDay::Night),
            Self::Morning => matches!(bucket, TimeOfDay::Morning),
            Self::Afternoon => matches!(bucket, TimeOfDay::Afternoon),
            Self::Evening => matches!(bucket, TimeOfDay::Evening),
        }
    }

    /// Short label for filter descriptions.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::All => "All day",
            Self::Day => "Day",
            Self::Night => "Night",
            Self::Morning => "Morning",
            Self::Afternoon => "Afternoon",
            Self::Evening => "Evening",
        }
    }
}

/// Reporting period token.
///
/// Tokens are `all`, `YYYY`, `YYYY-qN` and `YYYY-MM`. Anything else is kept
/// as [`Period::Unrecognized`] and restricts nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Period {
    /// No restriction.
    #[default]
    All,
    /// A calendar year.
    Year(i32),
    /// A calendar quarter (1-4) of a year.
    Quarter {
        /// Calendar year.
        year: i32,
        /// Quarter number, 1-4.
        quarter: u32,
    },
    /// A calendar month (1-12) of a year.
    Month {
        /// Calendar year.
        year: i32,
        /// Month number, 1-12.
        month: u32,
    },
    /// A token that does not match any known shape.
    Unrecognized(String),
}

impl Period {
    /// Parses a period token. Never fails.
    #[must_use]
    pub fn parse(token: &str) -> Self {
        let trimmed = token.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(ALL_TOKEN) {
            return Self::All;
        }
        Self::parse_known(trimmed).unwrap_or_else(|| Self::Unrecognized(token.to_string()))
    }

    fn parse_known(token: &str) -> Option<Self> {
        let (year_part, rest) = match token.split_once('-') {
            Some((year, rest)) => (year, Some(rest)),
            None => (token, None),
        };
        if year_part.len() != 4 || !year_part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let year: i32 = year_part.parse().ok()?;

        let Some(rest) = rest else {
            return Some(Self::Year(year));
        };

        if let Some(q) = rest.strip_prefix(['q', 'Q']) {
            let quarter: u32 = q.parse().ok()?;
            return (1..=4)
                .contains(&quarter)
                .then_some(Self::Quarter { year, quarter });
        }

        if rest.len() == 2 && rest.bytes().all(|b| b.is_ascii_digit()) {
            let month: u32 = rest.parse().ok()?;
            return (1..=12)
                .contains(&month)
                .then_some(Self::Month { year, month });
        }

        None
    }

    /// Human-readable label (e.g. `"Q4 2024"`, `"December 2024"`).
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::All => "All time".to_string(),
            Self::Year(year) => year.to_string(),
            Self::Quarter { year, quarter } => format!("Q{quarter} {year}"),
            Self::Month { year, month } => {
                let name = u8::try_from(*month)
                    .ok()
                    .and_then(|m| chrono::Month::try_from(m).ok())
                    .map_or("Unknown month", |m| m.name());
                format!("{name} {year}")
            }
            Self::Unrecognized(token) => token.clone(),
        }
    }
}

impl From<String> for Period {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<Period> for String {
    fn from(value: Period) -> Self {
        value.to_string()
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => f.write_str(ALL_TOKEN),
            Self::Year(year) => write!(f, "{year}"),
            Self::Quarter { year, quarter } => write!(f, "{year}-q{quarter}"),
            Self::Month { year, month } => write!(f, "{year}-{month:02}"),
            Self::Unrecognized(token) => f.write_str(token),
        }
    }
}

/// Category filter token: `all` or a single category code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CategoryFilter {
    /// No restriction.
    #[default]
    All,
    /// Exactly this category.
    Only(Category),
}

impl CategoryFilter {
    /// Parses a category token. Never fails.
    #[must_use]
    pub fn parse(token: &str) -> Self {
        if token == ALL_TOKEN {
            Self::All
        } else {
            Self::Only(Category::parse(token))
        }
    }
}

impl From<String> for CategoryFilter {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<CategoryFilter> for String {
    fn from(value: CategoryFilter) -> Self {
        match value {
            CategoryFilter::All => ALL_TOKEN.to_string(),
            CategoryFilter::Only(category) => category.into(),
        }
    }
}

impl From<CrimeType> for CategoryFilter {
    fn from(value: CrimeType) -> Self {
        Self::Only(Category::Known(value))
    }
}

/// The active filter values. Immutable: changes produce a new selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSelection {
    /// Reporting period.
    pub period: Period,
    /// Crime category.
    #[serde(rename = "crimeType")]
    pub category: CategoryFilter,
    /// Time of day.
    pub time_of_day: TimeOfDayFilter,
    /// Only narcotics-related incidents.
    #[serde(rename = "narcoOnly")]
    pub narcotics_only: bool,
}

impl FilterSelection {
    /// Returns a new selection with the patch's fields overriding this one.
    #[must_use]
    pub fn with_patch(&self, patch: &FilterPatch) -> Self {
        Self {
            period: patch.period.clone().unwrap_or_else(|| self.period.clone()),
            category: patch
                .category
                .clone()
                .unwrap_or_else(|| self.category.clone()),
            time_of_day: patch.time_of_day.unwrap_or(self.time_of_day),
            narcotics_only: patch.narcotics_only.unwrap_or(self.narcotics_only),
        }
    }

    /// Number of fields that differ from `baseline`.
    #[must_use]
    pub fn active_count(&self, baseline: &Self) -> usize {
        [
            self.period != baseline.period,
            self.category != baseline.category,
            self.time_of_day != baseline.time_of_day,
            self.narcotics_only != baseline.narcotics_only,
        ]
        .into_iter()
        .filter(|changed| *changed)
        .count()
    }

    /// One-line description such as `"Q4 2024, Theft, Night"`.
    #[must_use]
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();

        if self.period != Period::All {
            parts.push(self.period.label());
        }
        if let CategoryFilter::Only(category) = &self.category {
            parts.push(match category {
                Category::Known(crime_type) => crime_type.label().to_string(),
                Category::Other(code) => code.clone(),
            });
        }
        if self.time_of_day != TimeOfDayFilter::All {
            parts.push(self.time_of_day.label().to_string());
        }
        if self.narcotics_only {
            parts.push("Narcotics only".to_string());
        }

        if parts.is_empty() {
            "All data".to_string()
        } else {
            parts.join(", ")
        }
    }
}

/// A partial selection: only the fields that are `Some` change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterPatch {
    /// New period.
    pub period: Option<Period>,
    /// New category.
    #[serde(rename = "crimeType")]
    pub category: Option<CategoryFilter>,
    /// New time-of-day filter.
    pub time_of_day: Option<TimeOfDayFilter>,
    /// New narcotics-only flag.
    #[serde(rename = "narcoOnly")]
    pub narcotics_only: Option<bool>,
}

/// Named filter presets.
#[derive(
    Debug,
    Clone,
    Copy,
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
pub enum Preset {
    /// Everything in the current period
    Recent,
    /// Narcotics offenses
    Narcotics,
    /// Evening and night incidents
    NightCrimes,
    /// Thefts
    Theft,
}

impl Preset {
    /// The patch this preset applies. Presets never change the period.
    #[must_use]
    pub fn patch(self) -> FilterPatch {
        let (category, time_of_day, narcotics_only) = match self {
            Self::Recent => (CategoryFilter::All, TimeOfDayFilter::All, false),
            Self::Narcotics => (CrimeType::Drugs.into(), TimeOfDayFilter::All, true),
            Self::NightCrimes => (CategoryFilter::All, TimeOfDayFilter::Night, false),
            Self::Theft => (CrimeType::Theft.into(), TimeOfDayFilter::All, false),
        };
        FilterPatch {
            period: None,
            category: Some(category),
            time_of_day: Some(time_of_day),
            narcotics_only: Some(narcotics_only),
        }
    }
}
