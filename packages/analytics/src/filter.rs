//! Record filtering by period, category, time of day and narcotics flag.
//!
//! Every function here is pure and preserves input order.

use crime_dash_analytics_models::{CategoryFilter, FilterSelection, Period, TimeOfDayFilter};
use crime_dash_crime_models::Incident;

use crate::time::{period_contains, time_of_day_of};

/// Description keyword that marks an incident as narcotics related.
pub const DEFAULT_NARCOTICS_KEYWORD: &str = "narcotic";

/// Applies the four filters of a selection in order: period, category,
/// time of day, narcotics.
#[must_use]
pub fn apply_all(records: &[Incident], selection: &FilterSelection) -> Vec<Incident> {
    apply_all_with_keyword(records, selection, DEFAULT_NARCOTICS_KEYWORD)
}

/// [`apply_all`] with a custom narcotics keyword.
#[must_use]
pub fn apply_all_with_keyword(
    records: &[Incident],
    selection: &FilterSelection,
    narcotics_keyword: &str,
) -> Vec<Incident> {
    let keyword = narcotics_keyword.to_lowercase();

    records
        .iter()
        .filter(|r| in_period(r, &selection.period))
        .filter(|r| in_category(r, &selection.category))
        .filter(|r| in_time_of_day(r, selection.time_of_day))
        .filter(|r| !selection.narcotics_only || is_narcotics_related(r, &keyword))
        .cloned()
        .collect()
}

/// Keeps records inside `period`.
#[must_use]
pub fn by_period(records: &[Incident], period: &Period) -> Vec<Incident> {
    records
        .iter()
        .filter(|r| in_period(r, period))
        .cloned()
        .collect()
}

/// Keeps records of the selected category.
#[must_use]
pub fn by_category(records: &[Incident], category: &CategoryFilter) -> Vec<Incident> {
    records
        .iter()
        .filter(|r| in_category(r, category))
        .cloned()
        .collect()
}

/// Keeps records whose time-of-day bucket passes `filter`.
#[must_use]
pub fn by_time_of_day(records: &[Incident], filter: TimeOfDayFilter) -> Vec<Incident> {
    records
        .iter()
        .filter(|r| in_time_of_day(r, filter))
        .cloned()
        .collect()
}

/// Keeps narcotics-related records when `narcotics_only` is set.
#[must_use]
pub fn by_narcotics(records: &[Incident], narcotics_only: bool, keyword: &str) -> Vec<Incident> {
    if !narcotics_only {
        return records.to_vec();
    }
    let keyword = keyword.to_lowercase();
    records
        .iter()
        .filter(|r| is_narcotics_related(r, &keyword))
        .cloned()
        .collect()
}

fn in_period(record: &Incident, period: &Period) -> bool {
    period_contains(period, &record.timestamp)
}

fn in_category(record: &Incident, category: &CategoryFilter) -> bool {
    match category {
        CategoryFilter::All => true,
        CategoryFilter::Only(wanted) => record.category == *wanted,
    }
}

fn in_time_of_day(record: &Incident, filter: TimeOfDayFilter) -> bool {
    filter.admits(time_of_day_of(&record.timestamp))
}

/// `keyword` must already be lowercase.
fn is_narcotics_related(record: &Incident, keyword: &str) -> bool {
    record.category.is_narcotics()
        || (!keyword.is_empty()
            && record
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(keyword)))
}
