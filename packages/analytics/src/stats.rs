//! Aggregate statistics over a filtered record set.
//!
//! Percentages are relative to the size of the record set passed in and are
//! zero for an empty set. Rankings sort by count descending; ties keep the
//! order in which the key was first seen.

use std::collections::{BTreeMap, HashMap};

use chrono::Datelike as _;
use crime_dash_analytics_models::{
    AreaStat, CategoryStat, DailyCount, DerivedView, TimeOfDay, TimeOfDayStat, TrendDirection,
    TrendSummary,
};
use crime_dash_crime_models::{Category, Incident};

use crate::time::{time_of_day_of, week_of_year};

#[allow(clippy::cast_precision_loss)]
fn percentage(count: u64, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

/// Counts keys in first-seen order, then sorts by count descending.
fn ranked_counts<K, I>(keys: I) -> Vec<(K, u64)>
where
    K: Eq + std::hash::Hash + Clone,
    I: IntoIterator<Item = K>,
{
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut counts: Vec<(K, u64)> = Vec::new();

    for key in keys {
        if let Some(&i) = index.get(&key) {
            counts[i].1 += 1;
        } else {
            index.insert(key.clone(), counts.len());
            counts.push((key, 1));
        }
    }

    // sort_by is stable
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

/// The `limit` most frequent categories.
#[must_use]
pub fn top_categories(records: &[Incident], limit: usize) -> Vec<CategoryStat> {
    let mut ranked = ranked_counts::<Category, _>(records.iter().map(|r| r.category.clone()));
    ranked.truncate(limit);

    ranked
        .into_iter()
        .map(|(category, count)| CategoryStat {
            label: category.label().to_string(),
            category,
            count,
            percentage: percentage(count, records.len()),
        })
        .collect()
}

/// Incident count per calendar day, ascending, one entry per date.
#[must_use]
pub fn daily_series(records: &[Incident]) -> Vec<DailyCount> {
    let mut days = BTreeMap::new();
    for record in records {
        *days.entry(record.timestamp.date()).or_insert(0_u64) += 1;
    }
    days.into_iter()
        .map(|(date, count)| DailyCount { date, count })
        .collect()
}

/// Count per time-of-day bucket. Always returns all four buckets.
#[must_use]
pub fn time_of_day_distribution(records: &[Incident]) -> Vec<TimeOfDayStat> {
    let mut counts: HashMap<TimeOfDay, u64> = HashMap::new();
    for record in records {
        *counts.entry(time_of_day_of(&record.timestamp)).or_default() += 1;
    }

    TimeOfDay::all()
        .iter()
        .map(|bucket| {
            let count = counts.get(bucket).copied().unwrap_or(0);
            TimeOfDayStat {
                bucket: *bucket,
                label: bucket.label().to_string(),
                count,
                percentage: percentage(count, records.len()),
            }
        })
        .collect()
}

/// Count per district, descending. Records without a district are grouped
/// under `"unknown"`.
#[must_use]
pub fn area_distribution(records: &[Incident]) -> Vec<AreaStat> {
    ranked_counts(records.iter().map(Incident::area_or_unknown))
        .into_iter()
        .map(|(area, count)| AreaStat {
            area: area.to_string(),
            count,
            percentage: percentage(count, records.len()),
        })
        .collect()
}

/// Percent change from `previous` to `current`. Zero when `previous` is
/// zero.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn percent_change(previous: u64, current: u64) -> f64 {
    if previous == 0 {
        return 0.0;
    }
    (current as f64 - previous as f64) / previous as f64 * 100.0
}

/// Percent change between the mean count of the first half and the mean
/// count of the second half of a time-ordered series.
///
/// With an odd number of points the middle one belongs to the second half.
/// Zero for fewer than two points or when the first half averages zero.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn trend(series: &[DailyCount]) -> f64 {
    if series.len() < 2 {
        return 0.0;
    }
    let (first, second) = series.split_at(series.len() / 2);

    let mean = |half: &[DailyCount]| {
        half.iter().map(|p| p.count as f64).sum::<f64>() / half.len() as f64
    };
    let baseline = mean(first);
    if baseline == 0.0 {
        return 0.0;
    }
    (mean(second) - baseline) / baseline * 100.0
}

/// [`percent_change`] between the last two weeks of `series` that have
/// records. Weeks are keyed by year and [`week_of_year`].
#[must_use]
pub fn week_over_week(series: &[DailyCount]) -> f64 {
    let mut weeks: BTreeMap<(i32, u32), u64> = BTreeMap::new();
    for point in series {
        *weeks
            .entry((point.date.year(), week_of_year(&point.date)))
            .or_default() += point.count;
    }

    let mut latest = weeks.values().rev();
    match (latest.next(), latest.next()) {
        (Some(&current), Some(&previous)) => percent_change(previous, current),
        _ => 0.0,
    }
}

/// [`trend`] with its direction and the week-over-week change.
#[must_use]
pub fn trend_summary(series: &[DailyCount]) -> TrendSummary {
    let percent_change = trend(series);
    TrendSummary {
        percent_change,
        direction: TrendDirection::of(percent_change),
        week_over_week: week_over_week(series),
    }
}

/// Computes every aggregate for an already filtered record set.
#[must_use]
pub fn derive_view(records: &[Incident], top_limit: usize) -> DerivedView {
    let daily = daily_series(records);
    DerivedView {
        total_count: records.len() as u64,
        top_categories: top_categories(records, top_limit),
        trend: trend_summary(&daily),
        daily_series: daily,
        time_of_day: time_of_day_distribution(records),
        area_distribution: area_distribution(records),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use crime_dash_analytics_models::{FilterSelection, Period};
    use crime_dash_crime_models::CrimeType;

    use super::*;
    use crate::filter::tests::incident;

    fn in_area(id: &str, area: Option<&str>) -> Incident {
        let mut record = incident(id, "theft", "2024-05-01T12:00:00");
        record.area = area.map(String::from);
        record
    }

    fn day(date: &str, count: u64) -> DailyCount {
        DailyCount {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            count,
        }
    }

    #[test]
    fn q4_2024_ranks_theft_first() {
        let categories = [
            "theft", "drugs", "theft", "assault", "drugs", "theft", "fraud", "drugs", "assault",
            "theft",
        ];
        let records: Vec<Incident> = categories
            .iter()
            .enumerate()
            .map(|(i, category)| {
                incident(
                    &i.to_string(),
                    category,
                    &format!("2024-12-{:02}T12:00:00", i + 1),
                )
            })
            .collect();
        let selection = FilterSelection {
            period: Period::parse("2024-q4"),
            ..FilterSelection::default()
        };

        let filtered = crate::filter::apply_all(&records, &selection);
        assert_eq!(filtered.len(), 10);

        let view = derive_view(&filtered, 5);
        assert_eq!(view.total_count, 10);
        let top = &view.top_categories[0];
        assert_eq!(top.category, Category::from(CrimeType::Theft));
        assert_eq!(top.count, 4);
        assert!((top.percentage - 40.0).abs() < 1e-9);
        assert_eq!(view.top_categories[1].count, 3);
        assert_eq!(view.top_categories[2].count, 2);
        assert_eq!(view.top_categories[3].count, 1);
        assert_eq!(view.daily_series.len(), 10);
    }

    #[test]
    fn top_categories_ranked_with_stable_ties() {
        let records = vec![
            incident("1", "fraud", "2024-01-01T10:00:00"),
            incident("2", "theft", "2024-01-01T10:00:00"),
            incident("3", "theft", "2024-01-01T10:00:00"),
            incident("4", "robbery", "2024-01-01T10:00:00"),
            incident("5", "arson", "2024-01-01T10:00:00"),
        ];
        let top = top_categories(&records, 3);
        let cats: Vec<_> = top.iter().map(|s| s.category.as_str()).collect();
        assert_eq!(cats, vec!["theft", "fraud", "robbery"]);
        assert!((top[0].percentage - 40.0).abs() < 1e-9);
        assert_eq!(top[0].label, CrimeType::Theft.label());

        let all = top_categories(&records, 10);
        assert_eq!(all.len(), 4);
        assert_eq!(all[3].label, "Unknown");
    }

    #[test]
    fn percentages_sum_to_hundred_or_zero() {
        let records = vec![
            incident("1", "fraud", "2024-01-01T10:00:00"),
            incident("2", "theft", "2024-01-01T10:00:00"),
            incident("3", "theft", "2024-01-01T10:00:00"),
        ];
        let sum: f64 = top_categories(&records, 10)
            .iter()
            .map(|s| s.percentage)
            .sum();
        assert!((sum - 100.0).abs() < 1e-9);

        assert!(top_categories(&[], 5).is_empty());
        for stat in time_of_day_distribution(&[]) {
            assert!(stat.percentage.abs() < f64::EPSILON);
        }
    }

    #[test]
    fn daily_series_is_strictly_increasing() {
        let records = vec![
            incident("1", "theft", "2024-01-03T10:00:00"),
            incident("2", "theft", "2024-01-01T23:59:59"),
            incident("3", "theft", "2024-01-03T00:00:00"),
            incident("4", "theft", "2024-01-02T10:00:00"),
        ];
        let series = daily_series(&records);
        assert_eq!(
            series,
            vec![
                day("2024-01-01", 1),
                day("2024-01-02", 1),
                day("2024-01-03", 2)
            ]
        );
        assert!(series.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[test]
    fn time_of_day_has_four_buckets_summing_to_total() {
        let records = vec![
            incident("1", "theft", "2024-01-01T07:00:00"),
            incident("2", "theft", "2024-01-01T13:00:00"),
            incident("3", "theft", "2024-01-01T23:00:00"),
            incident("4", "theft", "2024-01-01T03:00:00"),
        ];
        let dist = time_of_day_distribution(&records);
        assert_eq!(dist.len(), 4);
        assert_eq!(
            dist.iter().map(|s| s.bucket).collect::<Vec<_>>(),
            TimeOfDay::all()
        );
        assert_eq!(dist.iter().map(|s| s.count).sum::<u64>(), 4);
        assert_eq!(dist[3].count, 2);
        assert_eq!(dist[2].count, 0);
    }

    #[test]
    fn area_distribution_groups_missing_as_unknown() {
        let records = vec![
            in_area("1", Some("Medeu")),
            in_area("2", None),
            in_area("3", Some("Auezov")),
            in_area("4", Some("Auezov")),
        ];
        let dist = area_distribution(&records);
        let areas: Vec<_> = dist.iter().map(|s| (s.area.as_str(), s.count)).collect();
        assert_eq!(
            areas,
            vec![("Auezov", 2), ("Medeu", 1), ("unknown", 1)]
        );
    }

    #[test]
    fn trend_compares_half_means() {
        assert!(trend(&[]).abs() < f64::EPSILON);
        assert!(trend(&[day("2024-01-01", 5)]).abs() < f64::EPSILON);

        let rising = [
            day("2024-01-01", 2),
            day("2024-01-02", 2),
            day("2024-01-03", 3),
            day("2024-01-04", 3),
        ];
        assert!((trend(&rising) - 50.0).abs() < 1e-9);
        assert_eq!(trend_summary(&rising).direction, TrendDirection::Increasing);

        let from_zero = [day("2024-01-01", 0), day("2024-01-02", 4)];
        assert!(trend(&from_zero).abs() < f64::EPSILON);
    }

    #[test]
    fn percent_change_guards_zero_baseline() {
        assert!(percent_change(0, 10).abs() < f64::EPSILON);
        assert!((percent_change(10, 15) - 50.0).abs() < 1e-9);
        assert!((percent_change(20, 10) + 50.0).abs() < 1e-9);
    }

    #[test]
    fn week_over_week_compares_last_two_weeks() {
        // Weeks start on Sunday; 2024-12-01 and 2024-12-03 share one.
        let series = [
            day("2024-11-25", 7),
            day("2024-12-01", 2),
            day("2024-12-03", 2),
            day("2024-12-09", 6),
        ];
        assert!((week_over_week(&series) - 50.0).abs() < 1e-9);
        assert!((trend_summary(&series).week_over_week - 50.0).abs() < 1e-9);

        let one_week = [day("2024-12-01", 3), day("2024-12-02", 1)];
        assert!(week_over_week(&one_week).abs() < f64::EPSILON);
        assert!(week_over_week(&[]).abs() < f64::EPSILON);
    }

    #[test]
    fn derive_view_uses_filtered_total() {
        let records = vec![
            incident("1", "theft", "2024-01-01T10:00:00"),
            incident("2", "drugs", "2024-01-02T20:00:00"),
        ];
        let view = derive_view(&records, 5);
        assert_eq!(view.total_count, 2);
        assert_eq!(view.daily_series.len(), 2);
        assert_eq!(view.time_of_day.len(), 4);
        assert_eq!(view.area_distribution[0].area, "unknown");

        let empty = derive_view(&[], 5);
        assert_eq!(empty.total_count, 0);
        assert_eq!(empty.time_of_day.len(), 4);
        assert!(empty.top_categories.is_empty());
    }
}
