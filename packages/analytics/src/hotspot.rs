//! Per-cell incident density, heat intensity and hotspot ranking.

use std::collections::HashMap;

use crime_dash_analytics_models::{CellDensity, IntensityTiers};
use crime_dash_crime_models::{GridCell, Incident};

/// Heat intensity for a cell with `count` incidents.
#[must_use]
pub fn intensity(count: u64, tiers: &IntensityTiers) -> f64 {
    if count == 0 {
        0.0
    } else if count <= tiers.low_max {
        tiers.low
    } else if count <= tiers.medium_max {
        tiers.medium
    } else {
        1.0
    }
}

/// Counts `incidents` per grid cell. Every cell is returned, in input
/// order, including cells with no incidents. Incidents referencing an
/// unknown cell are ignored.
#[must_use]
pub fn density_grid(
    cells: &[GridCell],
    incidents: &[Incident],
    tiers: &IntensityTiers,
) -> Vec<CellDensity> {
    let mut counts: HashMap<&str, u64> = HashMap::new();
    for cell_id in incidents.iter().filter_map(|i| i.cell_id.as_deref()) {
        *counts.entry(cell_id).or_default() += 1;
    }

    cells
        .iter()
        .map(|cell| {
            let incident_count = counts.get(cell.cell_id.as_str()).copied().unwrap_or(0);
            CellDensity {
                cell: cell.clone(),
                incident_count,
                intensity: intensity(incident_count, tiers),
            }
        })
        .collect()
}

/// Cells whose count is at least `threshold` of the busiest cell's count,
/// busiest first.
///
/// When every cell is empty each ratio is taken as zero, so only a
/// threshold of zero or less keeps anything.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn hotspots(cells: &[CellDensity], threshold: f64) -> Vec<CellDensity> {
    let Some(max) = cells.iter().map(|c| c.incident_count).max() else {
        return vec![];
    };

    let ratio = |count: u64| {
        if max == 0 {
            0.0
        } else {
            count as f64 / max as f64
        }
    };

    let mut hot: Vec<CellDensity> = cells
        .iter()
        .filter(|c| ratio(c.incident_count) >= threshold)
        .cloned()
        .collect();
    hot.sort_by(|a, b| b.incident_count.cmp(&a.incident_count));
    hot
}

/// Cells whose district contains `name`, ignoring case.
#[must_use]
pub fn cells_in_area(cells: &[CellDensity], name: &str) -> Vec<CellDensity> {
    let needle = name.to_lowercase();
    cells
        .iter()
        .filter(|c| {
            c.cell
                .area
                .as_deref()
                .is_some_and(|area| area.to_lowercase().contains(&needle))
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use crime_dash_crime_models::Location;

    use super::*;
    use crate::filter::tests::incident;

    fn cell(id: &str, area: Option<&str>) -> GridCell {
        GridCell {
            cell_id: id.to_string(),
            center: Location {
                latitude: 43.2,
                longitude: 76.9,
            },
            area: area.map(String::from),
            address: None,
        }
    }

    fn density(id: &str, count: u64) -> CellDensity {
        CellDensity {
            cell: cell(id, None),
            incident_count: count,
            intensity: intensity(count, &IntensityTiers::default()),
        }
    }

    fn ids(cells: &[CellDensity]) -> Vec<&str> {
        cells.iter().map(|c| c.cell.cell_id.as_str()).collect()
    }

    #[test]
    fn intensity_tiers() {
        let tiers = IntensityTiers::default();
        assert!(intensity(0, &tiers).abs() < f64::EPSILON);
        assert!((intensity(1, &tiers) - 0.3).abs() < f64::EPSILON);
        assert!((intensity(10, &tiers) - 0.3).abs() < f64::EPSILON);
        assert!((intensity(11, &tiers) - 0.6).abs() < f64::EPSILON);
        assert!((intensity(25, &tiers) - 0.6).abs() < f64::EPSILON);
        assert!((intensity(26, &tiers) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn intensity_is_monotonic() {
        let tiers = IntensityTiers::default();
        let values: Vec<f64> = (0..100).map(|n| intensity(n, &tiers)).collect();
        assert!(values.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn hotspots_keep_cells_near_max() {
        let cells = vec![
            density("a", 8),
            density("b", 10),
            density("c", 3),
            density("d", 9),
        ];
        assert_eq!(ids(&hotspots(&cells, 0.8)), vec!["b", "d", "a"]);
    }

    #[test]
    fn zero_threshold_keeps_every_cell_busiest_first() {
        let cells = vec![
            density("a", 3),
            density("b", 7),
            density("c", 0),
            density("d", 7),
            density("e", 1),
        ];
        let hot = hotspots(&cells, 0.0);
        assert_eq!(ids(&hot), vec!["b", "d", "a", "e", "c"]);
    }

    #[test]
    fn hotspots_on_empty_input() {
        assert!(hotspots(&[], 0.8).is_empty());
    }

    #[test]
    fn hotspots_when_all_counts_are_zero() {
        let cells = vec![density("a", 0), density("b", 0)];
        assert!(hotspots(&cells, 0.8).is_empty());
        assert_eq!(hotspots(&cells, 0.0).len(), 2);
    }

    #[test]
    fn density_grid_counts_per_cell() {
        let cells = vec![cell("hex_1", None), cell("hex_2", None)];
        let mut a = incident("1", "theft", "2024-01-01T10:00:00");
        a.cell_id = Some("hex_2".to_string());
        let mut b = incident("2", "theft", "2024-01-01T10:00:00");
        b.cell_id = Some("hex_2".to_string());
        let mut stray = incident("3", "theft", "2024-01-01T10:00:00");
        stray.cell_id = Some("hex_9".to_string());
        let unassigned = incident("4", "theft", "2024-01-01T10:00:00");

        let grid = density_grid(&cells, &[a, b, stray, unassigned], &IntensityTiers::default());
        assert_eq!(ids(&grid), vec!["hex_1", "hex_2"]);
        assert_eq!(grid[0].incident_count, 0);
        assert!(grid[0].intensity.abs() < f64::EPSILON);
        assert_eq!(grid[1].incident_count, 2);
        assert!((grid[1].intensity - 0.3).abs() < f64::EPSILON);
    }

    #[test]
    fn district_lookup_ignores_case() {
        let cells = vec![
            CellDensity {
                cell: cell("1", Some("Medeu district")),
                incident_count: 1,
                intensity: 0.3,
            },
            CellDensity {
                cell: cell("2", Some("Auezov")),
                incident_count: 1,
                intensity: 0.3,
            },
            density("3", 1),
        ];
        assert_eq!(ids(&cells_in_area(&cells, "MEDEU")), vec!["1"]);
        assert!(cells_in_area(&cells, "Turksib").is_empty());
    }
}
