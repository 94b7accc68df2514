#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Dashboard state orchestration.
//!
//! A [`Dashboard`] owns the working set of validated incidents, the grid
//! cell catalog, the filter history and the current derived view. Every
//! selection change recomputes the view synchronously from the working
//! set; only [`Dashboard::refresh`] suspends, and at most one refresh runs
//! at a time. Readers get consistent [`DashboardSnapshot`]s built from
//! shared `Arc`s, so a snapshot never mixes old and new state.

pub mod config;

use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, FixedOffset, Offset as _, Utc};
use crime_dash_analytics::export::{self, ExportError, ExportFormat};
use crime_dash_analytics::{filter, hotspot, stats, validate};
use crime_dash_analytics_models::{
    CellDensity, DEFAULT_HISTORY_CAPACITY, DEFAULT_HOTSPOT_THRESHOLD, DEFAULT_TOP_LIMIT,
    DerivedView, FilterHistory, FilterPatch, FilterSelection, IntensityTiers, Preset,
    ValidationReport,
};
use crime_dash_crime_models::{GridCell, Incident};
use crime_dash_source::{IncidentSource, SourceError};
use crime_dash_source_models::FetchHints;
use serde::Serialize;
use strum_macros::{AsRefStr, Display};

use crate::config::{ConfigError, DashboardConfig};

/// Number of validation messages logged after a refresh.
const LOGGED_VALIDATION_ERRORS: usize = 10;

/// Errors surfaced by dashboard operations.
#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    /// The data source failed.
    #[error("Failed to load incident data: {0}")]
    Source(#[from] SourceError),

    /// The refresh as a whole took too long.
    #[error("Refresh timed out after {0:?}")]
    Timeout(Duration),

    /// Encoding an export failed.
    #[error(transparent)]
    Export(#[from] ExportError),
}

impl DashboardError {
    /// Whether trying again later may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Source(e) => e.is_retryable(),
            Self::Timeout(_) => true,
            Self::Export(_) => false,
        }
    }
}

/// Lifecycle phase of the working set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Phase {
    /// Nothing loaded yet.
    Empty,
    /// A refresh is in flight.
    Loading,
    /// Data is loaded.
    Ready,
}

/// Result of a [`Dashboard::refresh`] call that did not fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "outcome")]
pub enum RefreshOutcome {
    /// The working set was replaced.
    Refreshed {
        /// Incidents in the new working set.
        incidents: usize,
        /// Raw records dropped by the sanitizer.
        rejected: usize,
        /// Grid cells in the new catalog.
        cells: usize,
    },
    /// Another refresh was already running; nothing was done.
    Superseded,
}

/// Tunables for a [`Dashboard`].
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardOptions {
    pub top_limit: usize,
    pub hotspot_threshold: f64,
    pub narcotics_keyword: String,
    /// Offset used to convert source timestamps to local time.
    pub utc_offset: FixedOffset,
    pub intensity: IntensityTiers,
    /// Upper bound on one whole refresh.
    pub refresh_timeout: Duration,
    pub history_capacity: usize,
    /// Selection at startup and after reset.
    pub default_selection: FilterSelection,
}

impl Default for DashboardOptions {
    fn default() -> Self {
        Self {
            top_limit: DEFAULT_TOP_LIMIT,
            hotspot_threshold: DEFAULT_HOTSPOT_THRESHOLD,
            narcotics_keyword: filter::DEFAULT_NARCOTICS_KEYWORD.to_string(),
            utc_offset: Utc.fix(),
            intensity: IntensityTiers::default(),
            refresh_timeout: Duration::from_secs(120),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            default_selection: FilterSelection::default(),
        }
    }
}

impl TryFrom<&DashboardConfig> for DashboardOptions {
    type Error = ConfigError;

    fn try_from(config: &DashboardConfig) -> Result<Self, Self::Error> {
        config.validate()?;
        let utc_offset = config
            .analytics
            .utc_offset()
            .ok_or_else(|| ConfigError::Invalid {
                key: "analytics.utc_offset_minutes",
                message: "out of range".to_string(),
            })?;

        Ok(Self {
            top_limit: config.analytics.top_limit,
            hotspot_threshold: config.analytics.hotspot_threshold,
            narcotics_keyword: config.analytics.narcotics_keyword.clone(),
            utc_offset,
            intensity: config.analytics.intensity,
            refresh_timeout: config.source.refresh_timeout(),
            history_capacity: config.filters.history_capacity,
            default_selection: config.filters.default.clone(),
        })
    }
}

/// Everything shown for one selection.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    /// Selection this view was computed for.
    pub selection: FilterSelection,
    /// Human-readable summary of the selection.
    pub description: String,
    /// Aggregates of the filtered records.
    pub stats: DerivedView,
    /// Every grid cell with its filtered density.
    pub heatmap: Vec<CellDensity>,
    /// Cells at or above the configured hotspot threshold.
    pub hotspots: Vec<CellDensity>,
    /// The filtered records.
    pub records: Vec<Incident>,
}

/// A consistent read-only copy of the dashboard state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    pub phase: Phase,
    pub loading: bool,
    pub view: Arc<DashboardView>,
    /// Message of the last failed refresh, until dismissed or a refresh
    /// succeeds.
    pub error: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
    /// Validation report of the last successful refresh.
    pub validation: Option<ValidationReport>,
    pub can_undo: bool,
    pub can_redo: bool,
    /// Number of selection fields that differ from the default.
    pub active_filters: usize,
}

#[derive(Debug, Default)]
struct WorkingSet {
    incidents: Vec<Incident>,
    cells: Vec<GridCell>,
    validation: Option<ValidationReport>,
    last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug)]
struct State {
    phase: Phase,
    data: Arc<WorkingSet>,
    history: FilterHistory,
    view: Arc<DashboardView>,
    last_error: Option<String>,
}

/// The analytics orchestrator behind the dashboard.
pub struct Dashboard {
    source: Arc<dyn IncidentSource>,
    options: DashboardOptions,
    state: RwLock<State>,
    refresh_lock: tokio::sync::Mutex<()>,
}

impl Dashboard {
    /// Creates an empty dashboard. Call [`Self::refresh`] to load data.
    #[must_use]
    pub fn new(source: Arc<dyn IncidentSource>, options: DashboardOptions) -> Self {
        let data = Arc::new(WorkingSet::default());
        let selection = options.default_selection.clone();
        let view = Arc::new(compute_view(&data, &selection, &options));

        Self {
            source,
            state: RwLock::new(State {
                phase: Phase::Empty,
                data,
                history: FilterHistory::new(selection, options.history_capacity),
                view,
                last_error: None,
            }),
            options,
            refresh_lock: tokio::sync::Mutex::new(()),
        }
    }

    #[must_use]
    pub const fn options(&self) -> &DashboardOptions {
        &self.options
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, State> {
        self.state
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, State> {
        self.state
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// A consistent copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> DashboardSnapshot {
        let state = self.read();
        DashboardSnapshot {
            phase: state.phase,
            loading: state.phase == Phase::Loading,
            view: state.view.clone(),
            error: state.last_error.clone(),
            last_updated: state.data.last_updated,
            validation: state.data.validation.clone(),
            can_undo: state.history.can_undo(),
            can_redo: state.history.can_redo(),
            active_filters: state
                .history
                .current()
                .active_count(&self.options.default_selection),
        }
    }

    /// The current derived view.
    #[must_use]
    pub fn view(&self) -> Arc<DashboardView> {
        self.read().view.clone()
    }

    /// The active selection.
    #[must_use]
    pub fn selection(&self) -> FilterSelection {
        self.read().history.current().clone()
    }

    /// Human-readable summary of the active selection.
    #[must_use]
    pub fn describe(&self) -> String {
        self.read().history.current().describe()
    }

    /// Reloads the working set from the source.
    ///
    /// Returns [`RefreshOutcome::Superseded`] without doing anything if
    /// another refresh is in flight. On failure the previous working set
    /// and view are kept and the error is recorded in the snapshot.
    ///
    /// # Errors
    ///
    /// * If the source fails
    /// * If the whole refresh exceeds the refresh timeout
    pub async fn refresh(&self) -> Result<RefreshOutcome, DashboardError> {
        let Ok(_guard) = self.refresh_lock.try_lock() else {
            log::debug!("Refresh already in progress; skipping");
            return Ok(RefreshOutcome::Superseded);
        };

        self.write().phase = Phase::Loading;
        let _loading = LoadingGuard { dashboard: self };
        log::info!("Refreshing incident data...");

        match self.fetch().await {
            Ok((raw, cells)) => {
                let report = validate::validate_with_offset(&raw, &self.options.utc_offset);
                if !report.valid {
                    log::warn!(
                        "{} of {} records failed validation",
                        report.invalid_count(),
                        report.total_count
                    );
                    for message in report.errors.iter().take(LOGGED_VALIDATION_ERRORS) {
                        log::warn!("  {message}");
                    }
                }

                let incidents = validate::sanitize_with_offset(&raw, &self.options.utc_offset);
                let outcome = RefreshOutcome::Refreshed {
                    incidents: incidents.len(),
                    rejected: raw.len() - incidents.len(),
                    cells: cells.len(),
                };

                let data = Arc::new(WorkingSet {
                    incidents,
                    cells,
                    validation: Some(report),
                    last_updated: Some(Utc::now()),
                });

                let mut state = self.write();
                let view = compute_view(&data, state.history.current(), &self.options);
                state.data = data;
                state.view = Arc::new(view);
                state.last_error = None;
                settle_phase(&mut state);
                drop(state);

                log::info!("Refresh complete: {outcome:?}");
                Ok(outcome)
            }
            Err(e) => {
                log::error!("Refresh failed: {e}");
                let mut state = self.write();
                state.last_error = Some(e.to_string());
                settle_phase(&mut state);
                Err(e)
            }
        }
    }

    /// Clears the source's fetch cache, then refreshes.
    ///
    /// # Errors
    ///
    /// Same as [`Self::refresh`].
    pub async fn force_refresh(&self) -> Result<RefreshOutcome, DashboardError> {
        self.source.clear_cache();
        self.refresh().await
    }

    async fn fetch(
        &self,
    ) -> Result<(Vec<crime_dash_source_models::RawIncident>, Vec<GridCell>), DashboardError> {
        let hints = FetchHints::none();
        let fetch = async {
            tokio::try_join!(
                self.source.fetch_all_incidents(&hints),
                self.source.fetch_grid_cells()
            )
        };

        tokio::time::timeout(self.options.refresh_timeout, fetch)
            .await
            .map_err(|_| DashboardError::Timeout(self.options.refresh_timeout))?
            .map_err(DashboardError::from)
    }

    /// Applies `patch` to the active selection and recomputes the view.
    ///
    /// A patch that changes nothing leaves the history untouched.
    pub fn set_filter(&self, patch: &FilterPatch) -> Arc<DashboardView> {
        let mut state = self.write();
        let next = state.history.current().with_patch(patch);
        if !state.history.push(next) {
            return state.view.clone();
        }
        log::debug!("Filters changed: {}", state.history.current().describe());
        self.recompute(&mut state)
    }

    /// Applies a named preset. The period is kept.
    pub fn apply_preset(&self, preset: Preset) -> Arc<DashboardView> {
        log::debug!("Applying preset {preset}");
        self.set_filter(&preset.patch())
    }

    /// Steps back in filter history. `None` if there is nothing to undo.
    pub fn undo(&self) -> Option<Arc<DashboardView>> {
        let mut state = self.write();
        state.history.undo()?;
        Some(self.recompute(&mut state))
    }

    /// Steps forward in filter history. `None` if there is nothing to redo.
    pub fn redo(&self) -> Option<Arc<DashboardView>> {
        let mut state = self.write();
        state.history.redo()?;
        Some(self.recompute(&mut state))
    }

    /// Clears the history and restores the default selection.
    pub fn reset_filters(&self) -> Arc<DashboardView> {
        let mut state = self.write();
        state
            .history
            .reset(self.options.default_selection.clone());
        self.recompute(&mut state)
    }

    /// Clears the recorded refresh error.
    pub fn dismiss_error(&self) {
        self.write().last_error = None;
    }

    /// Hotspots of the current view at `threshold`, or at the configured
    /// threshold when `None`.
    #[must_use]
    pub fn hotspots(&self, threshold: Option<f64>) -> Vec<CellDensity> {
        let view = self.view();
        match threshold {
            None => view.hotspots.clone(),
            Some(threshold) => hotspot::hotspots(&view.heatmap, threshold),
        }
    }

    /// Cells of the current heatmap whose district contains `name`,
    /// ignoring case.
    #[must_use]
    pub fn district_cells(&self, name: &str) -> Vec<CellDensity> {
        hotspot::cells_in_area(&self.view().heatmap, name)
    }

    /// Encodes the current view.
    ///
    /// # Errors
    ///
    /// * If encoding fails
    pub fn export(&self, format: ExportFormat) -> Result<Vec<u8>, DashboardError> {
        let view = self.view();
        Ok(export::encode(
            format,
            &view.selection,
            &view.records,
            &view.stats,
            Utc::now(),
        )?)
    }

    fn recompute(&self, state: &mut State) -> Arc<DashboardView> {
        let view = Arc::new(compute_view(
            &state.data,
            state.history.current(),
            &self.options,
        ));
        state.view = view.clone();
        view
    }
}

/// Leaves [`Phase::Loading`] for `Ready` or `Empty`, depending on whether a
/// working set has ever been loaded.
fn settle_phase(state: &mut State) {
    if state.phase == Phase::Loading {
        state.phase = if state.data.last_updated.is_some() {
            Phase::Ready
        } else {
            Phase::Empty
        };
    }
}

/// Settles the phase when a refresh future is dropped before completing.
struct LoadingGuard<'a> {
    dashboard: &'a Dashboard,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        settle_phase(&mut self.dashboard.write());
    }
}

fn compute_view(
    data: &WorkingSet,
    selection: &FilterSelection,
    options: &DashboardOptions,
) -> DashboardView {
    let records =
        filter::apply_all_with_keyword(&data.incidents, selection, &options.narcotics_keyword);
    let heatmap = hotspot::density_grid(&data.cells, &records, &options.intensity);

    DashboardView {
        selection: selection.clone(),
        description: selection.describe(),
        stats: stats::derive_view(&records, options.top_limit),
        hotspots: hotspot::hotspots(&heatmap, options.hotspot_threshold),
        heatmap,
        records,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use async_trait::async_trait;
    use crime_dash_analytics_models::{CategoryFilter, Period, TimeOfDayFilter};
    use crime_dash_crime_models::{CrimeType, Location};
    use crime_dash_source_models::RawIncident;

    use super::*;

    struct MockSource {
        incidents: Vec<RawIncident>,
        cells: Vec<GridCell>,
        fail: AtomicBool,
        delay: Duration,
        fetches: AtomicUsize,
        cleared: AtomicBool,
    }

    impl MockSource {
        fn new(incidents: &str) -> Self {
            Self {
                incidents: serde_json::from_str(incidents).unwrap(),
                cells: vec![cell("hex_1", "Medeu"), cell("hex_2", "Auezov")],
                fail: AtomicBool::new(false),
                delay: Duration::ZERO,
                fetches: AtomicUsize::new(0),
                cleared: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl IncidentSource for MockSource {
        async fn fetch_all_incidents(
            &self,
            _hints: &FetchHints,
        ) -> Result<Vec<RawIncident>, SourceError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail.load(Ordering::SeqCst) {
                return Err(SourceError::Timeout(Duration::from_secs(30)));
            }
            Ok(self.incidents.clone())
        }

        async fn fetch_grid_cells(&self) -> Result<Vec<GridCell>, SourceError> {
            Ok(self.cells.clone())
        }

        fn clear_cache(&self) {
            self.cleared.store(true, Ordering::SeqCst);
        }
    }

    fn cell(id: &str, area: &str) -> GridCell {
        GridCell {
            cell_id: id.to_string(),
            center: Location {
                latitude: 43.2,
                longitude: 76.9,
            },
            area: Some(area.to_string()),
            address: None,
        }
    }

    const RECORDS: &str = r#"[
        {"id": 1, "crime_type": "theft", "date": "2024-11-15T14:00:00", "latitude": 43.2, "longitude": 76.9, "district": "Medeu", "hex_id": "hex_1"},
        {"id": 2, "crime_type": "theft", "date": "2024-07-01T10:00:00", "latitude": 43.2, "longitude": 76.9, "district": "Medeu", "hex_id": "hex_1"},
        {"id": 3, "crime_type": "drugs", "date": "2024-12-02T23:30:00", "latitude": 43.3, "longitude": 76.8, "district": "Auezov", "hex_id": "hex_2"},
        {"id": 4, "crime_type": "fraud", "date": "2023-03-03T19:00:00", "lat": "43.1", "lng": "76.7"},
        {"id": 5, "crime_type": "theft", "date": "2024-11-20T09:00:00", "longitude": 76.9}
    ]"#;

    fn dashboard(source: MockSource) -> (Dashboard, Arc<MockSource>) {
        let source = Arc::new(source);
        let dashboard = Dashboard::new(source.clone(), DashboardOptions::default());
        (dashboard, source)
    }

    #[test]
    fn starts_empty() {
        let (dashboard, _) = dashboard(MockSource::new(RECORDS));
        let snapshot = dashboard.snapshot();
        assert_eq!(snapshot.phase, Phase::Empty);
        assert!(!snapshot.loading);
        assert_eq!(snapshot.view.stats.total_count, 0);
        assert_eq!(snapshot.view.stats.time_of_day.len(), 4);
        assert!(!snapshot.can_undo);
    }

    #[tokio::test]
    async fn refresh_loads_sanitized_working_set() {
        let (dashboard, _) = dashboard(MockSource::new(RECORDS));

        let outcome = dashboard.refresh().await.unwrap();
        assert_eq!(
            outcome,
            RefreshOutcome::Refreshed {
                incidents: 4,
                rejected: 1,
                cells: 2
            }
        );

        let snapshot = dashboard.snapshot();
        assert_eq!(snapshot.phase, Phase::Ready);
        assert!(snapshot.last_updated.is_some());
        assert_eq!(snapshot.view.stats.total_count, 4);
        let validation = snapshot.validation.unwrap();
        assert_eq!(validation.valid_count, 4);
        assert_eq!(validation.errors, vec!["record 4: missing latitude".to_string()]);

        let hex_1 = &snapshot.view.heatmap[0];
        assert_eq!(hex_1.incident_count, 2);
        assert_eq!(snapshot.view.hotspots.len(), 1);
        assert_eq!(snapshot.view.heatmap[1].incident_count, 1);
    }

    #[tokio::test]
    async fn quarter_filter_narrows_the_view() {
        let (dashboard, _) = dashboard(MockSource::new(RECORDS));
        dashboard.refresh().await.unwrap();

        let view = dashboard.set_filter(&FilterPatch {
            period: Some(Period::parse("2024-q4")),
            ..FilterPatch::default()
        });
        let ids: Vec<_> = view.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
        assert_eq!(view.stats.total_count, 2);
        assert_eq!(view.description, "Q4 2024");
        assert_eq!(dashboard.snapshot().active_filters, 1);
    }

    #[tokio::test]
    async fn same_selection_gives_same_view() {
        let (dashboard, _) = dashboard(MockSource::new(RECORDS));
        dashboard.refresh().await.unwrap();

        let patch = FilterPatch {
            time_of_day: Some(TimeOfDayFilter::Night),
            ..FilterPatch::default()
        };
        let first = dashboard.set_filter(&patch);
        let second = dashboard.set_filter(&patch);
        assert_eq!(first, second);
        assert!(!dashboard.snapshot().can_redo);
    }

    #[tokio::test]
    async fn history_undo_redo_and_reset() {
        let (dashboard, _) = dashboard(MockSource::new(RECORDS));
        dashboard.refresh().await.unwrap();

        dashboard.apply_preset(Preset::Narcotics);
        assert_eq!(dashboard.view().stats.total_count, 1);
        assert_eq!(dashboard.view().records[0].id, "3");

        let undone = dashboard.undo().unwrap();
        assert_eq!(undone.stats.total_count, 4);
        assert!(dashboard.undo().is_none());

        let redone = dashboard.redo().unwrap();
        assert_eq!(
            redone.selection.category,
            CategoryFilter::from(CrimeType::Drugs)
        );
        assert!(dashboard.redo().is_none());

        dashboard.reset_filters();
        let snapshot = dashboard.snapshot();
        assert_eq!(snapshot.view.selection, FilterSelection::default());
        assert!(!snapshot.can_undo);
        assert_eq!(dashboard.describe(), "All data");
    }

    #[tokio::test]
    async fn failed_refresh_keeps_last_known_good_data() {
        let (dashboard, source) = dashboard(MockSource::new(RECORDS));
        dashboard.refresh().await.unwrap();
        let before = dashboard.view();

        source.fail.store(true, Ordering::SeqCst);
        let err = dashboard.refresh().await.unwrap_err();
        assert!(err.is_retryable());

        let snapshot = dashboard.snapshot();
        assert_eq!(snapshot.phase, Phase::Ready);
        assert_eq!(snapshot.view, before);
        assert!(snapshot.error.is_some());

        dashboard.dismiss_error();
        assert!(dashboard.snapshot().error.is_none());
    }

    #[tokio::test]
    async fn failed_first_refresh_stays_empty() {
        let source = MockSource::new(RECORDS);
        source.fail.store(true, Ordering::SeqCst);
        let (dashboard, _) = dashboard(source);

        assert!(dashboard.refresh().await.is_err());
        assert_eq!(dashboard.snapshot().phase, Phase::Empty);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_refresh_is_superseded() {
        let mut source = MockSource::new(RECORDS);
        source.delay = Duration::from_secs(1);
        let (dashboard, source) = dashboard(source);

        let (first, second) = tokio::join!(dashboard.refresh(), dashboard.refresh());
        assert!(matches!(first.unwrap(), RefreshOutcome::Refreshed { .. }));
        assert_eq!(second.unwrap(), RefreshOutcome::Superseded);
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn loading_phase_is_visible_during_refresh() {
        let mut source = MockSource::new(RECORDS);
        source.delay = Duration::from_secs(1);
        let (dashboard, _) = dashboard(source);

        let observe = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            dashboard.snapshot().loading
        };
        let (result, loading) = tokio::join!(dashboard.refresh(), observe);
        assert!(result.is_ok());
        assert!(loading);
        assert!(!dashboard.snapshot().loading);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_source_times_out() {
        let mut source = MockSource::new(RECORDS);
        source.delay = Duration::from_secs(600);
        let (dashboard, _) = dashboard(source);

        let err = dashboard.refresh().await.unwrap_err();
        assert!(matches!(err, DashboardError::Timeout(_)));
        assert!(dashboard.snapshot().error.unwrap().contains("timed out"));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_refresh_leaves_loading_phase() {
        let mut source = MockSource::new(RECORDS);
        source.delay = Duration::from_secs(5);
        let (dashboard, _) = dashboard(source);

        let cancelled =
            tokio::time::timeout(Duration::from_millis(10), dashboard.refresh()).await;
        assert!(cancelled.is_err());

        let snapshot = dashboard.snapshot();
        assert_eq!(snapshot.phase, Phase::Empty);
        assert!(!snapshot.loading);
        assert!(snapshot.error.is_none());

        let outcome = dashboard.refresh().await.unwrap();
        assert!(matches!(outcome, RefreshOutcome::Refreshed { .. }));

        let cancelled =
            tokio::time::timeout(Duration::from_millis(10), dashboard.refresh()).await;
        assert!(cancelled.is_err());
        assert_eq!(dashboard.snapshot().phase, Phase::Ready);
        assert_eq!(dashboard.view().stats.total_count, 4);
    }

    #[tokio::test]
    async fn force_refresh_clears_source_cache() {
        let (dashboard, source) = dashboard(MockSource::new(RECORDS));
        dashboard.force_refresh().await.unwrap();
        assert!(source.cleared.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn district_cells_and_hotspot_threshold() {
        let (dashboard, _) = dashboard(MockSource::new(RECORDS));
        dashboard.refresh().await.unwrap();

        let medeu = dashboard.district_cells("medeu");
        assert_eq!(medeu.len(), 1);
        assert_eq!(medeu[0].incident_count, 2);

        let strict = dashboard.hotspots(Some(1.0));
        assert_eq!(strict.len(), 1);
        assert_eq!(strict[0].cell.cell_id, "hex_1");

        let loose = dashboard.hotspots(Some(0.5));
        assert_eq!(loose.len(), 2);
    }

    #[tokio::test]
    async fn exports_current_view() {
        let (dashboard, _) = dashboard(MockSource::new(RECORDS));
        dashboard.refresh().await.unwrap();
        dashboard.apply_preset(Preset::Theft);

        let csv = String::from_utf8(dashboard.export(ExportFormat::Csv).unwrap()).unwrap();
        assert_eq!(csv.lines().count(), 3);

        let json: serde_json::Value =
            serde_json::from_slice(&dashboard.export(ExportFormat::Json).unwrap()).unwrap();
        assert_eq!(json["filters"]["crimeType"], "theft");
        assert_eq!(json["stats"]["totalCount"], 2);
    }
}
