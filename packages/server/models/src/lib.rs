#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the crime dashboard server.
//!
//! Dashboard views and snapshots are serialized as-is; the types here
//! cover the request parameters and the small responses that have no
//! counterpart in the dashboard crate.

use crime_dash_analytics_models::{CellDensity, FilterSelection};
use serde::{Deserialize, Serialize};

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the service is healthy.
    pub healthy: bool,
    /// Service version.
    pub version: String,
    /// Lifecycle phase of the working set.
    pub phase: String,
}

/// Error body returned with every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
}

impl ApiError {
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// The active selection and its history state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiFilterState {
    pub selection: FilterSelection,
    /// Human-readable summary, e.g. `"Q4 2024, Theft"`.
    pub description: String,
    /// Fields that differ from the default selection.
    pub active_filters: usize,
    pub can_undo: bool,
    pub can_redo: bool,
}

/// Cells of one district.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiDistrictCells {
    /// The district name as requested.
    pub district: String,
    pub incident_count: u64,
    pub cells: Vec<CellDensity>,
}

impl ApiDistrictCells {
    #[must_use]
    pub fn new(district: String, cells: Vec<CellDensity>) -> Self {
        Self {
            district,
            incident_count: cells.iter().map(|c| c.incident_count).sum(),
            cells,
        }
    }
}

/// Query parameters for `GET /api/hotspots`.
#[derive(Debug, Clone, Deserialize)]
pub struct HotspotQueryParams {
    /// Ratio threshold in `0.0..=1.0`. Defaults to the configured one.
    pub threshold: Option<f64>,
}

/// Query parameters for `GET /api/export`.
#[derive(Debug, Clone, Deserialize)]
pub struct ExportQueryParams {
    /// `csv` or `json`. Defaults to `json`.
    pub format: Option<String>,
}

/// Query parameters for `POST /api/refresh`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RefreshQueryParams {
    /// Clear the source's fetch cache first.
    #[serde(default)]
    pub force: bool,
}
