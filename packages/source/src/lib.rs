#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Incident data source boundary.
//!
//! The dashboard only talks to an [`IncidentSource`]. The production
//! implementation is [`http::HttpIncidentSource`], which walks the
//! paginated incident listing with retry and caches every response in a
//! [`cache::FetchCache`].

pub mod cache;
pub mod http;
pub mod progress;
pub mod retry;

use std::time::Duration;

use async_trait::async_trait;
use crime_dash_crime_models::GridCell;
use crime_dash_source_models::{FetchHints, RawIncident};

/// Errors that can occur while fetching from a data source.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status {
        /// Response status.
        status: reqwest::StatusCode,
        /// Requested URL.
        url: String,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The request did not finish in time.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
}

impl SourceError {
    /// Whether retrying the same request may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => retry::is_transient(e),
            Self::Status { status, .. } => retry::is_retryable_status(*status),
            Self::Json(_) => false,
            Self::Timeout(_) => true,
        }
    }
}

/// A remote provider of incident and grid cell records.
#[async_trait]
pub trait IncidentSource: Send + Sync {
    /// Fetches every page of the incident listing.
    ///
    /// Either the whole listing is returned or an error; partial results
    /// are never returned.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if any page fails after retries.
    async fn fetch_all_incidents(&self, hints: &FetchHints)
    -> Result<Vec<RawIncident>, SourceError>;

    /// Fetches the grid cell catalog.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the request fails after retries.
    async fn fetch_grid_cells(&self) -> Result<Vec<GridCell>, SourceError>;

    /// Drops any cached responses so the next fetch hits the network.
    fn clear_cache(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeouts_are_retryable_json_errors_are_not() {
        assert!(SourceError::Timeout(Duration::from_secs(5)).is_retryable());

        let json = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(!SourceError::Json(json).is_retryable());
    }

    #[test]
    fn status_classification() {
        let status = |code: u16| SourceError::Status {
            status: reqwest::StatusCode::from_u16(code).unwrap(),
            url: "http://localhost/crimes/".to_string(),
        };
        assert!(status(503).is_retryable());
        assert!(status(429).is_retryable());
        assert!(!status(404).is_retryable());
        assert_eq!(status(404).to_string(), "HTTP 404 Not Found from http://localhost/crimes/");
    }
}
