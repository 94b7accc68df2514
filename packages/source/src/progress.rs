//! Progress reporting for paginated fetches.
//!
//! Defines a [`ProgressCallback`] trait that decouples page progress from
//! any specific rendering backend. The CLI renders it with an `indicatif`
//! spinner; the server uses [`NullProgress`].

use std::sync::Arc;

/// Receives page-level progress from a paginated fetch.
///
/// Implementations must be `Send + Sync` to support `Arc`-based sharing
/// across tasks.
pub trait ProgressCallback: Send + Sync {
    /// Called after each page, with the records on that page and the
    /// running total.
    fn page_fetched(&self, page: u32, records: u64, total: u64);

    /// Called once after the last page.
    fn finish(&self, total: u64);
}

/// Silently ignores all progress updates.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn page_fetched(&self, _page: u32, _records: u64, _total: u64) {}
    fn finish(&self, _total: u64) {}
}

/// Returns a shared [`NullProgress`] instance.
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
