//! `indicatif`-backed progress reporting and logger setup.
//!
//! Wraps [`indicatif::ProgressBar`] behind the [`ProgressCallback`] trait
//! so that the HTTP source stays decoupled from the rendering backend.

use std::sync::Arc;
use std::time::Duration;

use crime_dash_source::progress::ProgressCallback;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// An `indicatif` spinner that implements [`ProgressCallback`].
pub struct IndicatifProgress {
    bar: ProgressBar,
    label: String,
}

impl IndicatifProgress {
    /// Creates a spinner for a paginated fetch. The page count is unknown
    /// up front, so it never switches to a bar.
    #[must_use]
    pub fn pages_spinner(multi: &MultiProgress, label: &str) -> Arc<dyn ProgressCallback> {
        let bar = multi.add(ProgressBar::new_spinner());
        bar.enable_steady_tick(Duration::from_millis(100));
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg} [{elapsed}]")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(label.to_string());

        Arc::new(Self {
            bar,
            label: label.to_string(),
        })
    }
}

impl ProgressCallback for IndicatifProgress {
    fn page_fetched(&self, page: u32, records: u64, total: u64) {
        self.bar.set_position(total);
        self.bar.set_message(format!(
            "{}: page {page} (+{records}, {total} records)",
            self.label
        ));
    }

    fn finish(&self, total: u64) {
        self.bar
            .finish_with_message(format!("{}: {total} records", self.label));
    }
}

/// Initializes the global logger wrapped in `indicatif-log-bridge` so that
/// `log::info!` and friends are suspended while progress bars redraw.
///
/// Returns the [`MultiProgress`] that all progress bars must be added to.
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();

    let logger = pretty_env_logger::formatted_builder()
        .parse_env("RUST_LOG")
        .build();
    let level = logger.filter();

    // Ignore the error if a logger is already set (e.g., in tests)
    indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .ok();

    log::set_max_level(level);

    multi
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spinner_tracks_running_total() {
        let bar = ProgressBar::hidden();
        let progress = IndicatifProgress {
            bar: bar.clone(),
            label: "Fetching incidents".to_string(),
        };

        progress.page_fetched(1, 100, 100);
        progress.page_fetched(2, 40, 140);
        assert_eq!(bar.position(), 140);
        assert_eq!(bar.message(), "Fetching incidents: page 2 (+40, 140 records)");

        progress.finish(140);
        assert!(bar.is_finished());
        assert_eq!(bar.message(), "Fetching incidents: 140 records");
    }
}
