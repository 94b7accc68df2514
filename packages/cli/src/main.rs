#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the crime dashboard.
//!
//! Loads the incident working set from the configured service and prints a
//! summary, a validation report or an export for a filter selection, or
//! starts the API server.
//!
//! Uses `indicatif-log-bridge` (via [`progress::init_logger`]) to route
//! `log` output through `indicatif::MultiProgress` so that log lines and
//! the page-fetch spinner never fight for the terminal.

mod progress;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use crime_dash_analytics::ExportFormat;
use crime_dash_analytics::export::write_to_file;
use crime_dash_analytics_models::{
    CategoryFilter, FilterPatch, Period, Preset, TimeOfDayFilter, TrendDirection,
};
use crime_dash_dashboard::config::DashboardConfig;
use crime_dash_dashboard::{Dashboard, DashboardOptions};
use crime_dash_source::http::HttpIncidentSource;
use indicatif::MultiProgress;

use crate::progress::IndicatifProgress;

#[derive(Parser)]
#[command(name = "crime_dash", about = "Crime incident dashboard analytics")]
struct Cli {
    /// TOML file merged over the built-in configuration
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the dashboard API server
    Serve,
    /// Print aggregate statistics for a filter selection
    Summary {
        #[command(flatten)]
        filters: FilterArgs,
        /// Hotspot ratio threshold (defaults to the configured one)
        #[arg(long)]
        threshold: Option<f64>,
    },
    /// Fetch every record and report validation defects
    Validate {
        /// Maximum number of defect messages to print
        #[arg(long, default_value = "20")]
        max_errors: usize,
    },
    /// Export the filtered records as CSV or JSON
    Export {
        #[command(flatten)]
        filters: FilterArgs,
        /// Output format
        #[arg(long, default_value = "json")]
        format: ExportFormat,
        /// Output file (defaults to `crime_analytics.<format>`)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args)]
struct FilterArgs {
    /// Named preset applied before the other flags (`recent`, `narcotics`,
    /// `night_crimes`, `theft`)
    #[arg(long)]
    preset: Option<Preset>,
    /// Period token: `all`, `2024`, `2024-q4` or `2024-12`
    #[arg(long)]
    period: Option<String>,
    /// Crime type code, or `all`
    #[arg(long)]
    crime_type: Option<String>,
    /// `all`, `day`, `night`, `morning`, `afternoon` or `evening`
    #[arg(long)]
    time_of_day: Option<TimeOfDayFilter>,
    /// Only narcotics-related incidents
    #[arg(long)]
    narco_only: bool,
}

impl FilterArgs {
    fn patch(&self) -> FilterPatch {
        FilterPatch {
            period: self.period.as_deref().map(Period::parse),
            category: self.crime_type.as_deref().map(CategoryFilter::parse),
            time_of_day: self.time_of_day,
            narcotics_only: self.narco_only.then_some(true),
        }
    }

    fn apply(&self, dashboard: &Dashboard) {
        if let Some(preset) = self.preset {
            dashboard.apply_preset(preset);
        }
        dashboard.set_filter(&self.patch());
    }
}

/// Builds a dashboard over the HTTP source and loads the working set.
async fn load(
    config: &DashboardConfig,
    multi: &MultiProgress,
) -> Result<Dashboard, Box<dyn std::error::Error>> {
    let options = DashboardOptions::try_from(config)?;
    let source = HttpIncidentSource::new(config.source.http_config())?
        .with_progress(IndicatifProgress::pages_spinner(multi, "Fetching incidents"));

    let dashboard = Dashboard::new(Arc::new(source), options);
    dashboard.refresh().await?;
    Ok(dashboard)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = progress::init_logger();
    let cli = Cli::parse();
    let config = DashboardConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve => {
            // actix-web brings its own runtime, so run it on a blocking
            // thread to avoid nesting tokio runtimes.
            tokio::task::spawn_blocking(|| {
                actix_web::rt::System::new().block_on(crime_dash_server::run_server(config))
            })
            .await??;
        }
        Commands::Summary { filters, threshold } => {
            let dashboard = load(&config, &multi).await?;
            filters.apply(&dashboard);
            print_summary(&dashboard, threshold);
        }
        Commands::Validate { max_errors } => {
            let dashboard = load(&config, &multi).await?;
            let Some(report) = dashboard.snapshot().validation else {
                return Ok(());
            };

            println!(
                "{} of {} records valid",
                report.valid_count, report.total_count
            );
            for message in report.errors.iter().take(max_errors) {
                println!("  {message}");
            }
            if report.errors.len() > max_errors {
                println!("  ... and {} more", report.errors.len() - max_errors);
            }
        }
        Commands::Export {
            filters,
            format,
            output,
        } => {
            let dashboard = load(&config, &multi).await?;
            filters.apply(&dashboard);

            let bytes = dashboard.export(format)?;
            if bytes.is_empty() {
                log::warn!("No records match {}; nothing exported", dashboard.describe());
                return Ok(());
            }

            let path = output.unwrap_or_else(|| PathBuf::from(format.default_filename()));
            write_to_file(&path, &bytes)?;
        }
    }

    Ok(())
}

fn print_summary(dashboard: &Dashboard, threshold: Option<f64>) {
    let view = dashboard.view();
    let stats = &view.stats;

    println!("{}", view.description);
    println!("{} incidents", stats.total_count);
    println!();

    println!("{:<30} {:>8} {:>7}", "CATEGORY", "COUNT", "%");
    println!("{}", "-".repeat(47));
    for row in &stats.top_categories {
        println!("{:<30} {:>8} {:>6.1}%", row.label, row.count, row.percentage);
    }
    println!();

    println!("{:<30} {:>8} {:>7}", "TIME OF DAY", "COUNT", "%");
    println!("{}", "-".repeat(47));
    for row in &stats.time_of_day {
        println!("{:<30} {:>8} {:>6.1}%", row.label, row.count, row.percentage);
    }
    println!();

    println!("{:<30} {:>8} {:>7}", "DISTRICT", "COUNT", "%");
    println!("{}", "-".repeat(47));
    for row in &stats.area_distribution {
        println!("{:<30} {:>8} {:>6.1}%", row.area, row.count, row.percentage);
    }
    println!();

    let arrow = match stats.trend.direction {
        TrendDirection::Increasing => "up",
        TrendDirection::Decreasing => "down",
        TrendDirection::Stable => "flat",
    };
    println!(
        "Trend: {arrow} {:+.1}% over {} days, {:+.1}% week over week",
        stats.trend.percent_change,
        stats.daily_series.len(),
        stats.trend.week_over_week
    );

    let hotspots = dashboard.hotspots(threshold);
    println!("Hotspots: {}", hotspots.len());
    for cell in &hotspots {
        println!(
            "  {:<16} {:<24} {:>6}",
            cell.cell.cell_id,
            cell.cell.area.as_deref().unwrap_or("-"),
            cell.incident_count
        );
    }
}
