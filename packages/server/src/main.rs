#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the crime dashboard.
//!
//! Reads an optional config file from `CRIME_DASH_CONFIG`, then serves the
//! dashboard API.

use std::path::PathBuf;

use crime_dash_dashboard::config::{CONFIG_PATH_ENV, DashboardConfig};

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let path = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);
    let config = DashboardConfig::load(path.as_deref())?;

    crime_dash_server::run_server(config).await?;
    Ok(())
}
