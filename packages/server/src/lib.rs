#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the crime dashboard.
//!
//! Serves the dashboard snapshot, filter controls, hotspot and district
//! queries and exports as JSON under `/api`. All state lives in one
//! shared [`Dashboard`]; the working set is loaded once at startup and
//! reloaded on `POST /api/refresh`.

mod handlers;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use crime_dash_dashboard::config::DashboardConfig;
use crime_dash_dashboard::{Dashboard, DashboardOptions};
use crime_dash_source::http::HttpIncidentSource;

/// Shared application state.
pub struct AppState {
    /// The dashboard every handler reads and updates.
    pub dashboard: Arc<Dashboard>,
}

/// Registers the `/api` routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/dashboard", web::get().to(handlers::dashboard))
            .route("/filters", web::get().to(handlers::filters))
            .route("/filters", web::patch().to(handlers::set_filters))
            .route("/filters/undo", web::post().to(handlers::undo))
            .route("/filters/redo", web::post().to(handlers::redo))
            .route("/filters/reset", web::post().to(handlers::reset))
            .route("/filters/preset/{name}", web::post().to(handlers::preset))
            .route("/refresh", web::post().to(handlers::refresh))
            .route("/error", web::delete().to(handlers::dismiss_error))
            .route("/hotspots", web::get().to(handlers::hotspots))
            .route("/districts/{name}/cells", web::get().to(handlers::district_cells))
            .route("/export", web::get().to(handlers::export)),
    );
}

/// Starts the crime dashboard API server.
///
/// Builds the HTTP incident source and the dashboard from `config`, starts
/// the initial refresh in the background and serves until shutdown. The
/// caller provides the async runtime (e.g. via `#[actix_web::main]`) and
/// initializes logging.
///
/// # Errors
///
/// * If the configuration is invalid
/// * If the HTTP client cannot be built
/// * If the HTTP server fails to bind or encounters a runtime error
#[allow(clippy::future_not_send)]
pub async fn run_server(config: DashboardConfig) -> std::io::Result<()> {
    let options = DashboardOptions::try_from(&config).map_err(std::io::Error::other)?;
    let source =
        HttpIncidentSource::new(config.source.http_config()).map_err(std::io::Error::other)?;

    log::info!("Using incident service at {}", config.source.base_url);
    let dashboard = Arc::new(Dashboard::new(Arc::new(source), options));

    let initial = dashboard.clone();
    actix_rt::spawn(async move {
        if let Err(e) = initial.refresh().await {
            log::error!("Initial refresh failed: {e}");
        }
    });

    let state = web::Data::new(AppState { dashboard });
    let bind_addr = config.server.bind_addr;
    let port = config.server.port;

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((bind_addr, port))?
    .run()
    .await
}
