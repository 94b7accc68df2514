//! HTTP handler functions for the crime dashboard API.

use actix_web::http::header;
use actix_web::{HttpResponse, web};
use crime_dash_analytics::ExportFormat;
use crime_dash_analytics_models::{FilterPatch, Preset};
use crime_dash_dashboard::DashboardError;
use crime_dash_server_models::{
    ApiDistrictCells, ApiError, ApiFilterState, ApiHealth, ExportQueryParams, HotspotQueryParams,
    RefreshQueryParams,
};

use crate::AppState;

/// `GET /api/health`
pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
        phase: state.dashboard.snapshot().phase.to_string(),
    })
}

/// `GET /api/dashboard`
///
/// Returns the full snapshot: phase, current view, last error and
/// history flags.
pub async fn dashboard(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(state.dashboard.snapshot())
}

/// `GET /api/filters`
pub async fn filters(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(filter_state(&state))
}

/// `PATCH /api/filters`
///
/// Applies the given fields over the active selection and returns the
/// recomputed view.
pub async fn set_filters(
    state: web::Data<AppState>,
    patch: web::Json<FilterPatch>,
) -> HttpResponse {
    let view = state.dashboard.set_filter(&patch);
    HttpResponse::Ok().json(view.as_ref())
}

/// `POST /api/filters/undo`
pub async fn undo(state: web::Data<AppState>) -> HttpResponse {
    state.dashboard.undo().map_or_else(
        || HttpResponse::Conflict().json(ApiError::new("Nothing to undo")),
        |view| HttpResponse::Ok().json(view.as_ref()),
    )
}

/// `POST /api/filters/redo`
pub async fn redo(state: web::Data<AppState>) -> HttpResponse {
    state.dashboard.redo().map_or_else(
        || HttpResponse::Conflict().json(ApiError::new("Nothing to redo")),
        |view| HttpResponse::Ok().json(view.as_ref()),
    )
}

/// `POST /api/filters/reset`
pub async fn reset(state: web::Data<AppState>) -> HttpResponse {
    let view = state.dashboard.reset_filters();
    HttpResponse::Ok().json(view.as_ref())
}

/// `POST /api/filters/preset/{name}`
pub async fn preset(state: web::Data<AppState>, name: web::Path<String>) -> HttpResponse {
    match name.parse::<Preset>() {
        Ok(preset) => {
            let view = state.dashboard.apply_preset(preset);
            HttpResponse::Ok().json(view.as_ref())
        }
        Err(_) => HttpResponse::NotFound().json(ApiError::new(format!(
            "Unknown preset: {}",
            name.as_str()
        ))),
    }
}

/// `POST /api/refresh`
///
/// Reloads the working set. `?force=true` clears the fetch cache first.
pub async fn refresh(
    state: web::Data<AppState>,
    params: web::Query<RefreshQueryParams>,
) -> HttpResponse {
    let result = if params.force {
        state.dashboard.force_refresh().await
    } else {
        state.dashboard.refresh().await
    };

    match result {
        Ok(outcome) => HttpResponse::Ok().json(outcome),
        Err(e @ DashboardError::Timeout(_)) => {
            HttpResponse::GatewayTimeout().json(ApiError::new(e.to_string()))
        }
        Err(e) => HttpResponse::BadGateway().json(ApiError::new(e.to_string())),
    }
}

/// `DELETE /api/error`
pub async fn dismiss_error(state: web::Data<AppState>) -> HttpResponse {
    state.dashboard.dismiss_error();
    HttpResponse::NoContent().finish()
}

/// `GET /api/hotspots`
pub async fn hotspots(
    state: web::Data<AppState>,
    params: web::Query<HotspotQueryParams>,
) -> HttpResponse {
    if let Some(threshold) = params.threshold
        && !(0.0..=1.0).contains(&threshold)
    {
        return HttpResponse::BadRequest().json(ApiError::new(format!(
            "threshold {threshold} is not within 0.0..=1.0"
        )));
    }

    HttpResponse::Ok().json(state.dashboard.hotspots(params.threshold))
}

/// `GET /api/districts/{name}/cells`
pub async fn district_cells(state: web::Data<AppState>, name: web::Path<String>) -> HttpResponse {
    let name = name.into_inner();
    let cells = state.dashboard.district_cells(&name);
    HttpResponse::Ok().json(ApiDistrictCells::new(name, cells))
}

/// `GET /api/export`
///
/// Downloads the current view as `crime_analytics.csv` or
/// `crime_analytics.json`.
pub async fn export(
    state: web::Data<AppState>,
    params: web::Query<ExportQueryParams>,
) -> HttpResponse {
    let format = match params.format.as_deref().map(str::parse::<ExportFormat>) {
        None => ExportFormat::default(),
        Some(Ok(format)) => format,
        Some(Err(_)) => {
            return HttpResponse::BadRequest()
                .json(ApiError::new("format must be one of: csv, json"));
        }
    };

    match state.dashboard.export(format) {
        Ok(bytes) => HttpResponse::Ok()
            .content_type(format.content_type())
            .insert_header((
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", format.default_filename()),
            ))
            .body(bytes),
        Err(e) => {
            log::error!("Failed to export: {e}");
            HttpResponse::InternalServerError().json(ApiError::new("Failed to export"))
        }
    }
}

fn filter_state(state: &AppState) -> ApiFilterState {
    let snapshot = state.dashboard.snapshot();
    ApiFilterState {
        selection: snapshot.view.selection.clone(),
        description: snapshot.view.description.clone(),
        active_filters: snapshot.active_filters,
        can_undo: snapshot.can_undo,
        can_redo: snapshot.can_redo,
    }
}
