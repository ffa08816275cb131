//! HTTP Server - JSON API for the browser map
//!
//! Endpoints:
//! - GET /api/modes                → Selectable modes + active mode
//! - GET /api/mode, PUT /api/mode  → Read / change the active mode
//! - GET /api/styles               → Per-parcel styles for the active mode
//! - GET /api/legend               → Legend for the active mode
//! - GET /api/parcels              → Parcel layer (GeoJSON)
//! - GET /api/parcels/:index/popup → Click popup for one parcel
//! - GET /api/subdivisions         → Subdivision outlines (GeoJSON)
//! - GET /api/addresses            → Address points (GeoJSON)
//! - GET /api/summary              → Coverage statistics

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

use crate::classify::Mode;
use crate::config::SurfaceConfig;
use crate::state::AppState;

#[derive(Error, Debug)]
pub enum InitError {
    #[error("Render surface library {path} not available after {attempts} attempts")]
    RenderSurfaceUnavailable { path: String, attempts: u32 },
}

/// Wait for the render-surface library asset, polling with a cap
pub async fn wait_for_surface(web_dir: &str, surface: &SurfaceConfig) -> Result<(), InitError> {
    let Some(probe) = &surface.probe else {
        return Ok(());
    };
    let path = std::path::Path::new(web_dir).join(probe);
    let attempts = surface.max_attempts.max(1);

    for attempt in 1..=attempts {
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            tracing::debug!("Render surface available after {} attempt(s): {:?}", attempt, path);
            return Ok(());
        }
        if attempt < attempts {
            tokio::time::sleep(Duration::from_millis(surface.poll_interval_ms)).await;
        }
    }

    tracing::error!("Render surface {:?} never became available", path);
    Err(InitError::RenderSurfaceUnavailable {
        path: path.to_string_lossy().into_owned(),
        attempts,
    })
}

/// Build the router: API under /api, static front-end as fallback
pub fn router(state: AppState, web_dir: &str) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .route("/modes", get(list_modes))
        .route("/mode", get(get_mode).put(put_mode))
        .route("/styles", get(get_styles))
        .route("/legend", get(get_legend))
        .route("/parcels", get(get_parcels))
        .route("/parcels/:index/popup", get(get_popup))
        .route("/subdivisions", get(get_subdivisions))
        .route("/addresses", get(get_addresses))
        .route("/summary", get(get_summary))
        .with_state(state);
    tracing::debug!("API routes registered");

    Router::new()
        .nest("/api", api)
        .fallback_service(ServeDir::new(web_dir))
        .layer(cors)
}

/// Start the HTTP server
pub async fn serve(state: AppState, web_dir: &str, port: u16) -> anyhow::Result<()> {
    tracing::info!("Initializing HTTP server on port {}", port);
    let parcels = state.data.parcels.features.len();
    let app = router(state, web_dir);

    let addr = format!("0.0.0.0:{}", port);
    tracing::info!("Starting server on http://localhost:{}", port);
    tracing::info!("  API: http://localhost:{}/api/styles", port);
    tracing::info!("  Web: http://localhost:{}/ (from {})", port, web_dir);
    tracing::info!("  Parcels loaded: {}", parcels);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server bound to {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

#[derive(Serialize)]
struct ModeInfo {
    id: &'static str,
    label: &'static str,
}

#[derive(Serialize)]
struct ModesResponse {
    modes: Vec<ModeInfo>,
    active: Option<Mode>,
}

#[derive(Serialize, Deserialize)]
struct ModeBody {
    mode: String,
}

/// GET /api/modes
async fn list_modes(State(state): State<AppState>) -> impl IntoResponse {
    tracing::debug!("GET /api/modes");
    let modes = Mode::ALL
        .iter()
        .map(|m| ModeInfo { id: m.id(), label: m.label() })
        .collect();
    Json(ModesResponse { modes, active: state.active_mode().await })
}

/// GET /api/mode
async fn get_mode(State(state): State<AppState>) -> impl IntoResponse {
    tracing::debug!("GET /api/mode");
    Json(state.active_mode().await)
}

/// PUT /api/mode - selection changed; respond with the redraw payload
async fn put_mode(
    State(state): State<AppState>,
    Json(body): Json<ModeBody>,
) -> impl IntoResponse {
    tracing::info!("PUT /api/mode mode={}", body.mode);
    Json(state.set_mode(&body.mode).await)
}

/// GET /api/styles
async fn get_styles(State(state): State<AppState>) -> impl IntoResponse {
    let styles = state.styles().await;
    tracing::debug!("GET /api/styles - {} styles", styles.len());
    Json(styles)
}

/// GET /api/legend
async fn get_legend(State(state): State<AppState>) -> impl IntoResponse {
    tracing::debug!("GET /api/legend");
    Json(state.legend().await)
}

/// GET /api/parcels
async fn get_parcels(State(state): State<AppState>) -> impl IntoResponse {
    tracing::debug!("GET /api/parcels");
    Json(state.data.parcels.clone())
}

/// GET /api/parcels/:index/popup
async fn get_popup(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> Result<impl IntoResponse, StatusCode> {
    tracing::debug!("GET /api/parcels/{}/popup", index);
    match state.data.popup(index) {
        Some(popup) => Ok(Json(popup)),
        None => {
            tracing::warn!("Parcel {} not found", index);
            Err(StatusCode::NOT_FOUND)
        }
    }
}

/// GET /api/subdivisions
async fn get_subdivisions(State(state): State<AppState>) -> impl IntoResponse {
    tracing::debug!("GET /api/subdivisions");
    Json(state.data.subdivisions.clone())
}

/// GET /api/addresses
async fn get_addresses(State(state): State<AppState>) -> impl IntoResponse {
    tracing::debug!("GET /api/addresses");
    Json(state.data.addresses.clone())
}

/// GET /api/summary
async fn get_summary(State(state): State<AppState>) -> impl IntoResponse {
    tracing::debug!("GET /api/summary");
    Json(state.summary().await)
}
