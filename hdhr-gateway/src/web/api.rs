//! HTTP handlers for status, artifacts and on-demand refresh.

use axum::{
    extract::State,
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::output::Artifact;
use crate::web::state::WebState;

/// Gateway status and the last completed refresh.
pub async fn get_status(State(state): State<WebState>) -> impl IntoResponse {
    let device = state.scheduler.device_status().await;
    let last_refresh = state.scheduler.last_report().await;

    Json(json!({
        "status": "HDHR Gateway Running",
        "device_found": device.device_ip.is_some(),
        "device_ip": device.device_ip,
        "has_auth_token": device.has_auth_token,
        "last_refresh": last_refresh,
    }))
}

pub async fn get_playlist(State(state): State<WebState>) -> Response {
    serve_artifact(&state, Artifact::Playlist).await
}

pub async fn get_epg(State(state): State<WebState>) -> Response {
    serve_artifact(&state, Artifact::Guide).await
}

async fn serve_artifact(state: &WebState, artifact: Artifact) -> Response {
    match state.store.read(artifact).await {
        Ok(Some(bytes)) => (
            StatusCode::OK,
            [(CONTENT_TYPE, artifact.content_type())],
            bytes,
        )
            .into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": format!("{} not found", artifact.display_name()),
                "message": "Try triggering a refresh via POST /refresh",
            })),
        )
            .into_response(),
        Err(e) => {
            log::error!("Failed to read {}: {}", artifact.display_name(), e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": format!("Failed to read {}", artifact.display_name()),
                })),
            )
                .into_response()
        }
    }
}

/// Run a refresh now, or join the one in progress.
pub async fn trigger_refresh(State(state): State<WebState>) -> impl IntoResponse {
    log::info!("Manual refresh requested");
    let outcome = state.scheduler.trigger().await;

    Json(json!({
        "success": outcome.success(),
        "outcome": outcome,
    }))
}
