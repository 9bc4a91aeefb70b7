use axum::{
    extract::State,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use hlsrelay_av::output::OutputListing;
use serde::{Deserialize, Serialize};

use crate::server::error::AppError;
use crate::server::AppContext;
use crate::supervisor::{StatusSnapshot, StopOutcome};

pub fn api_routes() -> Router<AppContext> {
    Router::new()
        .route("/health", get(health))
        .route("/stream/test", post(test_stream))
        .route("/stream/start", post(start_stream))
        .route("/stream/stop", post(stop_stream))
        .route("/stream/status", get(stream_status))
        .route("/debug/hls", get(debug_hls))
}

async fn health(State(ctx): State<AppContext>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "message": "Server is running",
        "version": env!("CARGO_PKG_VERSION"),
        "streaming": ctx.supervisor.is_active(),
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TestStreamRequest {
    rtsp_url: Option<String>,
}

fn required_url(url: Option<String>) -> Result<String, AppError> {
    url.filter(|u| !u.trim().is_empty())
        .ok_or_else(|| AppError::validation("RTSP URL is required"))
}

async fn test_stream(
    State(ctx): State<AppContext>,
    Json(req): Json<TestStreamRequest>,
) -> Result<impl IntoResponse, AppError> {
    let url = required_url(req.rtsp_url)?;
    ctx.probe.probe(&url).await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "message": "RTSP URL is valid and accessible",
    })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartStreamRequest {
    rtsp_url: Option<String>,
    quality: Option<String>,
}

async fn start_stream(
    State(ctx): State<AppContext>,
    Json(req): Json<StartStreamRequest>,
) -> Result<impl IntoResponse, AppError> {
    let url = required_url(req.rtsp_url)?;
    // Only an omitted tier falls back; an explicit unknown one is rejected.
    let quality = req
        .quality
        .unwrap_or_else(|| ctx.config.stream.default_quality.to_string());

    let session_id = ctx.supervisor.start(&url, &quality).await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Stream started. Video is available once the first segments are written.",
        "sessionId": session_id,
        "hlsUrl": ctx.playlist_url(),
        "streamInfo": {
            "rtspUrl": url,
            "quality": quality,
        },
    })))
}

async fn stop_stream(State(ctx): State<AppContext>) -> impl IntoResponse {
    let outcome = ctx.supervisor.stop().await;
    let (stopped, message) = match outcome {
        StopOutcome::Stopped => (true, "Stream stopped successfully"),
        StopOutcome::NothingToStop => (false, "Nothing to stop"),
    };
    Json(serde_json::json!({
        "success": true,
        "stopped": stopped,
        "message": message,
    }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StreamStatusResponse {
    #[serde(flatten)]
    status: StatusSnapshot,
    hls_url: Option<String>,
}

async fn stream_status(State(ctx): State<AppContext>) -> impl IntoResponse {
    let status = ctx.supervisor.status();
    let hls_url = status.has_ready_output.then(|| ctx.playlist_url());
    Json(serde_json::json!({
        "success": true,
        "data": StreamStatusResponse { status, hls_url },
    }))
}

#[derive(Serialize)]
struct DebugHlsResponse {
    success: bool,
    #[serde(flatten)]
    listing: OutputListing,
}

async fn debug_hls(State(ctx): State<AppContext>) -> impl IntoResponse {
    let listing = ctx.supervisor.sink().listing();
    Json(DebugHlsResponse {
        success: listing.exists,
        listing,
    })
}
