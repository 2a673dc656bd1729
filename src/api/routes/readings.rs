//! Reading Routes
//!
//! - POST /api/v1/readings - Add a reading (body optional)
//! - GET /api/v1/readings/recent - Current Recent Window

use axum::{body::Bytes, extract::State, http::StatusCode, Json};
use chrono::Utc;
use std::sync::Arc;

use crate::api::dto::{AddReadingRequest, AddReadingResponse, RecentResponse};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::reading::Reading;
use crate::websocket::WsEvent;

/// POST /api/v1/readings
///
/// An empty body behaves like the dashboard's "add" button.
pub async fn add_reading(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<AddReadingResponse>)> {
    let req = parse_add_request(&body)?;
    let reading = resolve_reading(req);

    let appended = state.live.append(reading).await?;

    state.ws_hub.publish(WsEvent::reading(appended.reading));

    Ok((
        StatusCode::CREATED,
        Json(AddReadingResponse {
            id: appended.id,
            seq: appended.seq,
            reading: appended.reading,
        }),
    ))
}

/// GET /api/v1/readings/recent
pub async fn recent_readings(State(state): State<Arc<AppState>>) -> ApiResult<Json<RecentResponse>> {
    let readings = state.live.recent_window().await?;

    Ok(Json(RecentResponse {
        collection: state.live.collection().to_string(),
        count: readings.len(),
        readings,
    }))
}

fn parse_add_request(body: &[u8]) -> ApiResult<AddReadingRequest> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(AddReadingRequest::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| ApiError::Validation(format!("Invalid request body: {}", e)))
}

/// Fill in what the request left out
fn resolve_reading(req: AddReadingRequest) -> Reading {
    let generated = Reading::random();
    Reading::new(
        req.temperature.unwrap_or(generated.temperature),
        req.timestamp.unwrap_or_else(|| Utc::now().timestamp_millis()),
    )
}
