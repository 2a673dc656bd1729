//! Chart Routes
//!
//! - GET /api/v1/chart.svg - The current window as a static SVG

use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
};
use std::sync::Arc;

use crate::api::error::ApiResult;
use crate::api::state::AppState;

/// GET /api/v1/chart.svg
///
/// Every bar is drawn at its final size.
pub async fn chart_svg(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    let svg = state.live.snapshot_svg().await?;
    Ok(([(header::CONTENT_TYPE, "image/svg+xml")], svg))
}
