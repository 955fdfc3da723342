//! Health Check API Handler
//!
//! Reports whether the store is reachable.

use axum::{extract::State, http::StatusCode, response::IntoResponse};

use crate::api::AppState;
use crate::api::error::ApiResult;

/// GET /health
/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    state.store.ping().await?;
    Ok((StatusCode::OK, "OK"))
}
