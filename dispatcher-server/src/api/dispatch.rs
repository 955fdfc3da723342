//! Dispatch API Handler

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use dispatcher_core::dto::run::{DispatchResult, RunInput};

use crate::api::AppState;
use crate::api::error::ApiResult;
use crate::api::identity;
use crate::service::dispatch_service::{self, DispatchDeps};

/// POST /internal/dispatch
/// Create runs; each item gets its own status in the 207 body
pub async fn dispatch_runs(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(inputs): Json<Vec<RunInput>>,
) -> ApiResult<(StatusCode, Json<Vec<DispatchResult>>)> {
    let service = identity::service(&headers)?;
    tracing::info!(service, runs = inputs.len(), "Dispatching runs");

    let deps = DispatchDeps {
        store: state.store.as_ref(),
        dispatcher: state.dispatcher.as_ref(),
        limiter: &state.limiter,
        max_wait: state.config.admission_max_wait,
        default_timeout: state.config.default_run_timeout,
    };
    let results = dispatch_service::dispatch_runs(deps, &service, inputs).await?;

    Ok((StatusCode::MULTI_STATUS, Json(results)))
}
