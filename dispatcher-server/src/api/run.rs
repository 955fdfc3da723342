//! Run API Handlers
//!
//! Read endpoints for runs and run hosts.

use axum::{
    Json,
    extract::{RawQuery, State},
    http::HeaderMap,
};
use chrono::Utc;
use dispatcher_core::dto::page::ListPage;
use dispatcher_core::query::QueryParams;

use crate::api::AppState;
use crate::api::error::ApiResult;
use crate::api::identity;
use crate::service::run_service::{self, ListContext};

pub const RUNS_PATH: &str = "/api/playbook-dispatcher/v1/runs";
pub const RUN_HOSTS_PATH: &str = "/api/playbook-dispatcher/v1/run_hosts";

/// GET /api/playbook-dispatcher/v1/runs
pub async fn list_runs(
    State(state): State<AppState>,
    headers: HeaderMap,
    RawQuery(raw): RawQuery,
) -> ApiResult<Json<ListPage>> {
    let org_id = identity::org_id(&headers)?;
    let params = QueryParams::parse(raw.as_deref().unwrap_or_default());
    tracing::debug!(org_id, "Listing runs");

    let ctx = ListContext {
        org_id: &org_id,
        path: RUNS_PATH,
        params: &params,
        now: Utc::now(),
    };
    let page = run_service::list_runs(state.store.as_ref(), ctx).await?;

    Ok(Json(page))
}

/// GET /api/playbook-dispatcher/v1/run_hosts
pub async fn list_run_hosts(
    State(state): State<AppState>,
    headers: HeaderMap,
    RawQuery(raw): RawQuery,
) -> ApiResult<Json<ListPage>> {
    let org_id = identity::org_id(&headers)?;
    let params = QueryParams::parse(raw.as_deref().unwrap_or_default());
    tracing::debug!(org_id, "Listing run hosts");

    let ctx = ListContext {
        org_id: &org_id,
        path: RUN_HOSTS_PATH,
        params: &params,
        now: Utc::now(),
    };
    let page = run_service::list_run_hosts(state.store.as_ref(), ctx)
        .await?;

    Ok(Json(page))
}
