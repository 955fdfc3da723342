//! Run Service
//!
//! Listing of runs and run hosts: validates the request, queries the store
//! and shapes the page.

use chrono::{DateTime, Utc};
use dispatcher_core::dto::page::{ListPage, PageMeta};
use dispatcher_core::dto::projection::{project_run, project_run_host};
use dispatcher_core::query::fields::{RunField, RunHostField};
use dispatcher_core::query::filter::ResourceKind;
use dispatcher_core::query::page::{PageParams, build_links};
use dispatcher_core::query::sort::{RunHostSortKey, RunSortKey};
use dispatcher_core::query::{ListRequest, QueryError, QueryParams};
use serde_json::{Map, Value};

use crate::repository::RunStore;

/// Service error type
#[derive(Debug)]
pub enum RunError {
    Query(QueryError),
    DatabaseError(sqlx::Error),
}

impl From<QueryError> for RunError {
    fn from(err: QueryError) -> Self {
        RunError::Query(err)
    }
}

impl From<sqlx::Error> for RunError {
    fn from(err: sqlx::Error) -> Self {
        RunError::DatabaseError(err)
    }
}

pub type Result<T> = std::result::Result<T, RunError>;

/// Where a listing is served from and the parameters it was requested with
pub struct ListContext<'a> {
    pub org_id: &'a str,
    pub path: &'a str,
    pub params: &'a QueryParams,
    /// Sampled once per request
    pub now: DateTime<Utc>,
}

/// List the runs of a tenant
pub async fn list_runs(store: &dyn RunStore, ctx: ListContext<'_>) -> Result<ListPage> {
    let request = ListRequest::<RunField, RunSortKey>::parse(ctx.params, ResourceKind::Run)?;
    let fields = request.fields.clone();
    let query = request.into_query(ctx.org_id, ctx.now);

    let listing = store.list_runs(&query).await?;
    let data = listing
        .items
        .iter()
        .map(|run| project_run(run, &fields, ctx.now))
        .collect();

    Ok(page(data, &ctx, query.page, listing.total))
}

/// List the run hosts of a tenant, each joined with its run
pub async fn list_run_hosts(store: &dyn RunStore, ctx: ListContext<'_>) -> Result<ListPage> {
    let request =
        ListRequest::<RunHostField, RunHostSortKey>::parse(ctx.params, ResourceKind::RunHost)?;
    let fields = request.fields.clone();
    let query = request.into_query(ctx.org_id, ctx.now);

    let listing = store.list_run_hosts(&query).await?;
    let data = listing
        .items
        .iter()
        .map(|record| project_run_host(record, &fields, ctx.now))
        .collect();

    Ok(page(data, &ctx, query.page, listing.total))
}

fn page(
    data: Vec<Map<String, Value>>,
    ctx: &ListContext<'_>,
    params: PageParams,
    total: i64,
) -> ListPage {
    ListPage {
        meta: PageMeta {
            count: data.len() as i64,
            total,
        },
        links: build_links(ctx.path, ctx.params.pairs(), params, total),
        data,
    }
}
