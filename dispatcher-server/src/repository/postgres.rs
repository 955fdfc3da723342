//! Postgres Run Store
//!
//! Listings are rendered with `QueryBuilder` so each compiled predicate binds
//! its own values. Count and page queries share the same `WHERE` clause and
//! run in one read-only snapshot, so `total` always describes the page.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dispatcher_core::domain::run::{Labels, Run, RunHost, RunHostWithRun, RunStatus};
use dispatcher_core::query::ListQuery;
use dispatcher_core::query::sort::{RunHostSortKey, RunSortKey};
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction, types::Json};
use uuid::Uuid;

use super::{Listing, RunStore, sql};

const RUN_COLUMNS: &str = "r.id, r.org_id, r.recipient, r.correlation_id, r.url, r.timeout, \
     r.status, r.labels, r.service, r.created_at, r.updated_at, r.satellite_id, \
     r.satellite_org_id, r.name, r.web_console_url";

const HOST_COLUMNS: &str = "h.id AS host_id, h.run_id AS host_run_id, h.host AS host_name, \
     h.inventory_id AS host_inventory_id, h.status AS host_status, h.stdout AS host_stdout, \
     h.created_at AS host_created_at, h.updated_at AS host_updated_at";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn begin_snapshot(&self) -> Result<Transaction<'static, Postgres>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(sql::SNAPSHOT).execute(&mut *tx).await?;
        Ok(tx)
    }
}

#[async_trait]
impl RunStore for PgStore {
    async fn insert_run(&self, run: &Run, hosts: &[RunHost]) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO runs (id, org_id, recipient, correlation_id, url, timeout, status,
                              labels, service, created_at, updated_at, satellite_id,
                              satellite_org_id, name, web_console_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(run.id)
        .bind(&run.org_id)
        .bind(run.recipient)
        .bind(run.correlation_id)
        .bind(&run.url)
        .bind(run.timeout)
        .bind(run.status.as_str())
        .bind(Json(&run.labels))
        .bind(&run.service)
        .bind(run.created_at)
        .bind(run.updated_at)
        .bind(run.satellite_id)
        .bind(run.satellite_org_id.as_deref())
        .bind(run.name.as_deref())
        .bind(run.web_console_url.as_deref())
        .execute(&mut *tx)
        .await?;

        if !hosts.is_empty() {
            let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new(
                "INSERT INTO run_hosts \
                 (id, run_id, host, inventory_id, status, stdout, created_at, updated_at) ",
            );
            qb.push_values(hosts, |mut row, host| {
                row.push_bind(host.id)
                    .push_bind(host.run_id)
                    .push_bind(host.host.as_str())
                    .push_bind(host.inventory_id)
                    .push_bind(host.status.as_str())
                    .push_bind(host.stdout.as_deref())
                    .push_bind(host.created_at)
                    .push_bind(host.updated_at);
            });
            qb.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;

        tracing::debug!(run_id = %run.id, hosts = hosts.len(), "Run persisted");
        Ok(())
    }

    async fn list_runs(&self, query: &ListQuery<RunSortKey>) -> Result<Listing<Run>, sqlx::Error> {
        let mut tx = self.begin_snapshot().await?;

        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM runs r");
        sql::push_where(&mut count, &query.org_id, &query.filter, query.now);
        let total: i64 = count.build_query_scalar().fetch_one(&mut *tx).await?;

        let mut select = QueryBuilder::new(format!("SELECT {} FROM runs r", RUN_COLUMNS));
        sql::push_where(&mut select, &query.org_id, &query.filter, query.now);
        sql::push_run_order(&mut select, &query.sort);
        sql::push_page(&mut select, query.page);

        let rows: Vec<RunRow> = select.build_query_as().fetch_all(&mut *tx).await?;
        tx.commit().await?;

        let items = rows
            .into_iter()
            .map(Run::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Listing { items, total })
    }

    async fn list_run_hosts(
        &self,
        query: &ListQuery<RunHostSortKey>,
    ) -> Result<Listing<RunHostWithRun>, sqlx::Error> {
        const FROM: &str = " FROM run_hosts h JOIN runs r ON r.id = h.run_id";

        let mut tx = self.begin_snapshot().await?;

        let mut count = QueryBuilder::new(format!("SELECT COUNT(*){}", FROM));
        sql::push_where(&mut count, &query.org_id, &query.filter, query.now);
        let total: i64 = count.build_query_scalar().fetch_one(&mut *tx).await?;

        let mut select =
            QueryBuilder::new(format!("SELECT {}, {}{}", HOST_COLUMNS, RUN_COLUMNS, FROM));
        sql::push_where(&mut select, &query.org_id, &query.filter, query.now);
        sql::push_run_host_order(&mut select, &query.sort);
        sql::push_page(&mut select, query.page);

        let rows: Vec<RunHostRow> = select.build_query_as().fetch_all(&mut *tx).await?;
        tx.commit().await?;

        let items = rows
            .into_iter()
            .map(RunHostWithRun::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Listing { items, total })
    }

    async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

// Helper types for database mapping

#[derive(sqlx::FromRow)]
struct RunRow {
    id: Uuid,
    org_id: String,
    recipient: Uuid,
    correlation_id: Uuid,
    url: String,
    timeout: i32,
    status: String,
    labels: Json<Labels>,
    service: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    satellite_id: Option<Uuid>,
    satellite_org_id: Option<String>,
    name: Option<String>,
    web_console_url: Option<String>,
}

#[derive(sqlx::FromRow)]
struct RunHostRow {
    host_id: Uuid,
    host_run_id: Uuid,
    host_name: String,
    host_inventory_id: Option<Uuid>,
    host_status: String,
    host_stdout: Option<String>,
    host_created_at: DateTime<Utc>,
    host_updated_at: DateTime<Utc>,
    #[sqlx(flatten)]
    run: RunRow,
}

/// Stored statuses are constrained by the schema; anything else is corruption
fn decode_status(raw: &str) -> Result<RunStatus, sqlx::Error> {
    raw.parse::<RunStatus>().map_err(|e| {
        tracing::error!(status = raw, "Unrecognized status in storage");
        sqlx::Error::Decode(Box::new(e))
    })
}

impl TryFrom<RunRow> for Run {
    type Error = sqlx::Error;

    fn try_from(row: RunRow) -> Result<Self, Self::Error> {
        Ok(Run {
            id: row.id,
            org_id: row.org_id,
            recipient: row.recipient,
            correlation_id: row.correlation_id,
            url: row.url,
            timeout: row.timeout,
            status: decode_status(&row.status)?,
            labels: row.labels.0,
            service: row.service,
            created_at: row.created_at,
            updated_at: row.updated_at,
            satellite_id: row.satellite_id,
            satellite_org_id: row.satellite_org_id,
            name: row.name,
            web_console_url: row.web_console_url,
        })
    }
}

impl TryFrom<RunHostRow> for RunHostWithRun {
    type Error = sqlx::Error;

    fn try_from(row: RunHostRow) -> Result<Self, Self::Error> {
        let host = RunHost {
            id: row.host_id,
            run_id: row.host_run_id,
            host: row.host_name,
            inventory_id: row.host_inventory_id,
            status: decode_status(&row.host_status)?,
            stdout: row.host_stdout,
            created_at: row.host_created_at,
            updated_at: row.host_updated_at,
        };

        Ok(RunHostWithRun {
            host,
            run: Run::try_from(row.run)?,
        })
    }
}
