//! SQL rendering of compiled filters
//!
//! Runs are always aliased `r` and run hosts `h`, so every predicate can be
//! rendered without knowing which listing it belongs to.

use chrono::{DateTime, Utc};
use dispatcher_core::domain::run::Labels;
use dispatcher_core::domain::status::DisplayedStatus;
use dispatcher_core::query::filter::{Column, Filter, Predicate, StatusSubject, Value};
use dispatcher_core::query::page::PageParams;
use dispatcher_core::query::sort::{Direction, RunHostSortKey, RunSortKey, Sort};
use sqlx::{Postgres, QueryBuilder, types::Json};

/// Instant at which the owning run times out; see `status::deadline`
const RUN_DEADLINE: &str = "(r.created_at + r.timeout * INTERVAL '1 second')";

/// Isolation for a listing's count and page queries; must open the transaction
pub(crate) const SNAPSHOT: &str = "SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY";

/// Append `WHERE r.org_id = $n AND <predicates>`
pub(crate) fn push_where(
    qb: &mut QueryBuilder<'static, Postgres>,
    org_id: &str,
    filter: &Filter,
    now: DateTime<Utc>,
) {
    qb.push(" WHERE r.org_id = ").push_bind(org_id.to_string());

    for predicate in filter.predicates() {
        qb.push(" AND ");
        push_predicate(qb, predicate, now);
    }
}

fn push_predicate(
    qb: &mut QueryBuilder<'static, Postgres>,
    predicate: &Predicate,
    now: DateTime<Utc>,
) {
    match predicate {
        Predicate::AnyOf { column, values } => {
            if values.is_empty() {
                qb.push("FALSE");
                return;
            }

            qb.push(column_sql(*column)).push(" IN (");
            let mut list = qb.separated(", ");
            for value in values {
                match value {
                    Value::Uuid(id) => list.push_bind(*id),
                    Value::Text(text) => list.push_bind(text.clone()),
                };
            }
            list.push_unseparated(")");
        }
        Predicate::Status { subject, any_of } => {
            if any_of.is_empty() {
                qb.push("FALSE");
                return;
            }

            let column = match subject {
                StatusSubject::Run => "r.status",
                StatusSubject::Host => "h.status",
            };

            qb.push("(");
            for (i, status) in any_of.iter().enumerate() {
                if i > 0 {
                    qb.push(" OR ");
                }
                match status {
                    DisplayedStatus::Timeout => {
                        qb.push("(")
                            .push(column)
                            .push(" = 'running' AND ")
                            .push(RUN_DEADLINE)
                            .push(" <= ")
                            .push_bind(now)
                            .push(")");
                    }
                    DisplayedStatus::Running => {
                        qb.push("(")
                            .push(column)
                            .push(" = 'running' AND ")
                            .push(RUN_DEADLINE)
                            .push(" > ")
                            .push_bind(now)
                            .push(")");
                    }
                    DisplayedStatus::Success | DisplayedStatus::Failure => {
                        qb.push(column).push(" = ").push_bind(status.as_str());
                    }
                }
            }
            qb.push(")");
        }
        Predicate::Label { key, value } => {
            let pair: Labels = [(key.clone(), value.clone())].into();
            qb.push("r.labels @> ").push_bind(Json(pair));
        }
    }
}

fn column_sql(column: Column) -> &'static str {
    match column {
        Column::RunId => "r.id",
        Column::Recipient => "r.recipient",
        Column::Service => "r.service",
        Column::Host => "h.host",
        Column::InventoryId => "h.inventory_id",
    }
}

fn direction_sql(direction: Direction) -> &'static str {
    match direction {
        Direction::Asc => "ASC NULLS FIRST",
        Direction::Desc => "DESC NULLS LAST",
    }
}

pub(crate) fn push_run_order(qb: &mut QueryBuilder<'static, Postgres>, sort: &Sort<RunSortKey>) {
    let column = match sort.key {
        RunSortKey::CreatedAt => "r.created_at",
        RunSortKey::UpdatedAt => "r.updated_at",
        RunSortKey::Timeout => "r.timeout",
        RunSortKey::Recipient => "r.recipient",
        RunSortKey::Service => "r.service",
        RunSortKey::Name => "r.name",
    };

    qb.push(" ORDER BY ")
        .push(column)
        .push(" ")
        .push(direction_sql(sort.direction))
        .push(", r.id ASC");
}

pub(crate) fn push_run_host_order(
    qb: &mut QueryBuilder<'static, Postgres>,
    sort: &Sort<RunHostSortKey>,
) {
    let column = match sort.key {
        RunHostSortKey::CreatedAt => "h.created_at",
        RunHostSortKey::UpdatedAt => "h.updated_at",
        RunHostSortKey::Host => "h.host",
        RunHostSortKey::InventoryId => "h.inventory_id",
    };

    qb.push(" ORDER BY ")
        .push(column)
        .push(" ")
        .push(direction_sql(sort.direction))
        .push(", h.id ASC");
}

pub(crate) fn push_page(qb: &mut QueryBuilder<'static, Postgres>, page: PageParams) {
    qb.push(" LIMIT ")
        .push_bind(page.limit)
        .push(" OFFSET ")
        .push_bind(page.offset);
}
