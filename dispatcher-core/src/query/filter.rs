//! Filter compiler
//!
//! Turns the parsed `filter[...]` tree into a conjunction of typed predicates.
//! The predicates are store-agnostic: the Postgres store renders them as SQL,
//! the in-memory store evaluates them with [`Filter::matches`].

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::QueryError;
use super::tree::{Node, Tree};
use crate::domain::run::{Run, RunHost};
use crate::domain::status::{self, DisplayedStatus};

/// Resource a filter is compiled for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Run,
    RunHost,
}

/// Columns that support exact-match filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    RunId,
    Recipient,
    Service,
    Host,
    InventoryId,
}

impl Column {
    fn is_uuid(self) -> bool {
        matches!(
            self,
            Column::RunId | Column::Recipient | Column::InventoryId
        )
    }

    fn value_of(self, run: &Run, host: Option<&RunHost>) -> Option<Value> {
        match self {
            Column::RunId => Some(Value::Uuid(run.id)),
            Column::Recipient => Some(Value::Uuid(run.recipient)),
            Column::Service => Some(Value::Text(run.service.clone())),
            Column::Host => host.map(|h| Value::Text(h.host.clone())),
            Column::InventoryId => host.and_then(|h| h.inventory_id).map(Value::Uuid),
        }
    }
}

/// Typed filter operand
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Uuid(Uuid),
    Text(String),
}

/// Whose stored status a status predicate reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusSubject {
    Run,
    Host,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Column equals one of the values
    AnyOf { column: Column, values: Vec<Value> },
    /// Displayed status is one of the given statuses
    Status {
        subject: StatusSubject,
        any_of: Vec<DisplayedStatus>,
    },
    /// The (owning) run carries exactly this label pair
    Label { key: String, value: String },
}

impl Predicate {
    /// Evaluate against a run and, for run-host listings, one of its hosts
    pub fn matches(&self, run: &Run, host: Option<&RunHost>, now: DateTime<Utc>) -> bool {
        match self {
            Predicate::AnyOf { column, values } => column
                .value_of(run, host)
                .is_some_and(|actual| values.contains(&actual)),
            Predicate::Status { subject, any_of } => {
                let stored = match subject {
                    StatusSubject::Run => Some(run.status),
                    StatusSubject::Host => host.map(|h| h.status),
                };
                stored.is_some_and(|stored| {
                    let displayed = status::derive(stored, run.created_at, run.timeout, now);
                    any_of.contains(&displayed)
                })
            }
            Predicate::Label { key, value } => run.labels.get(key) == Some(value),
        }
    }
}

/// Conjunction of predicates; empty means no constraint
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    predicates: Vec<Predicate>,
}

impl Filter {
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn matches(&self, run: &Run, host: Option<&RunHost>, now: DateTime<Utc>) -> bool {
        self.predicates.iter().all(|p| p.matches(run, host, now))
    }
}

/// Compile a filter tree for the given resource
///
/// Keys outside the resource's declared filters fail with `UnknownField`, so a
/// typo is reported instead of silently matching nothing.
pub fn compile(tree: &Tree, kind: ResourceKind) -> Result<Filter, QueryError> {
    let mut predicates = Vec::new();

    match kind {
        ResourceKind::Run => compile_run_scope(tree, None, true, &mut predicates)?,
        ResourceKind::RunHost => compile_host_scope(tree, &mut predicates)?,
    }

    Ok(Filter { predicates })
}

fn compile_run_scope(
    tree: &Tree,
    prefix: Option<&str>,
    allow_status: bool,
    out: &mut Vec<Predicate>,
) -> Result<(), QueryError> {
    for (key, node) in tree {
        let path = join(prefix, key);
        let predicate = match key.as_str() {
            "id" => exact(Column::RunId, node, &path)?,
            "recipient" => exact(Column::Recipient, node, &path)?,
            "service" => exact(Column::Service, node, &path)?,
            "status" if allow_status => status_predicate(StatusSubject::Run, node, &path)?,
            "labels" => {
                label_predicates(node, &path, out)?;
                continue;
            }
            _ => return Err(QueryError::UnknownField(path)),
        };
        out.push(predicate);
    }

    Ok(())
}

fn compile_host_scope(tree: &Tree, out: &mut Vec<Predicate>) -> Result<(), QueryError> {
    for (key, node) in tree {
        let predicate = match key.as_str() {
            "status" => status_predicate(StatusSubject::Host, node, key)?,
            "host" => exact(Column::Host, node, key)?,
            "inventory_id" => exact(Column::InventoryId, node, key)?,
            "run" => {
                let run = node.expect_branch(key)?;
                compile_run_scope(run, Some(key.as_str()), false, out)?;
                continue;
            }
            _ => return Err(QueryError::UnknownField(key.clone())),
        };
        out.push(predicate);
    }

    Ok(())
}

fn exact(column: Column, node: &Node, path: &str) -> Result<Predicate, QueryError> {
    let values = node
        .expect_leaf(path)?
        .iter()
        .map(|raw| {
            if column.is_uuid() {
                raw.parse::<Uuid>().map(Value::Uuid).map_err(|_| {
                    QueryError::InvalidParameter(format!("{} must be a UUID, got '{}'", path, raw))
                })
            } else {
                Ok(Value::Text(raw.clone()))
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Predicate::AnyOf { column, values })
}

fn status_predicate(
    subject: StatusSubject,
    node: &Node,
    path: &str,
) -> Result<Predicate, QueryError> {
    let mut any_of = Vec::new();
    for raw in node.expect_leaf(path)? {
        let parsed = raw
            .parse::<DisplayedStatus>()
            .map_err(|e| QueryError::InvalidParameter(format!("{}: {}", path, e)))?;
        if !any_of.contains(&parsed) {
            any_of.push(parsed);
        }
    }

    Ok(Predicate::Status { subject, any_of })
}

fn label_predicates(
    node: &Node,
    path: &str,
    out: &mut Vec<Predicate>,
) -> Result<(), QueryError> {
    for (key, value_node) in node.expect_branch(path)? {
        let label_path = format!("{}.{}", path, key);
        for value in value_node.expect_leaf(&label_path)? {
            out.push(Predicate::Label {
                key: key.clone(),
                value: value.clone(),
            });
        }
    }

    Ok(())
}

fn join(prefix: Option<&str>, key: &str) -> String {
    match prefix {
        Some(prefix) => format!("{}.{}", prefix, key),
        None => key.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::run::{Labels, RunStatus};
    use crate::query::deep_object;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn tree(pairs: &[(&str, &str)]) -> Tree {
        let params: Vec<(String, String)> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        deep_object::parse(&params, "filter").tree
    }

    fn run(status: RunStatus, age_seconds: i64, labels: &[(&str, &str)]) -> Run {
        let created_at = now() - Duration::seconds(age_seconds);
        Run {
            id: Uuid::new_v4(),
            org_id: "5318290".to_string(),
            recipient: Uuid::new_v4(),
            correlation_id: Uuid::new_v4(),
            url: "http://example.com/playbook.yml".to_string(),
            timeout: 3600,
            status,
            labels: labels
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<Labels>(),
            service: "remediations".to_string(),
            created_at,
            updated_at: created_at,
            satellite_id: None,
            satellite_org_id: None,
            name: None,
            web_console_url: None,
        }
    }

    fn host(run: &Run, status: RunStatus) -> RunHost {
        RunHost {
            id: Uuid::new_v4(),
            run_id: run.id,
            host: "localhost".to_string(),
            inventory_id: Some(Uuid::new_v4()),
            status,
            stdout: None,
            created_at: run.created_at,
            updated_at: run.created_at,
        }
    }

    #[test]
    fn test_empty_tree_has_no_constraints() {
        let filter = compile(&Tree::new(), ResourceKind::Run).unwrap();
        assert!(filter.is_empty());

        let failed = run(RunStatus::Failure, 0, &[]);
        assert!(filter.matches(&failed, None, now()));
    }

    #[test]
    fn test_timeout_filter_matches_oracle() {
        let filter = compile(&tree(&[("filter[status]", "timeout")]), ResourceKind::Run).unwrap();

        let expired = run(RunStatus::Running, 3601, &[]);
        let fresh = run(RunStatus::Running, 3599, &[]);
        let done = run(RunStatus::Success, 7200, &[]);

        assert!(filter.matches(&expired, None, now()));
        assert!(!filter.matches(&fresh, None, now()));
        assert!(!filter.matches(&done, None, now()));
    }

    #[test]
    fn test_running_filter_excludes_timed_out_rows() {
        let filter = compile(&tree(&[("filter[status]", "running")]), ResourceKind::Run).unwrap();

        let fresh = run(RunStatus::Running, 10, &[]);
        let expired = run(RunStatus::Running, 3601, &[]);
        assert!(filter.matches(&fresh, None, now()));
        assert!(!filter.matches(&expired, None, now()));
    }

    #[test]
    fn test_status_filter_agrees_with_projection() {
        let rows = [
            run(RunStatus::Running, 0, &[]),
            run(RunStatus::Running, 3600, &[]),
            run(RunStatus::Running, 9000, &[]),
            run(RunStatus::Success, 9000, &[]),
            run(RunStatus::Failure, 10, &[]),
        ];

        for status in ["running", "success", "failure", "timeout"] {
            let filter = compile(&tree(&[("filter[status]", status)]), ResourceKind::Run).unwrap();
            for row in &rows {
                assert_eq!(
                    filter.matches(row, None, now()),
                    row.displayed_status(now()).as_str() == status,
                    "status {} disagrees for {:?}",
                    status,
                    row.status
                );
            }
        }
    }

    #[test]
    fn test_repeated_status_values_are_ored() {
        let filter = compile(
            &tree(&[
                ("filter[status]", "failure"),
                ("filter[status]", "timeout"),
            ]),
            ResourceKind::Run,
        )
        .unwrap();

        let failed = run(RunStatus::Failure, 0, &[]);
        let expired = run(RunStatus::Running, 4000, &[]);
        let succeeded = run(RunStatus::Success, 0, &[]);
        assert!(filter.matches(&failed, None, now()));
        assert!(filter.matches(&expired, None, now()));
        assert!(!filter.matches(&succeeded, None, now()));
    }

    #[test]
    fn test_label_filters_are_conjunctive() {
        let row = run(
            RunStatus::Running,
            0,
            &[("env", "prod"), ("team", "platform")],
        );

        let env_only =
            compile(&tree(&[("filter[labels][env]", "prod")]), ResourceKind::Run).unwrap();
        assert!(env_only.matches(&row, None, now()));

        let both = compile(
            &tree(&[
                ("filter[labels][env]", "prod"),
                ("filter[labels][team]", "platform"),
            ]),
            ResourceKind::Run,
        )
        .unwrap();
        assert!(both.matches(&row, None, now()));

        let mismatch = compile(
            &tree(&[
                ("filter[labels][env]", "prod"),
                ("filter[labels][team]", "app"),
            ]),
            ResourceKind::Run,
        )
        .unwrap();
        assert!(!mismatch.matches(&row, None, now()));
        assert_eq!(mismatch.predicates().len(), 2);
    }

    #[test]
    fn test_exact_match_filters() {
        let row = run(RunStatus::Success, 0, &[]);
        let recipient = row.recipient.to_string();
        let filter = compile(
            &tree(&[
                ("filter[recipient]", recipient.as_str()),
                ("filter[service]", "remediations"),
            ]),
            ResourceKind::Run,
        )
        .unwrap();
        assert!(filter.matches(&row, None, now()));

        let other = run(RunStatus::Success, 0, &[]);
        assert!(!filter.matches(&other, None, now()));
    }

    #[test]
    fn test_uuid_columns_reject_garbage() {
        let err = compile(&tree(&[("filter[recipient]", "nope")]), ResourceKind::Run).unwrap_err();
        assert!(matches!(err, QueryError::InvalidParameter(_)));
    }

    #[test]
    fn test_unknown_keys_fail_loudly() {
        let err = compile(&tree(&[("filter[salad]", "x")]), ResourceKind::Run).unwrap_err();
        assert_eq!(err, QueryError::UnknownField("salad".to_string()));

        let err =
            compile(&tree(&[("filter[run][salad]", "x")]), ResourceKind::RunHost).unwrap_err();
        assert_eq!(err, QueryError::UnknownField("run.salad".to_string()));

        // run hosts have no top-level labels; those live on the parent run
        let err = compile(&tree(&[("filter[labels][a]", "b")]), ResourceKind::RunHost).unwrap_err();
        assert_eq!(err, QueryError::UnknownField("labels".to_string()));
    }

    #[test]
    fn test_unknown_status_is_invalid_parameter() {
        let err = compile(&tree(&[("filter[status]", "done")]), ResourceKind::Run).unwrap_err();
        assert!(matches!(err, QueryError::InvalidParameter(_)));
    }

    #[test]
    fn test_shape_mismatch_is_invalid_parameter() {
        let err = compile(&tree(&[("filter[labels]", "env")]), ResourceKind::Run).unwrap_err();
        assert!(matches!(err, QueryError::InvalidParameter(_)));

        let err = compile(
            &tree(&[("filter[status][x]", "running")]),
            ResourceKind::Run,
        )
        .unwrap_err();
        assert!(matches!(err, QueryError::InvalidParameter(_)));
    }

    #[test]
    fn test_run_host_filters_join_through_run() {
        let parent = run(RunStatus::Running, 0, &[("env", "prod")]);
        let child = host(&parent, RunStatus::Success);
        let run_id = parent.id.to_string();

        let filter = compile(
            &tree(&[
                ("filter[run][id]", run_id.as_str()),
                ("filter[run][labels][env]", "prod"),
                ("filter[run][service]", "remediations"),
                ("filter[status]", "success"),
            ]),
            ResourceKind::RunHost,
        )
        .unwrap();
        assert!(filter.matches(&parent, Some(&child), now()));

        let other_parent = run(RunStatus::Running, 0, &[("env", "prod")]);
        assert!(!filter.matches(&other_parent, Some(&child), now()));
    }

    #[test]
    fn test_host_status_uses_parent_timeout() {
        let parent = run(RunStatus::Running, 4000, &[]);
        let child = host(&parent, RunStatus::Running);

        let timeout = compile(
            &tree(&[("filter[status]", "timeout")]),
            ResourceKind::RunHost,
        )
        .unwrap();
        assert!(timeout.matches(&parent, Some(&child), now()));

        let running = compile(
            &tree(&[("filter[status]", "running")]),
            ResourceKind::RunHost,
        )
        .unwrap();
        assert!(!running.matches(&parent, Some(&child), now()));
    }

    #[test]
    fn test_inventory_id_filter() {
        let parent = run(RunStatus::Running, 0, &[]);
        let child = host(&parent, RunStatus::Running);
        let inventory_id = child.inventory_id.unwrap().to_string();

        let filter = compile(
            &tree(&[("filter[inventory_id]", inventory_id.as_str())]),
            ResourceKind::RunHost,
        )
        .unwrap();
        assert!(filter.matches(&parent, Some(&child), now()));

        let mut without = child.clone();
        without.inventory_id = None;
        assert!(!filter.matches(&parent, Some(&without), now()));
    }
}
