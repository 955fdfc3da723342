//! Dispatch Service
//!
//! Creates runs: admission, per-item validation, delivery through the
//! connector and persistence of the run with its hosts.

use std::time::Duration;

use chrono::Utc;
use dispatcher_core::domain::run::{Run, RunHost, RunStatus};
use dispatcher_core::dto::run::{DispatchResult, RunInput};
use uuid::Uuid;

use crate::connector::{ConnectorError, Dispatcher, RunMessage};
use crate::repository::RunStore;
use crate::service::admission::{AdmissionLimiter, Throttled};

/// Service error type
#[derive(Debug)]
pub enum DispatchError {
    ValidationError(String),
    RecipientNotFound(Uuid),
    ConnectorFailed(String),
    DatabaseError(sqlx::Error),
}

impl From<sqlx::Error> for DispatchError {
    fn from(err: sqlx::Error) -> Self {
        DispatchError::DatabaseError(err)
    }
}

impl From<ConnectorError> for DispatchError {
    fn from(err: ConnectorError) -> Self {
        match err {
            ConnectorError::RecipientNotFound(id) => DispatchError::RecipientNotFound(id),
            ConnectorError::Failed(msg) => DispatchError::ConnectorFailed(msg),
        }
    }
}

impl DispatchError {
    /// Per-item outcome reported in the multi-status response
    fn into_result(self) -> DispatchResult {
        match self {
            DispatchError::ValidationError(msg) => DispatchResult::error(400, msg),
            DispatchError::RecipientNotFound(id) => {
                DispatchResult::error(404, format!("recipient {} not found", id))
            }
            DispatchError::ConnectorFailed(msg) => {
                tracing::error!("Dispatch failed: {}", msg);
                DispatchResult::error(500, "Internal server error")
            }
            DispatchError::DatabaseError(err) => {
                tracing::error!("Database error: {:?}", err);
                DispatchResult::error(500, "Internal server error")
            }
        }
    }
}

/// Width of the `org_id` column
const MAX_ORG_ID_LEN: usize = 10;

/// Collaborators and settings a dispatch request runs against
pub struct DispatchDeps<'a> {
    pub store: &'a dyn RunStore,
    pub dispatcher: &'a dyn Dispatcher,
    pub limiter: &'a AdmissionLimiter,
    pub max_wait: Duration,
    pub default_timeout: i32,
}

/// Dispatch a batch of runs on behalf of `service`
///
/// The whole request is admitted once. After that every item is handled
/// independently and gets its own result, in input order. Only admission can
/// fail the request as a whole.
pub async fn dispatch_runs(
    deps: DispatchDeps<'_>,
    service: &str,
    inputs: Vec<RunInput>,
) -> Result<Vec<DispatchResult>, Throttled> {
    match deps.limiter.acquire(service, deps.max_wait).await {
        Ok(waited) if !waited.is_zero() => {
            tracing::debug!(
                service,
                waited_ms = waited.as_millis() as u64,
                "Request paced"
            );
        }
        Ok(_) => {}
        Err(throttled) => {
            tracing::warn!(service, "Dispatch request throttled: {}", throttled);
            return Err(throttled);
        }
    }

    let mut results = Vec::with_capacity(inputs.len());
    for input in inputs {
        let result = match dispatch_one(&deps, service, input).await {
            Ok(id) => DispatchResult::created(id),
            Err(err) => err.into_result(),
        };
        results.push(result);
    }

    Ok(results)
}

struct ValidHost {
    name: String,
    inventory_id: Option<Uuid>,
}

fn validate(
    input: &RunInput,
    default_timeout: i32,
) -> Result<(i32, Vec<ValidHost>), DispatchError> {
    if input.url.trim().is_empty() {
        return Err(DispatchError::ValidationError(
            "url must not be empty".to_string(),
        ));
    }

    if input.org_id.trim().is_empty() {
        return Err(DispatchError::ValidationError(
            "org_id must not be empty".to_string(),
        ));
    }

    let org_id_len = input.org_id.chars().count();
    if org_id_len > MAX_ORG_ID_LEN {
        return Err(DispatchError::ValidationError(format!(
            "org_id must be at most {} characters, got {}",
            MAX_ORG_ID_LEN, org_id_len
        )));
    }

    let timeout = input.timeout.unwrap_or(default_timeout);
    if timeout < 0 {
        return Err(DispatchError::ValidationError(format!(
            "timeout must not be negative, got {}",
            timeout
        )));
    }

    let hosts = input
        .hosts
        .iter()
        .map(|host| {
            host.display_name()
                .map(|name| ValidHost {
                    name,
                    inventory_id: host.inventory_id,
                })
                .ok_or_else(|| {
                    DispatchError::ValidationError(
                        "host requires ansible_host or inventory_id".to_string(),
                    )
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok((timeout, hosts))
}

async fn dispatch_one(
    deps: &DispatchDeps<'_>,
    service: &str,
    input: RunInput,
) -> Result<Uuid, DispatchError> {
    let (timeout, hosts) = validate(&input, deps.default_timeout)?;
    let run_id = Uuid::new_v4();

    let message = RunMessage::playbook(
        input.org_id.clone(),
        input.recipient,
        run_id,
        input.url.clone(),
        timeout,
        hosts.iter().map(|h| h.name.clone()).collect(),
    );
    let correlation_id = deps.dispatcher.dispatch(&message).await?;

    let now = Utc::now();
    let run = Run {
        id: run_id,
        org_id: input.org_id,
        recipient: input.recipient,
        correlation_id,
        url: input.url,
        timeout,
        status: RunStatus::Running,
        labels: input.labels,
        service: service.to_string(),
        created_at: now,
        updated_at: now,
        satellite_id: input.satellite_id,
        satellite_org_id: input.satellite_org_id,
        name: input.name,
        web_console_url: input.web_console_url,
    };

    let hosts: Vec<RunHost> = hosts
        .into_iter()
        .map(|host| RunHost {
            id: Uuid::new_v4(),
            run_id,
            host: host.name,
            inventory_id: host.inventory_id,
            status: RunStatus::Running,
            stdout: None,
            created_at: now,
            updated_at: now,
        })
        .collect();

    deps.store.insert_run(&run, &hosts).await?;

    tracing::info!(
        run_id = %run.id,
        recipient = %run.recipient,
        %correlation_id,
        service,
        "Run dispatched"
    );

    Ok(run.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::fake::FakeDispatcher;
    use crate::repository::MemoryStore;
    use dispatcher_core::dto::run::HostInput;

    fn input(recipient: Uuid) -> RunInput {
        RunInput {
            recipient,
            org_id: "5318290".to_string(),
            url: "http://example.com/playbook.yml".to_string(),
            timeout: None,
            labels: Default::default(),
            hosts: vec![HostInput {
                ansible_host: Some("web-1".to_string()),
                inventory_id: None,
            }],
            name: None,
            web_console_url: None,
            satellite_id: None,
            satellite_org_id: None,
        }
    }

    fn deps<'a>(
        store: &'a MemoryStore,
        dispatcher: &'a FakeDispatcher,
        limiter: &'a AdmissionLimiter,
    ) -> DispatchDeps<'a> {
        DispatchDeps {
            store,
            dispatcher,
            limiter,
            max_wait: Duration::ZERO,
            default_timeout: 3600,
        }
    }

    #[tokio::test]
    async fn test_items_are_reported_independently() {
        let store = MemoryStore::new();
        let dispatcher = FakeDispatcher::default();
        let limiter = AdmissionLimiter::new(5, 5);

        let offline = Uuid::new_v4();
        let broken = Uuid::new_v4();
        dispatcher.disconnect(offline);
        dispatcher.break_recipient(broken);

        let mut negative = input(Uuid::new_v4());
        negative.timeout = Some(-1);

        let results = dispatch_runs(
            deps(&store, &dispatcher, &limiter),
            "remediations",
            vec![input(Uuid::new_v4()), input(offline), negative, input(broken)],
        )
        .await
        .unwrap();

        let codes: Vec<u16> = results.iter().map(|r| r.code).collect();
        assert_eq!(codes, vec![201, 404, 400, 500]);
        assert!(results[0].id.is_some());
        assert_eq!(store.run_count(), 1);
        assert_eq!(dispatcher.sent.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_created_run_carries_defaults() {
        let store = MemoryStore::new();
        let dispatcher = FakeDispatcher::default();
        let limiter = AdmissionLimiter::new(5, 5);

        let results = dispatch_runs(
            deps(&store, &dispatcher, &limiter),
            "remediations",
            vec![input(Uuid::new_v4())],
        )
        .await
        .unwrap();
        assert_eq!(results[0].code, 201);

        let sent = dispatcher.sent.lock();
        assert_eq!(sent[0].metadata.timeout, 3600);
        assert_eq!(sent[0].metadata.hosts, vec!["web-1".to_string()]);
        assert_eq!(Some(sent[0].metadata.run_id), results[0].id);
    }

    #[tokio::test]
    async fn test_empty_url_is_rejected_before_dispatch() {
        let store = MemoryStore::new();
        let dispatcher = FakeDispatcher::default();
        let limiter = AdmissionLimiter::new(5, 5);

        let mut blank = input(Uuid::new_v4());
        blank.url = "  ".to_string();

        let results = dispatch_runs(
            deps(&store, &dispatcher, &limiter),
            "remediations",
            vec![blank],
        )
        .await
        .unwrap();

        assert_eq!(results[0].code, 400);
        assert!(dispatcher.sent.lock().is_empty());
    }

    #[tokio::test]
    async fn test_org_id_wider_than_column_is_rejected_before_dispatch() {
        let store = MemoryStore::new();
        let dispatcher = FakeDispatcher::default();
        let limiter = AdmissionLimiter::new(5, 5);

        let mut widest = input(Uuid::new_v4());
        widest.org_id = "1234567890".to_string();
        let mut too_wide = input(Uuid::new_v4());
        too_wide.org_id = "12345678901".to_string();

        let results = dispatch_runs(
            deps(&store, &dispatcher, &limiter),
            "remediations",
            vec![widest, too_wide],
        )
        .await
        .unwrap();

        assert_eq!(results[0].code, 201);
        assert_eq!(results[1].code, 400);
        assert_eq!(results[1].id, None);
        let message = results[1].message.as_deref().unwrap_or_default();
        assert!(message.contains("org_id"));
        assert_eq!(store.run_count(), 1);
        assert_eq!(dispatcher.sent.lock().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_over_the_limit_is_throttled() {
        let store = MemoryStore::new();
        let dispatcher = FakeDispatcher::default();
        let limiter = AdmissionLimiter::new(1, 1);

        dispatch_runs(
            deps(&store, &dispatcher, &limiter),
            "remediations",
            Vec::new(),
        )
        .await
        .unwrap();

        let throttled = dispatch_runs(
            deps(&store, &dispatcher, &limiter),
            "remediations",
            Vec::new(),
        )
        .await
        .unwrap_err();
        assert!(throttled.retry_after > Duration::ZERO);

        // Other services keep their own budget
        dispatch_runs(
            deps(&store, &dispatcher, &limiter),
            "config-manager",
            Vec::new(),
        )
        .await
        .unwrap();
    }
}
