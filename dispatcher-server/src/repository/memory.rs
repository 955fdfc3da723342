//! In-memory Run Store
//!
//! Evaluates compiled filters with `Filter::matches`, which applies the same
//! status derivation the SQL rendering mirrors.

use async_trait::async_trait;
use dispatcher_core::domain::run::{Run, RunHost, RunHostWithRun};
use dispatcher_core::query::ListQuery;
use dispatcher_core::query::sort::{RunHostSortKey, RunSortKey};
use parking_lot::RwLock;

use super::{Listing, RunStore};

#[derive(Default)]
pub struct MemoryStore {
    runs: RwLock<Vec<Run>>,
    hosts: RwLock<Vec<RunHost>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored runs across all tenants
    pub fn run_count(&self) -> usize {
        self.runs.read().len()
    }
}

#[async_trait]
impl RunStore for MemoryStore {
    async fn insert_run(&self, run: &Run, hosts: &[RunHost]) -> Result<(), sqlx::Error> {
        let mut runs = self.runs.write();
        let mut stored_hosts = self.hosts.write();
        runs.push(run.clone());
        stored_hosts.extend_from_slice(hosts);
        Ok(())
    }

    async fn list_runs(&self, query: &ListQuery<RunSortKey>) -> Result<Listing<Run>, sqlx::Error> {
        let runs = self.runs.read();

        let mut matched: Vec<Run> = runs
            .iter()
            .filter(|run| run.org_id == query.org_id)
            .filter(|run| query.filter.matches(run, None, query.now))
            .cloned()
            .collect();
        matched.sort_by(|a, b| query.sort.compare(a, b));

        Ok(Listing {
            total: matched.len() as i64,
            items: query.page.slice(matched),
        })
    }

    async fn list_run_hosts(
        &self,
        query: &ListQuery<RunHostSortKey>,
    ) -> Result<Listing<RunHostWithRun>, sqlx::Error> {
        let runs = self.runs.read();
        let hosts = self.hosts.read();

        let mut matched: Vec<RunHostWithRun> = hosts
            .iter()
            .filter_map(|host| {
                let run = runs
                    .iter()
                    .find(|run| run.id == host.run_id && run.org_id == query.org_id)?;
                query
                    .filter
                    .matches(run, Some(host), query.now)
                    .then(|| RunHostWithRun {
                        host: host.clone(),
                        run: run.clone(),
                    })
            })
            .collect();
        matched.sort_by(|a, b| query.sort.compare(a, b));

        Ok(Listing {
            total: matched.len() as i64,
            items: query.page.slice(matched),
        })
    }

    async fn ping(&self) -> Result<(), sqlx::Error> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use dispatcher_core::domain::run::{Labels, RunStatus};
    use dispatcher_core::query::filter::ResourceKind;
    use dispatcher_core::query::fields::{RunField, RunHostField};
    use dispatcher_core::query::{ListRequest, QueryParams};
    use uuid::Uuid;

    fn run(org_id: &str, created_ago: i64, status: RunStatus) -> Run {
        let created_at = Utc::now() - Duration::seconds(created_ago);
        Run {
            id: Uuid::new_v4(),
            org_id: org_id.to_string(),
            recipient: Uuid::new_v4(),
            correlation_id: Uuid::new_v4(),
            url: "http://example.com/playbook.yml".to_string(),
            timeout: 3600,
            status,
            labels: Labels::new(),
            service: "remediations".to_string(),
            created_at,
            updated_at: created_at,
            satellite_id: None,
            satellite_org_id: None,
            name: None,
            web_console_url: None,
        }
    }

    fn host(run: &Run, name: &str) -> RunHost {
        RunHost {
            id: Uuid::new_v4(),
            run_id: run.id,
            host: name.to_string(),
            inventory_id: None,
            status: run.status,
            stdout: None,
            created_at: run.created_at,
            updated_at: run.updated_at,
        }
    }

    fn run_query(raw: &str, org_id: &str) -> ListQuery<RunSortKey> {
        ListRequest::<RunField, RunSortKey>::parse(&QueryParams::parse(raw), ResourceKind::Run)
            .unwrap()
            .into_query(org_id, Utc::now())
    }

    fn host_query(raw: &str, org_id: &str) -> ListQuery<RunHostSortKey> {
        ListRequest::<RunHostField, RunHostSortKey>::parse(
            &QueryParams::parse(raw),
            ResourceKind::RunHost,
        )
        .unwrap()
        .into_query(org_id, Utc::now())
    }

    #[tokio::test]
    async fn test_listing_is_tenant_scoped() {
        let store = MemoryStore::new();
        store
            .insert_run(&run("1", 10, RunStatus::Running), &[])
            .await
            .unwrap();
        store
            .insert_run(&run("2", 10, RunStatus::Running), &[])
            .await
            .unwrap();

        let listing = store.list_runs(&run_query("", "1")).await.unwrap();
        assert_eq!(listing.total, 1);
        assert_eq!(listing.items[0].org_id, "1");
    }

    #[tokio::test]
    async fn test_timeout_filter_uses_derived_status() {
        let store = MemoryStore::new();
        let expired = run("1", 3601, RunStatus::Running);
        store.insert_run(&expired, &[]).await.unwrap();
        store
            .insert_run(&run("1", 3599, RunStatus::Running), &[])
            .await
            .unwrap();

        let listing = store
            .list_runs(&run_query("filter[status]=timeout", "1"))
            .await
            .unwrap();
        assert_eq!(listing.total, 1);
        assert_eq!(listing.items[0].id, expired.id);

        let listing = store
            .list_runs(&run_query("filter[status]=running", "1"))
            .await
            .unwrap();
        assert_eq!(listing.total, 1);
        assert_ne!(listing.items[0].id, expired.id);
    }

    #[tokio::test]
    async fn test_total_counts_rows_beyond_the_page() {
        let store = MemoryStore::new();
        for i in 0..12 {
            store
                .insert_run(&run("1", i, RunStatus::Success), &[])
                .await
                .unwrap();
        }

        let listing = store
            .list_runs(&run_query("limit=5&offset=10", "1"))
            .await
            .unwrap();
        assert_eq!(listing.total, 12);
        assert_eq!(listing.items.len(), 2);
    }

    #[tokio::test]
    async fn test_run_hosts_are_joined_with_their_run() {
        let store = MemoryStore::new();
        let parent = run("1", 10, RunStatus::Running);
        let other = run("1", 10, RunStatus::Running);
        store
            .insert_run(&parent, &[host(&parent, "web-1"), host(&parent, "web-2")])
            .await
            .unwrap();
        store
            .insert_run(&other, &[host(&other, "db-1")])
            .await
            .unwrap();

        let listing = store
            .list_run_hosts(&host_query(
                &format!("filter[run][id]={}&sort_by=host:asc", parent.id),
                "1",
            ))
            .await
            .unwrap();

        assert_eq!(listing.total, 2);
        let names: Vec<&str> = listing.items.iter().map(|h| h.host.host.as_str()).collect();
        assert_eq!(names, vec!["web-1", "web-2"]);
        assert!(listing.items.iter().all(|h| h.run.id == parent.id));
    }

    #[tokio::test]
    async fn test_run_hosts_of_other_tenants_are_hidden() {
        let store = MemoryStore::new();
        let foreign = run("2", 10, RunStatus::Running);
        store
            .insert_run(&foreign, &[host(&foreign, "web-1")])
            .await
            .unwrap();

        let listing = store.list_run_hosts(&host_query("", "1")).await.unwrap();
        assert_eq!(listing.total, 0);
        assert!(listing.items.is_empty());
    }
}
