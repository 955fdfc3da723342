//! Run-related API endpoints

use crate::DispatcherClient;
use crate::error::{ClientError, Result};
use crate::query::ListQuery;
use crate::{ORG_ID_HEADER, SERVICE_HEADER};
use dispatcher_core::dto::page::ListPage;
use dispatcher_core::dto::run::{DispatchResult, RunInput};

const RUNS_PATH: &str = "/api/playbook-dispatcher/v1/runs";
const RUN_HOSTS_PATH: &str = "/api/playbook-dispatcher/v1/run_hosts";

impl DispatcherClient {
    // =============================================================================
    // Listings
    // =============================================================================

    /// List runs of the client's tenant
    pub async fn list_runs(&self, query: &ListQuery) -> Result<ListPage> {
        self.get_page(&self.list_url(RUNS_PATH, query)).await
    }

    /// List run hosts of the client's tenant
    pub async fn list_run_hosts(&self, query: &ListQuery) -> Result<ListPage> {
        self.get_page(&self.list_url(RUN_HOSTS_PATH, query)).await
    }

    /// Fetch the page after `page`, if there is one
    ///
    /// Links are relative to the dispatcher root and already carry every
    /// parameter of the original request.
    pub async fn next_page(&self, page: &ListPage) -> Result<Option<ListPage>> {
        match &page.links.next {
            Some(next) => {
                let url = format!("{}{}", self.base_url, next);
                self.get_page(&url).await.map(Some)
            }
            None => Ok(None),
        }
    }

    /// Fetch every page of a run listing
    pub async fn list_all_runs(&self, query: &ListQuery) -> Result<Vec<ListPage>> {
        let mut pages = Vec::new();
        let mut page = self.list_runs(query).await?;

        loop {
            let next = self.next_page(&page).await?;
            pages.push(page);
            match next {
                Some(following) => page = following,
                None => return Ok(pages),
            }
        }
    }

    fn list_url(&self, path: &str, query: &ListQuery) -> String {
        let query = query.to_query_string();
        if query.is_empty() {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}{}?{}", self.base_url, path, query)
        }
    }

    async fn get_page(&self, url: &str) -> Result<ListPage> {
        tracing::debug!(url, "Fetching page");
        let response = self
            .client
            .get(url)
            .header(ORG_ID_HEADER, self.org_id()?)
            .send()
            .await?;

        self.handle_response(response).await
    }

    // =============================================================================
    // Dispatch (internal services)
    // =============================================================================

    /// Dispatch runs on behalf of `service`
    ///
    /// # Returns
    /// One result per input, in order. Items fail independently, so check each
    /// `code`; the call itself only fails when the whole request is rejected.
    pub async fn dispatch(&self, service: &str, runs: &[RunInput]) -> Result<Vec<DispatchResult>> {
        if service.trim().is_empty() {
            return Err(ClientError::InvalidRequest(
                "service name must not be empty".to_string(),
            ));
        }

        let url = format!("{}/internal/dispatch", self.base_url);
        let response = self
            .client
            .post(&url)
            .header(SERVICE_HEADER, service)
            .json(runs)
            .send()
            .await?;

        self.handle_response(response).await
    }
}
