//! Playbook Dispatcher HTTP Client
//!
//! A typed client for the dispatcher API: listing runs and run hosts with the
//! deep-object query language, following pagination links, and dispatching
//! new runs from internal services.
//!
//! # Example
//!
//! ```no_run
//! use dispatcher_client::{DispatcherClient, ListQuery};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = DispatcherClient::new("http://localhost:8000").with_org_id("5318290");
//!
//!     let query = ListQuery::new()
//!         .filter("status", "timeout")
//!         .label("env", "prod")
//!         .fields(&["id", "status"])
//!         .limit(10);
//!
//!     let page = client.list_runs(&query).await?;
//!     println!("{} of {} runs", page.meta.count, page.meta.total);
//!     Ok(())
//! }
//! ```

pub mod error;
mod query;
mod runs;

// Re-export commonly used types
pub use dispatcher_core::dto::page::ListPage;
pub use dispatcher_core::dto::run::{DispatchResult, HostInput, RunInput};
pub use error::{ClientError, Result};
pub use query::ListQuery;

use reqwest::Client;
use serde::de::DeserializeOwned;

/// Header carrying the tenant on read requests
pub const ORG_ID_HEADER: &str = "x-org-id";
/// Header naming the internal service on dispatch requests
pub const SERVICE_HEADER: &str = "x-dispatcher-service";

/// HTTP client for the dispatcher API
#[derive(Debug, Clone)]
pub struct DispatcherClient {
    /// Base URL of the dispatcher (e.g., "http://localhost:8000")
    base_url: String,
    /// Tenant sent with listing requests
    org_id: Option<String>,
    /// HTTP client instance
    client: Client,
}

impl DispatcherClient {
    /// Create a new dispatcher client
    ///
    /// # Example
    /// ```
    /// use dispatcher_client::DispatcherClient;
    ///
    /// let client = DispatcherClient::new("http://localhost:8000");
    /// ```
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new dispatcher client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            org_id: None,
            client,
        }
    }

    /// Scope listing requests to a tenant
    pub fn with_org_id(mut self, org_id: impl Into<String>) -> Self {
        self.org_id = Some(org_id.into());
        self
    }

    /// Get the base URL of the dispatcher
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn org_id(&self) -> Result<&str> {
        self.org_id.as_deref().ok_or_else(|| {
            ClientError::InvalidRequest("listing requires an org id".to_string())
        })
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle an API response and deserialize JSON
    ///
    /// Error bodies carry `{"message": ...}`; when they don't, the raw text is
    /// used as the message.
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(
                status.as_u16(),
                error_message(&error_text),
            ));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message")?.as_str().map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = DispatcherClient::new("http://localhost:8000");
        assert_eq!(client.base_url(), "http://localhost:8000");
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = DispatcherClient::new("http://localhost:8000/");
        assert_eq!(client.base_url(), "http://localhost:8000");
    }

    #[test]
    fn test_listing_without_org_id_is_invalid() {
        let client = DispatcherClient::new("http://localhost:8000");
        assert!(matches!(
            client.org_id(),
            Err(ClientError::InvalidRequest(_))
        ));

        let client = client.with_org_id("5318290");
        assert_eq!(client.org_id().unwrap(), "5318290");
    }

    #[test]
    fn test_error_message_prefers_json_body() {
        assert_eq!(
            error_message(r#"{"message":"unknown field: salad"}"#),
            "unknown field: salad"
        );
        assert_eq!(error_message("Bad Gateway"), "Bad Gateway");
    }
}
