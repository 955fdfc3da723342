//! Cloud Connector
//!
//! Delivers run messages to recipients. The [`Dispatcher`] trait lets the
//! dispatch service be exercised without a connector running.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Directive telling the recipient's worker to run a playbook
const PLAYBOOK_DIRECTIVE: &str = "rhc-worker-playbook";

/// Message sent to a recipient to start a run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunMessage {
    pub org_id: String,
    pub recipient: Uuid,
    pub directive: &'static str,
    /// URL the recipient fetches the playbook from
    pub payload: String,
    pub metadata: RunMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunMetadata {
    pub run_id: Uuid,
    pub timeout: i32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub hosts: Vec<String>,
}

impl RunMessage {
    pub fn playbook(
        org_id: impl Into<String>,
        recipient: Uuid,
        run_id: Uuid,
        url: impl Into<String>,
        timeout: i32,
        hosts: Vec<String>,
    ) -> Self {
        Self {
            org_id: org_id.into(),
            recipient,
            directive: PLAYBOOK_DIRECTIVE,
            payload: url.into(),
            metadata: RunMetadata {
                run_id,
                timeout,
                hosts,
            },
        }
    }
}

#[derive(Debug)]
pub enum ConnectorError {
    /// The recipient is not connected
    RecipientNotFound(Uuid),
    Failed(String),
}

impl std::fmt::Display for ConnectorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectorError::RecipientNotFound(id) => write!(f, "recipient {} not found", id),
            ConnectorError::Failed(msg) => write!(f, "dispatch failed: {}", msg),
        }
    }
}

#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Send a message and return the correlation id of the delivery
    async fn dispatch(&self, message: &RunMessage) -> Result<Uuid, ConnectorError>;
}

#[derive(Deserialize)]
struct ConnectorResponse {
    id: Uuid,
}

/// Dispatcher backed by the cloud connector HTTP API
#[derive(Debug, Clone)]
pub struct ConnectorDispatcher {
    base_url: String,
    client: Client,
}

impl ConnectorDispatcher {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    fn message_url(&self) -> String {
        format!("{}/api/cloud-connector/v1/message", self.base_url)
    }
}

#[async_trait]
impl Dispatcher for ConnectorDispatcher {
    async fn dispatch(&self, message: &RunMessage) -> Result<Uuid, ConnectorError> {
        let response = self
            .client
            .post(self.message_url())
            .json(message)
            .send()
            .await
            .map_err(|e| ConnectorError::Failed(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ConnectorError::RecipientNotFound(message.recipient));
        }

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ConnectorError::Failed(format!(
                "status {}: {}",
                status, body
            )));
        }

        let body: ConnectorResponse = response
            .json()
            .await
            .map_err(|e| ConnectorError::Failed(format!("invalid connector response: {}", e)))?;

        Ok(body.id)
    }
}
