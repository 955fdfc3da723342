//! Run dispatch DTOs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::run::Labels;

/// One run to dispatch, as submitted by an internal service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunInput {
    pub recipient: Uuid,
    pub org_id: String,
    pub url: String,
    /// Seconds; the server default applies when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<i32>,
    #[serde(default)]
    pub labels: Labels,
    #[serde(default)]
    pub hosts: Vec<HostInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_console_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub satellite_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub satellite_org_id: Option<String>,
}

/// A host targeted by a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ansible_host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inventory_id: Option<Uuid>,
}

impl HostInput {
    /// Name recorded for the host: the ansible host, else the inventory id
    pub fn display_name(&self) -> Option<String> {
        self.ansible_host
            .clone()
            .or_else(|| self.inventory_id.map(|id| id.to_string()))
    }
}

/// Per-item outcome of a dispatch request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchResult {
    /// HTTP-style status for this item (201, 400, 404, 500)
    pub code: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl DispatchResult {
    pub fn created(id: Uuid) -> Self {
        Self {
            code: 201,
            id: Some(id),
            message: None,
        }
    }

    pub fn error(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            id: None,
            message: Some(message.into()),
        }
    }
}
