//! Run domain types
//!
//! A run is one dispatch of a playbook to a recipient. Each run fans out to
//! zero or more run hosts, one per targeted system.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::status::{self, DisplayedStatus};

/// Free-form labels attached to a run
pub type Labels = BTreeMap<String, String>;

/// Playbook run record
///
/// Owned by the persistence layer; the query engine only reads and projects it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub id: Uuid,
    pub org_id: String,
    pub recipient: Uuid,
    pub correlation_id: Uuid,
    pub url: String,
    /// Seconds after `created_at` at which a still-running run is considered timed out
    pub timeout: i32,
    pub status: RunStatus,
    pub labels: Labels,
    /// Internal service that created the run
    pub service: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub satellite_id: Option<Uuid>,
    pub satellite_org_id: Option<String>,
    pub name: Option<String>,
    pub web_console_url: Option<String>,
}

impl Run {
    /// Status as shown to clients at instant `now`
    pub fn displayed_status(&self, now: DateTime<Utc>) -> DisplayedStatus {
        status::derive(self.status, self.created_at, self.timeout, now)
    }
}

/// Outcome of a run on a single host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunHost {
    pub id: Uuid,
    pub run_id: Uuid,
    pub host: String,
    pub inventory_id: Option<Uuid>,
    pub status: RunStatus,
    /// Captured playbook output for this host
    pub stdout: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A run host together with the run that owns it
///
/// The host's displayed status depends on the parent run's creation time and
/// timeout, so listings always carry both.
#[derive(Debug, Clone, PartialEq)]
pub struct RunHostWithRun {
    pub host: RunHost,
    pub run: Run,
}

impl RunHostWithRun {
    pub fn displayed_status(&self, now: DateTime<Utc>) -> DisplayedStatus {
        status::derive(self.host.status, self.run.created_at, self.run.timeout, now)
    }
}

/// Status persisted for runs and run hosts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Success,
    Failure,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Success => "success",
            RunStatus::Failure => "failure",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a stored status string is not one of the known values
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown run status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for RunStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(RunStatus::Running),
            "success" => Ok(RunStatus::Success),
            "failure" => Ok(RunStatus::Failure),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}
