//! Displayed status derivation
//!
//! Runs are never written back as timed out. Instead the `timeout` status is
//! synthesized whenever a stored `running` row has outlived its timeout. Both
//! output projection and status filtering go through [`derive`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::run::RunStatus;

/// Status as reported to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayedStatus {
    Running,
    Success,
    Failure,
    Timeout,
}

impl DisplayedStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DisplayedStatus::Running => "running",
            DisplayedStatus::Success => "success",
            DisplayedStatus::Failure => "failure",
            DisplayedStatus::Timeout => "timeout",
        }
    }
}

impl From<RunStatus> for DisplayedStatus {
    fn from(status: RunStatus) -> Self {
        match status {
            RunStatus::Running => DisplayedStatus::Running,
            RunStatus::Success => DisplayedStatus::Success,
            RunStatus::Failure => DisplayedStatus::Failure,
        }
    }
}

impl fmt::Display for DisplayedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DisplayedStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(DisplayedStatus::Running),
            "success" => Ok(DisplayedStatus::Success),
            "failure" => Ok(DisplayedStatus::Failure),
            "timeout" => Ok(DisplayedStatus::Timeout),
            other => Err(format!("unknown status: {}", other)),
        }
    }
}

/// Instant at which a run created at `created_at` times out
pub fn deadline(created_at: DateTime<Utc>, timeout_seconds: i32) -> DateTime<Utc> {
    created_at + Duration::seconds(i64::from(timeout_seconds))
}

/// Derive the displayed status of a run (or one of its hosts)
///
/// `now` must be the instant the current request is being served at, sampled
/// once per request so every row on a page agrees.
pub fn derive(
    stored: RunStatus,
    created_at: DateTime<Utc>,
    timeout_seconds: i32,
    now: DateTime<Utc>,
) -> DisplayedStatus {
    if stored == RunStatus::Running && now >= deadline(created_at, timeout_seconds) {
        DisplayedStatus::Timeout
    } else {
        stored.into()
    }
}
