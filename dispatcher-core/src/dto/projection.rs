//! Sparse-fieldset projection
//!
//! Renders a row as a JSON object containing only the selected fields.
//! Displayed status is derived here with the same `now` the filter used.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value, json};

use crate::domain::run::{Run, RunHostWithRun};
use crate::query::fields::{Field, RunField, RunHostField};

pub fn project_run(run: &Run, fields: &[RunField], now: DateTime<Utc>) -> Map<String, Value> {
    let mut out = Map::new();

    for field in fields {
        let value = match field {
            RunField::Id => json!(run.id),
            RunField::OrgId => json!(run.org_id),
            RunField::Recipient => json!(run.recipient),
            RunField::CorrelationId => json!(run.correlation_id),
            RunField::Url => json!(run.url),
            RunField::Labels => json!(run.labels),
            RunField::Timeout => json!(run.timeout),
            RunField::Status => json!(run.displayed_status(now)),
            RunField::Service => json!(run.service),
            RunField::Name => json!(run.name),
            RunField::WebConsoleUrl => json!(run.web_console_url),
            RunField::SatelliteId => json!(run.satellite_id),
            RunField::SatelliteOrgId => json!(run.satellite_org_id),
            RunField::CreatedAt => json!(run.created_at),
            RunField::UpdatedAt => json!(run.updated_at),
        };
        out.insert(field.name().to_string(), value);
    }

    out
}

pub fn project_run_host(
    record: &RunHostWithRun,
    fields: &[RunHostField],
    now: DateTime<Utc>,
) -> Map<String, Value> {
    let mut out = Map::new();

    for field in fields {
        let value = match field {
            RunHostField::Host => json!(record.host.host),
            RunHostField::Run => json!({
                "id": record.run.id,
                "labels": record.run.labels,
                "service": record.run.service,
            }),
            RunHostField::Status => json!(record.displayed_status(now)),
            RunHostField::Stdout => json!(record.host.stdout),
            RunHostField::InventoryId => json!(record.host.inventory_id),
        };
        out.insert(field.name().to_string(), value);
    }

    out
}
