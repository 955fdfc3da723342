//! Sparse fieldsets
//!
//! Clients pick output fields with `fields[data]=a,b` (or repeated
//! `fields[data]` parameters). Every requested name must be on the resource's
//! whitelist.

use super::QueryError;
use super::tree::Tree;

/// An output field of a listable resource
pub trait Field: Copy + PartialEq + std::fmt::Debug + 'static {
    /// Whitelist of wire names
    const KNOWN: &'static [(&'static str, Self)];

    /// Fields returned when the request does not select any
    const DEFAULTS: &'static [Self];

    fn name(self) -> &'static str {
        Self::KNOWN
            .iter()
            .find(|(_, field)| *field == self)
            .map(|(name, _)| *name)
            .unwrap_or("unknown")
    }
}

/// Validate a field selection against a whitelist
///
/// With no selection, `defaults` is returned unchanged. Otherwise each raw
/// token is split on `,` and every piece must be in `known`; the first
/// unknown name fails the whole selection. Output follows input order and
/// duplicates are kept.
pub fn select<F: Copy>(
    requested: Option<&[String]>,
    known: &[(&str, F)],
    defaults: &[F],
) -> Result<Vec<F>, QueryError> {
    let Some(requested) = requested else {
        return Ok(defaults.to_vec());
    };

    let mut selected = Vec::new();
    for token in requested.iter().flat_map(|raw| raw.split(',')) {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }

        let field = known
            .iter()
            .find(|(name, _)| *name == token)
            .map(|(_, field)| *field)
            .ok_or_else(|| QueryError::UnknownField(token.to_string()))?;
        selected.push(field);
    }

    Ok(selected)
}

/// Resolve the selection for `F` from the parsed `fields[...]` tree
pub fn from_tree<F: Field>(tree: &Tree) -> Result<Vec<F>, QueryError> {
    let mut requested = None;

    for (key, node) in tree {
        if key != "data" {
            return Err(QueryError::UnknownField(key.clone()));
        }
        requested = Some(node.expect_leaf("fields[data]")?);
    }

    select(requested, F::KNOWN, F::DEFAULTS)
}

/// Output fields of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunField {
    Id,
    OrgId,
    Recipient,
    CorrelationId,
    Url,
    Labels,
    Timeout,
    Status,
    Service,
    Name,
    WebConsoleUrl,
    SatelliteId,
    SatelliteOrgId,
    CreatedAt,
    UpdatedAt,
}

impl Field for RunField {
    const KNOWN: &'static [(&'static str, Self)] = &[
        ("id", RunField::Id),
        ("org_id", RunField::OrgId),
        ("recipient", RunField::Recipient),
        ("correlation_id", RunField::CorrelationId),
        ("url", RunField::Url),
        ("labels", RunField::Labels),
        ("timeout", RunField::Timeout),
        ("status", RunField::Status),
        ("service", RunField::Service),
        ("name", RunField::Name),
        ("web_console_url", RunField::WebConsoleUrl),
        ("satellite_id", RunField::SatelliteId),
        ("satellite_org_id", RunField::SatelliteOrgId),
        ("created_at", RunField::CreatedAt),
        ("updated_at", RunField::UpdatedAt),
    ];

    const DEFAULTS: &'static [Self] = &[
        RunField::Id,
        RunField::Recipient,
        RunField::Url,
        RunField::Labels,
        RunField::Timeout,
        RunField::Status,
    ];
}

/// Output fields of a run host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunHostField {
    Host,
    Run,
    Status,
    Stdout,
    InventoryId,
}

impl Field for RunHostField {
    const KNOWN: &'static [(&'static str, Self)] = &[
        ("host", RunHostField::Host),
        ("run", RunHostField::Run),
        ("status", RunHostField::Status),
        ("stdout", RunHostField::Stdout),
        ("inventory_id", RunHostField::InventoryId),
    ];

    const DEFAULTS: &'static [Self] = &[
        RunHostField::Host,
        RunHostField::Run,
        RunHostField::Status,
    ];
}
