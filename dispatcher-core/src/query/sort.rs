//! Sort order
//!
//! `sort_by=field[:asc|:desc]` picks the primary ordering. Listings always
//! break ties by id ascending so pagination is stable.

use std::cmp::Ordering;

use super::QueryError;
use crate::domain::run::{Run, RunHostWithRun};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Direction::Asc => ordering,
            Direction::Desc => ordering.reverse(),
        }
    }
}

/// A sortable field of a listable resource
pub trait SortKey: Copy + PartialEq + std::fmt::Debug + 'static {
    const KNOWN: &'static [(&'static str, Self)];

    /// Primary key used when the request has no `sort_by`
    const DEFAULT: Self;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort<K> {
    pub key: K,
    pub direction: Direction,
}

impl<K: SortKey> Default for Sort<K> {
    fn default() -> Self {
        Self {
            key: K::DEFAULT,
            direction: Direction::Desc,
        }
    }
}

impl<K: SortKey> Sort<K> {
    /// Parse a `sort_by` value; `None` yields the default order
    pub fn parse(raw: Option<&str>) -> Result<Self, QueryError> {
        let Some(raw) = raw else {
            return Ok(Self::default());
        };

        let (name, direction) = match raw.split_once(':') {
            Some((name, "asc")) => (name, Direction::Asc),
            Some((name, "desc")) => (name, Direction::Desc),
            Some(_) => {
                return Err(QueryError::InvalidParameter(format!(
                    "sort_by direction must be asc or desc, got '{}'",
                    raw
                )));
            }
            None => (raw, Direction::Asc),
        };

        let key = K::KNOWN
            .iter()
            .find(|(known, _)| *known == name)
            .map(|(_, key)| *key)
            .ok_or_else(|| {
                QueryError::InvalidParameter(format!("cannot sort by '{}'", name))
            })?;

        Ok(Self { key, direction })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunSortKey {
    CreatedAt,
    UpdatedAt,
    Timeout,
    Recipient,
    Service,
    Name,
}

impl SortKey for RunSortKey {
    const KNOWN: &'static [(&'static str, Self)] = &[
        ("created_at", RunSortKey::CreatedAt),
        ("updated_at", RunSortKey::UpdatedAt),
        ("timeout", RunSortKey::Timeout),
        ("recipient", RunSortKey::Recipient),
        ("service", RunSortKey::Service),
        ("name", RunSortKey::Name),
    ];

    const DEFAULT: Self = RunSortKey::CreatedAt;
}

impl Sort<RunSortKey> {
    /// Total order over runs: primary key in the requested direction, then id
    ///
    /// Missing values sort first in ascending order, matching the
    /// `NULLS FIRST` / `NULLS LAST` clauses the SQL store emits.
    pub fn compare(&self, a: &Run, b: &Run) -> Ordering {
        let primary = match self.key {
            RunSortKey::CreatedAt => a.created_at.cmp(&b.created_at),
            RunSortKey::UpdatedAt => a.updated_at.cmp(&b.updated_at),
            RunSortKey::Timeout => a.timeout.cmp(&b.timeout),
            RunSortKey::Recipient => a.recipient.cmp(&b.recipient),
            RunSortKey::Service => a.service.cmp(&b.service),
            RunSortKey::Name => a.name.cmp(&b.name),
        };

        self.direction.apply(primary).then_with(|| a.id.cmp(&b.id))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunHostSortKey {
    CreatedAt,
    UpdatedAt,
    Host,
    InventoryId,
}

impl SortKey for RunHostSortKey {
    const KNOWN: &'static [(&'static str, Self)] = &[
        ("created_at", RunHostSortKey::CreatedAt),
        ("updated_at", RunHostSortKey::UpdatedAt),
        ("host", RunHostSortKey::Host),
        ("inventory_id", RunHostSortKey::InventoryId),
    ];

    const DEFAULT: Self = RunHostSortKey::CreatedAt;
}

impl Sort<RunHostSortKey> {
    pub fn compare(&self, a: &RunHostWithRun, b: &RunHostWithRun) -> Ordering {
        let (a, b) = (&a.host, &b.host);
        let primary = match self.key {
            RunHostSortKey::CreatedAt => a.created_at.cmp(&b.created_at),
            RunHostSortKey::UpdatedAt => a.updated_at.cmp(&b.updated_at),
            RunHostSortKey::Host => a.host.cmp(&b.host),
            RunHostSortKey::InventoryId => a.inventory_id.cmp(&b.inventory_id),
        };

        self.direction.apply(primary).then_with(|| a.id.cmp(&b.id))
    }
}
