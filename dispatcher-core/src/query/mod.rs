//! List-query engine
//!
//! Translates the query string of a list request into a validated
//! [`ListRequest`]: selected output fields, a compiled filter, a sort order
//! and a page window. Stores execute the result; nothing here touches I/O.

pub mod deep_object;
pub mod fields;
pub mod filter;
pub mod page;
pub mod sort;
pub mod tree;

use chrono::{DateTime, Utc};
use thiserror::Error;
use url::form_urlencoded;

use self::fields::Field;
use self::filter::{Filter, ResourceKind};
use self::page::PageParams;
use self::sort::{Sort, SortKey};

/// Client errors raised while interpreting a list request
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// Unrecognized field selection or filter key
    #[error("unknown field: {0}")]
    UnknownField(String),

    /// Bad limit, offset, sort token or filter value
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Decoded query string, in original order with repeats kept
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    pub fn parse(raw: &str) -> Self {
        let pairs = form_urlencoded::parse(raw.as_bytes()).into_owned();
        Self(pairs.collect())
    }

    /// First value for `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.0
    }
}

impl From<Vec<(String, String)>> for QueryParams {
    fn from(pairs: Vec<(String, String)>) -> Self {
        Self(pairs)
    }
}

/// A fully validated list request for one resource
#[derive(Debug, Clone, PartialEq)]
pub struct ListRequest<F, K> {
    pub fields: Vec<F>,
    pub filter: Filter,
    pub sort: Sort<K>,
    pub page: PageParams,
}

impl<F: Field, K: SortKey> ListRequest<F, K> {
    /// Validate every list parameter of a request
    ///
    /// Malformed `filter[...]`/`fields[...]` keys are rejected here rather than
    /// silently ignored.
    pub fn parse(params: &QueryParams, kind: ResourceKind) -> Result<Self, QueryError> {
        let filters = deep_object::parse(params.pairs(), "filter");
        let selection = deep_object::parse(params.pairs(), "fields");

        if let Some(key) = filters.malformed.first().or(selection.malformed.first()) {
            return Err(QueryError::InvalidParameter(format!(
                "malformed parameter: {}",
                key
            )));
        }

        Ok(Self {
            fields: fields::from_tree(&selection.tree)?,
            filter: filter::compile(&filters.tree, kind)?,
            sort: Sort::parse(params.get("sort_by"))?,
            page: PageParams::parse(params.get("limit"), params.get("offset"))?,
        })
    }

    /// Bind the request to a tenant and the instant it is served at
    pub fn into_query(self, org_id: impl Into<String>, now: DateTime<Utc>) -> ListQuery<K> {
        ListQuery {
            org_id: org_id.into(),
            filter: self.filter,
            sort: self.sort,
            page: self.page,
            now,
        }
    }
}

/// What a store needs to execute a listing
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery<K> {
    pub org_id: String,
    pub filter: Filter,
    pub sort: Sort<K>,
    pub page: PageParams,
    /// Fixed for the whole request; every status comparison uses it
    pub now: DateTime<Utc>,
}
