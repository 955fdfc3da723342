//! List response DTOs

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One page of a listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListPage {
    /// Projected items; only the selected fields are present
    pub data: Vec<Map<String, Value>>,
    pub meta: PageMeta,
    pub links: PageLinks,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    /// Items on this page
    pub count: i64,
    /// Items matching the filter before pagination
    pub total: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLinks {
    pub first: String,
    pub last: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<String>,
}
