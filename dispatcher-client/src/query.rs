//! Builder for list query strings

use url::form_urlencoded;

/// Query parameters for a listing, in deep-object form
///
/// ```
/// use dispatcher_client::ListQuery;
///
/// let query = ListQuery::new().filter("status", "running").limit(5);
/// assert_eq!(query.to_query_string(), "filter%5Bstatus%5D=running&limit=5");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    params: Vec<(String, String)>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// `filter[key]=value`; nested keys use dots, e.g. `run.id`
    pub fn filter(mut self, key: &str, value: impl Into<String>) -> Self {
        let path: String = key
            .split('.')
            .map(|segment| format!("[{}]", segment))
            .collect();
        self.params.push((format!("filter{}", path), value.into()));
        self
    }

    /// `filter[labels][key]=value`
    pub fn label(self, key: &str, value: impl Into<String>) -> Self {
        self.filter(&format!("labels.{}", key), value)
    }

    /// `fields[data]=a,b,c`
    pub fn fields(mut self, fields: &[&str]) -> Self {
        self.params
            .push(("fields[data]".to_string(), fields.join(",")));
        self
    }

    /// `sort_by=field` or `sort_by=field:asc|desc`
    pub fn sort_by(mut self, sort: impl Into<String>) -> Self {
        self.params.push(("sort_by".to_string(), sort.into()));
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.params.push(("limit".to_string(), limit.to_string()));
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.params.push(("offset".to_string(), offset.to_string()));
        self
    }

    pub fn to_query_string(&self) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        for (key, value) in &self.params {
            query.append_pair(key, value);
        }
        query.finish()
    }
}
