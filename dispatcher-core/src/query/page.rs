//! Pagination and navigation links

use url::form_urlencoded;

use super::QueryError;
use crate::dto::page::PageLinks;

pub const DEFAULT_LIMIT: i64 = 50;

/// Requested window `[offset, offset + limit)` of the ordered match set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageParams {
    pub limit: i64,
    pub offset: i64,
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

impl PageParams {
    /// Validate raw `limit` and `offset` parameters
    pub fn parse(limit: Option<&str>, offset: Option<&str>) -> Result<Self, QueryError> {
        let limit = match limit {
            Some(raw) => parse_integer("limit", raw)?,
            None => DEFAULT_LIMIT,
        };
        if limit <= 0 {
            return Err(QueryError::InvalidParameter(format!(
                "limit must be greater than 0, got {}",
                limit
            )));
        }

        let offset = match offset {
            Some(raw) => parse_integer("offset", raw)?,
            None => 0,
        };
        if offset < 0 {
            return Err(QueryError::InvalidParameter(format!(
                "offset must not be negative, got {}",
                offset
            )));
        }

        Ok(Self { limit, offset })
    }

    /// Offset of the last page for `total` matches
    pub fn last_offset(&self, total: i64) -> i64 {
        if total <= 0 {
            0
        } else {
            ((total - 1) / self.limit) * self.limit
        }
    }

    /// Apply the window to an already ordered, already filtered sequence
    pub fn slice<T>(&self, items: impl IntoIterator<Item = T>) -> Vec<T> {
        items
            .into_iter()
            .skip(usize::try_from(self.offset).unwrap_or(usize::MAX))
            .take(usize::try_from(self.limit).unwrap_or(usize::MAX))
            .collect()
    }
}

fn parse_integer(name: &str, raw: &str) -> Result<i64, QueryError> {
    raw.trim().parse::<i64>().map_err(|_| {
        QueryError::InvalidParameter(format!("{} must be an integer, got '{}'", name, raw))
    })
}

/// Build `first`/`last`/`next`/`previous` links for a page
///
/// Every parameter other than `limit` and `offset` is carried over. Parameters
/// are stably sorted by key, so two requests that differ only in parameter
/// order produce identical links while repeated values keep their order.
pub fn build_links(
    path: &str,
    params: &[(String, String)],
    page: PageParams,
    total: i64,
) -> PageLinks {
    let mut carried: Vec<&(String, String)> = params
        .iter()
        .filter(|(key, _)| key != "limit" && key != "offset")
        .collect();
    carried.sort_by(|a, b| a.0.cmp(&b.0));

    let link = |offset: i64| {
        let mut query = form_urlencoded::Serializer::new(String::new());
        for (key, value) in &carried {
            query.append_pair(key, value);
        }
        query.append_pair("limit", &page.limit.to_string());
        query.append_pair("offset", &offset.to_string());
        format!("{}?{}", path, query.finish())
    };

    // offset and limit are both caller supplied; their sum may not fit
    let next = page
        .offset
        .checked_add(page.limit)
        .filter(|next| *next < total);

    PageLinks {
        first: link(0),
        last: link(page.last_offset(total)),
        next: next.map(link),
        previous: (page.offset > 0).then(|| link(page.offset.saturating_sub(page.limit).max(0))),
    }
}
