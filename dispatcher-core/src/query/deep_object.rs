//! Deep-object parameter parser
//!
//! Decodes bracket-nested keys such as `filter[run][labels][env]=prod` into a
//! [`Tree`]. Only this module knows about brackets; swapping the wire syntax
//! means replacing this file.

use super::tree::{self, Tree};

/// Result of parsing all parameters under one root name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeepObject {
    pub tree: Tree,
    /// Keys that belong to the root but could not be parsed, in input order
    pub malformed: Vec<String>,
}

/// Parse every `root[...]` parameter into a tree
///
/// Keys that do not start with `root` are ignored. Keys that do but are not
/// well-formed bracket paths are dropped and reported in `malformed`; the
/// caller decides whether that is an error.
pub fn parse(params: &[(String, String)], root: &str) -> DeepObject {
    let mut parsed = DeepObject::default();

    for (key, value) in params {
        let Some(rest) = key.strip_prefix(root) else {
            continue;
        };
        if !rest.is_empty() && !rest.starts_with('[') {
            // A different parameter that merely shares the prefix
            continue;
        }

        let inserted = match segments(rest) {
            Some(path) => tree::insert(&mut parsed.tree, &path, value.clone()),
            None => false,
        };

        if !inserted {
            parsed.malformed.push(key.clone());
        }
    }

    parsed
}

/// Split `[a][b][c]` into `["a", "b", "c"]`
fn segments(mut rest: &str) -> Option<Vec<&str>> {
    let mut path = Vec::new();

    while !rest.is_empty() {
        let inner = rest.strip_prefix('[')?;
        let close = inner.find(']')?;
        let segment = &inner[..close];

        if segment.is_empty() || segment.contains('[') {
            return None;
        }

        path.push(segment);
        rest = &inner[close + 1..];
    }

    if path.is_empty() { None } else { Some(path) }
}
