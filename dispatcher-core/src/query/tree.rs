//! Parameter tree
//!
//! Wire-independent representation of nested query parameters. The bracket
//! parser in [`super::deep_object`] produces it; the field selector and filter
//! compiler only ever see this type.

use std::collections::BTreeMap;

use super::QueryError;

/// Children of a branch, keyed by segment name in sorted order
pub type Tree = BTreeMap<String, Node>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Raw values in order of appearance, duplicates kept
    Leaf(Vec<String>),
    Branch(Tree),
}

impl Node {
    /// Values of a leaf; `path` names the node in error messages
    pub fn expect_leaf(&self, path: &str) -> Result<&[String], QueryError> {
        match self {
            Node::Leaf(values) => Ok(values),
            Node::Branch(_) => Err(QueryError::InvalidParameter(format!(
                "{} expects a value, not an object",
                path
            ))),
        }
    }

    /// Children of a branch; `path` names the node in error messages
    pub fn expect_branch(&self, path: &str) -> Result<&Tree, QueryError> {
        match self {
            Node::Branch(children) => Ok(children),
            Node::Leaf(_) => Err(QueryError::InvalidParameter(format!(
                "{} expects an object, not a value",
                path
            ))),
        }
    }
}

/// Insert `value` at `path`, creating branches on the way
///
/// Returns `false` without modifying the tree when the path conflicts with
/// the shape already present (a leaf where a branch is needed or vice versa).
pub(crate) fn insert(tree: &mut Tree, path: &[&str], value: String) -> bool {
    let Some((head, rest)) = path.split_first() else {
        return false;
    };

    if rest.is_empty() {
        match tree
            .entry((*head).to_string())
            .or_insert_with(|| Node::Leaf(Vec::new()))
        {
            Node::Leaf(values) => {
                values.push(value);
                true
            }
            Node::Branch(_) => false,
        }
    } else {
        match tree
            .entry((*head).to_string())
            .or_insert_with(|| Node::Branch(Tree::new()))
        {
            Node::Branch(children) => insert(children, rest, value),
            Node::Leaf(_) => false,
        }
    }
}
