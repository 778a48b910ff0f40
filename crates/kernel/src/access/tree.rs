//! Two-level tree builder for menus and resources.
//!
//! Flat parent/child lists are folded into a forest of roots, each carrying
//! the children that name it as parent. Only one parent hop is inspected:
//! grandchildren are never nested, and children whose parent is not a root
//! are dropped.

use std::collections::HashMap;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

/// A record that can be placed in a two-level tree.
pub trait TreeNode {
    type Id: Copy + Eq + Hash;

    /// Identifier other nodes refer to as their parent.
    fn node_id(&self) -> Self::Id;

    /// Parent reference; `None` marks a root.
    fn parent_id(&self) -> Option<Self::Id>;
}

/// A node together with its ordered children.
///
/// Serializes as the node's own fields plus a `children` array that is
/// always present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Branch<T> {
    #[serde(flatten)]
    pub node: T,
    #[serde(default)]
    pub children: Vec<Branch<T>>,
}

impl<T> Branch<T> {
    /// A branch without children.
    pub fn leaf(node: T) -> Self {
        Self {
            node,
            children: Vec::new(),
        }
    }
}

/// Selector option: `{ key, label, children }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeOption<Id> {
    pub key: Id,
    pub label: String,
    #[serde(default)]
    pub children: Vec<TreeOption<Id>>,
}

/// Build an ordered forest of depth at most two.
///
/// Roots and each root's children are sorted by `order_key` ascending. The
/// sort is stable, so nodes with equal keys keep their input order.
pub fn build_tree<T, K, F>(flat: Vec<T>, order_key: F) -> Vec<Branch<T>>
where
    T: TreeNode,
    K: Ord,
    F: Fn(&T) -> K,
{
    let mut roots = Vec::new();
    let mut buckets: HashMap<T::Id, Vec<T>> = HashMap::new();

    for node in flat {
        match node.parent_id() {
            None => roots.push(node),
            Some(parent) => buckets.entry(parent).or_default().push(node),
        }
    }

    let mut forest: Vec<Branch<T>> = roots
        .into_iter()
        .map(|node| {
            let children = buckets
                .remove(&node.node_id())
                .unwrap_or_default()
                .into_iter()
                .map(Branch::leaf)
                .collect();
            Branch { node, children }
        })
        .collect();

    // Whatever is left in `buckets` has no root parent and is dropped.
    forest.sort_by(|a, b| order_key(&a.node).cmp(&order_key(&b.node)));
    for branch in &mut forest {
        branch
            .children
            .sort_by(|a, b| order_key(&a.node).cmp(&order_key(&b.node)));
    }

    forest
}

/// Project a forest into selector options.
pub fn to_options<T, L>(forest: &[Branch<T>], label: L) -> Vec<TreeOption<T::Id>>
where
    T: TreeNode,
    L: Fn(&T) -> String + Copy,
{
    forest
        .iter()
        .map(|branch| TreeOption {
            key: branch.node.node_id(),
            label: label(&branch.node),
            children: to_options(&branch.children, label),
        })
        .collect()
}
