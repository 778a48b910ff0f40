//! Access control: the evaluator, the resource catalog it reads, and the
//! tree builder used for menus and resources.

pub mod catalog;
pub mod evaluator;
pub mod tree;

use thiserror::Error;

pub use catalog::{PgResourceCatalog, ResourceCatalog};
pub use evaluator::AccessEvaluator;
pub use tree::{Branch, TreeNode, TreeOption, build_tree, to_options};

/// Outcome of an access check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        self == Decision::Allow
    }
}

/// Errors raised while evaluating access.
///
/// A catalog failure is never reported as a denial.
#[derive(Debug, Error)]
pub enum AccessError {
    #[error("resource catalog unavailable")]
    CatalogUnavailable(#[source] anyhow::Error),
}

/// A (url, method) pair. Matching is exact and case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub url: String,
    pub method: String,
}

impl Endpoint {
    pub fn new(url: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: method.into(),
        }
    }
}
