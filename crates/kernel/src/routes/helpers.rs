//! Shared route helpers: pagination, tree edit guards and client address.

use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};

use crate::access::TreeNode;
use crate::error::{AppError, AppResult};

/// Smallest page size handed out.
const MIN_PAGE_SIZE: i64 = 10;

/// Largest page size handed out.
const MAX_PAGE_SIZE: i64 = 100;

/// Pagination query parameters.
#[derive(Debug, Default, Clone, Copy, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub page_num: i64,
    #[serde(default)]
    pub page_size: i64,
}

impl PageQuery {
    /// Page number, at least 1.
    pub fn page_num(&self) -> i64 {
        self.page_num.max(1)
    }

    /// Page size clamped into `10..=100`.
    pub fn page_size(&self) -> i64 {
        self.page_size.clamp(MIN_PAGE_SIZE, MAX_PAGE_SIZE)
    }

    pub fn limit(&self) -> i64 {
        self.page_size()
    }

    /// Row offset of the page. Saturates instead of overflowing.
    pub fn offset(&self) -> i64 {
        (self.page_num() - 1).saturating_mul(self.page_size())
    }

    /// Wrap one page of rows.
    pub fn result<T>(&self, total: i64, page_data: Vec<T>) -> PageResult<T> {
        PageResult {
            page_num: self.page_num(),
            page_size: self.page_size(),
            total,
            page_data,
        }
    }
}

/// One page of a listing.
#[derive(Debug, Serialize)]
pub struct PageResult<T> {
    pub page_num: i64,
    pub page_size: i64,
    pub total: i64,
    pub page_data: Vec<T>,
}

/// `?keyword=` filter.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct KeywordQuery {
    pub keyword: Option<String>,
}

/// Body for mutations with nothing else to report.
#[derive(Debug, Serialize)]
pub struct Done {
    pub success: bool,
}

pub const DONE: Done = Done { success: true };

/// Check where a menu or resource may be placed.
///
/// `parent` is `None` for a root, `Some(None)` when the requested parent does
/// not exist. A parent must be a root other than the node itself, and a node
/// with children of its own cannot become a child.
pub fn check_placement<T: TreeNode>(
    kind: &str,
    id: Option<T::Id>,
    parent: Option<Option<&T>>,
    has_children: bool,
) -> AppResult<()> {
    let Some(parent) = parent else {
        return Ok(());
    };
    let parent =
        parent.ok_or_else(|| AppError::bad_request(format!("parent {kind} does not exist")))?;

    if parent.parent_id().is_some() || Some(parent.node_id()) == id {
        return Err(AppError::bad_request(format!(
            "parent must be a top-level {kind}"
        )));
    }

    if has_children {
        return Err(AppError::bad_request(format!(
            "{kind} with children cannot be placed under a parent"
        )));
    }

    Ok(())
}

/// Check that a menu or resource may be deleted.
pub fn check_removal(kind: &str, in_use: bool, exists: bool, has_children: bool) -> AppResult<()> {
    if in_use {
        return Err(AppError::conflict(format!("{kind} is granted to a role")));
    }
    if !exists {
        return Err(AppError::not_found(format!("{kind} not found")));
    }
    if has_children {
        return Err(AppError::conflict(format!("{kind} has children")));
    }
    Ok(())
}

/// Best-effort client IP from proxy headers.
pub fn client_ip(headers: &HeaderMap) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for")
        && let Ok(value) = forwarded.to_str()
        && let Some(ip) = value.split(',').next()
    {
        return ip.trim().to_string();
    }

    if let Some(real_ip) = headers.get("x-real-ip")
        && let Ok(value) = real_ip.to_str()
    {
        return value.trim().to_string();
    }

    String::new()
}
