//! Offset pagination shared by every list endpoint.
//!
//! Pages are 1-based; `skip = (page - 1) * limit` and
//! `pages = ceil(total / limit)`.

use serde::Serialize;

/// A validated page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
}

impl Pagination {
    pub const DEFAULT_LIMIT: u32 = 20;
    pub const MAX_LIMIT: u32 = 50;

    /// Build a page request, clamping out-of-range values.
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit: limit.clamp(1, Self::MAX_LIMIT),
        }
    }

    /// Rows to skip.
    pub fn skip(&self) -> i64 {
        (self.page as i64 - 1) * self.limit as i64
    }

    /// Rows to take.
    pub fn take(&self) -> i64 {
        self.limit as i64
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(1, Self::DEFAULT_LIMIT)
    }
}

/// One page of results plus the total number of matching rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64) -> Self {
        Self { items, total }
    }

    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
        }
    }

    /// Cut the requested page out of a fully materialised, ordered list.
    pub fn from_vec(all: Vec<T>, pagination: Pagination) -> Self {
        let total = all.len() as i64;
        let items = all
            .into_iter()
            .skip(pagination.skip() as usize)
            .take(pagination.take() as usize)
            .collect();
        Self { items, total }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
        }
    }
}

/// `{total, page, limit, pages}` block attached to list responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageMeta {
    pub total: i64,
    pub page: u32,
    pub limit: u32,
    pub pages: i64,
}

impl PageMeta {
    pub fn new(pagination: Pagination, total: i64) -> Self {
        let limit = pagination.limit as i64;
        Self {
            total,
            page: pagination.page,
            limit: pagination.limit,
            pages: (total + limit - 1) / limit,
        }
    }
}
