//! Page envelope and pagination assembly.

use serde::{Deserialize, Serialize};

use crate::filter::PageRequest;

/// Paginated response body: `{data, hasMore, total, page, pageSize}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct PageEnvelope<T> {
    pub data: Vec<T>,
    pub has_more: bool,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

/// Whether the assembled envelope's `total` came from a count query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TotalKind {
    /// Count query succeeded.
    Exact,
    /// Count failed or was unavailable; `total` is a lower bound.
    LowerBound,
}

impl<T> PageEnvelope<T> {
    /// The empty first page for a request that could not be run.
    pub fn empty(page: PageRequest) -> Self {
        Self {
            data: Vec::new(),
            has_more: false,
            total: 0,
            page: page.page(),
            page_size: page.page_size(),
        }
    }

    /// Wrap a single-record lookup result.
    pub fn single(record: Option<T>) -> Self {
        let data: Vec<T> = record.into_iter().collect();
        let total = data.len() as u64;
        Self {
            data,
            has_more: false,
            total,
            page: 0,
            page_size: 1,
        }
    }

    /// Combine a page slice with the optional row count.
    ///
    /// The slice is truncated to the page size. With a known count,
    /// `has_more` is `(page + 1) * page_size < total`; otherwise it is true
    /// only for a full slice and `total` becomes the lower bound
    /// `page * page_size + data.len()`.
    pub fn assemble(mut data: Vec<T>, total: Option<u64>, page: PageRequest) -> (Self, TotalKind) {
        data.truncate(page.page_size() as usize);
        let (has_more, total, kind) = match total {
            Some(total) => (has_more(page, total), total, TotalKind::Exact),
            None => (
                data.len() == page.page_size() as usize,
                page.offset() + data.len() as u64,
                TotalKind::LowerBound,
            ),
        };
        (
            Self {
                data,
                has_more,
                total,
                page: page.page(),
                page_size: page.page_size(),
            },
            kind,
        )
    }

    /// Index of the page that follows this one, when there is one.
    pub fn next_page(&self) -> Option<u32> {
        self.has_more.then(|| self.page.saturating_add(1))
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// True when strictly more records exist beyond the end of `page`.
pub fn has_more(page: PageRequest, total: u64) -> bool {
    page.offset() + (page.page_size() as u64) < total
}
