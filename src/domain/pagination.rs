//! Page envelopes returned by list queries.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationMeta {
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl PaginationMeta {
    /// Metadata for a response that arrived without any: one page holding
    /// everything returned.
    ///
    /// `total` counts only the returned rows, so it under-reports whenever the
    /// server truncated the page without saying so.
    pub fn single_page(len: usize, requested_limit: Option<u64>) -> Self {
        let len = len as u64;
        Self {
            total: len,
            page: 1,
            limit: requested_limit.unwrap_or(len),
            has_next_page: false,
            has_prev_page: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub meta: PaginationMeta,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, meta: PaginationMeta) -> Self {
        Self { data, meta }
    }

    /// Convert every item, failing on the first item `convert` rejects.
    pub fn try_map<U, E>(self, mut convert: impl FnMut(T) -> Result<U, E>) -> Result<Page<U>, E> {
        let data = self
            .data
            .into_iter()
            .map(&mut convert)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page {
            data,
            meta: self.meta,
        })
    }
}
