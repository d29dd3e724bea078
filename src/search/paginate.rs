//! Page slicing and metadata

use serde::Serialize;

use super::criteria::PageSpec;

/// Pagination metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    /// Current page number (starts at 1)
    pub page: u32,

    /// Number of items per page
    pub limit: u32,

    /// Total number of items (after filters)
    pub total: usize,

    /// Total number of pages, never less than 1
    pub total_pages: usize,

    pub has_next_page: bool,

    pub has_prev_page: bool,
}

impl PageMeta {
    pub fn new(spec: PageSpec, total: usize) -> Self {
        let total_pages = total.div_ceil(spec.limit() as usize).max(1);
        let page = spec.page();

        Self {
            page,
            limit: spec.limit(),
            total,
            total_pages,
            has_next_page: (page as usize) < total_pages,
            has_prev_page: page > 1,
        }
    }
}

/// Cuts one page out of an ordered collection. A page past the end is empty.
pub fn paginate<T>(items: Vec<T>, spec: PageSpec) -> (Vec<T>, PageMeta) {
    let meta = PageMeta::new(spec, items.len());
    let slice = items
        .into_iter()
        .skip(spec.offset())
        .take(spec.limit() as usize)
        .collect();
    (slice, meta)
}
