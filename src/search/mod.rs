//! Vehicle search engine: filter → facets → sort → paginate.
//!
//! Every function here is pure and synchronous. The caller fetches a snapshot
//! from a [`ListingStore`](crate::store::ListingStore) first; nothing in this
//! module does I/O or touches shared state.

pub mod criteria;
pub mod facets;
pub mod filter;
pub mod paginate;
pub mod sort;
pub mod suggest;

use serde::Serialize;

use crate::models::Listing;

pub use criteria::{CriteriaError, SearchCriteria};
pub use facets::{FacetSummary, facets};
pub use filter::ListingFilter;
pub use paginate::PageMeta;

/// Composite result of one search request
#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub vehicles: Vec<Listing>,
    #[serde(flatten)]
    pub meta: PageMeta,
    pub filters: FacetSummary,
}

/// Runs the pipeline over a snapshot that has already been narrowed by
/// `criteria.filter()`. Facets are scoped to that same snapshot.
pub fn execute(mut matched: Vec<Listing>, criteria: &SearchCriteria) -> SearchResponse {
    let filters = facets(&matched);
    sort::sort(&mut matched, criteria.sort_key, criteria.sort_order);
    let (vehicles, meta) = paginate::paginate(matched, criteria.page);

    tracing::debug!(
        total = meta.total,
        page = meta.page,
        returned = vehicles.len(),
        "search pipeline finished"
    );

    SearchResponse {
        vehicles,
        meta,
        filters,
    }
}

/// Filters `listings` and runs the full pipeline. The source slice is not modified.
#[cfg(test)]
pub fn search(listings: &[Listing], criteria: &SearchCriteria) -> SearchResponse {
    execute(criteria.filter().apply(listings), criteria)
}
