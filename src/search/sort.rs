// Ordering of a filtered listing set

use std::cmp::Ordering;

use crate::models::Listing;

use super::criteria::{SortKey, SortOrder};

fn compare(a: &Listing, b: &Listing, key: SortKey) -> Ordering {
    match key {
        SortKey::Price => a.price.cmp(&b.price),
        SortKey::Year => a.year.cmp(&b.year),
        SortKey::Mileage => a.mileage.cmp(&b.mileage),
        SortKey::Score => a.arbitrage_score.total_cmp(&b.arbitrage_score),
        SortKey::CreatedAt => a.created_at.cmp(&b.created_at),
    }
}

/// Sorts in place. `sort_by` is stable, so equal keys keep their incoming order.
pub fn sort(listings: &mut [Listing], key: SortKey, order: SortOrder) {
    match order {
        SortOrder::Asc => listings.sort_by(|a, b| compare(a, b, key)),
        SortOrder::Desc => listings.sort_by(|a, b| compare(b, a, key)),
    }
}
