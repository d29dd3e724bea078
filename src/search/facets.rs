// Distinct-value breakdowns used to populate the filter UI

use std::collections::HashMap;

use serde::Serialize;

use crate::models::Listing;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacetValue {
    pub value: String, // lowercase token, usable as a filter value
    pub label: String, // original spelling, first one seen
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NumericRange {
    pub min: u32,
    pub max: u32,
}

// Ranges are null for an empty collection rather than a fake {0, 0}
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FacetSummary {
    pub makes: Vec<FacetValue>,
    pub models: Vec<FacetValue>,
    pub body_types: Vec<FacetValue>,
    pub fuel_types: Vec<FacetValue>,
    pub transmissions: Vec<FacetValue>,
    pub price_range: Option<NumericRange>,
    pub year_range: Option<NumericRange>,
}

#[derive(Default)]
struct Counter {
    entries: HashMap<String, (String, usize)>,
}

impl Counter {
    fn add(&mut self, raw: &str) {
        let entry = self
            .entries
            .entry(raw.to_lowercase())
            .or_insert_with(|| (raw.to_string(), 0));
        entry.1 += 1;
    }

    // Most frequent first, ties alphabetical so output is deterministic
    fn into_values(self) -> Vec<FacetValue> {
        let mut values: Vec<FacetValue> = self
            .entries
            .into_iter()
            .map(|(value, (label, count))| FacetValue { value, label, count })
            .collect();
        values.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
        values
    }
}

#[derive(Default)]
struct RangeTracker(Option<NumericRange>);

impl RangeTracker {
    fn add(&mut self, value: u32) {
        self.0 = Some(match self.0 {
            Some(r) => NumericRange {
                min: r.min.min(value),
                max: r.max.max(value),
            },
            None => NumericRange {
                min: value,
                max: value,
            },
        });
    }
}

/// Single read pass over whatever collection the caller scopes it to.
pub fn facets<'a, I>(listings: I) -> FacetSummary
where
    I: IntoIterator<Item = &'a Listing>,
{
    let mut makes = Counter::default();
    let mut models = Counter::default();
    let mut body_types = Counter::default();
    let mut fuel_types = Counter::default();
    let mut transmissions = Counter::default();
    let mut price = RangeTracker::default();
    let mut year = RangeTracker::default();

    for listing in listings {
        makes.add(&listing.make);
        models.add(&listing.model);
        body_types.add(&listing.body_type);
        fuel_types.add(&listing.fuel_type);
        transmissions.add(&listing.transmission);
        price.add(listing.price);
        year.add(listing.year);
    }

    FacetSummary {
        makes: makes.into_values(),
        models: models.into_values(),
        body_types: body_types.into_values(),
        fuel_types: fuel_types.into_values(),
        transmissions: transmissions.into_values(),
        price_range: price.0,
        year_range: year.0,
    }
}
