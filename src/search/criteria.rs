//! Typed search criteria, parsed from the raw query-string bag.
//!
//! Everything that can be wrong with a request is caught here, so the rest of
//! the engine only deals with well-typed values and never coerces strings.

use thiserror::Error;

use crate::models::{Condition, SearchParams};

use super::filter::{ListingFilter, NumericField, Predicate, TextField};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PAGE_SIZE: u32 = 12;
pub const MAX_PAGE_SIZE: u32 = 50;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CriteriaError {
    #[error("'{field}' must be a whole number, got '{value}'")]
    InvalidNumber { field: &'static str, value: String },
    #[error("unknown sortOrder '{0}', expected asc or desc")]
    InvalidSortOrder(String),
    #[error("unknown condition '{0}', expected new, used or certified")]
    InvalidCondition(String),
    #[error("page must be at least 1")]
    PageOutOfRange,
    #[error("limit must be between 1 and {}", MAX_PAGE_SIZE)]
    LimitOutOfRange,
}

/// Inclusive numeric bounds. `None` on either side means unconstrained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Bounds {
    pub min: Option<u32>,
    pub max: Option<u32>,
}

impl Bounds {
    pub fn new(min: Option<u32>, max: Option<u32>) -> Self {
        Self { min, max }
    }

    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    pub fn contains(&self, value: u32) -> bool {
        self.min.is_none_or(|min| value >= min) && self.max.is_none_or(|max| value <= max)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    Price,
    Year,
    Mileage,
    #[default]
    Score,
    CreatedAt,
}

impl SortKey {
    /// Unknown keys fall back to the score ordering
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "price" => SortKey::Price,
            "year" => SortKey::Year,
            "mileage" => SortKey::Mileage,
            "createdAt" => SortKey::CreatedAt,
            _ => SortKey::Score,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Some(SortOrder::Asc),
            "desc" | "descending" => Some(SortOrder::Desc),
            _ => None,
        }
    }
}

/// A validated page request: `page >= 1`, `1 <= limit <= MAX_PAGE_SIZE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSpec {
    page: u32,
    limit: u32,
}

impl PageSpec {
    pub fn new(page: u32, limit: u32) -> Result<Self, CriteriaError> {
        if page < 1 {
            return Err(CriteriaError::PageOutOfRange);
        }
        if !(1..=MAX_PAGE_SIZE).contains(&limit) {
            return Err(CriteriaError::LimitOutOfRange);
        }
        Ok(Self { page, limit })
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn offset(&self) -> usize {
        (self.page as usize - 1) * self.limit as usize
    }
}

impl Default for PageSpec {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

/// The normalized, typed form of a caller's search request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchCriteria {
    pub query: Option<String>,
    pub makes: Vec<String>,
    pub models: Vec<String>,
    pub conditions: Vec<Condition>,
    pub body_types: Vec<String>,
    pub fuel_types: Vec<String>,
    pub transmissions: Vec<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub year: Bounds,
    pub price: Bounds,
    pub mileage: Bounds,
    pub sort_key: SortKey,
    pub sort_order: SortOrder,
    pub page: PageSpec,
}

impl SearchCriteria {
    /// Compiles the criteria into the predicate list shared by every store.
    /// Predicates are added in a fixed order; absent criteria add nothing.
    pub fn filter(&self) -> ListingFilter {
        let mut filter = ListingFilter::new();

        if let Some(query) = &self.query {
            filter.push(Predicate::Text(query.clone()));
        }
        for (field, needles) in [
            (TextField::Make, &self.makes),
            (TextField::Model, &self.models),
        ] {
            if !needles.is_empty() {
                filter.push(Predicate::AnyContains {
                    field,
                    needles: needles.clone(),
                });
            }
        }
        for (field, bounds) in [
            (NumericField::Year, self.year),
            (NumericField::Price, self.price),
            (NumericField::Mileage, self.mileage),
        ] {
            if !bounds.is_unbounded() {
                filter.push(Predicate::Range { field, bounds });
            }
        }
        if !self.conditions.is_empty() {
            filter.push(Predicate::ConditionIn(self.conditions.clone()));
        }
        for (field, needles) in [
            (TextField::BodyType, &self.body_types),
            (TextField::FuelType, &self.fuel_types),
            (TextField::Transmission, &self.transmissions),
        ] {
            if !needles.is_empty() {
                filter.push(Predicate::AnyContains {
                    field,
                    needles: needles.clone(),
                });
            }
        }
        for (field, needle) in [
            (TextField::City, &self.city),
            (TextField::State, &self.state),
        ] {
            if let Some(needle) = needle {
                filter.push(Predicate::AnyContains {
                    field,
                    needles: vec![needle.clone()],
                });
            }
        }

        filter
    }
}

impl TryFrom<&SearchParams> for SearchCriteria {
    type Error = CriteriaError;

    fn try_from(params: &SearchParams) -> Result<Self, Self::Error> {
        let conditions = split_list(params.condition.as_deref())
            .into_iter()
            .map(|raw| Condition::parse(&raw).ok_or(CriteriaError::InvalidCondition(raw)))
            .collect::<Result<Vec<_>, _>>()?;

        let sort_key = non_empty(params.sort_by.as_deref())
            .map(SortKey::parse)
            .unwrap_or_default();
        let sort_order = match non_empty(params.sort_order.as_deref()) {
            Some(raw) => SortOrder::parse(raw)
                .ok_or_else(|| CriteriaError::InvalidSortOrder(raw.to_string()))?,
            None => SortOrder::default(),
        };

        let page = parse_number("page", params.page.as_deref())?.unwrap_or(DEFAULT_PAGE);
        let limit = parse_number("limit", params.limit.as_deref())?.unwrap_or(DEFAULT_PAGE_SIZE);

        Ok(SearchCriteria {
            query: non_empty(params.query.as_deref()).map(str::to_lowercase),
            makes: split_list(params.make.as_deref()),
            models: split_list(params.model.as_deref()),
            conditions,
            body_types: split_list(params.body_type.as_deref()),
            fuel_types: split_list(params.fuel_type.as_deref()),
            transmissions: split_list(params.transmission.as_deref()),
            city: non_empty(params.city.as_deref()).map(str::to_lowercase),
            state: non_empty(params.state.as_deref()).map(str::to_lowercase),
            year: Bounds::new(
                parse_bound("yearMin", params.year_min.as_deref())?,
                parse_bound("yearMax", params.year_max.as_deref())?,
            ),
            price: Bounds::new(
                parse_bound("priceMin", params.price_min.as_deref())?,
                parse_bound("priceMax", params.price_max.as_deref())?,
            ),
            mileage: Bounds::new(
                parse_bound("mileageMin", params.mileage_min.as_deref())?,
                parse_bound("mileageMax", params.mileage_max.as_deref())?,
            ),
            sort_key,
            sort_order,
            page: PageSpec::new(page, limit)?,
        })
    }
}

fn non_empty(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

// "Toyota, honda,," -> ["toyota", "honda"]
fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(|part| part.trim().to_lowercase())
            .filter(|part| !part.is_empty())
            .collect()
    })
    .unwrap_or_default()
}

fn parse_number(field: &'static str, raw: Option<&str>) -> Result<Option<u32>, CriteriaError> {
    non_empty(raw)
        .map(|s| {
            s.parse::<u32>().map_err(|_| CriteriaError::InvalidNumber {
                field,
                value: s.to_string(),
            })
        })
        .transpose()
}

// A zero bound is "not specified", never a literal zero constraint
fn parse_bound(field: &'static str, raw: Option<&str>) -> Result<Option<u32>, CriteriaError> {
    Ok(parse_number(field, raw)?.filter(|&n| n > 0))
}
