//! Typed predicate AST for listing filters.
//!
//! A [`ListingFilter`] is a conjunction of [`Predicate`]s. The in-memory store
//! evaluates it directly; the MongoDB store translates the same value into a
//! query document, so both paths share one contract.

use crate::models::{Condition, Listing};

use super::criteria::Bounds;

/// String attributes a predicate can match against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextField {
    Make,
    Model,
    BodyType,
    FuelType,
    Transmission,
    City,
    State,
    Description,
}

impl TextField {
    /// Fields scanned by free-text search
    pub const SEARCHABLE: [TextField; 5] = [
        TextField::Make,
        TextField::Model,
        TextField::Description,
        TextField::City,
        TextField::State,
    ];

    pub fn value<'a>(&self, listing: &'a Listing) -> &'a str {
        match self {
            TextField::Make => &listing.make,
            TextField::Model => &listing.model,
            TextField::BodyType => &listing.body_type,
            TextField::FuelType => &listing.fuel_type,
            TextField::Transmission => &listing.transmission,
            TextField::City => &listing.location.city,
            TextField::State => &listing.location.state,
            TextField::Description => &listing.description,
        }
    }

    /// Document path of the field as stored
    #[cfg(any(test, feature = "mongodb"))]
    pub fn path(&self) -> &'static str {
        match self {
            TextField::Make => "make",
            TextField::Model => "model",
            TextField::BodyType => "bodyType",
            TextField::FuelType => "fuelType",
            TextField::Transmission => "transmission",
            TextField::City => "location.city",
            TextField::State => "location.state",
            TextField::Description => "description",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericField {
    Year,
    Price,
    Mileage,
}

impl NumericField {
    pub fn value(&self, listing: &Listing) -> u32 {
        match self {
            NumericField::Year => listing.year,
            NumericField::Price => listing.price,
            NumericField::Mileage => listing.mileage,
        }
    }

    #[cfg(any(test, feature = "mongodb"))]
    pub fn path(&self) -> &'static str {
        match self {
            NumericField::Year => "year",
            NumericField::Price => "price",
            NumericField::Mileage => "mileage",
        }
    }
}

/// One narrowing step. Needles and keywords are stored lowercase.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Field contains any of the needles (case-insensitive substring)
    AnyContains { field: TextField, needles: Vec<String> },
    /// Condition equals one of the listed values
    ConditionIn(Vec<Condition>),
    /// Inclusive numeric range
    Range { field: NumericField, bounds: Bounds },
    /// Every whitespace-separated keyword appears in at least one searchable field
    Text(String),
}

impl Predicate {
    pub fn matches(&self, listing: &Listing) -> bool {
        match self {
            Predicate::AnyContains { field, needles } => {
                let haystack = field.value(listing).to_lowercase();
                needles.iter().any(|needle| haystack.contains(needle.as_str()))
            }
            Predicate::ConditionIn(conditions) => conditions.contains(&listing.condition),
            Predicate::Range { field, bounds } => bounds.contains(field.value(listing)),
            Predicate::Text(query) => {
                let haystacks: Vec<String> = TextField::SEARCHABLE
                    .iter()
                    .map(|f| f.value(listing).to_lowercase())
                    .collect();
                keywords(query).all(|kw| haystacks.iter().any(|h| h.contains(kw)))
            }
        }
    }
}

pub fn keywords(query: &str) -> impl Iterator<Item = &str> {
    query.split_whitespace()
}

/// Conjunction of predicates. The empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingFilter {
    predicates: Vec<Predicate>,
}

impl ListingFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, predicate: Predicate) {
        self.predicates.push(predicate);
    }

    #[cfg(test)]
    pub fn and(mut self, predicate: Predicate) -> Self {
        self.push(predicate);
        self
    }

    #[cfg(any(test, feature = "mongodb"))]
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    #[cfg(any(test, feature = "mongodb"))]
    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn matches(&self, listing: &Listing) -> bool {
        self.predicates.iter().all(|p| p.matches(listing))
    }

    /// Returns the matching listings in source order. The source is untouched.
    pub fn apply(&self, listings: &[Listing]) -> Vec<Listing> {
        listings
            .iter()
            .filter(|listing| self.matches(listing))
            .cloned()
            .collect()
    }
}
