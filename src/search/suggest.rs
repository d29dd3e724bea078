// Autocomplete over makes and models

use std::cmp::Reverse;
use std::collections::HashMap;

use serde::Serialize;

use crate::models::Listing;

pub const DEFAULT_SUGGESTION_LIMIT: usize = 8;
pub const MAX_SUGGESTION_LIMIT: usize = 20;
const MIN_QUERY_CHARS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionKind {
    Make,
    Model,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    pub value: String,
    pub label: String,
    pub kind: SuggestionKind,
    pub count: usize, // popularity: number of listings behind this entry
}

/// One entry per distinct make and per distinct make + model pair.
pub fn suggestion_source(listings: &[Listing]) -> Vec<Suggestion> {
    let mut makes: HashMap<String, (String, usize)> = HashMap::new();
    let mut models: HashMap<(String, String), (String, usize)> = HashMap::new();

    for listing in listings {
        let make_key = listing.make.to_lowercase();
        makes
            .entry(make_key.clone())
            .or_insert_with(|| (listing.make.clone(), 0))
            .1 += 1;
        models
            .entry((make_key, listing.model.to_lowercase()))
            .or_insert_with(|| (format!("{} {}", listing.make, listing.model), 0))
            .1 += 1;
    }

    let mut source: Vec<Suggestion> = makes
        .into_iter()
        .map(|(value, (label, count))| Suggestion {
            value,
            label,
            kind: SuggestionKind::Make,
            count,
        })
        .chain(
            models
                .into_iter()
                .map(|((_, model), (label, count))| Suggestion {
                    value: model,
                    label,
                    kind: SuggestionKind::Model,
                    count,
                }),
        )
        .collect();
    source.sort_by(|a, b| a.label.cmp(&b.label));
    source
}

/// Ranks by earliest match position in either `value` or `label`, then by
/// popularity. Queries under two characters return nothing.
pub fn suggest(query: &str, source: &[Suggestion], limit: usize) -> Vec<Suggestion> {
    let query = query.trim().to_lowercase();
    if query.chars().count() < MIN_QUERY_CHARS {
        return Vec::new();
    }

    let mut ranked: Vec<(usize, &Suggestion)> = source
        .iter()
        .filter_map(|s| {
            let in_value = s.value.to_lowercase().find(&query);
            let in_label = s.label.to_lowercase().find(&query);
            in_value.into_iter().chain(in_label).min().map(|pos| (pos, s))
        })
        .collect();
    ranked.sort_by_key(|(pos, s)| (*pos, Reverse(s.count)));

    ranked
        .into_iter()
        .take(limit)
        .map(|(_, s)| s.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::seed::demo_listings;

    fn entry(value: &str, label: &str, count: usize) -> Suggestion {
        Suggestion {
            value: value.into(),
            label: label.into(),
            kind: SuggestionKind::Model,
            count,
        }
    }

    #[test]
    fn short_queries_return_nothing() {
        let source = suggestion_source(&demo_listings());
        assert!(suggest("", &source, 8).is_empty());
        assert!(suggest("a", &source, 8).is_empty());
        assert!(suggest("  t ", &source, 8).is_empty());
    }

    #[test]
    fn prefix_match_ranks_above_inner_match() {
        let source = vec![
            entry("f-150", "Ford F-150", 50),
            entry("hauler", "Ram Toy Hauler", 40),
            entry("camry", "Toyota Camry", 3),
        ];
        let result = suggest("toy", &source, 8);
        let labels: Vec<&str> = result.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["Toyota Camry", "Ram Toy Hauler"]);
    }

    #[test]
    fn toyota_camry_ranks_above_unrelated_entries() {
        let source = vec![entry("civic", "Honda Civic", 40), entry("camry", "Toyota Camry", 2)];
        let result = suggest("toy", &source, 8);
        assert_eq!(result.first().map(|s| s.label.as_str()), Some("Toyota Camry"));
        assert!(result.iter().all(|s| s.label != "Honda Civic"));
    }

    #[test]
    fn ties_on_position_break_on_popularity() {
        let source = vec![entry("camry", "Toyota Camry", 2), entry("corolla", "Toyota Corolla", 9)];
        let result = suggest("TOYOTA", &source, 8);
        assert_eq!(result[0].label, "Toyota Corolla");
        assert_eq!(result[1].label, "Toyota Camry");
    }

    #[test]
    fn result_is_capped_at_limit() {
        let source: Vec<Suggestion> = (0..20)
            .map(|i| entry(&format!("model{i}"), &format!("Make Model{i}"), i))
            .collect();
        assert_eq!(suggest("model", &source, 8).len(), 8);
        assert_eq!(suggest("model", &source, 3).len(), 3);
    }

    #[test]
    fn source_counts_listings_per_make() {
        let listings = demo_listings();
        let source = suggestion_source(&listings);
        let toyota = source
            .iter()
            .find(|s| s.kind == SuggestionKind::Make && s.value == "toyota")
            .expect("toyota entry");
        assert_eq!(
            toyota.count,
            listings.iter().filter(|l| l.make == "Toyota").count()
        );
        assert!(source
            .iter()
            .any(|s| s.kind == SuggestionKind::Model && s.label == "Toyota Camry"));
    }
}
