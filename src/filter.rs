// Filtering and sorting of listing collections for discovery pages
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::listing::ListingRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    #[default]
    Recommended,
    PriceAsc,
    PriceDesc,
    RatingDesc,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct FilterSortSpec {
    pub text_query: Option<String>,
    /// Matched exactly whenever present, so `Some("")` matches nothing.
    pub category_id: Option<String>,
    pub location_substring: Option<String>,
    pub sort_key: SortKey,
}

/// Ordered view over a borrowed slice. Iterating never mutates the source
/// and can be repeated any number of times.
#[derive(Debug, Clone)]
pub struct FilteredListings<'a> {
    source: &'a [ListingRecord],
    order: Vec<usize>,
}

impl<'a> FilteredListings<'a> {
    pub fn iter(&self) -> impl Iterator<Item = &'a ListingRecord> + '_ {
        let source = self.source;
        self.order.iter().map(move |&i| &source[i])
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn ids(&self) -> Vec<&'a str> {
        self.iter().map(|listing| listing.id()).collect()
    }

    pub fn to_vec(&self) -> Vec<ListingRecord> {
        self.iter().cloned().collect()
    }
}

// Blank inputs behave like an absent filter
fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_lowercase)
}

fn matches_text(listing: &ListingRecord, query: &str) -> bool {
    listing.name().to_lowercase().contains(query)
        || listing.description().to_lowercase().contains(query)
}

fn matches_location(listing: &ListingRecord, needle: &str) -> bool {
    let location = listing.location();
    location.normalized().to_lowercase().contains(needle)
        || location.address.to_lowercase().contains(needle)
}

fn compare_rating_desc(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.total_cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

pub fn apply<'a>(listings: &'a [ListingRecord], spec: &FilterSortSpec) -> FilteredListings<'a> {
    let text_query = non_blank(&spec.text_query);
    let location = non_blank(&spec.location_substring);
    let category = spec.category_id.as_deref();

    let mut order: Vec<usize> = listings
        .iter()
        .enumerate()
        .filter(|(_, listing)| {
            text_query
                .as_deref()
                .map_or(true, |query| matches_text(listing, query))
        })
        .filter(|(_, listing)| category.map_or(true, |id| listing.category_id() == id))
        .filter(|(_, listing)| {
            location
                .as_deref()
                .map_or(true, |needle| matches_location(listing, needle))
        })
        .map(|(i, _)| i)
        .collect();

    // `sort_by` is stable, so equal keys keep catalog order
    match spec.sort_key {
        SortKey::Recommended => {}
        SortKey::PriceAsc => order.sort_by(|&a, &b| {
            listings[a]
                .base_price()
                .total_cmp(&listings[b].base_price())
        }),
        SortKey::PriceDesc => order.sort_by(|&a, &b| {
            listings[b]
                .base_price()
                .total_cmp(&listings[a].base_price())
        }),
        SortKey::RatingDesc => order.sort_by(|&a, &b| {
            compare_rating_desc(listings[a].average_rating(), listings[b].average_rating())
        }),
    }

    FilteredListings {
        source: listings,
        order,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::{Location, Review, ServiceListing};
    use test_case::test_case;

    fn service(id: &str, category: &str, city: &str, rate: Option<f64>, ratings: &[u8]) -> ListingRecord {
        ListingRecord::Service(ServiceListing {
            id: id.to_string(),
            name: format!("Listing {}", id),
            description: format!("{} services in {}", category, city),
            category_id: category.to_string(),
            location: Location {
                city: city.to_string(),
                state: "TX".to_string(),
                address: String::new(),
            },
            reviews: ratings
                .iter()
                .map(|&rating| Review {
                    author: "someone".to_string(),
                    rating,
                    comment: String::new(),
                })
                .collect(),
            hourly_rate: rate,
            packages: vec![],
            add_ons: vec![],
            duration: None,
        })
    }

    fn catalog() -> Vec<ListingRecord> {
        vec![
            service("A", "music", "Austin", Some(100.0), &[4]),
            service("B", "music", "Dallas", Some(100.0), &[]),
            service("C", "photo", "Austin", Some(50.0), &[5, 4]),
            service("D", "catering", "Houston", None, &[2]),
        ]
    }

    #[test]
    fn test_price_ties_keep_original_order() {
        let listings = vec![
            service("A", "music", "Austin", Some(100.0), &[]),
            service("B", "music", "Austin", Some(100.0), &[]),
            service("C", "music", "Austin", Some(50.0), &[]),
        ];
        let spec = FilterSortSpec {
            sort_key: SortKey::PriceAsc,
            ..FilterSortSpec::default()
        };

        assert_eq!(apply(&listings, &spec).ids(), vec!["C", "A", "B"]);
    }

    #[test]
    fn test_empty_spec_is_identity() {
        let listings = catalog();
        let result = apply(&listings, &FilterSortSpec::default());
        assert_eq!(result.ids(), vec!["A", "B", "C", "D"]);
        assert_eq!(result.to_vec(), listings);
    }

    #[test_case(FilterSortSpec {text_query: Some("LISTING c".to_string()), ..FilterSortSpec::default()},
        vec!["C"]; "#1 case insensitive name match")]
    #[test_case(FilterSortSpec {text_query: Some("music".to_string()), ..FilterSortSpec::default()},
        vec!["A", "B"]; "#2 description match")]
    #[test_case(FilterSortSpec {text_query: Some("   ".to_string()), ..FilterSortSpec::default()},
        vec!["A", "B", "C", "D"]; "#3 blank query matches all")]
    #[test_case(FilterSortSpec {category_id: Some("photo".to_string()), ..FilterSortSpec::default()},
        vec!["C"]; "#4 category exact")]
    #[test_case(FilterSortSpec {category_id: Some("phot".to_string()), ..FilterSortSpec::default()},
        vec![]; "#5 category is not a substring match")]
    #[test_case(FilterSortSpec {category_id: Some(String::new()), ..FilterSortSpec::default()},
        vec![]; "#10 empty category matches no listing")]
    #[test_case(FilterSortSpec {location_substring: Some("austin, tx".to_string()), ..FilterSortSpec::default()},
        vec!["A", "C"]; "#6 normalized location")]
    #[test_case(FilterSortSpec {location_substring: Some("Austin".to_string()), sort_key: SortKey::PriceAsc, ..FilterSortSpec::default()},
        vec!["C", "A"]; "#7 filter then sort")]
    #[test_case(FilterSortSpec {sort_key: SortKey::PriceDesc, ..FilterSortSpec::default()},
        vec!["A", "B", "C", "D"]; "#8 price desc with missing price last")]
    #[test_case(FilterSortSpec {sort_key: SortKey::RatingDesc, ..FilterSortSpec::default()},
        vec!["C", "A", "D", "B"]; "#9 unrated sorts last")]
    fn test_filter_sort(spec: FilterSortSpec, expected_ids: Vec<&str>) {
        let listings = catalog();
        assert_eq!(apply(&listings, &spec).ids(), expected_ids);
    }

    #[test]
    fn test_view_is_restartable() {
        let listings = catalog();
        let spec = FilterSortSpec {
            sort_key: SortKey::RatingDesc,
            ..FilterSortSpec::default()
        };
        let view = apply(&listings, &spec);

        let first: Vec<&str> = view.iter().map(|l| l.id()).collect();
        let second: Vec<&str> = view.iter().map(|l| l.id()).collect();
        assert_eq!(first, second);
        assert_eq!(view.len(), 4);
        // source untouched
        assert_eq!(listings[0].id(), "A");
    }

    #[test]
    fn test_sort_key_from_json() {
        let spec: FilterSortSpec = serde_json::from_str(r#"{"sort_key": "priceAsc"}"#).unwrap();
        assert_eq!(spec.sort_key, SortKey::PriceAsc);
        assert_eq!(spec.text_query, None);
    }
}
