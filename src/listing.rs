// Listing data model shared by discovery pages and the booking flow
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::time_range::DurationConstraint;

// A fixed-price bundle offered by a vendor. Immutable once offered.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PricedPackage {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    #[serde(default)]
    pub duration_label: String,
    #[serde(default)]
    pub included_features: Vec<String>,
}

// Optional extra attached to a booking. Only `selected` changes.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AddOnItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    #[serde(default)]
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Review {
    pub author: String,
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct Location {
    pub city: String,
    pub state: String,
    #[serde(default)]
    pub address: String,
}

impl Location {
    /// "City, ST" form used by location search.
    pub fn normalized(&self) -> String {
        match (self.city.trim(), self.state.trim()) {
            ("", state) => state.to_string(),
            (city, "") => city.to_string(),
            (city, state) => format!("{}, {}", city, state),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingKind {
    Event,
    Service,
    Venue,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EventListing {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category_id: String,
    #[serde(default)]
    pub location: Location,
    #[serde(default)]
    pub reviews: Vec<Review>,
    pub ticket_price: Option<f64>,
    pub starts_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub organizer: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ServiceListing {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category_id: String,
    #[serde(default)]
    pub location: Location,
    #[serde(default)]
    pub reviews: Vec<Review>,
    pub hourly_rate: Option<f64>,
    #[serde(default)]
    pub packages: Vec<PricedPackage>,
    #[serde(default)]
    pub add_ons: Vec<AddOnItem>,
    #[serde(default)]
    pub duration: Option<DurationConstraint>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct VenueListing {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category_id: String,
    #[serde(default)]
    pub location: Location,
    #[serde(default)]
    pub reviews: Vec<Review>,
    pub hourly_rate: Option<f64>,
    #[serde(default)]
    pub capacity: u32,
    #[serde(default)]
    pub packages: Vec<PricedPackage>,
    #[serde(default)]
    pub add_ons: Vec<AddOnItem>,
    #[serde(default)]
    pub duration: Option<DurationConstraint>,
}

/// Read-only reference data for anything shown on a discovery page.
///
/// Serialized with an explicit `kind` tag so catalogs can mix all three
/// shapes in one array.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ListingRecord {
    Event(EventListing),
    Service(ServiceListing),
    Venue(VenueListing),
}

impl ListingRecord {
    pub fn kind(&self) -> ListingKind {
        match self {
            ListingRecord::Event(_) => ListingKind::Event,
            ListingRecord::Service(_) => ListingKind::Service,
            ListingRecord::Venue(_) => ListingKind::Venue,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            ListingRecord::Event(e) => &e.id,
            ListingRecord::Service(s) => &s.id,
            ListingRecord::Venue(v) => &v.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ListingRecord::Event(e) => &e.name,
            ListingRecord::Service(s) => &s.name,
            ListingRecord::Venue(v) => &v.name,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            ListingRecord::Event(e) => &e.description,
            ListingRecord::Service(s) => &s.description,
            ListingRecord::Venue(v) => &v.description,
        }
    }

    pub fn category_id(&self) -> &str {
        match self {
            ListingRecord::Event(e) => &e.category_id,
            ListingRecord::Service(s) => &s.category_id,
            ListingRecord::Venue(v) => &v.category_id,
        }
    }

    pub fn location(&self) -> &Location {
        match self {
            ListingRecord::Event(e) => &e.location,
            ListingRecord::Service(s) => &s.location,
            ListingRecord::Venue(v) => &v.location,
        }
    }

    pub fn reviews(&self) -> &[Review] {
        match self {
            ListingRecord::Event(e) => &e.reviews,
            ListingRecord::Service(s) => &s.reviews,
            ListingRecord::Venue(v) => &v.reviews,
        }
    }

    /// Headline price used for sorting: ticket price for events, hourly
    /// rate for services and venues, falling back to the cheapest package.
    /// Listings with no price at all report 0.
    pub fn base_price(&self) -> f64 {
        let (direct, packages): (Option<f64>, &[PricedPackage]) = match self {
            ListingRecord::Event(e) => (e.ticket_price, &[]),
            ListingRecord::Service(s) => (s.hourly_rate, s.packages.as_slice()),
            ListingRecord::Venue(v) => (v.hourly_rate, v.packages.as_slice()),
        };

        direct
            .or_else(|| {
                packages
                    .iter()
                    .map(|p| p.price)
                    .min_by(|a, b| a.total_cmp(b))
            })
            .unwrap_or(0.0)
    }

    /// Mean review rating, `None` when the listing has no reviews yet.
    pub fn average_rating(&self) -> Option<f64> {
        let reviews = self.reviews();
        if reviews.is_empty() {
            return None;
        }
        let sum: u32 = reviews.iter().map(|r| r.rating as u32).sum();
        Some(sum as f64 / reviews.len() as f64)
    }

    /// A package or add-on id used twice within this listing, if any.
    pub fn duplicate_item_id(&self) -> Option<&str> {
        match self {
            ListingRecord::Event(_) => None,
            ListingRecord::Service(s) => first_duplicate(&s.packages, &s.add_ons),
            ListingRecord::Venue(v) => first_duplicate(&v.packages, &v.add_ons),
        }
    }
}

// Packages and add-ons are looked up by id separately, so each list must be
// unique on its own.
fn first_duplicate<'a>(packages: &'a [PricedPackage], add_ons: &'a [AddOnItem]) -> Option<&'a str> {
    let mut seen = HashSet::new();
    if let Some(id) = packages.iter().map(|p| p.id.as_str()).find(|id| !seen.insert(*id)) {
        return Some(id);
    }

    seen.clear();
    add_ons.iter().map(|a| a.id.as_str()).find(|id| !seen.insert(*id))
}

// Bookable terms extracted from a service or venue listing
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BookingOffer {
    pub listing_id: String,
    pub listing_kind: Option<ListingKind>,
    pub hourly_rate: Option<f64>,
    pub packages: Vec<PricedPackage>,
    pub add_ons: Vec<AddOnItem>,
    pub duration: Option<DurationConstraint>,
}

impl BookingOffer {
    /// Events are sold as tickets and have no booking wizard.
    pub fn from_listing(listing: &ListingRecord) -> Option<Self> {
        match listing {
            ListingRecord::Event(_) => None,
            ListingRecord::Service(s) => Some(Self {
                listing_id: s.id.clone(),
                listing_kind: Some(ListingKind::Service),
                hourly_rate: s.hourly_rate,
                packages: s.packages.clone(),
                add_ons: s.add_ons.clone(),
                duration: s.duration,
            }),
            ListingRecord::Venue(v) => Some(Self {
                listing_id: v.id.clone(),
                listing_kind: Some(ListingKind::Venue),
                hourly_rate: v.hourly_rate,
                packages: v.packages.clone(),
                add_ons: v.add_ons.clone(),
                duration: v.duration,
            }),
        }
    }

    pub fn package(&self, id: &str) -> Option<&PricedPackage> {
        self.packages.iter().find(|p| p.id == id)
    }

    pub fn add_on(&self, id: &str) -> Option<&AddOnItem> {
        self.add_ons.iter().find(|a| a.id == id)
    }

    pub fn duplicate_item_id(&self) -> Option<&str> {
        first_duplicate(&self.packages, &self.add_ons)
    }
}
