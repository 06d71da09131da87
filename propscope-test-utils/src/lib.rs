//! PropScope Test Utilities
//!
//! Shared test infrastructure for the PropScope workspace:
//! - Proptest generators for filters, pages and records
//! - Listing fixtures for the Wellington and Auckland scenarios
//! - Assertions over page envelopes

pub use propscope_core::{
    FilterKey, ListView, PageEnvelope, PageRequest, Property, PropertyPage, DEFAULT_PAGE_SIZE,
    MAX_PAGE_SIZE,
};
pub use propscope_storage::{
    CacheTtls, EnvelopeCache, Fault, InMemoryCacheBackend, InMemoryPropertySource,
};

use std::sync::Arc;

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for listing types.

    use super::*;
    use proptest::prelude::*;

    /// Suburb names drawn from a small pool so that collisions happen.
    pub fn arb_suburb() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("Aro Valley".to_string()),
            Just("Brooklyn".to_string()),
            Just("Kelburn".to_string()),
            Just("Newtown".to_string()),
            Just("Te Aro".to_string()),
        ]
    }

    /// Suburb lists including blanks, padding and duplicates.
    pub fn arb_suburb_list() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec(
            prop_oneof![
                3 => arb_suburb(),
                1 => arb_suburb().prop_map(|s| format!("  {}  ", s)),
                1 => Just(String::new()),
                1 => Just("   ".to_string()),
            ],
            0..8,
        )
    }

    /// A valid page request; page sizes cover the whole allowed range.
    pub fn arb_page_request() -> impl Strategy<Value = PageRequest> {
        (0u32..20, 1u32..=MAX_PAGE_SIZE).prop_map(|(page, size)| PageRequest::new(page, size))
    }

    /// A property in Wellington City with an id unique within `0..10_000`.
    pub fn arb_property() -> impl Strategy<Value = Property> {
        (0u32..10_000, arb_suburb(), prop::option::of(0.0f64..1.0)).prop_map(
            |(n, suburb, confidence)| Property {
                id: format!("prop-{:05}", n),
                address: Some(format!("{} Example Street", n)),
                suburb: Some(suburb),
                city: Some("Wellington City".to_string()),
                confidence_score: confidence,
                ..Default::default()
            },
        )
    }

    /// A set of properties with distinct ids.
    pub fn arb_properties(max: usize) -> impl Strategy<Value = Vec<Property>> {
        prop::collection::vec(arb_property(), 0..max).prop_map(|mut rows| {
            rows.sort_by(|a, b| a.id.cmp(&b.id));
            rows.dedup_by(|a, b| a.id == b.id);
            rows
        })
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built listings for common scenarios.

    use super::*;

    pub const WELLINGTON_CITY: &str = "Wellington City";
    pub const AUCKLAND: &str = "Auckland";

    /// Aro Valley rows in [`wellington_listings`].
    pub const ARO_VALLEY_COUNT: usize = 14;

    /// A listing with the fields the filters look at.
    pub fn property(id: &str, city: &str, suburb: &str, address: &str) -> Property {
        Property {
            id: id.to_string(),
            address: Some(address.to_string()),
            suburb: Some(suburb.to_string()),
            city: Some(city.to_string()),
            region: Some(
                if city == AUCKLAND {
                    "Auckland"
                } else {
                    "Wellington"
                }
                .to_string(),
            ),
            bedrooms: Some(3),
            bathrooms: Some(1),
            ..Default::default()
        }
    }

    /// 14 Aro Valley and 4 Brooklyn rows in Wellington City, 3 Ponsonby rows
    /// in Auckland.
    pub fn wellington_listings() -> Vec<Property> {
        let mut rows = Vec::new();
        for i in 0..ARO_VALLEY_COUNT {
            rows.push(property(
                &format!("aro-{:02}", i),
                WELLINGTON_CITY,
                "Aro Valley",
                &format!("{} Aro Street", i + 1),
            ));
        }
        for i in 0..4 {
            rows.push(property(
                &format!("bro-{:02}", i),
                WELLINGTON_CITY,
                "Brooklyn",
                &format!("{} Ohiro Road", i + 1),
            ));
        }
        for i in 0..3 {
            rows.push(property(
                &format!("pon-{:02}", i),
                AUCKLAND,
                "Ponsonby",
                &format!("{} Ponsonby Road", i + 1),
            ));
        }
        rows
    }

    /// Forecast rows for Wellington City with descending confidence, one row
    /// without a score.
    pub fn forecast_listings() -> Vec<Property> {
        let scores = [0.55, 0.91, 0.72, 0.88];
        let mut rows: Vec<Property> = scores
            .iter()
            .enumerate()
            .map(|(i, score)| Property {
                confidence_score: Some(*score),
                predicted_status: Some("likely_to_sell".to_string()),
                ..property(
                    &format!("fc-{:02}", i),
                    WELLINGTON_CITY,
                    "Aro Valley",
                    &format!("{} Holloway Road", i + 1),
                )
            })
            .collect();
        rows.push(property("fc-99", WELLINGTON_CITY, "Aro Valley", "99 Holloway Road"));
        rows
    }

    /// A listing whose id is empty and falls back to its URL.
    pub fn url_only_property() -> Property {
        let mut row = property("", WELLINGTON_CITY, "Kelburn", "7 Glasgow Street");
        row.property_url = Some("https://listings.example/7-glasgow-street".to_string());
        row.with_fallback_id()
    }

    /// In-memory source seeded with [`wellington_listings`] and
    /// [`forecast_listings`].
    pub fn source_with_fixtures() -> InMemoryPropertySource {
        let mut properties = wellington_listings();
        properties.push(url_only_property());
        InMemoryPropertySource::new()
            .with_rows(ListView::Properties, properties)
            .with_rows(ListView::Forecast, forecast_listings())
    }

    /// Envelope cache over a fresh in-memory backend.
    pub fn memory_cache() -> EnvelopeCache {
        EnvelopeCache::new(Arc::new(InMemoryCacheBackend::new()), CacheTtls::default())
    }
}

// ============================================================================
// ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Checks shared by envelope tests.

    use super::*;

    /// Assert the invariants of a page assembled with an exact total.
    #[track_caller]
    pub fn assert_envelope_invariants<T: std::fmt::Debug>(envelope: &PageEnvelope<T>) {
        assert!(
            envelope.data.len() <= envelope.page_size as usize,
            "data.len() {} exceeds pageSize {}",
            envelope.data.len(),
            envelope.page_size
        );
        let end = (envelope.page as u64 + 1) * envelope.page_size as u64;
        assert_eq!(
            envelope.has_more,
            end < envelope.total,
            "hasMore disagrees with total {} for page {} size {}",
            envelope.total,
            envelope.page,
            envelope.page_size
        );
    }

    /// Assert a JSON body is the empty page `{data: [], hasMore: false, total: 0}`.
    #[track_caller]
    pub fn assert_empty_page_json(body: &serde_json::Value) {
        assert_eq!(body["data"], serde_json::json!([]));
        assert_eq!(body["hasMore"], false);
        assert_eq!(body["total"], 0);
    }
}
