//! Property-based tests for the listing service's page envelopes.

use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;
use propscope_api::ListingService;
use propscope_core::{FilterKey, ListView, Lookup, PageRequest, PropertyPage, StoreError};
use propscope_test_utils::assertions::assert_envelope_invariants;
use propscope_test_utils::fixtures::memory_cache;
use propscope_test_utils::generators::{arb_page_request, arb_properties, arb_suburb_list};
use propscope_test_utils::{InMemoryPropertySource, Property};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap_or_else(|e| panic!("failed to build runtime: {e}"))
}

fn service(rows: Vec<Property>) -> ListingService {
    let source = InMemoryPropertySource::new().with_rows(ListView::Properties, rows);
    ListingService::new(Arc::new(source), memory_cache())
}

fn browse(suburbs: &[String], page: PageRequest) -> Lookup {
    Lookup::Browse {
        filter: FilterKey::new("Wellington City", suburbs),
        search: None,
        page,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_envelope_respects_page_bounds(
        rows in arb_properties(60),
        suburbs in arb_suburb_list(),
        page in arb_page_request(),
    ) {
        let result: Result<PropertyPage, StoreError> = runtime().block_on(async {
            service(rows).list(ListView::Properties, browse(&suburbs, page)).await
        });
        let envelope = result.map_err(|e| TestCaseError::fail(e.to_string()))?;

        assert_envelope_invariants(&envelope);
        prop_assert_eq!(envelope.page, page.page());
        prop_assert_eq!(envelope.page_size, page.page_size());
        let ids: Vec<&str> = envelope.data.iter().map(|p| p.id.as_str()).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        prop_assert_eq!(ids, sorted);
    }

    #[test]
    fn prop_suburb_order_does_not_change_result(
        rows in arb_properties(40),
        suburbs in arb_suburb_list(),
    ) {
        let mut reversed = suburbs.clone();
        reversed.reverse();
        let page = PageRequest::new(0, 50);

        let (a, b) = runtime().block_on(async {
            let service = service(rows);
            let a = service.list(ListView::Properties, browse(&suburbs, page)).await;
            service.settle(Duration::from_secs(1)).await;
            let b = service.list(ListView::Properties, browse(&reversed, page)).await;
            (a, b)
        });
        let a = a.map_err(|e| TestCaseError::fail(e.to_string()))?;
        let b = b.map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert_eq!(a, b);
    }

    #[test]
    fn prop_pages_partition_the_result_set(
        rows in arb_properties(60),
        page_size in 1u32..=12,
    ) {
        let total = rows.len();
        let collected = runtime().block_on(async {
            let service = service(rows);
            let mut ids = Vec::new();
            let mut page = PageRequest::new(0, page_size);
            loop {
                let envelope = service.list(ListView::Properties, browse(&[], page)).await?;
                ids.extend(envelope.data.into_iter().map(|p| p.id));
                if !envelope.has_more {
                    break;
                }
                page = page.next();
            }
            Ok::<_, StoreError>(ids)
        });
        let ids = collected.map_err(|e| TestCaseError::fail(e.to_string()))?;

        prop_assert_eq!(ids.len(), total);
        let mut unique = ids.clone();
        unique.dedup();
        prop_assert_eq!(unique.len(), total);
    }
}
