//! Behaviour every cache backend and property source must share, exercised
//! through the trait objects the service holds.

use std::sync::Arc;
use std::time::Duration;

use propscope_core::{
    FilterKey, ListQuery, ListView, PageRequest, Property, StoreError, SuggestQuery,
};
use propscope_storage::{
    CacheBackend, CacheError, CacheKey, CacheLookup, CacheTtls, EnvelopeCache,
    InMemoryCacheBackend, InMemoryPropertySource, PropertySource,
};

async fn backend_contract(backend: Arc<dyn CacheBackend>) -> Result<(), CacheError> {
    assert_eq!(backend.get("contract:missing").await?, None);

    backend
        .set("contract:a", "one".to_string(), Duration::from_secs(60))
        .await?;
    backend
        .set("contract:a", "two".to_string(), Duration::from_secs(60))
        .await?;
    assert_eq!(backend.get("contract:a").await?.as_deref(), Some("two"));

    backend.delete("contract:a").await?;
    assert_eq!(backend.get("contract:a").await?, None);
    backend.delete("contract:a").await?;

    backend.ping().await
}

#[tokio::test]
async fn memory_backend_meets_contract() -> Result<(), CacheError> {
    backend_contract(Arc::new(InMemoryCacheBackend::new())).await
}

#[tokio::test]
async fn caches_with_different_schemas_do_not_share_entries() -> Result<(), CacheError> {
    let backend: Arc<dyn CacheBackend> = Arc::new(InMemoryCacheBackend::new());
    let v1 = EnvelopeCache::with_schema(backend.clone(), CacheTtls::default(), 1);
    let v2 = EnvelopeCache::with_schema(backend.clone(), CacheTtls::default(), 2);

    // Same key text under both schemas, as if the version bump was forgotten.
    let key = CacheKey::by_id(1, ListView::Properties, "p-1");
    v1.put(&key, &vec![1u32, 2, 3]).await?;

    assert_eq!(v1.get::<Vec<u32>>(&key).await, CacheLookup::Hit(vec![1, 2, 3]));
    assert_eq!(v2.get::<Vec<u32>>(&key).await, CacheLookup::SchemaMismatch);
    Ok(())
}

fn row(id: &str, suburb: &str, address: &str) -> Property {
    Property {
        city: Some("Wellington City".to_string()),
        suburb: Some(suburb.to_string()),
        address: Some(address.to_string()),
        ..Property::new(id)
    }
}

#[tokio::test]
async fn source_pages_are_disjoint_and_counted_once() -> Result<(), StoreError> {
    let rows = (0..7)
        .map(|i| row(&format!("p-{i}"), "Te Aro", &format!("{i} Cuba Street")))
        .collect();
    let source: Arc<dyn PropertySource> =
        Arc::new(InMemoryPropertySource::new().with_rows(ListView::Properties, rows));
    let filter = FilterKey::new("Wellington City", &["Te Aro"]);

    let mut seen = Vec::new();
    for page in 0..3 {
        let Some(query) =
            ListQuery::build(ListView::Properties, &filter, None, PageRequest::new(page, 3))
        else {
            panic!("city filter produced no query");
        };
        assert_eq!(source.count(&query).await?, 7);
        seen.extend(source.fetch_page(&query).await?.into_iter().map(|p| p.id));
    }
    assert_eq!(seen, vec!["p-0", "p-1", "p-2", "p-3", "p-4", "p-5", "p-6"]);
    Ok(())
}

#[tokio::test]
async fn source_suggestions_respect_city_and_limit() -> Result<(), StoreError> {
    let mut rows: Vec<Property> = (0..5)
        .map(|i| row(&format!("w-{i}"), "Te Aro", &format!("{i} Cuba Street")))
        .collect();
    rows.push(Property {
        city: Some("Auckland".to_string()),
        ..row("a-0", "Ponsonby", "1 Cuba Street")
    });
    let source = InMemoryPropertySource::new().with_rows(ListView::Properties, rows);

    let Some(query) = SuggestQuery::new("cuba", Some("Wellington City")) else {
        panic!("query long enough");
    };
    let hits = source.suggest(ListView::Properties, &query, 3).await?;
    assert_eq!(hits.len(), 3);
    assert!(hits.iter().all(|h| h.city.as_deref() == Some("Wellington City")));
    Ok(())
}
