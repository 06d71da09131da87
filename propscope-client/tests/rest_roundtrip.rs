//! RestClient and Pager against a live router bound to a local port.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use propscope_api::{create_api_router, ApiConfig, AppState};
use propscope_client::{
    ClientConfig, ClientError, FetchOutcome, Pager, RestClient, RetryPolicy,
};
use propscope_core::{DatabaseAnalysisStats, FilterKey, ListView};
use propscope_test_utils::fixtures::{
    memory_cache, source_with_fixtures, url_only_property, ARO_VALLEY_COUNT, WELLINGTON_CITY,
};
use propscope_test_utils::{Fault, InMemoryPropertySource};
use tokio::net::TcpListener;

type TestResult = Result<(), Box<dyn std::error::Error>>;

async fn serve() -> Result<(SocketAddr, Arc<InMemoryPropertySource>), Box<dyn std::error::Error>> {
    let source = Arc::new(source_with_fixtures());
    let state = AppState::new(source.clone(), memory_cache());
    let app = create_api_router(state, &ApiConfig::default())?;
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            eprintln!("test server stopped: {e}");
        }
    });
    Ok((addr, source))
}

fn client(addr: SocketAddr) -> Result<RestClient, ClientError> {
    RestClient::new(
        &ClientConfig::new(format!("http://{}", addr))
            .with_request_timeout(Duration::from_secs(5))
            .with_retry(RetryPolicy::none()),
    )
}

#[tokio::test]
async fn pager_over_http_matches_scenario() -> TestResult {
    let (addr, _) = serve().await?;
    let pager = Pager::new(
        Arc::new(client(addr)?),
        ListView::Properties,
        9,
        RetryPolicy::none(),
    );
    pager
        .set_filter(FilterKey::new(WELLINGTON_CITY, &["Aro Valley"]), None)
        .await;

    let mut sizes = Vec::new();
    while let FetchOutcome::Fetched(page) = pager.fetch_next_page().await? {
        sizes.push(page.data.len());
    }
    assert_eq!(sizes, vec![9, 5]);
    assert_eq!(pager.total().await, Some(ARO_VALLEY_COUNT as u64));
    Ok(())
}

#[tokio::test]
async fn by_id_autocomplete_and_stats() -> TestResult {
    let (addr, source) = serve().await?;
    let client = client(addr)?;

    let url = url_only_property().id;
    let single = client.by_id(ListView::Properties, &url).await?;
    assert_eq!(single.data.len(), 1);
    assert_eq!(single.data[0].id, url);

    let suggestions = client
        .autocomplete(ListView::Forecast, "holloway", Some(WELLINGTON_CITY))
        .await?;
    assert_eq!(suggestions.len(), 5);
    assert!(client.autocomplete(ListView::Properties, "h", None).await?.is_empty());

    let empty = client.database_analysis().await?;
    assert!(empty.message.is_some());
    source
        .record_stats(DatabaseAnalysisStats::from_region_counts(20, 10))
        .await;
    let stats = client.database_analysis().await?;
    assert_eq!(stats.wellington_forecast_90_percent, 9);
    Ok(())
}

#[tokio::test]
async fn timeout_error_body_is_decoded() -> TestResult {
    let (addr, source) = serve().await?;
    source.set_fault(Some(Fault::Timeout)).await;

    let pager = Pager::new(Arc::new(client(addr)?), ListView::Forecast, 9, RetryPolicy::none());
    pager
        .set_filter(FilterKey::new(WELLINGTON_CITY, &[] as &[&str]), None)
        .await;

    match pager.fetch_next_page().await {
        Err(ClientError::Api {
            status,
            code,
            message,
        }) => {
            assert_eq!(status, 500);
            assert_eq!(code.as_deref(), Some("QUERY_TIMEOUT"));
            assert!(message.contains("fewer suburbs"));
        }
        other => panic!("expected API error, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() -> TestResult {
    // Bind then drop to get a port nobody listens on.
    let addr = TcpListener::bind("127.0.0.1:0").await?.local_addr()?;
    let err = client(addr)?.by_id(ListView::Properties, "x").await.err();
    assert!(err.as_ref().is_some_and(ClientError::is_retryable), "{:?}", err);
    Ok(())
}
