//! Database analysis refresh job.
//!
//! Counts properties per region in the stats source relation and appends a
//! row with forecast tiers to the stats relation. Run on a schedule; the API
//! serves the newest row.
//!
//! Usage:
//!   cargo run -p propscope-api --bin update-stats

use propscope_api::telemetry::{init_tracing, TelemetryConfig};
use propscope_api::{ApiResult, DbClient, DbConfig};
use propscope_core::{DatabaseAnalysisStats, STATS_REGIONS};

#[tokio::main]
async fn main() -> ApiResult<()> {
    init_tracing(&TelemetryConfig::default())?;

    let db_config = DbConfig::from_env()?;
    let db = DbClient::from_config(&db_config)?;

    let [auckland, wellington] = STATS_REGIONS;
    let (auckland_count, wellington_count) =
        tokio::try_join!(db.count_region(auckland), db.count_region(wellington))?;
    tracing::info!(
        source = db.relations().stats_source(),
        auckland = auckland_count,
        wellington = wellington_count,
        "Counted properties per region"
    );

    let stats = DatabaseAnalysisStats::from_region_counts(
        i64::try_from(auckland_count).unwrap_or(i64::MAX),
        i64::try_from(wellington_count).unwrap_or(i64::MAX),
    );
    db.insert_stats(&stats).await?;

    tracing::info!(
        relation = db.relations().stats(),
        auckland_90 = stats.auckland_forecast_90_percent,
        wellington_90 = stats.wellington_forecast_90_percent,
        "Database analysis stats recorded"
    );
    Ok(())
}
