//! Aggregate "database analysis" statistics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Regions the statistics are broken down by.
pub const STATS_REGIONS: [&str; 2] = ["Auckland", "Wellington"];

/// Forecast confidence tiers, as fractions of the forecast total.
pub const FORECAST_TIERS: [f64; 3] = [0.9, 0.8, 0.6];

/// One row of the stats relation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct DatabaseAnalysisStats {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub auckland_properties: i64,
    #[serde(default)]
    pub wellington_properties: i64,
    #[serde(default)]
    pub auckland_forecast_total: i64,
    #[serde(default)]
    pub wellington_forecast_total: i64,
    #[serde(default)]
    pub auckland_forecast_90_percent: i64,
    #[serde(default)]
    pub auckland_forecast_80_percent: i64,
    #[serde(default)]
    pub auckland_forecast_60_percent: i64,
    #[serde(default)]
    pub wellington_forecast_90_percent: i64,
    #[serde(default)]
    pub wellington_forecast_80_percent: i64,
    #[serde(default)]
    pub wellington_forecast_60_percent: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl DatabaseAnalysisStats {
    /// Zeroed stats returned when no row has been recorded yet.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Default::default()
        }
    }

    /// Derive a full stats row from per-region property counts. Forecast
    /// totals fall back to the property counts.
    pub fn from_region_counts(auckland: i64, wellington: i64) -> Self {
        let [a90, a80, a60] = tiers(auckland);
        let [w90, w80, w60] = tiers(wellington);
        Self {
            message: None,
            auckland_properties: auckland,
            wellington_properties: wellington,
            auckland_forecast_total: auckland,
            wellington_forecast_total: wellington,
            auckland_forecast_90_percent: a90,
            auckland_forecast_80_percent: a80,
            auckland_forecast_60_percent: a60,
            wellington_forecast_90_percent: w90,
            wellington_forecast_80_percent: w80,
            wellington_forecast_60_percent: w60,
            created_at: None,
        }
    }
}

/// 90/80/60 % of `total`, rounded half away from zero.
pub fn tiers(total: i64) -> [i64; 3] {
    FORECAST_TIERS.map(|fraction| (total as f64 * fraction).round() as i64)
}
