//! Property listing records.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;

/// Immutable snapshot of a real-estate listing as read from the data source.
///
/// Every field other than `id` is optional because the ingestion pipeline
/// writes partial rows. Field names follow the column names of the source
/// relations, so a row serialized with `row_to_json` deserializes directly.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Property {
    /// Opaque identifier. May be a UUID, or the listing URL when the row has
    /// no identifier of its own (see [`Property::with_fallback_id`]).
    #[serde(default, deserialize_with = "opaque_id")]
    pub id: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub suburb: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub postcode: Option<String>,
    #[serde(default)]
    pub year_built: Option<i32>,
    #[serde(default)]
    pub bedrooms: Option<i32>,
    #[serde(default)]
    pub bathrooms: Option<i32>,
    #[serde(default)]
    pub car_spaces: Option<i32>,
    #[serde(default)]
    pub land_area: Option<String>,
    #[serde(default)]
    pub floor_size: Option<String>,
    #[serde(default)]
    pub last_sold_price: Option<f64>,
    #[serde(default)]
    pub last_sold_date: Option<String>,
    #[serde(default)]
    pub capital_value: Option<f64>,
    #[serde(default)]
    pub land_value: Option<f64>,
    #[serde(default)]
    pub improvement_value: Option<f64>,
    #[serde(default)]
    pub has_rental_history: Option<bool>,
    #[serde(default)]
    pub is_currently_rented: Option<bool>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub property_url: Option<String>,
    #[serde(default)]
    pub cover_image_url: Option<String>,

    // Forecast view only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicted_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicted_price: Option<f64>,
}

impl Property {
    /// Create a bare record with only an identifier set.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Use `property_url` as the identifier when the row carries none.
    pub fn with_fallback_id(mut self) -> Self {
        if self.id.trim().is_empty() {
            if let Some(url) = self.property_url.as_deref().filter(|u| !u.trim().is_empty()) {
                self.id = url.to_string();
            }
        }
        self
    }

    /// Parse a JSON row into a property, applying the identifier fallback.
    pub fn from_row_json(row: JsonValue) -> Result<Self, serde_json::Error> {
        serde_json::from_value::<Property>(row).map(Property::with_fallback_id)
    }
}

/// Accept string, numeric, or null identifiers.
pub(crate) fn opaque_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<JsonValue>::deserialize(deserializer)?;
    Ok(match value {
        Some(JsonValue::String(s)) => s,
        Some(JsonValue::Number(n)) => n.to_string(),
        _ => String::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_row_json_with_uuid_id() -> Result<(), serde_json::Error> {
        let row = json!({
            "id": "3f1c8d1e-59a4-4c2b-9d2e-8a3c1b7e0f11",
            "address": "12 Aro Street",
            "suburb": "Aro Valley",
            "city": "Wellington City",
            "bedrooms": 3,
            "last_sold_price": 1000000,
            "unknown_column": "ignored"
        });
        let property = Property::from_row_json(row)?;
        assert_eq!(property.id, "3f1c8d1e-59a4-4c2b-9d2e-8a3c1b7e0f11");
        assert_eq!(property.bedrooms, Some(3));
        assert_eq!(property.last_sold_price, Some(1_000_000.0));
        Ok(())
    }

    #[test]
    fn test_missing_id_falls_back_to_url() -> Result<(), serde_json::Error> {
        let row = json!({
            "id": null,
            "property_url": "https://example.com/property/7"
        });
        let property = Property::from_row_json(row)?;
        assert_eq!(property.id, "https://example.com/property/7");
        Ok(())
    }

    #[test]
    fn test_numeric_id_is_stringified() -> Result<(), serde_json::Error> {
        let property = Property::from_row_json(json!({ "id": 42 }))?;
        assert_eq!(property.id, "42");
        Ok(())
    }

    #[test]
    fn test_forecast_fields_omitted_when_absent() -> Result<(), serde_json::Error> {
        let json = serde_json::to_value(Property::new("p-1"))?;
        assert!(json.get("confidence_score").is_none());
        assert!(json.get("address").is_some());
        Ok(())
    }
}
