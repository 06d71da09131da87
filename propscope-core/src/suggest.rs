//! Address autocomplete suggestions.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Minimum trimmed query length before suggestions are looked up.
pub const MIN_QUERY_LEN: usize = 2;

/// Maximum suggestions returned.
pub const MAX_SUGGESTIONS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AddressSuggestion {
    #[serde(default, deserialize_with = "crate::property::opaque_id")]
    pub id: String,
    pub address: String,
    #[serde(default)]
    pub suburb: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
}

/// Normalized autocomplete request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestQuery {
    text: String,
    city: Option<String>,
}

impl SuggestQuery {
    /// `None` when the trimmed text is shorter than [`MIN_QUERY_LEN`].
    pub fn new(text: &str, city: Option<&str>) -> Option<Self> {
        let text = text.trim();
        if text.chars().count() < MIN_QUERY_LEN {
            return None;
        }
        Some(Self {
            text: text.to_string(),
            city: city
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string),
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn city(&self) -> Option<&str> {
        self.city.as_deref()
    }
}

/// Keep the first suggestion per address (case-insensitive) and cap the list.
pub fn dedupe_by_address(suggestions: Vec<AddressSuggestion>) -> Vec<AddressSuggestion> {
    let mut seen = HashSet::new();
    suggestions
        .into_iter()
        .filter(|s| !s.address.trim().is_empty())
        .filter(|s| seen.insert(s.address.trim().to_lowercase()))
        .take(MAX_SUGGESTIONS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn suggestion(id: &str, address: &str) -> AddressSuggestion {
        AddressSuggestion {
            id: id.to_string(),
            address: address.to_string(),
            suburb: None,
            city: None,
        }
    }

    #[test]
    fn test_short_query_rejected() {
        assert!(SuggestQuery::new(" a ", None).is_none());
        let q = SuggestQuery::new(" ar ", Some(" ")).map(|q| (q.text().to_string(), q.city().map(str::to_string)));
        assert_eq!(q, Some(("ar".to_string(), None)));
    }

    #[test]
    fn test_dedupe_keeps_first() {
        let out = dedupe_by_address(vec![
            suggestion("1", "12 Aro Street"),
            suggestion("2", "12 aro street "),
            suggestion("3", "14 Aro Street"),
            suggestion("4", ""),
        ]);
        let ids: Vec<&str> = out.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
    }

    #[test]
    fn test_capped_at_max() {
        let many = (0..25).map(|i| suggestion(&i.to_string(), &format!("{i} Cuba Street"))).collect();
        assert_eq!(dedupe_by_address(many).len(), MAX_SUGGESTIONS);
    }
}
