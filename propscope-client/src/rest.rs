//! REST client for the listing API.

use async_trait::async_trait;
use propscope_core::{
    AddressSearch, AddressSuggestion, DatabaseAnalysisStats, FilterKey, ListView, PageRequest,
    PropertyPage,
};
use serde::de::DeserializeOwned;

use crate::config::ClientConfig;
use crate::error::ClientError;

/// One page request as the pager issues it.
#[derive(Debug, Clone, PartialEq)]
pub struct PageQuery {
    pub view: ListView,
    pub filter: FilterKey,
    pub search: Option<AddressSearch>,
    pub page: PageRequest,
}

impl PageQuery {
    /// Query-string pairs in the names the list endpoints read.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("city", self.filter.city().to_string()),
            ("page", self.page.page().to_string()),
            ("pageSize", self.page.page_size().to_string()),
        ];
        if !self.filter.is_all_suburbs() {
            params.push(("suburbs", self.filter.suburbs().join(",")));
        }
        if let Some(search) = &self.search {
            params.push(("search", search.text().to_string()));
            if search.is_exact() {
                params.push(("exact", "true".to_string()));
            }
        }
        params
    }
}

/// Source of listing pages for the pager.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_page(&self, query: &PageQuery) -> Result<PropertyPage, ClientError>;
}

fn list_path(view: ListView) -> &'static str {
    match view {
        ListView::Properties => "/api/property",
        ListView::Forecast => "/api/forecast",
    }
}

fn autocomplete_path(view: ListView) -> &'static str {
    match view {
        ListView::Properties => "/api/property/autocomplete",
        ListView::Forecast => "/api/forecast/autocomplete",
    }
}

#[derive(Clone)]
pub struct RestClient {
    client: reqwest::Client,
    base_url: String,
}

impl RestClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch one record by id or listing URL; the envelope holds 0 or 1 rows.
    pub async fn by_id(&self, view: ListView, id: &str) -> Result<PropertyPage, ClientError> {
        self.get_json(list_path(view), &[("id", id.to_string())]).await
    }

    pub async fn autocomplete(
        &self,
        view: ListView,
        q: &str,
        city: Option<&str>,
    ) -> Result<Vec<AddressSuggestion>, ClientError> {
        let mut params = vec![("q", q.to_string())];
        if let Some(city) = city {
            params.push(("city", city.to_string()));
        }
        self.get_json(autocomplete_path(view), &params).await
    }

    pub async fn database_analysis(&self) -> Result<DatabaseAnalysisStats, ClientError> {
        self.get_json("/api/database-analysis", &[]).await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(url = %url, "GET");
        let response = self.client.get(&url).query(params).send().await?;
        let status = response.status();
        let text = response.text().await?;
        if status.is_success() {
            Ok(serde_json::from_str(&text)?)
        } else {
            Err(ClientError::from_response(status.as_u16(), &text))
        }
    }
}

#[async_trait]
impl PageFetcher for RestClient {
    async fn fetch_page(&self, query: &PageQuery) -> Result<PropertyPage, ClientError> {
        self.get_json(list_path(query.view), &query.params()).await
    }
}
