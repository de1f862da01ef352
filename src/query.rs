// Query client: itinerary search and the provider directory
use std::sync::Arc;
use tracing::{debug, info};

use crate::api::{ApiError, BookingService};
use crate::models::{BusProvider, District, ProviderDetails, SearchRequest, SearchResult};
use crate::validation::{self, ValidationError};

/// User-entered search criteria.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchCriteria {
    pub from_district: String,
    pub to_district: String,
    pub max_price: Option<u32>,
}

impl SearchCriteria {
    pub fn new(from_district: &str, to_district: &str) -> Self {
        Self {
            from_district: from_district.to_string(),
            to_district: to_district.to_string(),
            max_price: None,
        }
    }

    pub fn with_max_price(mut self, max_price: u32) -> Self {
        self.max_price = Some(max_price);
        self
    }

    /// Checks the criteria and builds the request payload.
    pub fn to_request(&self) -> Result<SearchRequest, ValidationError> {
        Ok(SearchRequest {
            from_district: validation::require("from_district", &self.from_district)?.to_string(),
            to_district: validation::require("to_district", &self.to_district)?.to_string(),
            max_price: validation::max_price(self.max_price)?,
        })
    }

    /// Rejects districts missing from a previously fetched reference list.
    pub fn check_known(&self, districts: &[District]) -> Result<(), ValidationError> {
        validation::known_district(self.from_district.trim(), districts)?;
        validation::known_district(self.to_district.trim(), districts)?;
        Ok(())
    }
}

/// Client-side, case-insensitive name filter over a fetched provider list.
pub fn filter_by_name<'a>(providers: &'a [BusProvider], query: &str) -> Vec<&'a BusProvider> {
    let needle = query.trim().to_lowercase();
    providers
        .iter()
        .filter(|p| p.name.to_lowercase().contains(&needle))
        .collect()
}

pub struct QueryClient {
    service: Arc<dyn BookingService>,
}

impl QueryClient {
    pub fn new(service: Arc<dyn BookingService>) -> Self {
        Self { service }
    }

    /// One round trip per call. An empty result means "no match"; failures
    /// come back as errors, never as an empty list.
    pub async fn search(&self, criteria: &SearchCriteria) -> Result<Vec<SearchResult>, ApiError> {
        let request = criteria.to_request()?;
        debug!(
            from = %request.from_district,
            to = %request.to_district,
            max_price = ?request.max_price,
            "searching buses"
        );

        let results = self.service.search_buses(&request).await?;
        info!(
            from = %request.from_district,
            to = %request.to_district,
            count = results.len(),
            "search completed"
        );
        Ok(results)
    }

    pub async fn list_districts(&self) -> Result<Vec<District>, ApiError> {
        self.service.districts().await
    }

    pub async fn list_providers(&self) -> Result<Vec<BusProvider>, ApiError> {
        self.service.providers().await
    }

    pub async fn list_providers_in(&self, district: &str) -> Result<Vec<BusProvider>, ApiError> {
        let district = validation::require("district", district)?;
        self.service.providers_in_district(district).await
    }

    pub async fn provider_details(&self, name: &str) -> Result<ProviderDetails, ApiError> {
        let name = validation::require("provider", name)?;
        self.service.provider_details(name).await
    }
}
