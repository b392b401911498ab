use async_trait::async_trait;
use tracing::{debug, info};

use super::client::HttpClient;
use super::load_forecast;
use crate::config::CitiesConfig;
use crate::error::FetchError;
use crate::forecast::ForecastDocument;

/// Obtains the forecast of one city. A single attempt: either a validated
/// document or a typed failure.
#[async_trait]
pub trait ForecastSource: Send + Sync {
    async fn fetch(&self, city: &str) -> Result<ForecastDocument, FetchError>;
}

/// A [`ForecastSource`] that resolves city names through a [`CitiesConfig`]
/// and loads each location over HTTP or from disk.
pub struct UrlSource<C> {
    client: C,
    cities: CitiesConfig,
}

impl<C: HttpClient> UrlSource<C> {
    pub fn new(client: C, cities: CitiesConfig) -> Self {
        Self { client, cities }
    }

    pub fn cities(&self) -> &CitiesConfig {
        &self.cities
    }
}

#[async_trait]
impl<C: HttpClient> ForecastSource for UrlSource<C> {
    async fn fetch(&self, city: &str) -> Result<ForecastDocument, FetchError> {
        let location = self.cities.location(city).ok_or_else(|| {
            FetchError::MalformedDocument(format!("please check that city {city} exists"))
        })?;

        debug!(city, location, "Fetching forecast");
        let fetch_start = std::time::Instant::now();
        let doc = load_forecast(&self.client, location).await?;

        info!(
            city,
            display_name = %doc.city_display_name,
            days = doc.days.len(),
            elapsed_ms = fetch_start.elapsed().as_millis() as u64,
            "Forecast fetched"
        );
        Ok(doc)
    }
}
