//! Provides a client for the Open-Meteo air quality API.
//!
//! This module defines the `OpenMeteoClient` struct, which fetches current
//! conditions and hourly forecasts from `/v1/air-quality`.

use super::AirQualityProvider;
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{AirQualityResponse, CurrentAirQuality, ForecastPoint};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, error, info};

pub const BASE_URL: &str = "https://air-quality-api.open-meteo.com/v1";

/// Fields requested in the `current` block.
pub const CURRENT_FIELDS: &str =
    "european_aqi,pm2_5,pm10,nitrogen_dioxide,ozone,sulphur_dioxide,carbon_monoxide";
/// Fields requested in the `hourly` block.
pub const HOURLY_FIELDS: &str = "european_aqi,pm2_5,pm10,nitrogen_dioxide,ozone,sulphur_dioxide";

/// An asynchronous client for the Open-Meteo air quality API.
pub struct OpenMeteoClient {
    client: Client,
    base_url: String,
    timezone: String,
    forecast_days: u32,
}

impl OpenMeteoClient {
    /// Creates a client from application configuration.
    ///
    /// Every request carries the configured timeout so a stalled provider
    /// turns into a `Network` error instead of hanging the refresh.
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("air-quality-fr/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.provider_url.trim_end_matches('/').to_string(),
            timezone: config.timezone.clone(),
            forecast_days: config.forecast_days,
        })
    }

    /// Creates a client with a custom base URL and default settings.
    ///
    /// This is primarily intended for testing purposes (e.g., using a mock server).
    #[cfg(test)]
    pub fn new_with_base_url(base_url: &str) -> Self {
        let config = Config {
            provider_url: base_url.to_string(),
            ..Config::default()
        };
        Self::new(&config).expect("default client settings are valid")
    }

    async fn get(&self, query: &[(&str, String)]) -> Result<AirQualityResponse> {
        let url = format!("{}/air-quality", self.base_url);

        let response = self.client.get(&url).query(query).send().await.map_err(|e| {
            error!("Error calling air quality provider at {}: {}", url, e);
            AppError::from(e)
        })?;

        // Check HTTP status code and handle potential API errors
        let response = match response.error_for_status() {
            Ok(resp) => resp,
            Err(e) => {
                error!(
                    "Air quality request failed with status {}: {}",
                    e.status().unwrap_or_default(),
                    e
                );
                return Err(AppError::from(e));
            },
        };

        response.json::<AirQualityResponse>().await.map_err(|e| {
            error!("Error parsing air quality response JSON: {}", e);
            AppError::from(e)
        })
    }
}

#[async_trait]
impl AirQualityProvider for OpenMeteoClient {
    /// Fetches current conditions at a point.
    ///
    /// Corresponds to `/v1/air-quality` with `current` fields requested.
    async fn current(&self, latitude: f64, longitude: f64) -> Result<CurrentAirQuality> {
        debug!("Fetching current air quality at ({}, {})", latitude, longitude);

        let body = self
            .get(&[
                ("latitude", latitude.to_string()),
                ("longitude", longitude.to_string()),
                ("current", CURRENT_FIELDS.to_string()),
                ("hourly", HOURLY_FIELDS.to_string()),
                ("timezone", self.timezone.clone()),
                ("forecast_days", self.forecast_days.to_string()),
            ])
            .await?;

        let current = body.current.ok_or_else(|| {
            error!("Response for ({}, {}) has no current block", latitude, longitude);
            AppError::Payload(format!(
                "no current conditions for ({}, {})",
                latitude, longitude
            ))
        })?;

        debug!(
            "Provider index at ({}, {}): {}",
            latitude, longitude, current.european_aqi
        );
        Ok(current)
    }

    /// Fetches the hourly index forecast.
    async fn forecast(
        &self,
        latitude: f64,
        longitude: f64,
        days: u32,
    ) -> Result<Vec<ForecastPoint>> {
        info!(
            "Fetching {}-day forecast at ({}, {})",
            days, latitude, longitude
        );

        let body = self
            .get(&[
                ("latitude", latitude.to_string()),
                ("longitude", longitude.to_string()),
                ("hourly", HOURLY_FIELDS.to_string()),
                ("timezone", self.timezone.clone()),
                ("forecast_days", days.to_string()),
            ])
            .await?;

        let hourly = body.hourly.ok_or_else(|| {
            AppError::Payload(format!("no hourly series for ({}, {})", latitude, longitude))
        })?;

        let series = hourly.index_series();
        debug!("Received {} forecast hours", series.len());
        Ok(series)
    }
}
