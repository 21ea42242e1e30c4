//! Provides clients and utilities for interacting with external APIs.
//!
//! Includes:
//! - `AirQualityProvider`: the seam the assembler calls through.
//! - `open_meteo`: client for the Open-Meteo air quality API.

mod open_meteo;

pub use open_meteo::*;

use crate::error::Result;
use crate::models::{CurrentAirQuality, ForecastPoint};
use async_trait::async_trait;

/// A remote source of air quality readings for a coordinate pair.
///
/// One call, no retries, no caching. Failures are `AppError::Network` or
/// `AppError::Payload`; retry policy belongs to the caller.
#[async_trait]
pub trait AirQualityProvider: Send + Sync {
    /// Current index and per-pollutant readings.
    async fn current(&self, latitude: f64, longitude: f64) -> Result<CurrentAirQuality>;

    /// Hourly index forecast for the next `days` days.
    async fn forecast(
        &self,
        latitude: f64,
        longitude: f64,
        days: u32,
    ) -> Result<Vec<ForecastPoint>>;
}
