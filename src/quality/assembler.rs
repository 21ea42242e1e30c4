//! Builds one city's reading: live from the provider, or synthesized from the
//! fallback cache when the provider cannot be reached.

use super::{generate_history, ClassificationProfile, FallbackCache, HistoryProfile};
use crate::api::AirQualityProvider;
use crate::clock::Clock;
use crate::error::{AppError, Result};
use crate::models::{AirQualityReading, City, CityMetadata, CurrentAirQuality, Pollutants, Trend};
use crate::quality::history::round_to_u32;
use crate::random::RandomSource;
use std::sync::Arc;
use tracing::{debug, warn};

/// Provider CO units (µg/m³) per display unit (mg/m³).
const CO_UNIT_DIVISOR: f64 = 1000.0;

/// Where a reading came from. Visible to the loader only; the produced
/// `City` does not carry it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadingSource {
    Live,
    Fallback,
}

/// A city together with how its reading was obtained.
#[derive(Debug, Clone)]
pub struct AssembledCity {
    pub city: City,
    pub source: ReadingSource,
}

/// Pollutant breakdown synthesized from a fallback index.
pub fn fallback_pollutants(aqi: f64) -> Pollutants {
    Pollutants {
        pm25: (aqi * 0.4).round(),
        pm10: (aqi * 0.6).round(),
        no2: (aqi * 0.3).round(),
        o3: (aqi * 0.5).round(),
        so2: (aqi * 0.2).round(),
        co: (aqi * 0.1).round(),
    }
}

/// Assembles readings for single cities. Cheap to share behind an `Arc`.
pub struct CityAssembler {
    provider: Arc<dyn AirQualityProvider>,
    cache: Arc<FallbackCache>,
    random: Arc<dyn RandomSource>,
    clock: Arc<dyn Clock>,
    history_days: usize,
}

impl CityAssembler {
    pub fn new(
        provider: Arc<dyn AirQualityProvider>,
        cache: Arc<FallbackCache>,
        random: Arc<dyn RandomSource>,
        clock: Arc<dyn Clock>,
        history_days: usize,
    ) -> Self {
        Self {
            provider,
            cache,
            random,
            clock,
            history_days,
        }
    }

    pub fn provider(&self) -> &Arc<dyn AirQualityProvider> {
        &self.provider
    }

    pub fn cache(&self) -> &FallbackCache {
        &self.cache
    }

    pub fn random(&self) -> &dyn RandomSource {
        self.random.as_ref()
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn history_days(&self) -> usize {
        self.history_days
    }

    /// Produces a fully populated reading for `info`.
    ///
    /// Network failures are absorbed into a fallback reading. Anything else
    /// (currently: unusable coordinates) is returned as `AppError::Assembly`.
    pub async fn assemble(&self, info: &CityMetadata) -> Result<AssembledCity> {
        validate_coordinates(info)?;

        match self.provider.current(info.latitude, info.longitude).await {
            Ok(current) => {
                debug!("Live reading for {}: index {}", info.id, current.european_aqi);
                Ok(AssembledCity {
                    city: City {
                        info: info.clone(),
                        air_quality: self.live_reading(&current),
                    },
                    source: ReadingSource::Live,
                })
            },
            Err(e) if e.is_network() => {
                warn!("Provider unavailable for {} ({}), using fallback data", info.id, e);
                Ok(AssembledCity {
                    city: City {
                        info: info.clone(),
                        air_quality: self.fallback_reading(&info.id),
                    },
                    source: ReadingSource::Fallback,
                })
            },
            Err(e) => Err(e),
        }
    }

    /// Reading from provider data: live table, live history profile.
    pub fn live_reading(&self, current: &CurrentAirQuality) -> AirQualityReading {
        let aqi = round_to_u32(current.european_aqi);
        let pollutants = Pollutants {
            pm25: non_negative(current.pm2_5).round(),
            pm10: non_negative(current.pm10).round(),
            no2: non_negative(current.nitrogen_dioxide).round(),
            o3: non_negative(current.ozone).round(),
            so2: non_negative(current.sulphur_dioxide).round(),
            co: (non_negative(current.carbon_monoxide) / CO_UNIT_DIVISOR).round(),
        };
        let now = self.clock.now();
        let history = generate_history(
            current.european_aqi,
            self.history_days,
            now.date_naive(),
            &HistoryProfile::LIVE,
            self.random.as_ref(),
        );

        ClassificationProfile::Live
            .classify(aqi as f64)
            .reading(aqi, pollutants, now, Trend::Stable, history)
    }

    /// Reading synthesized through the fallback cache: fallback table, live history profile.
    pub fn fallback_reading(&self, city_id: &str) -> AirQualityReading {
        let value = self.cache.derive_next(city_id, self.random.as_ref());
        let aqi = round_to_u32(value);
        let now = self.clock.now();
        let history = generate_history(
            value,
            self.history_days,
            now.date_naive(),
            &HistoryProfile::LIVE,
            self.random.as_ref(),
        );

        ClassificationProfile::Fallback.classify(aqi as f64).reading(
            aqi,
            fallback_pollutants(value),
            now,
            Trend::Stable,
            history,
        )
    }
}

fn non_negative(value: Option<f64>) -> f64 {
    value.unwrap_or(0.0).max(0.0)
}

fn validate_coordinates(info: &CityMetadata) -> Result<()> {
    let lat_ok = info.latitude.is_finite() && (-90.0..=90.0).contains(&info.latitude);
    let lon_ok = info.longitude.is_finite() && (-180.0..=180.0).contains(&info.longitude);
    if lat_ok && lon_ok {
        Ok(())
    } else {
        Err(AppError::Assembly(format!(
            "{} has invalid coordinates ({}, {})",
            info.id, info.latitude, info.longitude
        )))
    }
}
