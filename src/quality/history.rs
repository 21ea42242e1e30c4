//! Synthetic daily history around a base index value.
//!
//! Two profiles exist: `CATALOG` for the reference snapshot and `LIVE` for
//! readings built from the provider or from fallback data.

use crate::models::HistoricalSample;
use crate::random::RandomSource;
use chrono::{Duration, NaiveDate};

/// Default number of days in a generated series.
pub const DEFAULT_HISTORY_DAYS: usize = 30;

/// Linear mapping from a day's index to one pollutant, plus uniform noise in `[0, noise)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coefficient {
    pub slope: f64,
    pub noise: f64,
}

impl Coefficient {
    const fn new(slope: f64, noise: f64) -> Self {
        Self { slope, noise }
    }

    fn apply(&self, aqi: f64, random: &dyn RandomSource) -> u32 {
        round_to_u32(aqi * self.slope + random.next_f64() * self.noise)
    }
}

/// Clamp range, variation window and pollutant coefficients for one generator variant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoryProfile {
    pub min_aqi: f64,
    pub max_aqi: f64,
    /// Daily index is `base + uniform(-window/2, window/2)`.
    pub window: f64,
    pub pm25: Coefficient,
    pub pm10: Coefficient,
    pub no2: Coefficient,
    pub o3: Coefficient,
}

impl HistoryProfile {
    pub const CATALOG: HistoryProfile = HistoryProfile {
        min_aqi: 10.0,
        max_aqi: 300.0,
        window: 40.0,
        pm25: Coefficient::new(0.4, 10.0),
        pm10: Coefficient::new(0.6, 15.0),
        no2: Coefficient::new(0.3, 8.0),
        o3: Coefficient::new(0.5, 12.0),
    };

    pub const LIVE: HistoryProfile = HistoryProfile {
        min_aqi: 5.0,
        max_aqi: 100.0,
        window: 30.0,
        pm25: Coefficient::new(0.4, 10.0),
        pm10: Coefficient::new(0.6, 15.0),
        no2: Coefficient::new(0.3, 8.0),
        o3: Coefficient::new(0.5, 12.0),
    };
}

/// Produces `days` samples, one per calendar day, oldest first, the last one on `today`.
pub fn generate_history(
    base_aqi: f64,
    days: usize,
    today: NaiveDate,
    profile: &HistoryProfile,
    random: &dyn RandomSource,
) -> Vec<HistoricalSample> {
    (0..days)
        .rev()
        .map(|days_ago| {
            let variation = (random.next_f64() - 0.5) * profile.window;
            let aqi = (base_aqi + variation).clamp(profile.min_aqi, profile.max_aqi);
            HistoricalSample {
                date: today - Duration::days(days_ago as i64),
                aqi: round_to_u32(aqi),
                pm25: profile.pm25.apply(aqi, random),
                pm10: profile.pm10.apply(aqi, random),
                no2: profile.no2.apply(aqi, random),
                o3: profile.o3.apply(aqi, random),
            }
        })
        .collect()
}

/// Rounds half up and saturates at zero.
pub(crate) fn round_to_u32(value: f64) -> u32 {
    value.round().max(0.0) as u32
}
