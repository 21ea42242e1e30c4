//! Dashboard statistics over a set of cities.

use crate::models::{City, HistoricalSample, Trend};
use serde::Serialize;

/// Cities at or below this index count as having good air.
pub const GOOD_AIR_THRESHOLD: u32 = 50;
/// Number of days shown in the compact history chart.
pub const DISPLAY_HISTORY_DAYS: usize = 7;

/// Headline numbers for the national overview.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FleetSummary {
    pub city_count: usize,
    /// Rounded mean index, 0 for an empty set.
    pub average_aqi: u32,
    pub average_label: &'static str,
    pub good_air_cities: usize,
    pub good_air_percent: u32,
    pub polluted_cities: usize,
    pub polluted_percent: u32,
    pub improving: usize,
    pub worsening: usize,
    pub total_population: u64,
}

/// Coarse label for the national average.
pub fn headline_label(aqi: u32) -> &'static str {
    if aqi <= 50 {
        "Good"
    } else if aqi <= 100 {
        "Moderate"
    } else {
        "Poor"
    }
}

fn percent(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        0
    } else {
        (part as f64 * 100.0 / whole as f64).round() as u32
    }
}

pub fn summarize(cities: &[City]) -> FleetSummary {
    let city_count = cities.len();
    let average_aqi = if city_count == 0 {
        0
    } else {
        let total: u64 = cities.iter().map(|c| c.air_quality.aqi() as u64).sum();
        (total as f64 / city_count as f64).round() as u32
    };
    let good_air_cities = cities
        .iter()
        .filter(|c| c.air_quality.aqi() <= GOOD_AIR_THRESHOLD)
        .count();
    let polluted_cities = city_count - good_air_cities;
    let count_trend =
        |trend: Trend| cities.iter().filter(|c| c.air_quality.trend() == trend).count();

    FleetSummary {
        city_count,
        average_aqi,
        average_label: headline_label(average_aqi),
        good_air_cities,
        good_air_percent: percent(good_air_cities, city_count),
        polluted_cities,
        polluted_percent: percent(polluted_cities, city_count),
        improving: count_trend(Trend::Improving),
        worsening: count_trend(Trend::Worsening),
        total_population: cities.iter().map(|c| c.info.population).sum(),
    }
}

/// The `n` cleanest cities, lowest index first. Ties keep catalog order.
pub fn best_cities(cities: &[City], n: usize) -> Vec<&City> {
    let mut sorted: Vec<&City> = cities.iter().collect();
    sorted.sort_by_key(|c| c.air_quality.aqi());
    sorted.truncate(n);
    sorted
}

/// The `n` most polluted cities, highest index first. Ties keep catalog order.
pub fn worst_cities(cities: &[City], n: usize) -> Vec<&City> {
    let mut sorted: Vec<&City> = cities.iter().collect();
    sorted.sort_by_key(|c| std::cmp::Reverse(c.air_quality.aqi()));
    sorted.truncate(n);
    sorted
}

/// Case-insensitive substring match on name, region or department.
pub fn search<'a>(cities: &'a [City], term: &str) -> Vec<&'a City> {
    let needle = term.trim().to_lowercase();
    cities
        .iter()
        .filter(|c| {
            needle.is_empty()
                || c.info.name.to_lowercase().contains(&needle)
                || c.info.region.to_lowercase().contains(&needle)
                || c.info.department.to_lowercase().contains(&needle)
        })
        .collect()
}

/// The last `days` samples of a series (the whole series if shorter).
pub fn recent_history(history: &[HistoricalSample], days: usize) -> &[HistoricalSample] {
    &history[history.len().saturating_sub(days)..]
}
