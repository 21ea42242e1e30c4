//! Wire types for the Open-Meteo air quality API.
//!
//! Only `current` feeds the assembler. `hourly` is kept for the forecast view.

use serde::{Deserialize, Serialize};

/// Response body of `GET /v1/air-quality`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AirQualityResponse {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub current: Option<CurrentAirQuality>,
    #[serde(default)]
    pub hourly: Option<HourlyAirQuality>,
}

/// Current conditions at the requested point.
///
/// The index is required. Pollutants can come back `null` for some grid cells.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CurrentAirQuality {
    #[serde(default)]
    pub time: Option<String>,
    pub european_aqi: f64,
    #[serde(default)]
    pub pm2_5: Option<f64>,
    #[serde(default)]
    pub pm10: Option<f64>,
    #[serde(default)]
    pub nitrogen_dioxide: Option<f64>,
    #[serde(default)]
    pub ozone: Option<f64>,
    #[serde(default)]
    pub sulphur_dioxide: Option<f64>,
    /// µg/m³ as sent by the provider.
    #[serde(default)]
    pub carbon_monoxide: Option<f64>,
}

/// Hourly series, parallel arrays indexed by `time`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct HourlyAirQuality {
    pub time: Vec<String>,
    #[serde(default)]
    pub european_aqi: Vec<Option<f64>>,
    #[serde(default)]
    pub pm2_5: Vec<Option<f64>>,
    #[serde(default)]
    pub pm10: Vec<Option<f64>>,
    #[serde(default)]
    pub nitrogen_dioxide: Vec<Option<f64>>,
    #[serde(default)]
    pub ozone: Vec<Option<f64>>,
    #[serde(default)]
    pub sulphur_dioxide: Vec<Option<f64>>,
}

/// One hour of forecast index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastPoint {
    /// Local time string as returned by the provider, e.g. `2024-06-01T13:00`.
    pub time: String,
    pub european_aqi: f64,
}

impl HourlyAirQuality {
    /// Pairs each timestamp with its index, skipping hours the provider left empty.
    pub fn index_series(&self) -> Vec<ForecastPoint> {
        self.time
            .iter()
            .zip(self.european_aqi.iter())
            .filter_map(|(time, aqi)| {
                aqi.map(|european_aqi| ForecastPoint {
                    time: time.clone(),
                    european_aqi,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_with_null_pollutants() {
        let json = r#"{
            "latitude": 48.86,
            "longitude": 2.35,
            "current": {
                "time": "2024-06-01T12:00",
                "european_aqi": 42.0,
                "pm2_5": null,
                "pm10": 12.5
            }
        }"#;
        let resp: AirQualityResponse = serde_json::from_str(json).unwrap();
        let current = resp.current.unwrap();
        assert_eq!(current.european_aqi, 42.0);
        assert_eq!(current.pm2_5, None);
        assert_eq!(current.pm10, Some(12.5));
        assert!(resp.hourly.is_none());
    }

    #[test]
    fn test_index_series_skips_gaps() {
        let hourly = HourlyAirQuality {
            time: vec!["t0".into(), "t1".into(), "t2".into()],
            european_aqi: vec![Some(20.0), None, Some(35.0)],
            ..Default::default()
        };
        let series = hourly.index_series();
        assert_eq!(series.len(), 2);
        assert_eq!(series[1].time, "t2");
        assert_eq!(series[1].european_aqi, 35.0);
    }
}
