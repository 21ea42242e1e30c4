//! Cities and their air quality readings.
//!
//! This is the shape consumed by the presentation layer: cards, colour-coded map
//! markers, the pollutant bar chart and the historical line chart. It serialises
//! to camelCase JSON.

use crate::quality::Classification;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Static metadata for one city, as declared in the catalog.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CityMetadata {
    /// Stable key, e.g. `"paris"`.
    pub id: String,
    pub name: String,
    /// Administrative department. Catalog files may leave it out; it is then
    /// derived from the region when the catalog is loaded.
    #[serde(default)]
    pub department: String,
    pub region: String,
    #[serde(default = "default_country")]
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
    pub population: u64,
    #[serde(default)]
    pub description: String,
}

fn default_country() -> String {
    "France".to_string()
}

/// A catalog city with its most recent reading attached.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct City {
    #[serde(flatten)]
    pub info: CityMetadata,
    pub air_quality: AirQualityReading,
}

/// Category of an index value. The live and fallback tables use different
/// subsets of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AirQualityCategory {
    Good,
    Moderate,
    Degraded,
    PoorForSensitiveGroups,
    Poor,
    VeryPoor,
    ExtremelyPoor,
    Dangerous,
}

impl AirQualityCategory {
    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            AirQualityCategory::Good => "Good",
            AirQualityCategory::Moderate => "Moderate",
            AirQualityCategory::Degraded => "Degraded",
            AirQualityCategory::PoorForSensitiveGroups => "Poor for sensitive groups",
            AirQualityCategory::Poor => "Poor",
            AirQualityCategory::VeryPoor => "Very Poor",
            AirQualityCategory::ExtremelyPoor => "Extremely Poor",
            AirQualityCategory::Dangerous => "Dangerous",
        }
    }
}

impl std::fmt::Display for AirQualityCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Direction the index is heading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Improving,
    Stable,
    Worsening,
}

impl Trend {
    pub fn label(&self) -> &'static str {
        match self {
            Trend::Improving => "improving",
            Trend::Stable => "stable",
            Trend::Worsening => "worsening",
        }
    }
}

/// Per-pollutant sub-indices. CO is in mg/m³, the rest in µg/m³.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pollutants {
    pub pm25: f64,
    pub pm10: f64,
    pub no2: f64,
    pub o3: f64,
    pub so2: f64,
    pub co: f64,
}

/// One day of the historical series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalSample {
    pub date: NaiveDate,
    pub aqi: u32,
    pub pm25: u32,
    pub pm10: u32,
    pub no2: u32,
    pub o3: u32,
}

/// A full reading for one city. Replaced wholesale on every refresh.
///
/// `category` and `color` always come from the same classifier call as `aqi`:
/// the only constructor takes a [`Classification`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AirQualityReading {
    aqi: u32,
    category: AirQualityCategory,
    color: String,
    pollutants: Pollutants,
    last_updated: DateTime<Utc>,
    trend: Trend,
    /// Oldest first, one sample per calendar day ending on `last_updated`'s day.
    historical_data: Vec<HistoricalSample>,
}

impl AirQualityReading {
    pub fn new(
        aqi: u32,
        classification: Classification,
        pollutants: Pollutants,
        last_updated: DateTime<Utc>,
        trend: Trend,
        historical_data: Vec<HistoricalSample>,
    ) -> Self {
        Self {
            aqi,
            category: classification.category(),
            color: classification.color().to_string(),
            pollutants,
            last_updated,
            trend,
            historical_data,
        }
    }

    pub fn aqi(&self) -> u32 {
        self.aqi
    }

    pub fn category(&self) -> AirQualityCategory {
        self.category
    }

    /// `#rrggbb` display colour of the category.
    pub fn color(&self) -> &str {
        &self.color
    }

    pub fn pollutants(&self) -> Pollutants {
        self.pollutants
    }

    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    pub fn trend(&self) -> Trend {
        self.trend
    }

    pub fn historical_data(&self) -> &[HistoricalSample] {
        &self.historical_data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_defaults_when_fields_missing() {
        let json = r#"{
            "id": "lille",
            "name": "Lille",
            "region": "Hauts-de-France",
            "latitude": 50.6292,
            "longitude": 3.0573,
            "population": 236234
        }"#;
        let meta: CityMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(meta.country, "France");
        assert!(meta.department.is_empty());
        assert!(meta.description.is_empty());
    }

    #[test]
    fn test_category_labels() {
        assert_eq!(
            AirQualityCategory::PoorForSensitiveGroups.to_string(),
            "Poor for sensitive groups"
        );
        assert_eq!(AirQualityCategory::ExtremelyPoor.label(), "Extremely Poor");
    }

    #[test]
    fn test_reading_takes_category_and_colour_together() {
        use crate::quality::ClassificationProfile;

        let classification = ClassificationProfile::Fallback.classify(70.0);
        let reading = AirQualityReading::new(
            70,
            classification,
            Pollutants::default(),
            chrono::Utc::now(),
            Trend::Worsening,
            Vec::new(),
        );

        assert_eq!(reading.aqi(), 70);
        assert_eq!(reading.category(), AirQualityCategory::Poor);
        assert_eq!(reading.color(), "#ff5050");
        assert_eq!(reading.trend(), Trend::Worsening);

        let json = serde_json::to_value(&reading).unwrap();
        assert_eq!(json["category"], "Poor");
        assert_eq!(json["color"], "#ff5050");
        assert!(json["historicalData"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_trend_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Trend::Stable).unwrap(), "\"stable\"");
    }
}
