//! Maps an index value to a category and display colour.
//!
//! Two tables are in use. `Live` spans the full 0-300+ scale and is applied to
//! provider data and the reference snapshot. `Fallback` is compressed to 20-point
//! steps and is applied only to synthesized readings. They disagree on the same
//! value (e.g. 45 is "Good" live but "Degraded" as fallback); do not merge them
//! without product sign-off.

use crate::models::{AirQualityCategory, AirQualityReading, HistoricalSample, Pollutants, Trend};
use chrono::{DateTime, Utc};

/// Which threshold table to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassificationProfile {
    /// 50/100/150/200/300 thresholds.
    Live,
    /// 20/40/60/80/100 thresholds.
    Fallback,
}

struct Band {
    ceiling: f64,
    category: AirQualityCategory,
    color: &'static str,
}

const LIVE_BANDS: [Band; 6] = [
    Band {
        ceiling: 50.0,
        category: AirQualityCategory::Good,
        color: "#10B981",
    },
    Band {
        ceiling: 100.0,
        category: AirQualityCategory::Moderate,
        color: "#F59E0B",
    },
    Band {
        ceiling: 150.0,
        category: AirQualityCategory::PoorForSensitiveGroups,
        color: "#EF4444",
    },
    Band {
        ceiling: 200.0,
        category: AirQualityCategory::Poor,
        color: "#DC2626",
    },
    Band {
        ceiling: 300.0,
        category: AirQualityCategory::VeryPoor,
        color: "#7C2D12",
    },
    Band {
        ceiling: f64::INFINITY,
        category: AirQualityCategory::Dangerous,
        color: "#450A0A",
    },
];

const FALLBACK_BANDS: [Band; 6] = [
    Band {
        ceiling: 20.0,
        category: AirQualityCategory::Good,
        color: "#50f0e6",
    },
    Band {
        ceiling: 40.0,
        category: AirQualityCategory::Moderate,
        color: "#50ccaa",
    },
    Band {
        ceiling: 60.0,
        category: AirQualityCategory::Degraded,
        color: "#f0e641",
    },
    Band {
        ceiling: 80.0,
        category: AirQualityCategory::Poor,
        color: "#ff5050",
    },
    Band {
        ceiling: 100.0,
        category: AirQualityCategory::VeryPoor,
        color: "#960032",
    },
    Band {
        ceiling: f64::INFINITY,
        category: AirQualityCategory::ExtremelyPoor,
        color: "#7d2181",
    },
];

/// Result of classifying one index value. Only [`ClassificationProfile::classify`] builds one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    category: AirQualityCategory,
    color: &'static str,
}

impl ClassificationProfile {
    fn bands(&self) -> &'static [Band; 6] {
        match self {
            ClassificationProfile::Live => &LIVE_BANDS,
            ClassificationProfile::Fallback => &FALLBACK_BANDS,
        }
    }

    /// Classifies `value`. Boundaries belong to the lower category. NaN lands in
    /// the top band.
    pub fn classify(&self, value: f64) -> Classification {
        let bands = self.bands();
        let band = bands
            .iter()
            .find(|band| value <= band.ceiling)
            .unwrap_or(&bands[bands.len() - 1]);
        Classification {
            category: band.category,
            color: band.color,
        }
    }
}

impl Classification {
    pub fn category(&self) -> AirQualityCategory {
        self.category
    }

    pub fn color(&self) -> &'static str {
        self.color
    }

    /// Builds a reading whose category and colour are this classification.
    pub fn reading(
        self,
        aqi: u32,
        pollutants: Pollutants,
        last_updated: DateTime<Utc>,
        trend: Trend,
        historical_data: Vec<HistoricalSample>,
    ) -> AirQualityReading {
        AirQualityReading::new(aqi, self, pollutants, last_updated, trend, historical_data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use crate::models::AirQualityCategory::*;

    #[rstest]
    #[case(0.0, Good, "#10B981")]
    #[case(50.0, Good, "#10B981")]
    #[case(50.5, Moderate, "#F59E0B")]
    #[case(78.0, Moderate, "#F59E0B")]
    #[case(100.0, Moderate, "#F59E0B")]
    #[case(101.0, PoorForSensitiveGroups, "#EF4444")]
    #[case(150.0, PoorForSensitiveGroups, "#EF4444")]
    #[case(200.0, Poor, "#DC2626")]
    #[case(300.0, VeryPoor, "#7C2D12")]
    #[case(301.0, Dangerous, "#450A0A")]
    #[case(500.0, Dangerous, "#450A0A")]
    fn test_live_table(
        #[case] value: f64,
        #[case] category: AirQualityCategory,
        #[case] color: &str,
    ) {
        let c = ClassificationProfile::Live.classify(value);
        assert_eq!(c.category(), category);
        assert_eq!(c.color(), color);
    }

    #[rstest]
    #[case(0.0, Good, "#50f0e6")]
    #[case(20.0, Good, "#50f0e6")]
    #[case(21.0, Moderate, "#50ccaa")]
    #[case(40.0, Moderate, "#50ccaa")]
    #[case(60.0, Degraded, "#f0e641")]
    #[case(61.0, Poor, "#ff5050")]
    #[case(80.0, Poor, "#ff5050")]
    #[case(100.0, VeryPoor, "#960032")]
    #[case(100.1, ExtremelyPoor, "#7d2181")]
    fn test_fallback_table(
        #[case] value: f64,
        #[case] category: AirQualityCategory,
        #[case] color: &str,
    ) {
        let c = ClassificationProfile::Fallback.classify(value);
        assert_eq!(c.category(), category);
        assert_eq!(c.color(), color);
    }

    #[test]
    fn test_tables_disagree_on_same_value() {
        let live = ClassificationProfile::Live.classify(45.0);
        let fallback = ClassificationProfile::Fallback.classify(45.0);
        assert_eq!(live.category(), Good);
        assert_eq!(fallback.category(), Degraded);
    }

    #[test]
    fn test_color_is_fixed_per_category() {
        // Every value in a band must yield the band's colour.
        for profile in [ClassificationProfile::Live, ClassificationProfile::Fallback] {
            let mut seen: std::collections::HashMap<AirQualityCategory, &str> =
                std::collections::HashMap::new();
            for v in 0..=400 {
                let c = profile.classify(v as f64);
                let color = seen.entry(c.category()).or_insert(c.color());
                assert_eq!(*color, c.color());
            }
            assert_eq!(seen.len(), 6);
        }
    }

    #[test]
    fn test_nan_falls_in_top_band() {
        assert_eq!(ClassificationProfile::Live.classify(f64::NAN).category(), Dangerous);
    }
}
