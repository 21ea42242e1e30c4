//! The static city catalog and the hand-curated reference snapshot.
//!
//! The catalog is loaded once at startup and never changes afterwards. It comes
//! from the built-in list below or from a JSON file (an array of city records).

use crate::error::{AppError, Result};
use crate::models::{City, CityMetadata, Pollutants, Trend};
use crate::quality::{generate_history, ClassificationProfile, HistoryProfile};
use crate::random::RandomSource;
use chrono::{DateTime, Utc};
use std::path::Path;
use tracing::{info, warn};

struct CatalogRow {
    id: &'static str,
    name: &'static str,
    department: &'static str,
    region: &'static str,
    latitude: f64,
    longitude: f64,
    population: u64,
    description: &'static str,
}

const FRENCH_CITIES: [CatalogRow; 10] = [
    CatalogRow {
        id: "paris",
        name: "Paris",
        department: "Paris",
        region: "Île-de-France",
        latitude: 48.8566,
        longitude: 2.3522,
        population: 2_140_526,
        description: "Capital of France and the country's political, economic and cultural centre.",
    },
    CatalogRow {
        id: "marseille",
        name: "Marseille",
        department: "Bouches-du-Rhône",
        region: "Provence-Alpes-Côte d'Azur",
        latitude: 43.2965,
        longitude: 5.3698,
        population: 870_731,
        description: "Second city of France, major Mediterranean port and gateway to Africa.",
    },
    CatalogRow {
        id: "lyon",
        name: "Lyon",
        department: "Rhône",
        region: "Auvergne-Rhône-Alpes",
        latitude: 45.7640,
        longitude: 4.8357,
        population: 518_635,
        description: "Former capital of the Gauls, major economic hub and UNESCO heritage site.",
    },
    CatalogRow {
        id: "toulouse",
        name: "Toulouse",
        department: "Haute-Garonne",
        region: "Occitanie",
        latitude: 43.6047,
        longitude: 1.4442,
        population: 479_553,
        description: "The pink city, European capital of aeronautics and space.",
    },
    CatalogRow {
        id: "nice",
        name: "Nice",
        department: "Alpes-Maritimes",
        region: "Provence-Alpes-Côte d'Azur",
        latitude: 43.7102,
        longitude: 7.2620,
        population: 342_637,
        description: "Pearl of the Côte d'Azur and a world-renowned destination.",
    },
    CatalogRow {
        id: "nantes",
        name: "Nantes",
        department: "Loire-Atlantique",
        region: "Pays de la Loire",
        latitude: 47.2184,
        longitude: -1.5536,
        population: 320_732,
        description: "Former capital of Brittany, a green and innovative city.",
    },
    CatalogRow {
        id: "montpellier",
        name: "Montpellier",
        department: "Hérault",
        region: "Occitanie",
        latitude: 43.6110,
        longitude: 3.8767,
        population: 295_542,
        description: "Lively university city close to the Mediterranean.",
    },
    CatalogRow {
        id: "strasbourg",
        name: "Strasbourg",
        department: "Bas-Rhin",
        region: "Grand Est",
        latitude: 48.5734,
        longitude: 7.7521,
        population: 284_677,
        description: "European capital, seat of the European Parliament and the Council of Europe.",
    },
    CatalogRow {
        id: "bordeaux",
        name: "Bordeaux",
        department: "Gironde",
        region: "Nouvelle-Aquitaine",
        latitude: 44.8378,
        longitude: -0.5792,
        population: 257_804,
        description: "World wine capital and UNESCO heritage site.",
    },
    CatalogRow {
        id: "lille",
        name: "Lille",
        department: "Nord",
        region: "Hauts-de-France",
        latitude: 50.6292,
        longitude: 3.0573,
        population: 236_234,
        description: "Capital of Flanders, European crossroads and major cultural centre.",
    },
];

/// The built-in catalog, in declaration order.
pub fn french_cities() -> Vec<CityMetadata> {
    FRENCH_CITIES
        .iter()
        .map(|row| CityMetadata {
            id: row.id.to_string(),
            name: row.name.to_string(),
            department: row.department.to_string(),
            region: row.region.to_string(),
            country: "France".to_string(),
            latitude: row.latitude,
            longitude: row.longitude,
            population: row.population,
            description: row.description.to_string(),
        })
        .collect()
}

/// Main department of a region, used when a catalog record leaves it out.
/// Unknown regions map to themselves.
pub fn default_department(region: &str) -> &str {
    match region {
        "Île-de-France" => "Paris",
        "Provence-Alpes-Côte d'Azur" => "Bouches-du-Rhône",
        "Auvergne-Rhône-Alpes" => "Rhône",
        "Occitanie" => "Haute-Garonne",
        "Pays de la Loire" => "Loire-Atlantique",
        "Grand Est" => "Bas-Rhin",
        "Nouvelle-Aquitaine" => "Gironde",
        "Hauts-de-France" => "Nord",
        other => other,
    }
}

/// Reads a catalog file and fills in missing departments.
///
/// Rejects empty catalogs and duplicate ids; order is preserved.
pub fn load_catalog(path: &Path) -> Result<Vec<CityMetadata>> {
    info!("Loading city catalog from {}", path.display());
    let raw = std::fs::read_to_string(path)?;
    let mut cities: Vec<CityMetadata> = serde_json::from_str(&raw)?;

    if cities.is_empty() {
        return Err(AppError::Config(format!(
            "catalog {} contains no cities",
            path.display()
        )));
    }

    let mut seen = std::collections::HashSet::new();
    for city in cities.iter_mut() {
        if !seen.insert(city.id.clone()) {
            return Err(AppError::Config(format!("duplicate city id {:?}", city.id)));
        }
        if city.department.trim().is_empty() {
            let department = default_department(&city.region).to_string();
            warn!(
                "City {} has no department, using {} from region {}",
                city.id, department, city.region
            );
            city.department = department;
        }
    }

    info!("Loaded {} cities", cities.len());
    Ok(cities)
}

/// Curated index, pollutants and trend for one catalog city.
struct ReferenceRow {
    id: &'static str,
    aqi: u32,
    pollutants: Pollutants,
    trend: Trend,
}

const fn reference(
    id: &'static str,
    aqi: u32,
    [pm25, pm10, no2, o3, so2, co]: [f64; 6],
    trend: Trend,
) -> ReferenceRow {
    ReferenceRow {
        id,
        aqi,
        pollutants: Pollutants {
            pm25,
            pm10,
            no2,
            o3,
            so2,
            co,
        },
        trend,
    }
}

#[rustfmt::skip]
const REFERENCE_READINGS: [ReferenceRow; 10] = [
    reference("paris", 78, [32.0, 45.0, 28.0, 85.0, 12.0, 1.2], Trend::Stable),
    reference("marseille", 65, [28.0, 38.0, 22.0, 92.0, 15.0, 0.9], Trend::Improving),
    reference("lyon", 72, [30.0, 42.0, 25.0, 78.0, 10.0, 1.1], Trend::Stable),
    reference("toulouse", 58, [24.0, 35.0, 20.0, 68.0, 8.0, 0.8], Trend::Improving),
    reference("nice", 52, [22.0, 30.0, 18.0, 75.0, 6.0, 0.7], Trend::Stable),
    reference("nantes", 45, [18.0, 28.0, 15.0, 62.0, 5.0, 0.6], Trend::Improving),
    reference("montpellier", 61, [26.0, 36.0, 21.0, 82.0, 9.0, 0.9], Trend::Stable),
    reference("strasbourg", 69, [29.0, 40.0, 24.0, 71.0, 11.0, 1.0], Trend::Worsening),
    reference("bordeaux", 55, [23.0, 32.0, 19.0, 69.0, 7.0, 0.8], Trend::Stable),
    reference("lille", 82, [34.0, 48.0, 30.0, 76.0, 14.0, 1.3], Trend::Worsening),
];

/// The curated snapshot for every catalog city that has one, without any network call.
///
/// Readings use the live classification table and the catalog history profile.
pub fn reference_snapshot(
    catalog: &[CityMetadata],
    now: DateTime<Utc>,
    history_days: usize,
    random: &dyn RandomSource,
) -> Vec<City> {
    catalog
        .iter()
        .filter_map(|info| {
            let row = REFERENCE_READINGS.iter().find(|row| row.id == info.id)?;
            let history = generate_history(
                row.aqi as f64,
                history_days,
                now.date_naive(),
                &HistoryProfile::CATALOG,
                random,
            );
            let air_quality = ClassificationProfile::Live.classify(row.aqi as f64).reading(
                row.aqi,
                row.pollutants,
                now,
                row.trend,
                history,
            );
            Some(City {
                info: info.clone(),
                air_quality,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AirQualityCategory;
    use crate::random::FixedRandom;
    use chrono::TimeZone;
    use std::io::Write;

    #[test]
    fn test_builtin_catalog_order_and_ids() {
        let cities = french_cities();
        let ids: Vec<&str> = cities.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "paris", "marseille", "lyon", "toulouse", "nice", "nantes", "montpellier",
                "strasbourg", "bordeaux", "lille"
            ]
        );
        assert!(cities.iter().all(|c| c.country == "France" && !c.department.is_empty()));
    }

    #[test]
    fn test_default_department() {
        assert_eq!(default_department("Hauts-de-France"), "Nord");
        assert_eq!(default_department("Corse"), "Corse");
    }

    #[test]
    fn test_load_catalog_fills_department() {
        let path = std::env::temp_dir().join(format!("aq-catalog-{}.json", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        write!(
            file,
            r#"[{{"id": "rennes", "name": "Rennes", "region": "Bretagne", "latitude": 48.1173, "longitude": -1.6778, "population": 222485}},
               {{"id": "lille", "name": "Lille", "region": "Hauts-de-France", "latitude": 50.6292, "longitude": 3.0573, "population": 236234}}]"#
        )
        .unwrap();

        let cities = load_catalog(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(cities.len(), 2);
        assert_eq!(cities[0].department, "Bretagne");
        assert_eq!(cities[1].department, "Nord");
    }

    #[test]
    fn test_load_catalog_rejects_duplicates() {
        let path =
            std::env::temp_dir().join(format!("aq-catalog-dup-{}.json", std::process::id()));
        let record = r#"{"id": "nice", "name": "Nice", "region": "Provence-Alpes-Côte d'Azur", "latitude": 43.7, "longitude": 7.26, "population": 1}"#;
        std::fs::write(&path, format!("[{},{}]", record, record)).unwrap();

        let result = load_catalog(&path);
        std::fs::remove_file(&path).ok();
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_missing_catalog_file_is_io_error() {
        let result = load_catalog(Path::new("/definitely/not/here.json"));
        assert!(matches!(result, Err(AppError::Io(_))));
    }

    #[test]
    fn test_reference_snapshot_uses_live_table() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
        let snapshot = reference_snapshot(&french_cities(), now, 30, &FixedRandom(0.5));
        assert_eq!(snapshot.len(), 10);

        let paris = &snapshot[0].air_quality;
        assert_eq!(paris.aqi(), 78);
        assert_eq!(paris.category(), AirQualityCategory::Moderate);
        assert_eq!(paris.color(), "#F59E0B");
        assert_eq!(paris.pollutants().co, 1.2);
        assert_eq!(paris.historical_data().len(), 30);
        assert_eq!(paris.historical_data().last().unwrap().date, now.date_naive());

        let nantes = &snapshot[5].air_quality;
        assert_eq!(nantes.category(), AirQualityCategory::Good);
        assert_eq!(nantes.trend(), Trend::Improving);
    }
}
