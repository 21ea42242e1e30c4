//! Terminal output: tables, colour-coded categories, summaries.

use crate::models::{AirQualityReading, City, ForecastPoint};
use crate::quality::ClassificationProfile;
use crate::stats::{self, FleetSummary, DISPLAY_HISTORY_DAYS};
use colored::*;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, Table};

/// Parses `#rrggbb`.
fn hex_rgb(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}

fn category_cell(reading: &AirQualityReading) -> Cell {
    let cell = Cell::new(reading.category().label());
    match hex_rgb(reading.color()) {
        Some((r, g, b)) => cell.fg(Color::Rgb { r, g, b }),
        None => cell,
    }
}

fn colored_category(reading: &AirQualityReading) -> ColoredString {
    let label = reading.category().label();
    match hex_rgb(reading.color()) {
        Some((r, g, b)) => label.truecolor(r, g, b).bold(),
        None => label.normal(),
    }
}

pub fn print_warning(error: Option<&str>) {
    if let Some(error) = error {
        println!("{} {}", "Warning:".yellow().bold(), error.yellow());
    }
}

pub fn cities_table(cities: &[&City]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "City", "Department", "Region", "AQI", "Category", "Trend", "PM2.5", "PM10", "NO2",
        "O3", "SO2", "CO",
    ]);
    for city in cities {
        let aq = &city.air_quality;
        table.add_row(vec![
            Cell::new(&city.info.name),
            Cell::new(&city.info.department),
            Cell::new(&city.info.region),
            Cell::new(aq.aqi()),
            category_cell(aq),
            Cell::new(aq.trend().label()),
            Cell::new(aq.pollutants().pm25),
            Cell::new(aq.pollutants().pm10),
            Cell::new(aq.pollutants().no2),
            Cell::new(aq.pollutants().o3),
            Cell::new(aq.pollutants().so2),
            Cell::new(aq.pollutants().co),
        ]);
    }
    table
}

pub fn print_summary(summary: &FleetSummary) {
    println!("{}", "National overview".cyan().bold());
    println!(
        "Average AQI: {} ({})",
        summary.average_aqi.to_string().bold(),
        summary.average_label
    );
    println!(
        "Clean air cities: {} ({}%)",
        summary.good_air_cities, summary.good_air_percent
    );
    println!(
        "Polluted cities: {} ({}% with AQI > {})",
        summary.polluted_cities,
        summary.polluted_percent,
        stats::GOOD_AIR_THRESHOLD
    );
    println!(
        "Trends: {} improving vs {} worsening",
        summary.improving, summary.worsening
    );
    println!(
        "Cities: {}, total population: {}",
        summary.city_count, summary.total_population
    );
}

pub fn print_ranking(title: &str, cities: &[&City]) {
    println!("{}", title.cyan().bold());
    for (rank, city) in cities.iter().enumerate() {
        println!(
            "  {}. {:<14} {:>4}  {}",
            rank + 1,
            city.info.name,
            city.air_quality.aqi(),
            colored_category(&city.air_quality)
        );
    }
}

pub fn print_city(city: &City) {
    let aq = &city.air_quality;
    println!(
        "{} ({}, {})",
        city.info.name.cyan().bold(),
        city.info.department,
        city.info.region
    );
    if !city.info.description.is_empty() {
        println!("{}", city.info.description.dimmed());
    }
    println!(
        "Coordinates: {:.4}, {:.4}  Population: {}",
        city.info.latitude, city.info.longitude, city.info.population
    );
    println!(
        "AQI {} - {} - trend {} - updated {}",
        aq.aqi().to_string().bold(),
        colored_category(aq),
        aq.trend().label(),
        aq.last_updated().format("%Y-%m-%d %H:%M UTC")
    );
    println!(
        "PM2.5 {} µg/m³ | PM10 {} µg/m³ | NO2 {} µg/m³ | O3 {} µg/m³ | SO2 {} µg/m³ | CO {} mg/m³",
        aq.pollutants().pm25,
        aq.pollutants().pm10,
        aq.pollutants().no2,
        aq.pollutants().o3,
        aq.pollutants().so2,
        aq.pollutants().co
    );

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Date", "AQI", "PM2.5", "PM10", "NO2", "O3"]);
    for sample in stats::recent_history(aq.historical_data(), DISPLAY_HISTORY_DAYS) {
        table.add_row(vec![
            Cell::new(sample.date),
            Cell::new(sample.aqi),
            Cell::new(sample.pm25),
            Cell::new(sample.pm10),
            Cell::new(sample.no2),
            Cell::new(sample.o3),
        ]);
    }
    println!("Last {} days:\n{}", DISPLAY_HISTORY_DAYS, table);
}

pub fn print_forecast(city: &str, points: &[ForecastPoint]) {
    println!("{} {}", "Hourly forecast for".cyan().bold(), city.cyan().bold());
    if points.is_empty() {
        println!("No forecast data returned.");
        return;
    }
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec!["Time", "AQI", "Category"]);
    for point in points {
        let c = ClassificationProfile::Live.classify(point.european_aqi);
        let mut cell = Cell::new(c.category().label());
        if let Some((r, g, b)) = hex_rgb(c.color()) {
            cell = cell.fg(Color::Rgb { r, g, b });
        }
        table.add_row(vec![
            Cell::new(&point.time),
            Cell::new(format!("{:.0}", point.european_aqi)),
            cell,
        ]);
    }
    println!("{}", table);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::french_cities;
    use crate::models::Trend;
    use chrono::Utc;

    #[test]
    fn test_hex_rgb() {
        assert_eq!(hex_rgb("#10B981"), Some((0x10, 0xB9, 0x81)));
        assert_eq!(hex_rgb("#7d2181"), Some((0x7d, 0x21, 0x81)));
        assert_eq!(hex_rgb("10B981"), None);
        assert_eq!(hex_rgb("#zzzzzz"), None);
        assert_eq!(hex_rgb("#fff"), None);
    }

    #[test]
    fn test_cities_table_has_row_per_city() {
        let info = french_cities().remove(0);
        let air_quality = ClassificationProfile::Live.classify(78.0).reading(
            78,
            Default::default(),
            Utc::now(),
            Trend::Stable,
            Vec::new(),
        );
        let city = City { info, air_quality };
        let table = cities_table(&[&city]);
        assert_eq!(table.row_iter().count(), 1);
        let rendered = table.to_string();
        assert!(rendered.contains("Paris"));
        assert!(rendered.contains("Moderate"));
    }
}
