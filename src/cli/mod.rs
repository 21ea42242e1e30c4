//! Handles Command Line Interface (CLI) related functionalities.
//!
//! Includes defining commands, parsing arguments, handling user interaction
//! (prompts, menus), and rendering cities, summaries and forecasts to the terminal.

mod commands;
mod render;

pub use commands::*;

use crate::error::Result;
use crate::models::CityMetadata;
use dialoguer::{theme::ColorfulTheme, FuzzySelect, Input};

/// Asks the user to pick a city from the catalog. Returns its id.
pub fn prompt_city(catalog: &[CityMetadata]) -> Result<String> {
    let names: Vec<String> = catalog
        .iter()
        .map(|c| format!("{} ({})", c.name, c.region))
        .collect();
    let index = FuzzySelect::with_theme(&ColorfulTheme::default())
        .with_prompt("Which city?")
        .items(&names)
        .default(0)
        .interact()?;
    Ok(catalog[index].id.clone())
}

/// Asks for a free-text search term.
pub fn prompt_search_term() -> Result<String> {
    let term: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Search by city, region or department")
        .allow_empty(true)
        .interact_text()?;
    Ok(term)
}

/// Asks for a forecast length in days (1-7).
pub fn prompt_forecast_days() -> Result<u32> {
    let days: u32 = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Forecast days (1-7)")
        .default(3)
        .validate_with(|d: &u32| {
            if (1..=7).contains(d) {
                Ok(())
            } else {
                Err("enter a number between 1 and 7")
            }
        })
        .interact_text()?;
    Ok(days)
}

/// Asks where to write the JSON export.
pub fn prompt_export_path() -> Result<String> {
    let path: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Export file")
        .default("air-quality.json".to_string())
        .interact_text()?;
    Ok(path)
}
