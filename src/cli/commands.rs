use super::render;
use crate::api::OpenMeteoClient;
use crate::catalog::{self, french_cities, load_catalog};
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{City, CityMetadata};
use crate::quality::{CityAssembler, FallbackCache, FleetLoader, FleetSnapshot, RefreshOutcome};
use crate::random::{RandomSource, SeededRandom, ThreadRandom};
use crate::stats;
use chrono::{DateTime, Duration, Utc};
use clap::{Parser, Subcommand};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Air quality dashboard for French cities
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Runs one command and exits. Without it an interactive menu starts.
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// National overview with the best and worst cities
    Dashboard {
        /// How many cities to list in each ranking
        #[arg(short, long, default_value = "5")]
        top: usize,
    },

    /// Table of every city with its current reading
    Cities,

    /// Detailed reading and recent history for one city
    City {
        /// City id, e.g. "paris"
        id: String,
    },

    /// Find cities by name, region or department
    Search {
        term: String,
    },

    /// Hourly index forecast for one city
    Forecast {
        /// City id, e.g. "lyon"
        id: String,
        /// Number of days (1-7)
        #[arg(short, long, default_value = "3")]
        days: u32,
    },

    /// Curated reference readings, no network access
    Reference,

    /// Reload every city from the provider
    Refresh,

    /// Write the current data set as JSON
    Export {
        /// Output file
        path: PathBuf,
    },
}

/// Document written by the `export` command.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportDocument<'a> {
    generated_at: DateTime<Utc>,
    warning: Option<&'a str>,
    cities: &'a [City],
}

/// CLI application
pub struct App {
    loader: FleetLoader,
    clock: Arc<dyn Clock>,
    random: Arc<dyn RandomSource>,
    history_days: usize,
}

impl App {
    /// Wires the provider client, fallback cache, assembler and loader from configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let catalog = match &config.catalog_path {
            Some(path) => load_catalog(path)?,
            None => french_cities(),
        };

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let random: Arc<dyn RandomSource> = match config.random_seed {
            Some(seed) => {
                info!("Using seeded random source ({})", seed);
                Arc::new(SeededRandom::new(seed))
            },
            None => Arc::new(ThreadRandom),
        };

        let client = OpenMeteoClient::new(config)?;
        let cache = Arc::new(FallbackCache::new(
            clock.clone(),
            Duration::minutes(config.fallback_ttl_minutes),
        ));
        let assembler = Arc::new(CityAssembler::new(
            Arc::new(client),
            cache,
            random.clone(),
            clock.clone(),
            config.history_days,
        ));

        Ok(Self {
            loader: FleetLoader::new(assembler, catalog),
            clock,
            random,
            history_days: config.history_days,
        })
    }

    pub fn catalog(&self) -> &[CityMetadata] {
        self.loader.catalog()
    }

    /// Run a single command
    pub async fn run(&self, command: Commands) -> Result<()> {
        match command {
            Commands::Dashboard { top } => self.dashboard(top).await,
            Commands::Cities => {
                self.current().await?;
                let cities = self.loader.cities();
                let refs: Vec<&City> = cities.iter().collect();
                println!("{}", render::cities_table(&refs));
                render::print_warning(self.loader.error().as_deref());
                Ok(())
            },
            Commands::City { id } => self.city(&id).await,
            Commands::Search { term } => self.search(&term).await,
            Commands::Forecast { id, days } => self.forecast(&id, days).await,
            Commands::Reference => {
                self.reference();
                Ok(())
            },
            Commands::Refresh => {
                let snapshot = self.refresh().await?;
                println!(
                    "Refresh #{} loaded {} cities.",
                    snapshot.generation,
                    snapshot.cities.len()
                );
                if snapshot.is_degraded() {
                    println!("Synthesized: {}", snapshot.synthesized.join(", "));
                    render::print_warning(snapshot.error.as_deref());
                }
                Ok(())
            },
            Commands::Export { path } => self.export(&path).await,
        }
    }

    /// Latest snapshot, loading it first if nothing has been loaded yet.
    async fn current(&self) -> Result<FleetSnapshot> {
        match self.loader.snapshot() {
            Some(snapshot) => Ok(snapshot),
            None => self.refresh().await,
        }
    }

    /// Runs a refresh behind a spinner.
    async fn refresh(&self) -> Result<FleetSnapshot> {
        if self.loader.is_loading() {
            debug!("A refresh is already running; starting a newer one supersedes it");
        }
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(ProgressStyle::with_template("{spinner:.cyan} {msg}")?);
        spinner.set_message(format!(
            "Fetching air quality for {} cities...",
            self.loader.catalog().len()
        ));
        spinner.enable_steady_tick(std::time::Duration::from_millis(100));

        let outcome = self.loader.refresh().await;
        spinner.finish_and_clear();

        match outcome {
            RefreshOutcome::Completed(snapshot) => Ok(snapshot),
            // Only one refresh runs at a time from the CLI; fall back to whatever is published.
            RefreshOutcome::Superseded { generation } => self.loader.snapshot().ok_or_else(|| {
                AppError::Cli(format!("refresh #{} was superseded before completing", generation))
            }),
        }
    }

    async fn dashboard(&self, top: usize) -> Result<()> {
        let snapshot = self.current().await?;
        render::print_warning(snapshot.error.as_deref());
        render::print_summary(&stats::summarize(&snapshot.cities));
        println!();
        render::print_ranking(
            &format!("Top {} cleanest", top),
            &stats::best_cities(&snapshot.cities, top),
        );
        render::print_ranking(
            &format!("Top {} most polluted", top),
            &stats::worst_cities(&snapshot.cities, top),
        );
        Ok(())
    }

    async fn city(&self, id: &str) -> Result<()> {
        let snapshot = self.current().await?;
        let city = snapshot
            .cities
            .iter()
            .find(|c| c.info.id.eq_ignore_ascii_case(id))
            .ok_or_else(|| unknown_city(id, self.catalog()))?;
        render::print_city(city);
        render::print_warning(snapshot.error.as_deref());
        Ok(())
    }

    async fn search(&self, term: &str) -> Result<()> {
        let snapshot = self.current().await?;
        let matches = stats::search(&snapshot.cities, term);
        if matches.is_empty() {
            println!("No city matches {:?}.", term);
        } else {
            println!("{}", render::cities_table(&matches));
        }
        Ok(())
    }

    async fn forecast(&self, id: &str, days: u32) -> Result<()> {
        if !(1..=7).contains(&days) {
            return Err(AppError::Cli("forecast days must be between 1 and 7".into()));
        }
        let city = find_city(self.catalog(), id)?;
        let points = self
            .loader
            .assembler()
            .provider()
            .forecast(city.latitude, city.longitude, days)
            .await?;
        render::print_forecast(&city.name, &points);
        Ok(())
    }

    fn reference(&self) {
        let cities = catalog::reference_snapshot(
            self.catalog(),
            self.clock.now(),
            self.history_days,
            self.random.as_ref(),
        );
        let refs: Vec<&City> = cities.iter().collect();
        println!("{}", "Reference readings (curated, not live)".bold());
        println!("{}", render::cities_table(&refs));
    }

    async fn export(&self, path: &std::path::Path) -> Result<()> {
        let snapshot = self.current().await?;
        let document = ExportDocument {
            generated_at: snapshot.completed_at,
            warning: snapshot.error.as_deref(),
            cities: &snapshot.cities,
        };
        let json = serde_json::to_string_pretty(&document)?;
        tokio::fs::write(path, json).await?;
        info!("Exported {} cities to {}", snapshot.cities.len(), path.display());
        println!("Wrote {} cities to {}", snapshot.cities.len(), path.display());
        Ok(())
    }
}

fn unknown_city(id: &str, catalog: &[CityMetadata]) -> AppError {
    let ids: Vec<&str> = catalog.iter().map(|c| c.id.as_str()).collect();
    AppError::Cli(format!("Unknown city {:?}. Must be one of: {:?}", id, ids))
}

fn find_city<'a>(catalog: &'a [CityMetadata], id: &str) -> Result<&'a CityMetadata> {
    catalog
        .iter()
        .find(|c| c.id.eq_ignore_ascii_case(id))
        .ok_or_else(|| unknown_city(id, catalog))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn offline_config() -> Config {
        Config {
            // Nothing listens here, so every city falls back.
            provider_url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 2,
            random_seed: Some(7),
            ..Config::default()
        }
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let args = ["air-quality-fr", "forecast", "lyon", "--days", "2"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(
            cli.command,
            Some(Commands::Forecast {
                id: "lyon".into(),
                days: 2
            })
        );

        let cli = Cli::try_parse_from(["air-quality-fr"]).unwrap();
        assert!(cli.command.is_none());

        let cli = Cli::try_parse_from(["air-quality-fr", "dashboard"]).unwrap();
        assert_eq!(cli.command, Some(Commands::Dashboard { top: 5 }));
    }

    #[test]
    fn test_find_city_is_case_insensitive() {
        let catalog = french_cities();
        assert_eq!(find_city(&catalog, "PARIS").unwrap().name, "Paris");
        let err = find_city(&catalog, "berlin").unwrap_err();
        assert!(matches!(err, AppError::Cli(_)));
        assert!(err.to_string().contains("lille"));
    }

    #[tokio::test]
    async fn test_offline_refresh_synthesizes_every_city() {
        let app = App::new(&offline_config()).unwrap();
        let snapshot = app.refresh().await.unwrap();

        assert_eq!(snapshot.cities.len(), 10);
        assert_eq!(snapshot.synthesized.len(), 10);
        assert!(snapshot.is_degraded());
    }

    #[tokio::test]
    async fn test_forecast_rejects_out_of_range_days() {
        let app = App::new(&offline_config()).unwrap();
        let err = app.run(Commands::Forecast { id: "lyon".into(), days: 9 }).await.unwrap_err();
        assert!(matches!(err, AppError::Cli(_)));
    }

    #[tokio::test]
    async fn test_forecast_offline_is_network_error() {
        let app = App::new(&offline_config()).unwrap();
        let err = app.run(Commands::Forecast { id: "lyon".into(), days: 2 }).await.unwrap_err();
        assert!(err.is_network());
    }

    #[tokio::test]
    #[serial]
    async fn test_export_writes_camel_case_json() {
        let app = App::new(&offline_config()).unwrap();
        let path = std::env::temp_dir().join(format!("aq-export-{}.json", std::process::id()));

        app.run(Commands::Export { path: path.clone() }).await.unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();

        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let cities = value["cities"].as_array().unwrap();
        assert_eq!(cities.len(), 10);
        assert_eq!(cities[0]["id"], "paris");
        assert!(cities[0]["airQuality"]["historicalData"].is_array());
        assert!(value["warning"].as_str().unwrap().contains("default values"));
    }
}
