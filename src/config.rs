//! Runtime configuration read from the environment (and `.env`, if present).

use crate::api::BASE_URL;
use crate::error::{AppError, Result};
use crate::quality::{DEFAULT_FALLBACK_TTL_MINUTES, DEFAULT_HISTORY_DAYS};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Longest accepted generated history (`AQ_HISTORY_DAYS`).
pub const MAX_HISTORY_DAYS: usize = 366;
/// Longest accepted fallback cache expiry (`AQ_FALLBACK_TTL_MINUTES`), one week.
pub const MAX_FALLBACK_TTL_MINUTES: i64 = 7 * 24 * 60;

/// Application settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Base URL of the air quality provider (`AQ_PROVIDER_URL`).
    pub provider_url: String,
    /// Per-request timeout in seconds (`AQ_TIMEOUT_SECS`).
    pub timeout_secs: u64,
    /// Timezone sent to the provider (`AQ_TIMEZONE`).
    pub timezone: String,
    /// `forecast_days` for current-conditions requests (`AQ_FORECAST_DAYS`).
    pub forecast_days: u32,
    /// Length of generated historical series (`AQ_HISTORY_DAYS`).
    pub history_days: usize,
    /// Fallback cache expiry in minutes (`AQ_FALLBACK_TTL_MINUTES`).
    pub fallback_ttl_minutes: i64,
    /// Optional JSON catalog replacing the built-in cities (`AQ_CATALOG_PATH`).
    pub catalog_path: Option<PathBuf>,
    /// Seed for reproducible synthetic data (`AQ_RANDOM_SEED`).
    pub random_seed: Option<u64>,
    /// Directory for rolling log files (`AQ_LOG_DIR`).
    pub log_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider_url: BASE_URL.to_string(),
            timeout_secs: 10,
            timezone: "Europe/Paris".to_string(),
            forecast_days: 1,
            history_days: DEFAULT_HISTORY_DAYS,
            fallback_ttl_minutes: DEFAULT_FALLBACK_TTL_MINUTES,
            catalog_path: None,
            random_seed: None,
            log_dir: None,
        }
    }
}

impl Config {
    /// Loads `.env` (if any) and overlays environment variables on the defaults.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let defaults = Config::default();
        let config = Config {
            provider_url: read_var("AQ_PROVIDER_URL")?.unwrap_or(defaults.provider_url),
            timeout_secs: parse_var("AQ_TIMEOUT_SECS")?.unwrap_or(defaults.timeout_secs),
            timezone: read_var("AQ_TIMEZONE")?.unwrap_or(defaults.timezone),
            forecast_days: parse_var("AQ_FORECAST_DAYS")?.unwrap_or(defaults.forecast_days),
            history_days: parse_var("AQ_HISTORY_DAYS")?.unwrap_or(defaults.history_days),
            fallback_ttl_minutes: parse_var("AQ_FALLBACK_TTL_MINUTES")?
                .unwrap_or(defaults.fallback_ttl_minutes),
            catalog_path: read_var("AQ_CATALOG_PATH")?.map(PathBuf::from),
            random_seed: parse_var("AQ_RANDOM_SEED")?,
            log_dir: read_var("AQ_LOG_DIR")?.map(PathBuf::from),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(AppError::Config("AQ_TIMEOUT_SECS must be positive".into()));
        }
        if !(1..=MAX_HISTORY_DAYS).contains(&self.history_days) {
            return Err(AppError::Config(format!(
                "AQ_HISTORY_DAYS must be within 1..={}",
                MAX_HISTORY_DAYS
            )));
        }
        if !(1..=MAX_FALLBACK_TTL_MINUTES).contains(&self.fallback_ttl_minutes) {
            return Err(AppError::Config(format!(
                "AQ_FALLBACK_TTL_MINUTES must be within 1..={}",
                MAX_FALLBACK_TTL_MINUTES
            )));
        }
        if !(1..=7).contains(&self.forecast_days) {
            return Err(AppError::Config("AQ_FORECAST_DAYS must be within 1..=7".into()));
        }
        Ok(())
    }
}

/// Reads a variable, treating unset and empty as absent.
fn read_var(name: &str) -> Result<Option<String>> {
    match env::var(name) {
        Ok(value) if value.trim().is_empty() => Ok(None),
        Ok(value) => Ok(Some(value.trim().to_string())),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(AppError::Env(e)),
    }
}

fn parse_var<T: FromStr>(name: &str) -> Result<Option<T>> {
    read_var(name)?
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|_| AppError::Config(format!("{} has invalid value {:?}", name, raw)))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: [&str; 9] = [
        "AQ_PROVIDER_URL",
        "AQ_TIMEOUT_SECS",
        "AQ_TIMEZONE",
        "AQ_FORECAST_DAYS",
        "AQ_HISTORY_DAYS",
        "AQ_FALLBACK_TTL_MINUTES",
        "AQ_CATALOG_PATH",
        "AQ_RANDOM_SEED",
        "AQ_LOG_DIR",
    ];

    fn clear_vars() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_defaults_when_unset() {
        clear_vars();
        let config = Config::from_env().unwrap();
        assert_eq!(config.provider_url, BASE_URL);
        assert_eq!(config.history_days, 30);
        assert_eq!(config.fallback_ttl_minutes, 30);
        assert_eq!(config.timezone, "Europe/Paris");
        assert!(config.random_seed.is_none());
    }

    #[test]
    #[serial]
    fn test_overrides_from_env() {
        clear_vars();
        env::set_var("AQ_PROVIDER_URL", "http://localhost:9999/v1");
        env::set_var("AQ_TIMEOUT_SECS", "3");
        env::set_var("AQ_HISTORY_DAYS", "7");
        env::set_var("AQ_RANDOM_SEED", "1234");
        env::set_var("AQ_CATALOG_PATH", "cities.json");

        let config = Config::from_env().unwrap();
        assert_eq!(config.provider_url, "http://localhost:9999/v1");
        assert_eq!(config.timeout_secs, 3);
        assert_eq!(config.history_days, 7);
        assert_eq!(config.random_seed, Some(1234));
        assert_eq!(config.catalog_path, Some(PathBuf::from("cities.json")));
        clear_vars();
    }

    #[test]
    #[serial]
    fn test_invalid_number_is_config_error() {
        clear_vars();
        env::set_var("AQ_TIMEOUT_SECS", "soon");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
        clear_vars();
    }

    #[test]
    #[serial]
    fn test_zero_history_rejected() {
        clear_vars();
        env::set_var("AQ_HISTORY_DAYS", "0");
        assert!(matches!(Config::from_env(), Err(AppError::Config(_))));
        clear_vars();
    }

    #[test]
    #[serial]
    fn test_oversized_durations_rejected() {
        clear_vars();
        env::set_var("AQ_FALLBACK_TTL_MINUTES", "1000000000000");
        assert!(matches!(Config::from_env(), Err(AppError::Config(_))));

        env::set_var("AQ_FALLBACK_TTL_MINUTES", MAX_FALLBACK_TTL_MINUTES.to_string());
        assert_eq!(Config::from_env().unwrap().fallback_ttl_minutes, MAX_FALLBACK_TTL_MINUTES);

        clear_vars();
        env::set_var("AQ_HISTORY_DAYS", "100000000");
        assert!(matches!(Config::from_env(), Err(AppError::Config(_))));
        clear_vars();
    }
}
