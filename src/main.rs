mod api;
mod catalog;
mod cli;
mod clock;
mod config;
mod error;
mod models;
mod quality;
mod random;
mod stats;

use anyhow::Context;
use clap::Parser;
use cli::{App, Cli, Commands};
use colored::*;
use config::Config;
use dialoguer::{theme::ColorfulTheme, Select};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Console logs go to stderr at `warn` unless `RUST_LOG` says otherwise.
/// With `AQ_LOG_DIR` set, a daily rolling file additionally records `info` and above.
fn init_logging(config: &Config) -> Option<WorkerGuard> {
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(console_filter);

    let (file, guard) = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "air-quality-fr.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .json()
                .with_writer(writer)
                .with_filter(EnvFilter::new("info"));
            (Some(layer), Some(guard))
        },
        None => (None, None),
    };

    tracing_subscriber::registry().with(console).with(file).init();
    guard
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to read configuration")?;
    let _guard = init_logging(&config);

    info!("Initializing air quality dashboard...");

    let app = match App::new(&config) {
        Ok(app) => {
            info!("Application initialized with {} cities.", app.catalog().len());
            app
        },
        Err(e) => {
            error!("Failed to initialize application: {:?}", e);
            println!(
                "{}",
                "Error: Failed to initialize application. Check logs.".red()
            );
            return Err(e).context("Initialization failed");
        },
    };

    if let Some(command) = cli.command {
        return app.run(command).await.context("Command failed");
    }

    println!(
        "{}",
        "Welcome to the French Air Quality Dashboard!".cyan().bold()
    );

    loop {
        let options = &[
            "Dashboard",
            "All Cities",
            "City Details",
            "Search Cities",
            "City Forecast",
            "Reference Readings",
            "Refresh Data",
            "Export to JSON",
            "Exit",
        ];

        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt("What would you like to do?")
            .items(options)
            .default(0)
            .interact_opt()?
            .unwrap_or(options.len() - 1);

        println!("\n---\n");

        let command = match selection {
            0 => Ok(Commands::Dashboard { top: 5 }),
            1 => Ok(Commands::Cities),
            2 => cli::prompt_city(app.catalog()).map(|id| Commands::City { id }),
            3 => cli::prompt_search_term().map(|term| Commands::Search { term }),
            4 => cli::prompt_city(app.catalog()).and_then(|id| {
                cli::prompt_forecast_days().map(|days| Commands::Forecast { id, days })
            }),
            5 => Ok(Commands::Reference),
            6 => Ok(Commands::Refresh),
            7 => cli::prompt_export_path().map(|path| Commands::Export {
                path: PathBuf::from(path),
            }),
            _ => {
                println!("{}", "Exiting application. Goodbye!".green());
                break;
            },
        };

        let command = match command {
            Ok(command) => command,
            Err(e) => {
                println!("{} {}", "Failed to get input:".red(), e);
                continue;
            },
        };

        if let Err(e) = app.run(command).await {
            error!("Command execution failed: {:?}", e);
            println!(
                "{} {}",
                "Error executing command:".red(),
                e.to_string().red()
            );
        }

        println!("\n---\n");
    }

    Ok(())
}
