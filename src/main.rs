mod config;
mod coordinator;
mod display;
mod error;
mod integration;
mod sensor;
mod weather;

use clap::Parser;
use config::Config;
use display::SensorDisplay;
use integration::{ConfigEntry, Integration};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;
use weather::UnitSystem;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "\n\nSupported weather providers:\n",
    "- Meteoclimatic (station code, no API key required)\n",
    "- Tomorrow.io (API key required)\n"
);

#[derive(Parser)]
#[command(version, long_version = LONG_VERSION, about = "Weather provider sensors for the terminal", long_about = None)]
struct Cli {
    #[arg(short, long, value_name = "FILE", help = "Path to config.toml")]
    config: Option<PathBuf>,

    #[arg(
        long,
        conflicts_with = "metric",
        help = "Use imperial units (mi, mph, BTU/(h⋅ft²))"
    )]
    imperial: bool,

    #[arg(long, conflicts_with = "imperial", help = "Use metric units (km, m/s, W/m²)")]
    metric: bool,

    #[arg(long, help = "Fetch once, print sensor states and exit")]
    once: bool,

    #[arg(short, long, help = "Include sensors that are disabled by default")]
    all: bool,

    #[arg(
        short,
        long,
        help = "Show sensor ids, icons, device classes and enum options"
    )]
    details: bool,

    #[arg(short, long, help = "Enable debug logging")]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "wxsense=debug" } else { "wxsense=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn print_example_config() {
    eprintln!("\nCreate a config file at:");
    eprintln!("  Linux: ~/.config/wxsense/config.toml (or $XDG_CONFIG_HOME/wxsense/config.toml)");
    eprintln!("  macOS: ~/Library/Application Support/wxsense/config.toml");
    eprintln!("\nExample config.toml:");
    eprintln!("  units = \"metric\"");
    eprintln!();
    eprintln!("  [[integrations]]");
    eprintln!("  platform = \"meteoclimatic\"");
    eprintln!("  station_code = \"ESCAT4300000043206B\"");
    eprintln!();
    eprintln!("  [[integrations]]");
    eprintln!("  platform = \"tomorrowio\"");
    eprintln!("  api_key = \"<your key>\"");
    eprintln!("  latitude = 41.15");
    eprintln!("  longitude = 1.10");
    eprintln!();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let loaded = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    let mut config = match loaded {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            print_example_config();
            std::process::exit(1);
        }
    };

    // CLI Overrides
    if cli.imperial {
        config.units = UnitSystem::Imperial;
    }
    if cli.metric {
        config.units = UnitSystem::Metric;
    }

    if config.integrations.is_empty() {
        eprintln!("No integrations configured.");
        print_example_config();
        std::process::exit(1);
    }

    let mut integrations = Vec::new();
    for entry in ConfigEntry::from_config(&config) {
        let entry_id = entry.entry_id.clone();
        match Integration::setup(entry, &config).await {
            Ok(integration) => integrations.push(integration),
            Err(e) => error!(entry = %entry_id, error = %e, "Setup failed"),
        }
    }

    if integrations.is_empty() {
        eprintln!("\nNo integration could be set up. Check your config.toml and network.\n");
        std::process::exit(1);
    }

    for integration in &integrations {
        println!(
            "{}\n",
            SensorDisplay::render(integration, config.units, cli.all, cli.details)
        );
    }

    if cli.once {
        return;
    }

    let integrations: Vec<Arc<tokio::sync::Mutex<Integration>>> = integrations
        .into_iter()
        .map(|mut integration| {
            integration.start();
            Arc::new(tokio::sync::Mutex::new(integration))
        })
        .collect();

    let units = config.units;
    let include_disabled = cli.all;
    let details = cli.details;
    for integration in &integrations {
        let integration = Arc::clone(integration);
        tokio::spawn(async move {
            let mut handle = integration.lock().await.coordinator().subscribe();
            while handle.changed().await {
                let integration = integration.lock().await;
                debug!(coordinator = integration.coordinator().name(), "State changed");
                println!(
                    "{}\n",
                    SensorDisplay::render(&integration, units, include_disabled, details)
                );
            }
        });
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Could not listen for shutdown signal");
    }

    info!("Shutting down");
    for integration in &integrations {
        integration.lock().await.unload();
    }
}
