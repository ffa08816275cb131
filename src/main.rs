//! Parcel Map - choropleth backend for county parcel data
//!
//! CLI commands:
//! - serve: Load sources and serve the map API + front-end
//! - summary: Print join coverage for a mode
//! - classify: Print per-parcel styles as JSON
//! - modes: List selectable modes

mod classify;
mod config;
#[cfg(test)]
mod fixtures;
mod load;
mod logging;
mod popup;
mod resolver;
mod server;
mod state;
mod store;
mod tabular;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::classify::{Classifier, Mode};

#[derive(Parser)]
#[command(name = "parcel_map")]
#[command(about = "Choropleth map of county parcels joined with property records")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to map.yaml config
    #[arg(short, long, default_value = "map.yaml")]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Start HTTP server
    Serve {
        /// Port to listen on (defaults to PORT from .env)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Print coverage statistics
    Summary {
        /// Mode to count categories for
        #[arg(short, long)]
        mode: Option<String>,
    },

    /// Print per-parcel styles as JSON
    Classify {
        /// Mode identifier
        #[arg(short, long)]
        mode: String,

        /// Only print the first N parcels
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// List selectable modes
    Modes,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging first
    logging::init_logging("logs");
    tracing::info!("Parcel Map starting up");

    let cli = Cli::parse();
    tracing::debug!("CLI args parsed: config={:?}", cli.config);

    let config = if cli.config.exists() {
        tracing::info!("Loading config from {:?}", cli.config);
        config::Config::load(&cli.config)?
    } else {
        tracing::warn!("Config file not found: {:?}, using defaults", cli.config);
        config::Config::default()
    };
    let settings = config::Settings::load();
    tracing::info!("Data directory: {}", settings.data_dir);

    match cli.command {
        Commands::Serve { port } => {
            server::wait_for_surface(&settings.web_dir, &config.surface).await?;
            let data = load::load_all(&config, &settings).await?;
            let classifier = Classifier::new(config.colors.clone(), config.default_mode);
            let state = state::AppState::new(data, classifier);
            server::serve(state, &settings.web_dir, port.unwrap_or(settings.port)).await?;
        }

        Commands::Summary { mode } => {
            let data = load::load_all(&config, &settings).await?;
            let mut classifier = Classifier::new(config.colors.clone(), config.default_mode);
            if let Some(mode) = mode {
                classifier.set_mode(&mode);
            }
            print_summary(&data.summary(&classifier));
        }

        Commands::Classify { mode, limit } => {
            let data = load::load_all(&config, &settings).await?;
            let mut classifier = Classifier::new(config.colors.clone(), config.default_mode);
            classifier.set_mode(&mode);
            let mut redraw = data.redraw(&classifier);
            if let Some(limit) = limit {
                redraw.styles.truncate(limit);
            }
            println!("{}", serde_json::to_string_pretty(&redraw)?);
        }

        Commands::Modes => {
            for mode in Mode::ALL {
                println!("  {:<14} {}", mode.id(), mode.label());
            }
        }
    }

    Ok(())
}

/// Print coverage statistics
fn print_summary(summary: &state::Summary) {
    println!("Property records: {}", summary.property_records);
    println!("Address records:  {}", summary.address_records);
    println!("Skipped rows:     {}", summary.skipped_rows);
    println!(
        "Parcels:          {} (account field: {})",
        summary.parcels,
        summary.account_field.as_deref().unwrap_or("none")
    );
    println!();

    println!("By source:");
    for (source, count) in &summary.by_source {
        println!("  {:<10} {}", source, count);
    }
    println!();

    match summary.mode {
        Some(mode) => println!("Categories ({}):", mode.id()),
        None => println!("Categories (no active mode):"),
    }
    for (category, count) in &summary.categories {
        println!("  {:<20} {}", category, count);
    }
    println!("  {:<20} {}", "(not rendered)", summary.hidden);
}
