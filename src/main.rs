pub mod classify;
pub mod config;
pub mod controller;
pub mod data;
pub mod engine;
pub mod export;
pub mod feature;
pub mod geolocation;
pub mod index;
pub mod server;
pub mod style;
pub mod types;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the interactive neighborhood map
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Write the neighborhood GeoJSON and layer definitions to disk
    Export {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
        #[arg(short, long, value_name = "DIR", default_value = "dist")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Serve { config } => {
            info!(?config, "serving map");
            let app_config = config::AppConfig::load(config)?;
            let neighborhoods = data::load_neighborhoods(&app_config)?;

            server::start_server(app_config, neighborhoods).await?;
        }
        Commands::Export { config, out } => {
            info!(?config, ?out, "exporting map data");
            let app_config = config::AppConfig::load(config)?;
            let neighborhoods = data::load_neighborhoods(&app_config)?;

            export::export(&app_config, neighborhoods, out)?;
        }
    }

    Ok(())
}
