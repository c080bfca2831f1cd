pub mod types;
pub mod cities;
pub mod config;
pub mod error;
pub mod data;
pub mod projection;
pub mod style;
pub mod selection;
pub mod view;
pub mod tiles;
pub mod render;
pub mod export;
pub mod session;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use config::AppConfig;
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::EnvFilter;
use view::MapView;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open an interactive map session driven by commands on stdin
    Session {
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
    /// Export the initial view as PDF, optionally after clicking a point
    Export {
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
        /// Click this position before exporting, as LAT,LON
        #[arg(long, value_name = "LAT,LON")]
        at: Option<String>,
        /// Output directory, overrides the configured one
        #[arg(short, long, value_name = "DIR")]
        out: Option<PathBuf>,
    },
    /// List the regions of the boundary dataset
    Regions {
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
    /// List the city markers
    Cities,
}

fn parse_lat_lon(s: &str) -> anyhow::Result<(f64, f64)> {
    let (lat, lon) = s
        .split_once(',')
        .ok_or_else(|| anyhow!("expected LAT,LON, got '{}'", s))?;
    Ok((
        lat.trim().parse().with_context(|| format!("invalid latitude '{}'", lat))?,
        lon.trim().parse().with_context(|| format!("invalid longitude '{}'", lon))?,
    ))
}

fn http_client(config: &AppConfig) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(config.basemap.user_agent.clone())
        .build()
        .context("Failed to build HTTP client")
}

/// Build the view and load the overlay. A load failure leaves the basemap and
/// markers usable.
async fn build_view(config: &AppConfig, client: &reqwest::Client) -> MapView {
    let mut view = MapView::new(&config.view);
    match data::load_boundaries(client, &config.boundary.urls).await {
        Ok(dataset) => view.set_dataset(dataset),
        Err(e) => error!("{}", e),
    }
    view
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Session { config } => {
            let app_config = AppConfig::load(config.as_deref())?;
            let client = http_client(&app_config)?;

            let view = build_view(&app_config, &client).await;
            let icon = render::load_marker_icon(&client, &app_config.marker).await;
            let basemap = tiles::Basemap::new(client, app_config.basemap.clone());

            session::Session::new(view, basemap, icon, app_config.export.clone())
                .run()
                .await?;
        }
        Commands::Export { config, at, out } => {
            let app_config = AppConfig::load(config.as_deref())?;
            let client = http_client(&app_config)?;
            let click = at.as_deref().map(parse_lat_lon).transpose()?;

            let mut view = build_view(&app_config, &client).await;
            if let Some((lat, lon)) = click {
                if !view.click_at(lat, lon) {
                    println!("No region at {}, {}", lat, lon);
                }
            }

            let icon = render::load_marker_icon(&client, &app_config.marker).await;
            let basemap = tiles::Basemap::new(client, app_config.basemap.clone());
            let output_dir = out.unwrap_or_else(|| app_config.export.output_dir.clone());

            match export::export_view(
                &view,
                &basemap,
                &icon,
                app_config.export.pixel_ratio,
                &output_dir,
                &app_config.export.file_prefix,
            )
            .await
            {
                Ok(path) => println!("{}", path.display()),
                Err(e) => error!("Export failed: {}", e),
            }
        }
        Commands::Regions { config } => {
            let app_config = AppConfig::load(config.as_deref())?;
            let client = http_client(&app_config)?;
            let dataset = data::load_boundaries(&client, &app_config.boundary.urls).await?;

            for region in &dataset.regions {
                println!("{}", region.name.as_deref().unwrap_or("(unnamed)"));
            }
            if let Some(b) = dataset.bounds() {
                println!(
                    "bounds: {:.4},{:.4} .. {:.4},{:.4}",
                    b.min().y,
                    b.min().x,
                    b.max().y,
                    b.max().x
                );
            }
        }
        Commands::Cities => {
            for city in cities::CITIES.iter() {
                println!("{:<20} {:.4}, {:.4}", city.name, city.lat, city.lon);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_click_positions() {
        assert_eq!(parse_lat_lon("52.52, 13.40").unwrap(), (52.52, 13.40));
        assert!(parse_lat_lon("52.52").is_err());
        assert!(parse_lat_lon("a,b").is_err());
    }

    #[test]
    fn cli_accepts_export_flags() {
        let cli = Cli::try_parse_from(["deutschlandkarte", "export", "--at", "51.0,7.0", "--out", "/tmp"]).unwrap();
        match cli.command {
            Commands::Export { at, out, config } => {
                assert_eq!(at.as_deref(), Some("51.0,7.0"));
                assert_eq!(out, Some(PathBuf::from("/tmp")));
                assert!(config.is_none());
            }
            _ => panic!("expected export"),
        }
    }
}
