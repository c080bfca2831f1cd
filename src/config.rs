use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::fs;
use anyhow::{Context, Result};

pub const PRIMARY_BOUNDARY_URL: &str =
    "https://raw.githubusercontent.com/isellsoap/deutschlandGeoJSON/main/2_bundeslaender/1_sehr_hoch.geo.json";
pub const FALLBACK_BOUNDARY_URL: &str =
    "https://raw.githubusercontent.com/isellsoap/deutschlandGeoJSON/main/2_bundeslaender/2_hoch.geo.json";

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub boundary: BoundaryConfig,
    pub basemap: BasemapConfig,
    pub view: ViewConfig,
    pub marker: MarkerConfig,
    pub export: ExportConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BoundaryConfig {
    /// Candidate sources, tried in order until one answers with JSON.
    pub urls: Vec<String>,
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        Self {
            urls: vec![PRIMARY_BOUNDARY_URL.to_string(), FALLBACK_BOUNDARY_URL.to_string()],
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BasemapConfig {
    pub enabled: bool,
    pub url_template: String, // {s} {z} {x} {y}
    pub subdomains: Vec<String>,
    pub attribution: String,
    pub user_agent: String,
}

impl Default for BasemapConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url_template: "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png".to_string(),
            subdomains: vec!["a".to_string(), "b".to_string(), "c".to_string()],
            attribution: "© OpenStreetMap contributors".to_string(),
            user_agent: concat!("deutschlandkarte/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ViewConfig {
    pub width: u32,
    pub height: u32,
    pub center_lat: f64,
    pub center_lon: f64,
    pub zoom: u8,
    pub fit_padding: f64,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            width: 960,
            height: 600,
            center_lat: 51.1657,
            center_lon: 10.4515,
            zoom: 6,
            fit_padding: 20.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MarkerConfig {
    /// When unset a built-in glyph is drawn instead of a fetched icon.
    pub icon_url: Option<String>,
    pub icon_width: u32,
    pub icon_height: u32,
    pub anchor_x: u32,
    pub anchor_y: u32,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            icon_url: None,
            icon_width: 25,
            icon_height: 41,
            anchor_x: 12,
            anchor_y: 41,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ExportConfig {
    pub pixel_ratio: u32,
    pub output_dir: PathBuf,
    pub file_prefix: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            pixel_ratio: 2,
            output_dir: PathBuf::from("."),
            file_prefix: "Deutschlandkarte".to_string(),
        }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: AppConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse TOML configuration")?;
        Ok(config)
    }

    /// Falls back to the built-in defaults when no file is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load_from_file(p),
            None => Ok(Self::default()),
        }
    }
}
