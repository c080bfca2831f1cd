use crate::config::BasemapConfig;
use crate::projection::{Viewport, TILE_SIZE};
use anyhow::{Context, Result};
use image::RgbaImage;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRef {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

/// A tile with its top-left corner in viewport CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedTile {
    pub tile: TileRef,
    pub screen_x: f64,
    pub screen_y: f64,
}

/// XYZ slippy-map basemap.
pub struct Basemap {
    client: reqwest::Client,
    config: BasemapConfig,
}

impl Basemap {
    pub fn new(client: reqwest::Client, config: BasemapConfig) -> Self {
        Self { client, config }
    }

    pub fn enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn attribution(&self) -> &str {
        &self.config.attribution
    }

    pub fn tile_url(&self, tile: TileRef) -> String {
        let subdomain = if self.config.subdomains.is_empty() {
            ""
        } else {
            let i = (tile.x as usize + tile.y as usize) % self.config.subdomains.len();
            self.config.subdomains[i].as_str()
        };

        self.config
            .url_template
            .replace("{s}", subdomain)
            .replace("{z}", &tile.z.to_string())
            .replace("{x}", &tile.x.to_string())
            .replace("{y}", &tile.y.to_string())
    }

    /// Fetch a tile. Failures are logged and yield `None` so the view stays usable.
    pub async fn fetch_tile(&self, tile: TileRef) -> Option<RgbaImage> {
        let url = self.tile_url(tile);
        match fetch_image(&self.client, &url).await {
            Ok(img) => Some(img),
            Err(e) => {
                warn!("Tile {}/{}/{} unavailable: {:#}", tile.z, tile.x, tile.y, e);
                None
            }
        }
    }
}

/// Tiles covering the viewport. Columns wrap around the antimeridian, rows
/// outside the world are dropped.
pub fn visible_tiles(viewport: &Viewport) -> Vec<PlacedTile> {
    let (ox, oy) = viewport.origin();
    let size = TILE_SIZE as f64;
    let n = 1i64 << viewport.zoom;

    let first_x = (ox / size).floor() as i64;
    let last_x = ((ox + viewport.width as f64 - 1.0) / size).floor() as i64;
    let first_y = (oy / size).floor() as i64;
    let last_y = ((oy + viewport.height as f64 - 1.0) / size).floor() as i64;

    let mut placed = Vec::new();
    for ty in first_y..=last_y {
        if ty < 0 || ty >= n {
            continue;
        }
        for tx in first_x..=last_x {
            placed.push(PlacedTile {
                tile: TileRef {
                    z: viewport.zoom,
                    x: tx.rem_euclid(n) as u32,
                    y: ty as u32,
                },
                screen_x: tx as f64 * size - ox,
                screen_y: ty as f64 * size - oy,
            });
        }
    }

    debug!("{} tiles visible at zoom {}", placed.len(), viewport.zoom);
    placed
}

pub async fn fetch_image(client: &reqwest::Client, url: &str) -> Result<RgbaImage> {
    let bytes = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("request to {} failed", url))?
        .error_for_status()?
        .bytes()
        .await?;
    let img = image::load_from_memory(&bytes)
        .with_context(|| format!("{} is not a decodable image", url))?;
    Ok(img.to_rgba8())
}
