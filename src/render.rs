use crate::config::MarkerConfig;
use crate::projection::{Viewport, TILE_SIZE};
use crate::style::{Dash, RegionStyle};
use crate::tiles::{fetch_image, visible_tiles, Basemap};
use crate::view::{MapView, RegionLayer};
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use rayon::prelude::*;
use tracing::{info, warn};

const BACKGROUND: Rgba<u8> = Rgba([0xdd, 0xdd, 0xdd, 255]);
const GLYPH_RADIUS: f64 = 12.0;
const PIN_RADIUS: f64 = 6.0;
const PIN_HOLE_RADIUS: f64 = 2.0;
const PIN_COLOR: Rgba<u8> = Rgba([0x11, 0x18, 0x27, 255]);
const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

// Sampling step along strokes, in device pixels
const STROKE_STEP: f64 = 0.5;

pub enum MarkerIcon {
    /// White disc with a dark pin, anchored at its center.
    Glyph,
    Image { image: RgbaImage, anchor: (u32, u32) },
}

/// Resolve the marker icon once. A configured icon that cannot be fetched
/// falls back to the glyph.
pub async fn load_marker_icon(client: &reqwest::Client, config: &MarkerConfig) -> MarkerIcon {
    let Some(url) = &config.icon_url else {
        return MarkerIcon::Glyph;
    };

    match fetch_image(client, url).await {
        Ok(img) => MarkerIcon::Image {
            image: imageops::resize(&img, config.icon_width, config.icon_height, FilterType::Triangle),
            anchor: (config.anchor_x, config.anchor_y),
        },
        Err(e) => {
            warn!("Marker icon unavailable, drawing glyph instead: {:#}", e);
            MarkerIcon::Glyph
        }
    }
}

/// Rasterize the live view: basemap, region overlay, then markers, at
/// `pixel_ratio` device pixels per CSS pixel.
pub async fn capture(view: &MapView, basemap: &Basemap, icon: &MarkerIcon, pixel_ratio: u32) -> RgbaImage {
    let ratio = pixel_ratio.max(1);
    let vp = view.viewport();
    let mut img = RgbaImage::from_pixel(vp.width * ratio, vp.height * ratio, BACKGROUND);

    if basemap.enabled() {
        draw_basemap(&mut img, vp, basemap, ratio).await;
    }
    draw_regions(&mut img, vp, view.layers(), ratio);
    draw_markers(&mut img, view, icon, ratio);

    info!("Captured view at {}x{} px", img.width(), img.height());
    img
}

async fn draw_basemap(img: &mut RgbaImage, vp: &Viewport, basemap: &Basemap, ratio: u32) {
    let scaled = TILE_SIZE * ratio;
    for placed in visible_tiles(vp) {
        let Some(tile) = basemap.fetch_tile(placed.tile).await else {
            continue;
        };
        let tile = if ratio == 1 {
            tile
        } else {
            imageops::resize(&tile, scaled, scaled, FilterType::Triangle)
        };
        let x = (placed.screen_x * ratio as f64).round() as i64;
        let y = (placed.screen_y * ratio as f64).round() as i64;
        imageops::overlay(img, &tile, x, y);
    }
}

type Ring = Vec<(f64, f64)>;

/// Every ring of a layer (exteriors and holes) in device pixels.
fn project_layer(vp: &Viewport, layer: &RegionLayer, ratio: f64) -> Vec<Ring> {
    let to_px = |c: &geo::Coord<f64>| {
        let (x, y) = vp.to_screen(c.y, c.x);
        (x * ratio, y * ratio)
    };

    layer
        .region
        .geometry
        .iter()
        .flat_map(|poly| std::iter::once(poly.exterior()).chain(poly.interiors().iter()))
        .map(|ring| ring.coords().map(to_px).collect())
        .collect()
}

pub fn draw_regions(img: &mut RgbaImage, vp: &Viewport, layers: &[RegionLayer], ratio: u32) {
    let r = ratio as f64;
    let projected: Vec<Vec<Ring>> = layers.par_iter().map(|layer| project_layer(vp, layer, r)).collect();

    for (layer, rings) in layers.iter().zip(&projected) {
        fill_rings(img, rings, &layer.style);
        stroke_rings(img, rings, &layer.style, r);
    }
}

fn blend(img: &mut RgbaImage, x: i64, y: i64, color: Rgba<u8>, alpha: f64) {
    if x < 0 || y < 0 || x >= img.width() as i64 || y >= img.height() as i64 {
        return;
    }
    let px = img.get_pixel_mut(x as u32, y as u32);
    for c in 0..3 {
        let mixed = color[c] as f64 * alpha + px[c] as f64 * (1.0 - alpha);
        px[c] = mixed.round().clamp(0.0, 255.0) as u8;
    }
    px[3] = 255;
}

/// Even-odd scanline fill sampled at pixel centers.
fn fill_rings(img: &mut RgbaImage, rings: &[Ring], style: &RegionStyle) {
    let color = hex_to_rgba(style.fill_color);
    let (min_y, max_y) = rings
        .iter()
        .flatten()
        .fold((f64::MAX, f64::MIN), |(lo, hi), &(_, y)| (lo.min(y), hi.max(y)));
    if min_y > max_y {
        return;
    }

    let first_row = min_y.floor().max(0.0) as i64;
    let last_row = max_y.ceil().min(img.height() as f64) as i64;
    let mut crossings = Vec::new();

    for row in first_row..last_row {
        let yc = row as f64 + 0.5;
        crossings.clear();
        for ring in rings {
            for edge in ring.windows(2) {
                let ((x0, y0), (x1, y1)) = (edge[0], edge[1]);
                if (y0 <= yc && yc < y1) || (y1 <= yc && yc < y0) {
                    crossings.push(x0 + (yc - y0) * (x1 - x0) / (y1 - y0));
                }
            }
        }
        crossings.sort_by(|a, b| a.total_cmp(b));

        for span in crossings.chunks_exact(2) {
            let start = (span[0] - 0.5).ceil() as i64;
            let end = (span[1] - 0.5).floor() as i64;
            for x in start.max(0)..=end.min(img.width() as i64 - 1) {
                blend(img, x, row, color, style.fill_opacity);
            }
        }
    }
}

fn stamp_disc(img: &mut RgbaImage, cx: f64, cy: f64, radius: f64, color: Rgba<u8>, alpha: f64) {
    let reach = radius.max(0.5);
    let (x0, x1) = ((cx - reach).floor() as i64, (cx + reach).ceil() as i64);
    let (y0, y1) = ((cy - reach).floor() as i64, (cy + reach).ceil() as i64);
    for y in y0..=y1 {
        for x in x0..=x1 {
            let (dx, dy) = (x as f64 + 0.5 - cx, y as f64 + 0.5 - cy);
            if dx * dx + dy * dy <= reach * reach {
                blend(img, x, y, color, alpha);
            }
        }
    }
}

/// Parameter range of the segment that lies within the image grown by `margin`
/// (Liang-Barsky), or `None` when it misses the image entirely.
fn clip_segment(img: &RgbaImage, (x0, y0): (f64, f64), (x1, y1): (f64, f64), margin: f64) -> Option<(f64, f64)> {
    let (dx, dy) = (x1 - x0, y1 - y0);
    let (min_x, min_y) = (-margin - 1.0, -margin - 1.0);
    let (max_x, max_y) = (img.width() as f64 + margin + 1.0, img.height() as f64 + margin + 1.0);

    let mut t0: f64 = 0.0;
    let mut t1: f64 = 1.0;
    for (p, q) in [(-dx, x0 - min_x), (dx, max_x - x0), (-dy, y0 - min_y), (dy, max_y - y0)] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            t0 = t0.max(r);
        } else {
            t1 = t1.min(r);
        }
    }
    (t0 <= t1).then_some((t0, t1))
}

fn stroke_rings(img: &mut RgbaImage, rings: &[Ring], style: &RegionStyle, ratio: f64) {
    let color = hex_to_rgba(style.stroke_color);
    let radius = style.stroke_weight * ratio / 2.0;
    let dash = match style.dash {
        Dash::Solid => None,
        Dash::Dashed(len) => Some(len * ratio),
    };

    for ring in rings {
        // dash phase restarts on every ring
        let mut walked = 0.0;
        for edge in ring.windows(2) {
            let ((x0, y0), (x1, y1)) = (edge[0], edge[1]);
            let length = ((x1 - x0).powi(2) + (y1 - y0).powi(2)).sqrt();
            let Some((t0, t1)) = clip_segment(img, (x0, y0), (x1, y1), radius) else {
                walked += length;
                continue;
            };
            let steps = ((t1 - t0) * length / STROKE_STEP).ceil().max(1.0) as usize;

            for i in 0..=steps {
                let t = t0 + (t1 - t0) * i as f64 / steps as f64;
                let on = match dash {
                    None => true,
                    Some(d) => (walked + t * length) % (2.0 * d) < d,
                };
                if on {
                    stamp_disc(img, x0 + t * (x1 - x0), y0 + t * (y1 - y0), radius, color, style.stroke_opacity);
                }
            }
            walked += length;
        }
    }
}

pub fn draw_markers(img: &mut RgbaImage, view: &MapView, icon: &MarkerIcon, ratio: u32) {
    let r = ratio as f64;
    let vp = view.viewport();

    for city in view.markers() {
        let (sx, sy) = vp.to_screen(city.lat, city.lon);
        let (cx, cy) = (sx * r, sy * r);

        match icon {
            MarkerIcon::Glyph => {
                stamp_disc(img, cx, cy, GLYPH_RADIUS * r, WHITE, 1.0);
                stamp_disc(img, cx, cy, PIN_RADIUS * r, PIN_COLOR, 1.0);
                stamp_disc(img, cx, cy, PIN_HOLE_RADIUS * r, WHITE, 1.0);
            }
            MarkerIcon::Image { image, anchor } => {
                let scaled = if ratio == 1 {
                    image.clone()
                } else {
                    imageops::resize(image, image.width() * ratio, image.height() * ratio, FilterType::Triangle)
                };
                let x = (cx - anchor.0 as f64 * r).round() as i64;
                let y = (cy - anchor.1 as f64 * r).round() as i64;
                imageops::overlay(img, &scaled, x, y);
            }
        }
    }
}

fn hex_to_rgba(hex: &str) -> Rgba<u8> {
    let hex = hex.trim_start_matches('#');
    let channel = |i: usize| {
        hex.get(i..i + 2)
            .and_then(|s| u8::from_str_radix(s, 16).ok())
            .unwrap_or(0)
    };
    Rgba([channel(0), channel(2), channel(4), 255])
}
