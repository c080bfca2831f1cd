use geo::Rect;
use std::f64::consts::PI;

// Constants for Web Mercator
pub const TILE_SIZE: u32 = 256;
pub const MIN_ZOOM: u8 = 0;
pub const MAX_ZOOM: u8 = 19;
const MAX_LATITUDE: f64 = 85.051_128_779_806_6;

fn world_size(zoom: u8) -> f64 {
    TILE_SIZE as f64 * 2.0_f64.powi(zoom as i32)
}

/// Lat/lon to global pixel coordinates at `zoom`.
pub fn project(lat: f64, lon: f64, zoom: u8) -> (f64, f64) {
    let size = world_size(zoom);
    let lat_rad = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    let x = (lon + 180.0) / 360.0 * size;
    let y = (1.0 - (lat_rad.tan() + (1.0 / lat_rad.cos())).ln() / PI) / 2.0 * size;
    (x, y)
}

/// Global pixel coordinates back to (lat, lon).
pub fn unproject(x: f64, y: f64, zoom: u8) -> (f64, f64) {
    let size = world_size(zoom);
    let lon = x / size * 360.0 - 180.0;
    let lat = (PI * (1.0 - 2.0 * y / size)).sinh().atan().to_degrees();
    (lat, lon)
}

/// The visible part of the map, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub center_lat: f64,
    pub center_lon: f64,
    pub zoom: u8,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    /// Global pixel position of the viewport's top-left corner.
    pub fn origin(&self) -> (f64, f64) {
        let (cx, cy) = project(self.center_lat, self.center_lon, self.zoom);
        (cx - self.width as f64 / 2.0, cy - self.height as f64 / 2.0)
    }

    pub fn to_screen(&self, lat: f64, lon: f64) -> (f64, f64) {
        let (ox, oy) = self.origin();
        let (x, y) = project(lat, lon, self.zoom);
        (x - ox, y - oy)
    }

    pub fn from_screen(&self, sx: f64, sy: f64) -> (f64, f64) {
        let (ox, oy) = self.origin();
        unproject(ox + sx, oy + sy, self.zoom)
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        let (cx, cy) = project(self.center_lat, self.center_lon, self.zoom);
        let (lat, lon) = unproject(cx + dx, cy + dy, self.zoom);
        self.center_lat = lat;
        self.center_lon = lon;
    }

    pub fn set_zoom(&mut self, zoom: u8) {
        self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
    }

    /// Center on `bounds` at the highest whole zoom level that keeps it inside
    /// the viewport minus `padding` on every side.
    pub fn fit_bounds(&mut self, bounds: &Rect<f64>, padding: f64) {
        let avail_w = (self.width as f64 - 2.0 * padding).max(1.0);
        let avail_h = (self.height as f64 - 2.0 * padding).max(1.0);

        // Size of the bounds at zoom 0; y grows southward so max lat is the top.
        let (x0, y0) = project(bounds.max().y, bounds.min().x, 0);
        let (x1, y1) = project(bounds.min().y, bounds.max().x, 0);
        let (w, h) = ((x1 - x0).abs(), (y1 - y0).abs());

        let zoom = if w <= f64::EPSILON && h <= f64::EPSILON {
            MAX_ZOOM
        } else {
            let scale = (avail_w / w.max(f64::EPSILON)).min(avail_h / h.max(f64::EPSILON));
            scale.log2().floor().clamp(MIN_ZOOM as f64, MAX_ZOOM as f64) as u8
        };

        let (lat, lon) = unproject((x0 + x1) / 2.0, (y0 + y1) / 2.0, 0);
        self.center_lat = lat;
        self.center_lon = lon;
        self.zoom = zoom;
    }
}
