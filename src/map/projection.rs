use crate::geo::{Bounds, LatLng, JERUSALEM};
use std::f64::consts::PI;

pub const MIN_ZOOM: f64 = 0.5;
pub const MAX_ZOOM: f64 = 400.0;
/// Regional view around Jerusalem at startup and on reset
pub const INITIAL_ZOOM: f64 = 24.0;
/// Fit-to-territory never zooms closer than this
pub const FIT_MAX_ZOOM: f64 = 96.0;

/// Normalized Web Mercator y (0 at the north edge, 1 at the south edge)
#[inline(always)]
fn mercator_y(lat: f64) -> f64 {
    let lat_rad = lat.clamp(-85.0, 85.0) * PI / 180.0;
    (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0
}

#[inline(always)]
fn inverse_mercator_y(y: f64) -> f64 {
    (PI * (1.0 - 2.0 * y)).sinh().atan() * 180.0 / PI
}

/// Viewport representing the visible map area and zoom level
#[derive(Clone, Debug, PartialEq)]
pub struct Viewport {
    /// Center longitude (-180 to 180)
    pub center_lon: f64,
    /// Center latitude (-85 to 85)
    pub center_lat: f64,
    /// Zoom level (1.0 = whole world across the canvas width)
    pub zoom: f64,
    /// Canvas pixel width
    pub width: usize,
    /// Canvas pixel height
    pub height: usize,
}

impl Viewport {
    pub fn new(center: LatLng, zoom: f64, width: usize, height: usize) -> Self {
        Self {
            center_lon: center.lng,
            center_lat: center.lat,
            zoom,
            width,
            height,
        }
    }

    /// Jerusalem-centered regional view
    pub fn initial(width: usize, height: usize) -> Self {
        Self::new(JERUSALEM, INITIAL_ZOOM, width, height)
    }

    pub fn center(&self) -> LatLng {
        LatLng::new(self.center_lat, self.center_lon)
    }

    /// Pan the viewport by pixel delta
    pub fn pan(&mut self, dx: i32, dy: i32) {
        let scale = self.zoom * self.width.max(1) as f64;
        let x = (self.center_lon + 180.0) / 360.0 + dx as f64 / scale;
        let y = (mercator_y(self.center_lat) + dy as f64 / scale).clamp(0.0, 1.0);

        self.center_lon = x * 360.0 - 180.0;
        // Wrap longitude
        if self.center_lon > 180.0 {
            self.center_lon -= 360.0;
        } else if self.center_lon < -180.0 {
            self.center_lon += 360.0;
        }
        self.center_lat = inverse_mercator_y(y).clamp(-85.0, 85.0);
    }

    /// Zoom in by a factor
    pub fn zoom_in(&mut self) {
        self.zoom = (self.zoom * 1.5).min(MAX_ZOOM);
    }

    /// Zoom out by a factor
    pub fn zoom_out(&mut self) {
        self.zoom = (self.zoom / 1.5).max(MIN_ZOOM);
    }

    /// Zoom in towards a specific pixel location
    pub fn zoom_in_at(&mut self, px: i32, py: i32) {
        self.zoom_at(px, py, 1.5);
    }

    /// Zoom out from a specific pixel location
    pub fn zoom_out_at(&mut self, px: i32, py: i32) {
        self.zoom_at(px, py, 1.0 / 1.5);
    }

    /// Zoom by factor keeping the location under (px, py) fixed
    fn zoom_at(&mut self, px: i32, py: i32, factor: f64) {
        let anchor = self.unproject(px, py);
        self.zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        let (new_px, new_py) = self.project(anchor);
        self.pan(new_px - px, new_py - py);
    }

    /// Center and zoom so `bounds` fills the canvas less `padding` pixels
    pub fn fit_bounds(&mut self, bounds: Bounds, padding: usize, max_zoom: f64) {
        let x0 = (bounds.west + 180.0) / 360.0;
        let x1 = (bounds.east + 180.0) / 360.0;
        let y_top = mercator_y(bounds.north);
        let y_bottom = mercator_y(bounds.south);

        let width = self.width.max(1) as f64;
        let avail_w = (self.width.saturating_sub(2 * padding)).max(1) as f64;
        let avail_h = (self.height.saturating_sub(2 * padding)).max(1) as f64;
        let span_x = (x1 - x0).max(1e-9);
        let span_y = (y_bottom - y_top).max(1e-9);

        self.zoom = (avail_w / (span_x * width))
            .min(avail_h / (span_y * width))
            .clamp(MIN_ZOOM, max_zoom);
        self.center_lon = (bounds.west + bounds.east) / 2.0;
        self.center_lat = inverse_mercator_y((y_top + y_bottom) / 2.0);
    }

    /// Unproject pixel coordinates back to geographic coordinates
    pub fn unproject(&self, px: i32, py: i32) -> LatLng {
        let scale = self.zoom * self.width as f64;
        let center_x = (self.center_lon + 180.0) / 360.0;
        let center_y = mercator_y(self.center_lat);

        let x = (px as f64 - self.width as f64 / 2.0) / scale + center_x;
        let y = (py as f64 - self.height as f64 / 2.0) / scale + center_y;

        LatLng::new(inverse_mercator_y(y), x * 360.0 - 180.0)
    }

    /// Project a geographic coordinate to pixel coordinates
    pub fn project(&self, p: LatLng) -> (i32, i32) {
        let x = (p.lng + 180.0) / 360.0;
        let y = mercator_y(p.lat);

        let center_x = (self.center_lon + 180.0) / 360.0;
        let center_y = mercator_y(self.center_lat);

        let scale = self.zoom * self.width as f64;

        let px = ((x - center_x) * scale + self.width as f64 / 2.0) as i32;
        let py = ((y - center_y) * scale + self.height as f64 / 2.0) as i32;

        (px, py)
    }

    /// Check if a projected point is visible in the viewport
    pub fn is_visible(&self, px: i32, py: i32) -> bool {
        px >= -10 && px < self.width as i32 + 10 && py >= -10 && py < self.height as i32 + 10
    }

    /// Check if a line segment might be visible (rough bounding box check)
    pub fn line_might_be_visible(&self, p1: (i32, i32), p2: (i32, i32)) -> bool {
        let min_x = p1.0.min(p2.0);
        let max_x = p1.0.max(p2.0);
        let min_y = p1.1.min(p2.1);
        let max_y = p1.1.max(p2.1);

        max_x >= 0 && min_x < self.width as i32 && max_y >= 0 && min_y < self.height as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_center() {
        let vp = Viewport::new(LatLng::new(0.0, 0.0), 1.0, 100, 100);
        assert_eq!(vp.project(LatLng::new(0.0, 0.0)), (50, 50));
    }

    #[test]
    fn test_project_unproject_roundtrip() {
        let vp = Viewport::initial(200, 120);
        let (px, py) = vp.project(JERUSALEM);
        assert_eq!((px, py), (100, 60));
        let back = vp.unproject(px, py);
        assert!((back.lat - JERUSALEM.lat).abs() < 0.1);
        assert!((back.lng - JERUSALEM.lng).abs() < 0.1);
    }

    #[test]
    fn test_pan() {
        let mut vp = Viewport::new(LatLng::new(0.0, 0.0), 1.0, 100, 100);
        vp.pan(10, 0);
        assert!(vp.center_lon > 0.0);
        vp.pan(0, -10);
        assert!(vp.center_lat > 0.0);
    }

    #[test]
    fn test_fit_bounds_contains_corners() {
        let mut vp = Viewport::new(LatLng::new(0.0, 0.0), 1.0, 160, 96);
        let bounds = Bounds {
            south: 31.24,
            west: 34.8,
            north: 33.3,
            east: 35.65,
        };
        vp.fit_bounds(bounds, 4, FIT_MAX_ZOOM);
        assert!(vp.zoom > 1.0 && vp.zoom <= FIT_MAX_ZOOM);
        for corner in [
            LatLng::new(bounds.south, bounds.west),
            LatLng::new(bounds.north, bounds.east),
        ] {
            let (px, py) = vp.project(corner);
            assert!((0..=160).contains(&px), "px {px}");
            assert!((0..=96).contains(&py), "py {py}");
        }
    }

    #[test]
    fn test_fit_point_clamps_zoom() {
        let mut vp = Viewport::initial(160, 96);
        vp.fit_bounds(Bounds::from_point(JERUSALEM), 4, FIT_MAX_ZOOM);
        assert_eq!(vp.zoom, FIT_MAX_ZOOM);
    }
}
