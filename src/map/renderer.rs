use crate::braille::BrailleCanvas;
use crate::data::BaseMap;
use crate::geo::{Bounds, LatLng};
use crate::map::geometry::{
    draw_circle, draw_dashed_line, draw_line, fill_polygon, polygon_contains, segment_distance_sq,
};
use crate::map::projection::{Viewport, FIT_MAX_ZOOM};
use crate::overlay::{Geometry, OverlayGroup, OverlayRegistry};
use crate::resolve::LegendEntry;
use crate::view::{MapStyle, MapSurface, Visibility};
use ratatui::style::Color;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Pixels kept clear around a fitted territory
const FIT_PADDING: usize = 6;
/// Point names appear once the map is zoomed in this far
const LABEL_ZOOM: f64 = 20.0;
/// Click tolerance for routes and markers, in braille pixels
const HIT_RADIUS: f64 = 3.0;

/// Parse "#RRGGBB" into a terminal color
pub fn hex_color(hex: &str) -> Color {
    let digits = hex.trim_start_matches('#');
    if digits.len() != 6 || !digits.is_ascii() {
        return Color::White;
    }
    let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
    match (channel(0), channel(2), channel(4)) {
        (Some(r), Some(g), Some(b)) => Color::Rgb(r, g, b),
        _ => Color::White,
    }
}

/// Base map colors for a style
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub coast: Color,
    pub river: Color,
    pub label: Color,
    pub background: Color,
}

impl Palette {
    pub fn for_style(style: MapStyle) -> Self {
        match style {
            MapStyle::Topographic => Self {
                coast: Color::Rgb(139, 119, 101),
                river: Color::Rgb(70, 130, 180),
                label: Color::White,
                background: Color::Reset,
            },
            MapStyle::Satellite => Self {
                coast: Color::Rgb(107, 142, 35),
                river: Color::Rgb(0, 191, 255),
                label: Color::Rgb(255, 250, 205),
                background: Color::Rgb(12, 24, 36),
            },
        }
    }
}

/// One color's worth of braille dots
pub struct MapLayer {
    pub canvas: BrailleCanvas,
    pub color: Color,
}

/// Text drawn over the braille layers, in character cells
pub struct MapLabel {
    pub x: u16,
    pub y: u16,
    pub text: String,
    pub color: Color,
}

/// Everything needed to paint one frame, back to front
pub struct MapLayers {
    pub layers: Vec<MapLayer>,
    pub labels: Vec<MapLabel>,
    pub background: Color,
}

/// Terminal map engine driven by the view controller
pub struct TerminalSurface {
    registry: Arc<OverlayRegistry>,
    basemap: BaseMap,
    visibility: HashMap<String, Visibility>,
    legend: Vec<LegendEntry>,
    pub viewport: Viewport,
    pub style: MapStyle,
}

impl TerminalSurface {
    pub fn new(registry: Arc<OverlayRegistry>, basemap: BaseMap, viewport: Viewport, style: MapStyle) -> Self {
        Self {
            registry,
            basemap,
            visibility: HashMap::new(),
            legend: Vec::new(),
            viewport,
            style,
        }
    }

    pub fn legend(&self) -> &[LegendEntry] {
        &self.legend
    }

    pub fn palette(&self) -> Palette {
        Palette::for_style(self.style)
    }

    pub fn toggle_style(&mut self) {
        self.style = self.style.toggled();
    }

    /// Opacity a group is drawn at, `None` when hidden. Base overlays are always shown.
    pub fn shown_opacity(&self, group: &OverlayGroup) -> Option<f64> {
        if group.is_base() {
            return Some(1.0);
        }
        match self.visibility.get(&group.id) {
            Some(Visibility::Shown { opacity }) => Some(*opacity),
            _ => None,
        }
    }

    fn shown(&self) -> impl Iterator<Item = (&OverlayGroup, f64)> {
        self.registry
            .groups()
            .iter()
            .filter_map(move |g| self.shown_opacity(g).map(|opacity| (g, opacity)))
    }

    /// Render all map features for a canvas of `cols` x `rows` characters
    pub fn render(&self, cols: usize, rows: usize, viewport: &Viewport) -> MapLayers {
        let palette = self.palette();
        let mut layers = Vec::new();
        let mut labels = Vec::new();

        let mut coast = BrailleCanvas::new(cols, rows);
        for line in &self.basemap.coastlines {
            draw_linestring(&mut coast, line, viewport, false);
        }
        layers.push(MapLayer {
            canvas: coast,
            color: palette.coast,
        });

        let shown: Vec<(&OverlayGroup, f64)> = self.shown().collect();

        // Fills first so routes and markers stay on top
        for &(group, opacity) in &shown {
            let Geometry::Polygon(ring) = &group.geometry else {
                continue;
            };
            let mut canvas = BrailleCanvas::new(cols, rows);
            let projected: Vec<(i32, i32)> = ring.iter().map(|&p| viewport.project(p)).collect();
            fill_polygon(&mut canvas, &projected, opacity * 0.5);
            draw_ring(&mut canvas, &projected, viewport);
            layers.push(MapLayer {
                canvas,
                color: hex_color(&group.color),
            });
            if let Some(label) = &group.label {
                let anchor = group
                    .label_at
                    .or_else(|| group.geometry.bounds().map(|b| b.center()));
                if let Some(anchor) = anchor {
                    push_label(&mut labels, viewport, anchor, label, hex_color(&group.color), 0);
                }
            }
        }

        for &(group, _) in &shown {
            let Geometry::Polyline(line) = &group.geometry else {
                continue;
            };
            let mut canvas = BrailleCanvas::new(cols, rows);
            let (color, dashed) = if group.is_base() {
                (palette.river, false)
            } else {
                (hex_color(&group.color), true)
            };
            draw_linestring(&mut canvas, line, viewport, dashed);
            layers.push(MapLayer { canvas, color });
            if let Some(label) = &group.label {
                let anchor = group.label_at.or_else(|| line.get(line.len() / 2).copied());
                if let Some(anchor) = anchor {
                    push_label(&mut labels, viewport, anchor, label, color, 0);
                }
            }
        }

        for &(group, _) in &shown {
            let Geometry::Point(p) = group.geometry else {
                continue;
            };
            let color = hex_color(&group.color);
            match group.marker {
                Some(marker) => push_label(&mut labels, viewport, p, &marker.glyph().to_string(), color, 0),
                None => {
                    let mut canvas = BrailleCanvas::new(cols, rows);
                    let (px, py) = viewport.project(p);
                    draw_circle(&mut canvas, px, py, 1);
                    layers.push(MapLayer { canvas, color });
                }
            }
            if viewport.zoom >= LABEL_ZOOM {
                let name = match group.order {
                    Some(order) => format!("{order}. {}", group.display_name),
                    None => group.display_name.clone(),
                };
                push_label(&mut labels, viewport, p, &name, palette.label, 2);
            }
        }

        MapLayers {
            layers,
            labels,
            background: palette.background,
        }
    }

    /// Topmost shown overlay under a braille pixel: markers, then routes, then fills
    pub fn hit_test(&self, px: i32, py: i32) -> Option<&OverlayGroup> {
        let shown: Vec<&OverlayGroup> = self.shown().map(|(g, _)| g).collect();
        let radius_sq = HIT_RADIUS * HIT_RADIUS;

        let point_hit = shown.iter().rev().find(|g| match g.geometry {
            Geometry::Point(p) => {
                let (x, y) = self.viewport.project(p);
                segment_distance_sq((px, py), (x, y), (x, y)) <= radius_sq
            }
            _ => false,
        });
        let line_hit = || {
            shown.iter().rev().find(|g| match &g.geometry {
                Geometry::Polyline(line) => {
                    let projected: Vec<(i32, i32)> = line.iter().map(|&p| self.viewport.project(p)).collect();
                    projected
                        .windows(2)
                        .any(|w| segment_distance_sq((px, py), w[0], w[1]) <= radius_sq)
                }
                _ => false,
            })
        };
        let fill_hit = || {
            shown.iter().rev().find(|g| match &g.geometry {
                Geometry::Polygon(ring) => {
                    let projected: Vec<(i32, i32)> = ring.iter().map(|&p| self.viewport.project(p)).collect();
                    polygon_contains(&projected, px, py)
                }
                _ => false,
            })
        };

        point_hit.or_else(line_hit).or_else(fill_hit).copied()
    }
}

impl MapSurface for TerminalSurface {
    fn set_overlay_visibility(&mut self, id: &str, visibility: Visibility) {
        self.visibility.insert(id.to_string(), visibility);
    }

    fn render_legend(&mut self, entries: &[LegendEntry]) {
        self.legend = entries.to_vec();
    }

    fn fit_bounds(&mut self, bounds: Bounds) {
        debug!(?bounds, "fitting viewport");
        self.viewport.fit_bounds(bounds, FIT_PADDING, FIT_MAX_ZOOM);
    }

    fn reset_view(&mut self) {
        self.viewport = Viewport::initial(self.viewport.width, self.viewport.height);
    }
}

/// Draw a linestring with viewport culling
fn draw_linestring(canvas: &mut BrailleCanvas, line: &[LatLng], viewport: &Viewport, dashed: bool) {
    if line.len() < 2 {
        return;
    }

    let mut prev: Option<(i32, i32)> = None;

    for &p in line {
        let (px, py) = viewport.project(p);

        if let Some((prev_x, prev_y)) = prev {
            let dist = ((px - prev_x).abs() + (py - prev_y).abs()) as usize;
            if dist < viewport.width && viewport.line_might_be_visible((prev_x, prev_y), (px, py)) {
                if dashed {
                    draw_dashed_line(canvas, prev_x, prev_y, px, py, 3, 2);
                } else {
                    draw_line(canvas, prev_x, prev_y, px, py);
                }
            }
        }

        prev = Some((px, py));
    }
}

/// Outline of an implicitly closed ring
fn draw_ring(canvas: &mut BrailleCanvas, ring: &[(i32, i32)], viewport: &Viewport) {
    for (i, &a) in ring.iter().enumerate() {
        let b = ring[(i + 1) % ring.len()];
        if viewport.line_might_be_visible(a, b) {
            draw_line(canvas, a.0, a.1, b.0, b.1);
        }
    }
}

/// Place text at a projected location, `offset` cells right of the point
fn push_label(labels: &mut Vec<MapLabel>, viewport: &Viewport, at: LatLng, text: &str, color: Color, offset: u16) {
    let (px, py) = viewport.project(at);
    if !viewport.is_visible(px, py) || px < 0 || py < 0 {
        return;
    }
    // Convert braille coords to char coords
    let char_x = (px / 2) as u16;
    let char_y = (py / 4) as u16;
    if let Some(x) = char_x.checked_add(offset) {
        labels.push(MapLabel {
            x,
            y: char_y,
            text: text.to_string(),
            color,
        });
    }
}
