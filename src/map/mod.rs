mod geometry;
mod projection;
mod renderer;

pub use projection::{Viewport, FIT_MAX_ZOOM, INITIAL_ZOOM};
pub use renderer::{hex_color, MapLabel, MapLayer, MapLayers, Palette, TerminalSurface};
