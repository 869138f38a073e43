//! View controller: owns the toggle state and pushes resolved views to a
//! drawing surface.

use crate::geo::Bounds;
use crate::overlay::OverlayRegistry;
use crate::resolve::{resolve, LegendEntry, ResolvedView, ToggleState};
use std::sync::Arc;
use tracing::debug;

/// Per-overlay display state handed to the surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Visibility {
    /// Not drawn and not clickable
    Hidden,
    Shown { opacity: f64 },
}

/// Capabilities the controller needs from a map engine
pub trait MapSurface {
    fn set_overlay_visibility(&mut self, id: &str, visibility: Visibility);
    fn render_legend(&mut self, entries: &[LegendEntry]);
    fn fit_bounds(&mut self, bounds: Bounds);
    /// Return to the initial view
    fn reset_view(&mut self);
}

/// Base map tile style
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum MapStyle {
    #[default]
    Topographic,
    Satellite,
}

impl MapStyle {
    pub fn toggled(self) -> Self {
        match self {
            MapStyle::Topographic => MapStyle::Satellite,
            MapStyle::Satellite => MapStyle::Topographic,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MapStyle::Topographic => "Topographic",
            MapStyle::Satellite => "Satellite",
        }
    }
}

pub struct ViewController<S: MapSurface> {
    registry: Arc<OverlayRegistry>,
    toggles: ToggleState,
    view: ResolvedView,
    surface: S,
}

impl<S: MapSurface> ViewController<S> {
    /// Start with all toggles off and opacity at 100%, then draw once
    pub fn new(registry: Arc<OverlayRegistry>, surface: S) -> Self {
        Self::with_toggles(registry, surface, ToggleState::new())
    }

    pub fn with_toggles(registry: Arc<OverlayRegistry>, surface: S, toggles: ToggleState) -> Self {
        let mut controller = Self {
            registry,
            toggles,
            view: ResolvedView::default(),
            surface,
        };
        controller.refresh();
        controller
    }

    pub fn registry(&self) -> &OverlayRegistry {
        &self.registry
    }

    pub fn toggles(&self) -> &ToggleState {
        &self.toggles
    }

    pub fn view(&self) -> &ResolvedView {
        &self.view
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn select_period(&mut self, key: &str) {
        self.toggles.select_period(key);
        self.refresh();
    }

    pub fn deselect_period(&mut self, key: &str) {
        self.toggles.deselect_period(key);
        self.refresh();
    }

    pub fn toggle_period(&mut self, key: &str) {
        self.toggles.toggle_period(key);
        self.refresh();
    }

    /// Check "none", or uncheck it when already checked
    pub fn toggle_none(&mut self) {
        if self.toggles.is_none_selected() {
            self.toggles.clear_none();
        } else {
            self.toggles.select_none();
        }
        self.refresh();
    }

    pub fn select_none(&mut self) {
        self.toggles.select_none();
        self.refresh();
    }

    /// Unknown categories are ignored; returns whether the toggle applied
    pub fn set_category(&mut self, id: &str, on: bool) -> bool {
        if !self.registry.has_category(id) {
            debug!("ignoring unknown category {id}");
            return false;
        }
        self.toggles.set_category(id, on);
        self.refresh();
        true
    }

    pub fn toggle_category(&mut self, id: &str) -> bool {
        let on = !self.toggles.is_on(id);
        self.set_category(id, on)
    }

    pub fn set_opacity(&mut self, percent: i32) {
        self.toggles.set_opacity_percent(percent);
        self.refresh();
    }

    pub fn adjust_opacity(&mut self, delta: i32) {
        let percent = i32::from(self.toggles.opacity_percent()) + delta;
        self.set_opacity(percent);
    }

    /// Fit to every visible geometry, or reset when nothing is visible
    pub fn fit_to_visible(&mut self) {
        match self.view.bounds(&self.registry) {
            Some(bounds) => self.surface.fit_bounds(bounds),
            None => self.surface.reset_view(),
        }
    }

    /// Re-resolve and push visibility for every managed overlay plus the legend
    pub fn refresh(&mut self) {
        self.view = resolve(&self.toggles, &self.registry);
        for group in self.registry.groups().iter().filter(|g| !g.is_base()) {
            let visibility = match self.view.opacity_of(&group.id) {
                Some(opacity) => Visibility::Shown { opacity },
                None => Visibility::Hidden,
            };
            self.surface.set_overlay_visibility(&group.id, visibility);
        }
        self.surface.render_legend(&self.view.legend);
        debug!(
            visible = self.view.visible.len(),
            legend = self.view.legend.len(),
            opacity = self.toggles.opacity_percent(),
            "view refreshed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_style_toggle() {
        assert_eq!(MapStyle::default(), MapStyle::Topographic);
        assert_eq!(MapStyle::Topographic.toggled(), MapStyle::Satellite);
        assert_eq!(MapStyle::Satellite.toggled().label(), "Topographic");
    }
}
