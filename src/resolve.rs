//! Layer visibility reconciliation: toggle state in, visible overlays and
//! legend out.

use crate::geo::Bounds;
use crate::overlay::{Category, Citation, Geometry, LegendTemplate, OverlayGroup, OverlayRegistry, SwatchStyle};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Period checkbox state. "none" and real period keys cannot coexist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PeriodSelection {
    /// The explicit "none" option
    None,
    /// Zero or more real period keys; empty means nothing is checked
    Keys(BTreeSet<String>),
}

impl Default for PeriodSelection {
    fn default() -> Self {
        PeriodSelection::Keys(BTreeSet::new())
    }
}

/// Live session toggles, owned by the view controller
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToggleState {
    periods: PeriodSelection,
    independent: BTreeMap<String, bool>,
    opacity_percent: u8,
}

impl Default for ToggleState {
    fn default() -> Self {
        Self {
            periods: PeriodSelection::default(),
            independent: BTreeMap::new(),
            opacity_percent: 100,
        }
    }
}

impl ToggleState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn periods(&self) -> &PeriodSelection {
        &self.periods
    }

    pub fn is_none_selected(&self) -> bool {
        matches!(self.periods, PeriodSelection::None)
    }

    pub fn is_period_selected(&self, key: &str) -> bool {
        match &self.periods {
            PeriodSelection::None => false,
            PeriodSelection::Keys(keys) => keys.contains(key),
        }
    }

    /// Selected real period keys (empty when "none" is selected)
    pub fn selected_keys(&self) -> impl Iterator<Item = &str> {
        let keys = match &self.periods {
            PeriodSelection::None => None,
            PeriodSelection::Keys(keys) => Some(keys.iter().map(String::as_str)),
        };
        keys.into_iter().flatten()
    }

    /// Check a real period; clears "none"
    pub fn select_period(&mut self, key: impl Into<String>) {
        let key = key.into();
        if let PeriodSelection::Keys(keys) = &mut self.periods {
            keys.insert(key);
            return;
        }
        self.periods = PeriodSelection::Keys(BTreeSet::from([key]));
    }

    /// Uncheck a real period; leaves "none" unchecked
    pub fn deselect_period(&mut self, key: &str) {
        if let PeriodSelection::Keys(keys) = &mut self.periods {
            keys.remove(key);
        }
    }

    pub fn toggle_period(&mut self, key: &str) {
        if self.is_period_selected(key) {
            self.deselect_period(key);
        } else {
            self.select_period(key);
        }
    }

    /// Check "none"; clears every real period
    pub fn select_none(&mut self) {
        self.periods = PeriodSelection::None;
    }

    /// Uncheck "none" without selecting anything
    pub fn clear_none(&mut self) {
        if self.is_none_selected() {
            self.periods = PeriodSelection::default();
        }
    }

    pub fn is_on(&self, category: &str) -> bool {
        self.independent.get(category).copied().unwrap_or(false)
    }

    pub fn set_category(&mut self, category: impl Into<String>, on: bool) {
        self.independent.insert(category.into(), on);
    }

    pub fn toggle_category(&mut self, category: &str) {
        let on = !self.is_on(category);
        self.set_category(category, on);
    }

    /// Any id switched on, including ids the registry does not know.
    /// Use [`ToggleState::any_known_category_on`] to ignore those.
    pub fn any_category_on(&self) -> bool {
        self.independent.values().any(|&on| on)
    }

    /// Any category of `registry` switched on
    pub fn any_known_category_on(&self, registry: &OverlayRegistry) -> bool {
        registry.categories().iter().any(|c| self.is_on(&c.id))
    }

    pub fn opacity_percent(&self) -> u8 {
        self.opacity_percent
    }

    /// Clamped to [0, 100]
    pub fn set_opacity_percent(&mut self, percent: i32) {
        self.opacity_percent = percent.clamp(0, 100) as u8;
    }
}

/// An overlay to show and its effective opacity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisibleOverlay {
    pub id: String,
    pub opacity: f64,
}

/// How a legend swatch is drawn, resolved to concrete colors
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Swatch {
    pub color: String,
    pub style: SwatchStyle,
}

/// A rendered legend line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    pub label: String,
    pub detail: Option<String>,
    pub swatch: Swatch,
    pub reference: Option<Citation>,
    pub note: Option<String>,
}

impl LegendEntry {
    fn territory(group: &OverlayGroup) -> Self {
        Self {
            label: group.display_name.clone(),
            detail: group.description.clone(),
            swatch: Swatch {
                color: group.color.clone(),
                style: SwatchStyle::Fill,
            },
            reference: Some(group.reference.clone()),
            note: group.note.clone(),
        }
    }

    /// Stand-in for a category that declares no legend lines
    fn for_category(category: &Category, first: &OverlayGroup) -> Self {
        let style = match first.geometry {
            Geometry::Polygon(_) => SwatchStyle::Fill,
            Geometry::Polyline(_) => SwatchStyle::DashedLine,
            Geometry::Point(_) => SwatchStyle::Markers {
                colors: vec![first.color.clone()],
            },
        };
        Self {
            label: category.label.clone(),
            detail: None,
            swatch: Swatch {
                color: first.color.clone(),
                style,
            },
            reference: None,
            note: None,
        }
    }

    fn from_template(template: &LegendTemplate) -> Self {
        Self {
            label: template.label.clone(),
            detail: template.detail.clone(),
            swatch: Swatch {
                color: template.color.clone(),
                style: template.swatch.clone(),
            },
            reference: template
                .reference
                .as_ref()
                .map(|text| Citation::new(text.clone(), template.reference_url.clone())),
            note: template.note.clone(),
        }
    }
}

/// Resolver output
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResolvedView {
    pub visible: Vec<VisibleOverlay>,
    pub legend: Vec<LegendEntry>,
}

impl ResolvedView {
    pub fn is_visible(&self, id: &str) -> bool {
        self.visible.iter().any(|v| v.id == id)
    }

    pub fn opacity_of(&self, id: &str) -> Option<f64> {
        self.visible.iter().find(|v| v.id == id).map(|v| v.opacity)
    }

    /// Bounding box of every visible geometry
    pub fn bounds(&self, registry: &OverlayRegistry) -> Option<Bounds> {
        registry.bounds_of(self.visible.iter().map(|v| v.id.as_str()))
    }
}

/// Opacity under the slider. Period-keyed overlays and filled polygons are
/// scaled; category routes and markers stay at full opacity.
pub fn effective_opacity(group: &OverlayGroup, opacity_percent: u8) -> f64 {
    if group.period_key.is_some() || group.geometry.is_fill() {
        f64::from(opacity_percent.min(100)) / 100.0 * group.base_opacity
    } else {
        1.0
    }
}

/// Compute visible overlays and legend entries. Pure: neither input is
/// modified and identical inputs give identical output.
pub fn resolve(toggles: &ToggleState, registry: &OverlayRegistry) -> ResolvedView {
    let percent = toggles.opacity_percent();
    let mut view = ResolvedView::default();

    if !toggles.is_none_selected() {
        for group in registry.groups() {
            let selected = group
                .period_key
                .as_deref()
                .is_some_and(|key| toggles.is_period_selected(key));
            if selected {
                view.visible.push(VisibleOverlay {
                    id: group.id.clone(),
                    opacity: effective_opacity(group, percent),
                });
                view.legend.push(LegendEntry::territory(group));
            }
        }
    }

    for category in categories_in_legend_order(registry) {
        if !toggles.is_on(&category.id) {
            continue;
        }
        let mut first = None;
        for group in registry.by_category(&category.id) {
            first.get_or_insert(group);
            view.visible.push(VisibleOverlay {
                id: group.id.clone(),
                opacity: effective_opacity(group, percent),
            });
        }
        if !category.legend.is_empty() {
            view.legend
                .extend(category.legend.iter().map(LegendEntry::from_template));
        } else if let Some(first) = first {
            view.legend.push(LegendEntry::for_category(category, first));
        }
    }

    view
}

/// Journey, conquest, empires, Eden, locations; declaration order within a kind
fn categories_in_legend_order(registry: &OverlayRegistry) -> Vec<&Category> {
    let mut categories: Vec<&Category> = registry.categories().iter().collect();
    categories.sort_by_key(|c| c.kind);
    categories
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_clears_periods() {
        let mut t = ToggleState::new();
        t.select_period("patriarchal");
        t.select_period("conquest");
        t.select_none();
        assert!(t.is_none_selected());
        assert_eq!(t.selected_keys().count(), 0);
    }

    #[test]
    fn test_period_clears_none() {
        let mut t = ToggleState::new();
        t.select_none();
        t.select_period("conquest");
        assert!(!t.is_none_selected());
        assert!(t.is_period_selected("conquest"));
    }

    #[test]
    fn test_deselect_last_period_leaves_nothing_checked() {
        let mut t = ToggleState::new();
        t.toggle_period("conquest");
        t.toggle_period("conquest");
        assert_eq!(t.periods(), &PeriodSelection::Keys(BTreeSet::new()));
    }

    #[test]
    fn test_opacity_clamped() {
        let mut t = ToggleState::new();
        assert_eq!(t.opacity_percent(), 100);
        t.set_opacity_percent(140);
        assert_eq!(t.opacity_percent(), 100);
        t.set_opacity_percent(-3);
        assert_eq!(t.opacity_percent(), 0);
    }

    fn registry(legend: Vec<LegendTemplate>) -> OverlayRegistry {
        use crate::geo::LatLng;
        use crate::overlay::{CategoryKind, Period};

        OverlayRegistry::new(
            vec![Period {
                key: "divided-kingdom".into(),
                label: "Divided Kingdom".into(),
            }],
            vec![Category {
                id: "sites".into(),
                kind: CategoryKind::Locations,
                label: "Sites".into(),
                legend,
            }],
            vec![
                OverlayGroup::new(
                    "border",
                    "Israel-Judah Border",
                    "#8B0000",
                    Geometry::Polyline(vec![LatLng::new(31.9, 34.8), LatLng::new(31.9, 35.5)]),
                    Citation::new("1 Kgs 12", None),
                )
                .with_period_key("divided-kingdom")
                .with_opacity(0.4),
                OverlayGroup::new(
                    "shechem",
                    "Shechem",
                    "#2E8B57",
                    Geometry::Point(LatLng::new(32.21, 35.28)),
                    Citation::new("1 Kgs 12:1", None),
                )
                .with_category("sites"),
            ],
        )
    }

    #[test]
    fn test_period_polyline_follows_slider() {
        let registry = registry(vec![]);
        let mut t = ToggleState::new();
        t.select_period("divided-kingdom");
        t.set_category("sites", true);

        t.set_opacity_percent(0);
        let view = resolve(&t, &registry);
        assert_eq!(view.opacity_of("border"), Some(0.0));
        assert_eq!(view.opacity_of("shechem"), Some(1.0));

        t.set_opacity_percent(50);
        let view = resolve(&t, &registry);
        assert_eq!(view.opacity_of("border"), Some(0.2));
        assert_eq!(view.opacity_of("shechem"), Some(1.0));
    }

    #[test]
    fn test_category_without_legend_lines_gets_one() {
        let registry = registry(vec![]);
        let mut t = ToggleState::new();
        t.set_category("sites", true);
        let view = resolve(&t, &registry);
        assert_eq!(view.visible.len(), 1);
        assert_eq!(view.legend.len(), 1);
        assert_eq!(view.legend[0].label, "Sites");
        assert_eq!(
            view.legend[0].swatch.style,
            SwatchStyle::Markers {
                colors: vec!["#2E8B57".into()]
            }
        );
    }

    #[test]
    fn test_declared_legend_lines_win() {
        let registry = registry(vec![LegendTemplate {
            label: "Northern Kingdom Sites".into(),
            detail: None,
            color: "#2E8B57".into(),
            swatch: SwatchStyle::Markers { colors: vec![] },
            reference: None,
            reference_url: None,
            note: None,
        }]);
        let mut t = ToggleState::new();
        t.set_category("sites", true);
        let view = resolve(&t, &registry);
        let labels: Vec<&str> = view.legend.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["Northern Kingdom Sites"]);
    }

    #[test]
    fn test_unknown_category_ids_ignored_by_known_check() {
        let registry = registry(vec![]);
        let mut t = ToggleState::new();
        t.set_category("atlantis", true);
        assert!(t.any_category_on());
        assert!(!t.any_known_category_on(&registry));
        assert!(resolve(&t, &registry).legend.is_empty());
    }

    #[test]
    fn test_toggle_category() {
        let mut t = ToggleState::new();
        assert!(!t.any_category_on());
        t.toggle_category("eden");
        assert!(t.is_on("eden"));
        t.toggle_category("eden");
        assert!(!t.is_on("eden"));
        assert!(!t.any_category_on());
    }
}
