use biblical_atlas::data;
use biblical_atlas::geo::{Bounds, JERUSALEM};
use biblical_atlas::resolve::LegendEntry;
use biblical_atlas::view::{MapSurface, ViewController, Visibility};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Fit(Bounds),
    Reset,
}

/// Surface that records what the controller asked for
#[derive(Default)]
struct RecordingSurface {
    visibility: HashMap<String, Visibility>,
    legend: Vec<String>,
    calls: Vec<Call>,
    refreshes: usize,
}

impl MapSurface for RecordingSurface {
    fn set_overlay_visibility(&mut self, id: &str, visibility: Visibility) {
        self.visibility.insert(id.to_string(), visibility);
    }

    fn render_legend(&mut self, entries: &[LegendEntry]) {
        self.legend = entries.iter().map(|e| e.label.clone()).collect();
        self.refreshes += 1;
    }

    fn fit_bounds(&mut self, bounds: Bounds) {
        self.calls.push(Call::Fit(bounds));
    }

    fn reset_view(&mut self) {
        self.calls.push(Call::Reset);
    }
}

impl RecordingSurface {
    fn shown(&self) -> usize {
        self.visibility
            .values()
            .filter(|v| matches!(v, Visibility::Shown { .. }))
            .count()
    }
}

fn controller() -> ViewController<RecordingSurface> {
    let registry = Arc::new(data::load_builtin().unwrap());
    ViewController::new(registry, RecordingSurface::default())
}

#[test]
fn initial_push_hides_everything_but_base() {
    let c = controller();
    let surface = c.surface();
    assert_eq!(surface.refreshes, 1);
    assert_eq!(surface.shown(), 0);
    assert!(surface.legend.is_empty());
    // Rivers are outside controller management
    assert!(!surface.visibility.contains_key("nile"));
    assert_eq!(
        surface.visibility.len(),
        c.registry().groups().iter().filter(|g| !g.is_base()).count()
    );
}

#[test]
fn period_selection_pushes_fill_opacity() {
    let mut c = controller();
    c.set_opacity(50);
    c.select_period("patriarchal");
    match c.surface().visibility["abraham-promised"] {
        Visibility::Shown { opacity } => assert!((opacity - 0.15).abs() < 1e-9),
        Visibility::Hidden => panic!("territory should be shown"),
    }
    assert_eq!(c.surface().legend, ["Abraham's Promised Land"]);

    c.select_none();
    assert_eq!(c.surface().visibility["abraham-promised"], Visibility::Hidden);
    assert!(c.surface().legend.is_empty());
}

#[test]
fn toggle_none_round_trip() {
    let mut c = controller();
    c.select_period("conquest");
    c.toggle_none();
    assert!(c.toggles().is_none_selected());
    c.toggle_none();
    assert!(!c.toggles().is_none_selected());
    assert!(!c.toggles().is_period_selected("conquest"));
    assert!(c.view().visible.is_empty());
}

#[test]
fn unknown_category_is_ignored() {
    let mut c = controller();
    let before = c.surface().refreshes;
    assert!(!c.toggle_category("atlantis"));
    assert_eq!(c.surface().refreshes, before);
    assert!(!c.toggles().any_category_on());

    assert!(c.toggle_category("garden-eden"));
    assert_eq!(c.surface().shown(), 4);
}

#[test]
fn opacity_adjust_clamps_and_leaves_markers_alone() {
    let mut c = controller();
    c.set_category("assyrian-empire", true);
    c.adjust_opacity(-150);
    assert_eq!(c.toggles().opacity_percent(), 0);
    assert_eq!(c.surface().visibility["assyrian-empire"], Visibility::Shown { opacity: 0.0 });
    assert_eq!(c.surface().visibility["assyrian-nineveh"], Visibility::Shown { opacity: 1.0 });
    c.adjust_opacity(500);
    assert_eq!(c.toggles().opacity_percent(), 100);
}

#[test]
fn fit_to_visible_uses_visible_bounds_or_resets() {
    let mut c = controller();
    c.fit_to_visible();
    assert_eq!(c.surface().calls, [Call::Reset]);

    c.select_period("united-kingdom");
    c.fit_to_visible();
    let Some(Call::Fit(bounds)) = c.surface().calls.last().cloned() else {
        panic!("expected a fit");
    };
    assert!(bounds.contains(JERUSALEM));
    assert_eq!(Some(bounds), c.view().bounds(c.registry()));
}
