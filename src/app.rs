use crate::disclaimer::Disclaimer;
use crate::map::{TerminalSurface, Viewport};
use crate::overlay::OverlayGroup;
use crate::view::{MapSurface, ViewController};
use crossterm::event::{KeyCode, KeyEvent, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::{Constraint, Direction, Layout, Margin, Rect};

/// Side panel width in columns
pub const PANEL_WIDTH: u16 = 38;
/// Opacity slider step, in percent
const OPACITY_STEP: i32 = 5;

/// Screen regions shared by input handling and drawing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenLayout {
    pub map: Rect,
    pub panel: Option<Rect>,
    pub status: Rect,
}

impl ScreenLayout {
    pub fn new(area: Rect, panel_collapsed: bool) -> Self {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(3), Constraint::Length(1)])
            .split(area);

        if panel_collapsed {
            return Self {
                map: rows[0],
                panel: None,
                status: rows[1],
            };
        }

        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(20), Constraint::Length(PANEL_WIDTH)])
            .split(rows[0]);

        Self {
            map: cols[0],
            panel: Some(cols[1]),
            status: rows[1],
        }
    }

    /// Map area inside its border
    pub fn map_inner(&self) -> Rect {
        self.map.inner(Margin {
            horizontal: 1,
            vertical: 1,
        })
    }
}

/// One focusable row of the control panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelItem {
    Period(usize),
    NonePeriod,
    Category(usize),
}

/// Application state
pub struct App {
    pub controller: ViewController<TerminalSurface>,
    pub disclaimer: Disclaimer,
    pub panel_collapsed: bool,
    /// Index into `panel_items()`
    pub focus: usize,
    /// Overlay whose popup is open
    pub popup: Option<String>,
    pub should_quit: bool,
    /// Last mouse position for drag tracking
    pub last_mouse: Option<(u16, u16)>,
    dragged: bool,
    screen: Rect,
}

impl App {
    pub fn new(controller: ViewController<TerminalSurface>, disclaimer: Disclaimer, width: u16, height: u16) -> Self {
        let mut app = Self {
            controller,
            disclaimer,
            panel_collapsed: false,
            focus: 0,
            popup: None,
            should_quit: false,
            last_mouse: None,
            dragged: false,
            screen: Rect::new(0, 0, width, height),
        };
        app.sync_viewport_size();
        app
    }

    pub fn layout(&self) -> ScreenLayout {
        ScreenLayout::new(self.screen, self.panel_collapsed)
    }

    pub fn viewport(&self) -> &Viewport {
        &self.controller.surface().viewport
    }

    fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.controller.surface_mut().viewport
    }

    /// Update viewport size when terminal resizes
    pub fn resize(&mut self, width: u16, height: u16) {
        self.screen = Rect::new(0, 0, width, height);
        self.sync_viewport_size();
    }

    fn sync_viewport_size(&mut self) {
        // Braille gives 2x4 resolution per character
        let inner = self.layout().map_inner();
        let viewport = self.viewport_mut();
        viewport.width = inner.width as usize * 2;
        viewport.height = inner.height as usize * 4;
    }

    pub fn panel_items(&self) -> Vec<PanelItem> {
        let registry = self.controller.registry();
        (0..registry.periods().len())
            .map(PanelItem::Period)
            .chain(std::iter::once(PanelItem::NonePeriod))
            .chain((0..registry.categories().len()).map(PanelItem::Category))
            .collect()
    }

    pub fn focused_item(&self) -> Option<PanelItem> {
        self.panel_items().get(self.focus).copied()
    }

    pub fn focus_next(&mut self) {
        let len = self.panel_items().len();
        if len > 0 {
            self.focus = (self.focus + 1) % len;
        }
    }

    pub fn focus_prev(&mut self) {
        let len = self.panel_items().len();
        if len > 0 {
            self.focus = (self.focus + len - 1) % len;
        }
    }

    /// Flip the checkbox behind a panel row
    pub fn activate(&mut self, item: PanelItem) {
        match item {
            PanelItem::Period(i) => {
                let key = self.controller.registry().periods().get(i).map(|p| p.key.clone());
                if let Some(key) = key {
                    self.controller.toggle_period(&key);
                }
            }
            PanelItem::NonePeriod => self.controller.toggle_none(),
            PanelItem::Category(i) => {
                let id = self.controller.registry().categories().get(i).map(|c| c.id.clone());
                if let Some(id) = id {
                    self.controller.toggle_category(&id);
                }
            }
        }
        self.close_stale_popup();
    }

    /// A popup never outlives the visibility of its overlay
    fn close_stale_popup(&mut self) {
        let stale = self.popup.as_deref().is_some_and(|id| {
            self.controller
                .registry()
                .get(id)
                .is_some_and(|g| self.controller.surface().shown_opacity(g).is_none())
        });
        if stale {
            self.popup = None;
        }
    }

    pub fn popup_group(&self) -> Option<&OverlayGroup> {
        self.popup.as_deref().and_then(|id| self.controller.registry().get(id))
    }

    /// Pan the map
    pub fn pan(&mut self, dx: i32, dy: i32) {
        self.viewport_mut().pan(dx, dy);
    }

    pub fn zoom_in(&mut self) {
        self.viewport_mut().zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.viewport_mut().zoom_out();
    }

    /// Terminal cell to braille pixel inside the map, `None` outside it
    pub fn cell_to_pixel(&self, col: u16, row: u16) -> Option<(i32, i32)> {
        let inner = self.layout().map_inner();
        if col < inner.x || row < inner.y || col >= inner.right() || row >= inner.bottom() {
            return None;
        }
        Some((i32::from(col - inner.x) * 2, i32::from(row - inner.y) * 4))
    }

    /// Open the popup of the topmost shown overlay at a cell, or close it
    pub fn click(&mut self, col: u16, row: u16) {
        let Some((px, py)) = self.cell_to_pixel(col, row) else {
            return;
        };
        // Center of the cell's 2x4 dot block
        self.popup = self
            .controller
            .surface()
            .hit_test(px + 1, py + 2)
            .map(|g| g.id.clone());
    }

    /// Request quit
    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if self.disclaimer.is_visible() {
            match key.code {
                KeyCode::Enter => self.disclaimer.accept(),
                KeyCode::Char(' ') | KeyCode::Char('x') => self.disclaimer.toggle_dont_show_again(),
                KeyCode::Char('q') => self.quit(),
                _ => {}
            }
            return;
        }

        if self.popup.is_some() && key.code == KeyCode::Esc {
            self.popup = None;
            return;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.quit(),

            // Pan with hjkl or arrow keys
            KeyCode::Left | KeyCode::Char('h') => self.pan(-10, 0),
            KeyCode::Right | KeyCode::Char('l') => self.pan(10, 0),
            KeyCode::Up | KeyCode::Char('k') => self.pan(0, -6),
            KeyCode::Down | KeyCode::Char('j') => self.pan(0, 6),

            // Zoom
            KeyCode::Char('+') | KeyCode::Char('=') => self.zoom_in(),
            KeyCode::Char('-') | KeyCode::Char('_') => self.zoom_out(),

            // Period shortcuts: 0 is "none", 1..9 follow panel order
            KeyCode::Char('0') => self.activate(PanelItem::NonePeriod),
            KeyCode::Char(c @ '1'..='9') => {
                let index = c as usize - '1' as usize;
                if index < self.controller.registry().periods().len() {
                    self.activate(PanelItem::Period(index));
                }
            }

            KeyCode::Tab => self.focus_next(),
            KeyCode::BackTab => self.focus_prev(),
            KeyCode::Char(' ') | KeyCode::Enter => {
                if let Some(item) = self.focused_item() {
                    self.activate(item);
                }
            }

            KeyCode::Char('[') => self.controller.adjust_opacity(-OPACITY_STEP),
            KeyCode::Char(']') => self.controller.adjust_opacity(OPACITY_STEP),

            KeyCode::Char('f') => self.controller.fit_to_visible(),
            KeyCode::Char('r') => self.controller.surface_mut().reset_view(),
            KeyCode::Char('m') => self.controller.surface_mut().toggle_style(),
            KeyCode::Char('c') => {
                self.panel_collapsed = !self.panel_collapsed;
                self.sync_viewport_size();
            }
            KeyCode::Char('d') => self.disclaimer.show(),

            _ => {}
        }
    }

    /// Handle mouse events for panning, zooming and popups
    pub fn handle_mouse(&mut self, mouse: MouseEvent) {
        if self.disclaimer.is_visible() {
            return;
        }
        match mouse.kind {
            // Scroll wheel for zooming towards mouse position
            MouseEventKind::ScrollUp => {
                if let Some((px, py)) = self.cell_to_pixel(mouse.column, mouse.row) {
                    self.viewport_mut().zoom_in_at(px, py);
                }
            }
            MouseEventKind::ScrollDown => {
                if let Some((px, py)) = self.cell_to_pixel(mouse.column, mouse.row) {
                    self.viewport_mut().zoom_out_at(px, py);
                }
            }
            // Horizontal scroll for panning (trackpad two-finger swipe)
            MouseEventKind::ScrollLeft => self.pan(-15, 0),
            MouseEventKind::ScrollRight => self.pan(15, 0),
            MouseEventKind::Down(MouseButton::Left) => {
                self.last_mouse = Some((mouse.column, mouse.row));
                self.dragged = false;
            }
            MouseEventKind::Drag(MouseButton::Left) => self.handle_drag(mouse.column, mouse.row),
            MouseEventKind::Up(MouseButton::Left) => {
                if !self.dragged {
                    self.click(mouse.column, mouse.row);
                }
                self.end_drag();
            }
            _ => {}
        }
    }

    /// Pan by the distance dragged since the last event
    pub fn handle_drag(&mut self, x: u16, y: u16) {
        if let Some((last_x, last_y)) = self.last_mouse {
            let dx = last_x as i32 - x as i32;
            let dy = last_y as i32 - y as i32;
            if dx != 0 || dy != 0 {
                self.dragged = true;
                self.pan(dx * 2, dy * 4);
            }
        }
        self.last_mouse = Some((x, y));
    }

    /// Reset drag state when mouse button released
    pub fn end_drag(&mut self) {
        self.last_mouse = None;
        self.dragged = false;
    }

    /// Get current zoom level as a string
    pub fn zoom_level(&self) -> String {
        format!("{:.1}x", self.viewport().zoom)
    }

    /// Get current center coordinates as a string
    pub fn center_coords(&self) -> String {
        let vp = self.viewport();
        format!(
            "{:.2}°{}, {:.2}°{}",
            vp.center_lat.abs(),
            if vp.center_lat >= 0.0 { "N" } else { "S" },
            vp.center_lon.abs(),
            if vp.center_lon >= 0.0 { "E" } else { "W" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{self, BaseMap};
    use crate::disclaimer::DisclaimerStore;
    use crate::geo::JERUSALEM;
    use crate::view::MapStyle;
    use crossterm::event::KeyModifiers;
    use std::sync::Arc;

    fn app() -> App {
        let registry = Arc::new(data::load_builtin().unwrap());
        let surface = TerminalSurface::new(
            registry.clone(),
            BaseMap::builtin(),
            Viewport::initial(0, 0),
            MapStyle::default(),
        );
        let controller = ViewController::new(registry, surface);
        let mut disclaimer = Disclaimer::load(DisclaimerStore::ephemeral());
        disclaimer.accept();
        App::new(controller, disclaimer, 120, 40)
    }

    fn press(app: &mut App, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    #[test]
    fn test_viewport_sized_to_map_area() {
        let mut app = app();
        // 120 - 38 panel - 2 border = 80 cols, 40 - 1 status - 2 border = 37 rows
        assert_eq!((app.viewport().width, app.viewport().height), (160, 148));
        press(&mut app, KeyCode::Char('c'));
        assert_eq!(app.viewport().width, 236);
    }

    #[test]
    fn test_number_keys_select_periods() {
        let mut app = app();
        press(&mut app, KeyCode::Char('1'));
        let first = app.controller.registry().periods()[0].key.clone();
        assert!(app.controller.toggles().is_period_selected(&first));

        press(&mut app, KeyCode::Char('0'));
        assert!(app.controller.toggles().is_none_selected());
        assert!(app.controller.view().visible.is_empty());
    }

    #[test]
    fn test_focus_wraps_and_activates_category() {
        let mut app = app();
        let items = app.panel_items();
        let periods = app.controller.registry().periods().len();
        assert_eq!(items[periods], PanelItem::NonePeriod);

        press(&mut app, KeyCode::BackTab);
        assert_eq!(app.focus, items.len() - 1);
        press(&mut app, KeyCode::Char(' '));
        let last = app.controller.registry().categories().last().unwrap().id.clone();
        assert!(app.controller.toggles().is_on(&last));
    }

    #[test]
    fn test_opacity_keys_step_and_clamp() {
        let mut app = app();
        press(&mut app, KeyCode::Char('['));
        assert_eq!(app.controller.toggles().opacity_percent(), 95);
        for _ in 0..3 {
            press(&mut app, KeyCode::Char(']'));
        }
        assert_eq!(app.controller.toggles().opacity_percent(), 100);
    }

    #[test]
    fn test_disclaimer_swallows_keys() {
        let mut app = app();
        app.disclaimer.show();
        press(&mut app, KeyCode::Char('1'));
        assert_eq!(app.controller.view().visible.len(), 0);
        press(&mut app, KeyCode::Esc);
        assert!(app.disclaimer.is_visible());
        assert!(!app.should_quit);
        press(&mut app, KeyCode::Enter);
        assert!(!app.disclaimer.is_visible());
        assert!(!app.should_quit);
    }

    #[test]
    fn test_click_opens_popup_for_shown_overlay_only() {
        let mut app = app();
        let (px, py) = app.viewport().project(JERUSALEM);
        let inner = app.layout().map_inner();
        let col = inner.x + (px / 2) as u16;
        let row = inner.y + (py / 4) as u16;

        app.click(col, row);
        assert!(app.popup.is_none());

        app.controller.set_category("locations", true);
        app.click(col, row);
        let group = app.popup_group().unwrap();
        assert_eq!(group.category.as_deref(), Some("locations"));

        let locations = app
            .panel_items()
            .into_iter()
            .position(|item| {
                matches!(item, PanelItem::Category(i)
                    if app.controller.registry().categories()[i].id == "locations")
            })
            .unwrap();
        app.focus = locations;
        press(&mut app, KeyCode::Char(' '));
        assert!(app.popup.is_none());
    }
}
