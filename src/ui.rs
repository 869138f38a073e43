use crate::app::{App, PanelItem};
use crate::disclaimer::DISCLAIMER_TEXT;
use crate::map::{hex_color, MapLayers};
use crate::overlay::{OverlayGroup, SwatchStyle};
use crate::resolve::LegendEntry;
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Gauge, Paragraph, Widget, Wrap},
    Frame,
};

/// Render the UI
pub fn render(frame: &mut Frame, app: &App) {
    let layout = app.layout();

    render_map(frame, app, layout.map);
    if let Some(panel) = layout.panel {
        render_panel(frame, app, panel);
    }
    render_status_bar(frame, app, layout.status);

    if let Some(group) = app.popup_group() {
        render_popup(frame, group, layout.map_inner());
    }
    if app.disclaimer.is_visible() {
        render_disclaimer(frame, app, frame.area());
    }
}

fn render_map(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            " Biblical Atlas ",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let surface = app.controller.surface();
    let layers = surface.render(inner.width as usize, inner.height as usize, &surface.viewport);
    frame.render_widget(MapWidget { layers }, inner);
}

/// Custom widget that renders braille layers with text labels overlaid
struct MapWidget {
    layers: MapLayers,
}

impl Widget for MapWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if self.layers.background != Color::Reset {
            buf.set_style(area, Style::default().bg(self.layers.background));
        }

        // Back to front: later layers overwrite shared cells
        for layer in &self.layers.layers {
            for cy in 0..area.height.min(layer.canvas.height() as u16) {
                for cx in 0..area.width.min(layer.canvas.width() as u16) {
                    if let Some(ch) = layer.canvas.glyph(cx as usize, cy as usize) {
                        buf[(area.x + cx, area.y + cy)].set_char(ch).set_fg(layer.color);
                    }
                }
            }
        }

        for label in &self.layers.labels {
            if label.y >= area.height || label.x >= area.width {
                continue;
            }
            let max_len = (area.width - label.x) as usize;
            let style = Style::default().fg(label.color).add_modifier(Modifier::BOLD);
            for (i, ch) in label.text.chars().take(max_len.min(28)).enumerate() {
                buf[(area.x + label.x + i as u16, area.y + label.y)].set_char(ch).set_style(style);
            }
        }
    }
}

fn checkbox(checked: bool) -> &'static str {
    if checked {
        "[x]"
    } else {
        "[ ]"
    }
}

fn render_panel(frame: &mut Frame, app: &App, area: Rect) {
    let registry = app.controller.registry();
    let toggles = app.controller.toggles();
    let focused = app.focused_item();
    let dim = Style::default().fg(Color::DarkGray);
    let header = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);

    let mut lines = vec![
        Line::from(vec![
            Span::styled("Map: ", dim),
            Span::raw(app.controller.surface().style.label()),
            Span::styled(" [m]", dim),
        ]),
        Line::from(Span::styled("Periods", header)),
    ];

    for item in app.panel_items() {
        let (text, checked) = match item {
            PanelItem::Period(i) => {
                let period = &registry.periods()[i];
                let shortcut = if i < 9 { format!("{}", i + 1) } else { " ".to_string() };
                (
                    format!("{shortcut} {}", period.label),
                    toggles.is_period_selected(&period.key),
                )
            }
            PanelItem::NonePeriod => ("0 None".to_string(), toggles.is_none_selected()),
            PanelItem::Category(i) => {
                let category = &registry.categories()[i];
                (format!("  {}", category.label), toggles.is_on(&category.id))
            }
        };
        if item == PanelItem::Category(0) {
            lines.push(Line::from(Span::styled("Overlays", header)));
        }
        let style = if Some(item) == focused {
            Style::default().add_modifier(Modifier::REVERSED)
        } else if checked {
            Style::default().fg(Color::Green)
        } else {
            Style::default()
        };
        lines.push(Line::from(Span::styled(format!("{} {text}", checkbox(checked)), style)));
    }

    let controls_height = lines.len() as u16 + 2;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(controls_height),
            Constraint::Length(3),
            Constraint::Min(3),
        ])
        .split(area);

    let controls = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(dim)
            .title(" Controls [c] "),
    );
    frame.render_widget(controls, chunks[0]);

    let percent = toggles.opacity_percent();
    let gauge = Gauge::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(dim)
                .title(" Opacity [ / ] "),
        )
        .gauge_style(Style::default().fg(Color::Yellow).bg(Color::DarkGray))
        .percent(u16::from(percent))
        .label(format!("{percent}%"));
    frame.render_widget(gauge, chunks[1]);

    render_legend(frame, app.controller.surface().legend(), chunks[2]);
}

fn swatch_spans(entry: &LegendEntry) -> Vec<Span<'static>> {
    let color = hex_color(&entry.swatch.color);
    match &entry.swatch.style {
        SwatchStyle::Fill => vec![Span::styled("██", Style::default().fg(color))],
        SwatchStyle::Striped => vec![Span::styled("▚▚", Style::default().fg(color))],
        SwatchStyle::DashedLine => vec![Span::styled("╌╌", Style::default().fg(color))],
        SwatchStyle::Markers { colors } => colors
            .iter()
            .map(|c| Span::styled("●", Style::default().fg(hex_color(c))))
            .collect(),
    }
}

fn render_legend(frame: &mut Frame, entries: &[LegendEntry], area: Rect) {
    let dim = Style::default().fg(Color::DarkGray);
    let mut lines = Vec::new();

    if entries.is_empty() {
        lines.push(Line::from(Span::styled("Nothing selected", dim)));
    }
    for entry in entries {
        let mut spans = swatch_spans(entry);
        spans.push(Span::raw(" "));
        spans.push(Span::styled(entry.label.clone(), Style::default().add_modifier(Modifier::BOLD)));
        lines.push(Line::from(spans));
        if let Some(detail) = &entry.detail {
            lines.push(Line::from(Span::raw(format!("   {detail}"))));
        }
        if let Some(reference) = &entry.reference {
            lines.push(Line::from(Span::styled(format!("   {}", reference.text), dim)));
        }
        if let Some(note) = &entry.note {
            lines.push(Line::from(Span::styled(
                format!("   {note}"),
                dim.add_modifier(Modifier::ITALIC),
            )));
        }
    }

    let legend = Paragraph::new(lines).wrap(Wrap { trim: false }).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(dim)
            .title(" Legend "),
    );
    frame.render_widget(legend, area);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let rejected = app.controller.registry().rejected().len();
    let mut spans = vec![
        Span::styled(" Zoom: ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.zoom_level(), Style::default().fg(Color::Yellow)),
        Span::styled(" | ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.center_coords(), Style::default().fg(Color::Cyan)),
        Span::styled(" | ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            format!("{} shown", app.controller.view().visible.len()),
            Style::default().fg(Color::Green),
        ),
    ];
    if rejected > 0 {
        spans.push(Span::styled(
            format!(" ({rejected} skipped)"),
            Style::default().fg(Color::Red),
        ));
    }
    spans.push(Span::styled(
        " | hjkl:pan +/-:zoom 0-9:period tab/space:toggle f:fit r:reset d:disclaimer q:quit",
        Style::default().fg(Color::DarkGray),
    ));

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Rect of the given size centered in `area`, clipped to it
fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

fn popup_lines(group: &OverlayGroup) -> Vec<Line<'static>> {
    let dim = Style::default().fg(Color::DarkGray);
    let mut lines = Vec::new();
    if let Some(period) = &group.period {
        lines.push(Line::from(Span::styled(period.clone(), Style::default().fg(Color::Yellow))));
    }
    if let Some(marker) = group.marker {
        lines.push(Line::from(vec![
            Span::styled(marker.glyph().to_string(), Style::default().fg(hex_color(&group.color))),
            Span::raw(format!(" {}", marker.label())),
        ]));
    }
    if let Some(description) = &group.description {
        lines.push(Line::from(description.clone()));
    }
    if let Some(note) = &group.note {
        lines.push(Line::from(Span::styled(note.clone(), Style::default().add_modifier(Modifier::ITALIC))));
    }
    lines.push(Line::from(Span::styled(format!("Reference: {}", group.reference.text), dim)));
    if let Some(url) = &group.reference.url {
        lines.push(Line::from(Span::styled(url.clone(), dim.add_modifier(Modifier::UNDERLINED))));
    }
    lines
}

fn render_popup(frame: &mut Frame, group: &OverlayGroup, map: Rect) {
    let lines = popup_lines(group);
    let area = centered_rect(54, lines.len() as u16 + 4, map);
    let popup = Paragraph::new(lines).wrap(Wrap { trim: true }).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(hex_color(&group.color)))
            .title(Span::styled(
                format!(" {} ", group.display_name),
                Style::default().add_modifier(Modifier::BOLD),
            ))
            .title_bottom(" esc "),
    );
    frame.render_widget(Clear, area);
    frame.render_widget(popup, area);
}

fn render_disclaimer(frame: &mut Frame, app: &App, screen: Rect) {
    let area = centered_rect(64, 13, screen);
    let lines = vec![
        Line::from(DISCLAIMER_TEXT),
        Line::from(""),
        Line::from(format!("{} Don't show this again (space)", checkbox(app.disclaimer.dont_show_again()))),
        Line::from(Span::styled("Press Enter to continue", Style::default().fg(Color::DarkGray))),
    ];
    let modal = Paragraph::new(lines).wrap(Wrap { trim: true }).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow))
            .title(Span::styled(
                " Historical Accuracy ",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )),
    );
    frame.render_widget(Clear, area);
    frame.render_widget(modal, area);
}
