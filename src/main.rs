use anyhow::{Context, Result};
use biblical_atlas::app::App;
use biblical_atlas::config::{Cli, Config};
use biblical_atlas::data::{self, BaseMap};
use biblical_atlas::disclaimer::{Disclaimer, DisclaimerStore};
use biblical_atlas::map::{TerminalSurface, Viewport};
use biblical_atlas::overlay::OverlayRegistry;
use biblical_atlas::resolve::{resolve, ToggleState};
use biblical_atlas::ui;
use biblical_atlas::view::{MapStyle, ViewController};
use clap::Parser;
use crossterm::event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind};
use crossterm::execute;
use ratatui::DefaultTerminal;
use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let config = Config::from(Cli::parse());
    init_logging(config.log_file.as_deref());

    let registry = Arc::new(match &config.catalog {
        Some(path) => data::load_catalog_file(path)
            .with_context(|| format!("loading catalog {}", path.display()))?,
        None => data::load_builtin().context("loading built-in catalog")?,
    });
    info!(
        overlays = registry.len(),
        rejected = registry.rejected().len(),
        "catalog ready"
    );

    let toggles = startup_toggles(&config, &registry);

    if config.dump {
        let view = resolve(&toggles, &registry);
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    let store = DisclaimerStore::new(config.state_dir.clone());
    if config.reset_disclaimer {
        store.reset();
    }
    let disclaimer = Disclaimer::load(store);
    let basemap = BaseMap::load(config.basemap_dir.as_deref());

    // Initialize terminal
    let mut terminal = ratatui::init();
    terminal.clear()?;

    // Enable mouse capture
    execute!(std::io::stdout(), EnableMouseCapture)?;

    let result = run(&mut terminal, registry, basemap, toggles, disclaimer, config.style);

    // Disable mouse capture and restore terminal
    let _ = execute!(std::io::stdout(), DisableMouseCapture);
    ratatui::restore();

    result
}

/// Logs go to a file since the map owns the terminal; without one they are dropped
fn init_logging(path: Option<&Path>) {
    let file = path.and_then(|path| {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).ok()?;
        }
        OpenOptions::new().create(true).append(true).open(path).ok()
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_ansi(false);
    match file {
        Some(file) => builder.with_writer(Mutex::new(file)).init(),
        None => builder.with_writer(std::io::sink).init(),
    }
}

/// Toggles from the command line; unknown categories are logged and dropped
fn startup_toggles(config: &Config, registry: &OverlayRegistry) -> ToggleState {
    let mut toggles = config.initial_toggles();
    for id in &config.show {
        if registry.has_category(id) {
            toggles.set_category(id.as_str(), true);
        } else {
            warn!("unknown category {id}, ignoring");
        }
    }
    toggles
}

fn run(
    terminal: &mut DefaultTerminal,
    registry: Arc<OverlayRegistry>,
    basemap: BaseMap,
    toggles: ToggleState,
    disclaimer: Disclaimer,
    style: MapStyle,
) -> Result<()> {
    let size = terminal.size()?;
    let surface = TerminalSurface::new(registry.clone(), basemap, Viewport::initial(0, 0), style);
    let controller = ViewController::with_toggles(registry, surface, toggles);
    let mut app = App::new(controller, disclaimer, size.width, size.height);

    // Main loop
    loop {
        terminal.draw(|frame| ui::render(frame, &app))?;

        if event::poll(Duration::from_millis(100))? {
            match event::read()? {
                // Only handle key press events (not release)
                Event::Key(key) if key.kind == KeyEventKind::Press => app.handle_key(key),
                Event::Mouse(mouse) => app.handle_mouse(mouse),
                Event::Resize(width, height) => app.resize(width, height),
                _ => {}
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
