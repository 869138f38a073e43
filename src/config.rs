use crate::resolve::ToggleState;
use crate::view::MapStyle;
use clap::Parser;
use std::path::PathBuf;

/// Period key that selects the explicit "none" option
pub const NONE_PERIOD: &str = "none";

#[derive(Parser, Debug)]
#[command(author, version, about = "Terminal atlas of biblical-era territories, routes and sites", long_about = None)]
pub struct Cli {
    /// GeoJSON overlay catalog to use instead of the built-in one
    #[arg(long)]
    pub catalog: Option<PathBuf>,
    /// Directory holding Natural Earth coastline GeoJSON files
    #[arg(long)]
    pub basemap_dir: Option<PathBuf>,
    /// Base map style at startup
    #[arg(long, value_enum, default_value_t = MapStyle::Topographic)]
    pub style: MapStyle,
    /// Period to select at startup ("none" for the explicit none option); repeatable
    #[arg(long = "period", value_name = "KEY")]
    pub periods: Vec<String>,
    /// Independent category to switch on at startup; repeatable
    #[arg(long = "show", value_name = "CATEGORY")]
    pub show: Vec<String>,
    /// Territory fill opacity in percent
    #[arg(long, default_value_t = 100, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub opacity: u8,
    /// Directory for the persisted disclaimer flag
    #[arg(long)]
    pub state_dir: Option<PathBuf>,
    /// Forget a previous "don't show again" before starting
    #[arg(long)]
    pub reset_disclaimer: bool,
    /// Where to write logs (the terminal belongs to the map)
    #[arg(long)]
    pub log_file: Option<PathBuf>,
    /// Print the resolved view for the startup toggles as JSON and exit
    #[arg(long)]
    pub dump: bool,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub catalog: Option<PathBuf>,
    pub basemap_dir: Option<PathBuf>,
    pub style: MapStyle,
    pub periods: Vec<String>,
    pub show: Vec<String>,
    pub opacity: u8,
    /// `None` keeps the disclaimer flag in memory only
    pub state_dir: Option<PathBuf>,
    pub reset_disclaimer: bool,
    pub log_file: Option<PathBuf>,
    pub dump: bool,
}

impl Default for Config {
    fn default() -> Self {
        let dirs = project_dirs();
        Config {
            catalog: None,
            basemap_dir: Some(PathBuf::from("data")),
            style: MapStyle::default(),
            periods: Vec::new(),
            show: Vec::new(),
            opacity: 100,
            state_dir: dirs.as_ref().map(|d| d.data_dir().to_path_buf()),
            reset_disclaimer: false,
            log_file: dirs.map(|d| d.data_dir().join("biblical-atlas.log")),
            dump: false,
        }
    }
}

impl From<Cli> for Config {
    fn from(cli: Cli) -> Self {
        let defaults = Config::default();
        Config {
            catalog: cli.catalog,
            basemap_dir: cli.basemap_dir.or(defaults.basemap_dir),
            style: cli.style,
            periods: cli.periods,
            show: cli.show,
            opacity: cli.opacity,
            state_dir: cli.state_dir.or(defaults.state_dir),
            reset_disclaimer: cli.reset_disclaimer,
            log_file: cli.log_file.or(defaults.log_file),
            dump: cli.dump,
        }
    }
}

impl Config {
    /// Toggle state requested on the command line. Categories are applied
    /// later through the controller so unknown ids get dropped.
    pub fn initial_toggles(&self) -> ToggleState {
        let mut toggles = ToggleState::new();
        for key in &self.periods {
            if key == NONE_PERIOD {
                toggles.select_none();
            } else {
                toggles.select_period(key.as_str());
            }
        }
        toggles.set_opacity_percent(i32::from(self.opacity));
        toggles
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("org", "biblical-atlas", "biblical-atlas")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_into_config() {
        let cli = Cli::parse_from([
            "biblical-atlas",
            "--period",
            "patriarchal",
            "--period",
            "conquest",
            "--show",
            "garden-eden",
            "--opacity",
            "50",
            "--style",
            "satellite",
            "--state-dir",
            "/tmp/atlas",
        ]);
        let config = Config::from(cli);
        assert_eq!(config.style, MapStyle::Satellite);
        assert_eq!(config.state_dir, Some(PathBuf::from("/tmp/atlas")));
        assert_eq!(config.show, vec!["garden-eden".to_string()]);

        let toggles = config.initial_toggles();
        assert!(toggles.is_period_selected("patriarchal"));
        assert!(toggles.is_period_selected("conquest"));
        assert_eq!(toggles.opacity_percent(), 50);
    }

    #[test]
    fn test_last_of_none_and_period_wins() {
        let config = Config {
            periods: vec!["conquest".into(), NONE_PERIOD.into()],
            ..Config::default()
        };
        assert!(config.initial_toggles().is_none_selected());

        let config = Config {
            periods: vec![NONE_PERIOD.into(), "conquest".into()],
            ..Config::default()
        };
        let toggles = config.initial_toggles();
        assert!(!toggles.is_none_selected());
        assert!(toggles.is_period_selected("conquest"));
    }

    #[test]
    fn test_opacity_out_of_range_rejected() {
        assert!(Cli::try_parse_from(["biblical-atlas", "--opacity", "140"]).is_err());
    }
}
