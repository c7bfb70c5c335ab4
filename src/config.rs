use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use log::info;
use serde::Deserialize;
use stationkey::{CellLayout, Filter};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub filter: Filter,
    pub router: RouterConfig,
    pub stats: Option<StatsConfig>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    pub cell_layout: CellLayout,
    // randomised addresses make poor long-lived station records
    pub exclude_local_stations: bool,
}

#[derive(Debug, Deserialize)]
pub struct StatsConfig {
    pub path: PathBuf,

    // amount of reports that aren't part of this run but should still be
    // added to the total count
    #[serde(default)]
    pub archived_reports: u64,
}

/// Resolve the config path from the command line, `STATIONDB_CONFIG`, or
/// `config.toml` in the working directory, falling back to defaults.
pub fn load(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(x) => Some(x.to_owned()),
        None => dotenvy::var("STATIONDB_CONFIG")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                let default = Path::new("config.toml");
                default.exists().then(|| default.to_owned())
            }),
    };

    let Some(path) = path else {
        info!("no config file, using defaults");
        return Ok(Config::default());
    };
    let data = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    parse(&data)
}

fn parse(data: &str) -> Result<Config> {
    let config = toml::from_str(data).context("Failed to parse config")?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = parse("").unwrap();
        assert_eq!(config.filter, Filter::default());
        assert_eq!(config.router.cell_layout, CellLayout::PerRadio);
        assert!(config.stats.is_none());
    }

    #[test]
    fn full() {
        let config = parse(
            r#"
            [filter]
            max_wifi_accuracy = 100.0

            [router]
            cell_layout = "combined"
            exclude_local_stations = true

            [stats]
            path = "stats.json"
            archived_reports = 42
            "#,
        )
        .unwrap();
        assert_eq!(config.filter.max_wifi_accuracy, 100.0);
        assert_eq!(config.filter.max_altitude, 5_000.0);
        assert_eq!(config.router.cell_layout, CellLayout::Combined);
        assert!(config.router.exclude_local_stations);
        let stats = config.stats.unwrap();
        assert_eq!(stats.path, PathBuf::from("stats.json"));
        assert_eq!(stats.archived_reports, 42);
    }

    #[test]
    fn from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[router]\ncell_layout = \"per-radio\"\n").unwrap();
        let config = load(Some(&path)).unwrap();
        assert_eq!(config.router.cell_layout, CellLayout::PerRadio);

        assert!(load(Some(&dir.path().join("missing.toml"))).is_err());
    }
}
