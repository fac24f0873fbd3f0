//! Configuration loading from TOML.
//!
//! Every key has a default, so a missing file runs the server with the
//! stock settings.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::race_server::RaceLimits;

/// Env var naming the config file
pub const CONFIG_ENV: &str = "RACETRACK_CONFIG";
const DEFAULT_CONFIG_FILE: &str = "racetrack.toml";

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub race: RaceConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StoreConfig {
    /// JSON file holding every race
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("carrera.json"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RaceConfig {
    /// Fixed RNG seed for reproducible runner speeds
    pub seed: Option<u64>,
    pub max_runners: u32,
    pub max_distance: f64,
}

impl Default for RaceConfig {
    fn default() -> Self {
        let limits = RaceLimits::default();
        Self {
            seed: None,
            max_runners: limits.max_runners,
            max_distance: limits.max_distance,
        }
    }
}

impl RaceConfig {
    pub fn limits(&self) -> RaceLimits {
        RaceLimits {
            max_runners: self.max_runners,
            max_distance: self.max_distance,
        }
    }
}

impl Config {
    /// Load from the file named by `RACETRACK_CONFIG`, or `racetrack.toml`.
    pub fn from_env() -> Result<Self> {
        let path = std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        Self::load(&path)
    }

    /// Load configuration from a TOML file. A missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                log::info!("No config at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("Failed to read config file: {}", path.display()))
            }
        };
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = Config::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.server.bind, "127.0.0.1:3000");
        assert_eq!(cfg.store.path, PathBuf::from("carrera.json"));
        assert_eq!(cfg.race.seed, None);
        assert_eq!(cfg.race.limits(), RaceLimits::default());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("racetrack.toml");
        fs::write(&path, "[race]\nseed = 17\n").unwrap();

        let cfg = Config::load(&path).unwrap();
        assert_eq!(cfg.race.seed, Some(17));
        assert_eq!(cfg.server.bind, "127.0.0.1:3000");
    }

    #[test]
    fn full_file_overrides_everything() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("racetrack.toml");
        fs::write(
            &path,
            "[server]\nbind = \"0.0.0.0:8080\"\n\n[store]\npath = \"/var/lib/races.json\"\n",
        )
        .unwrap();

        let cfg = Config::load(&path).unwrap();
        assert_eq!(cfg.server.bind, "0.0.0.0:8080");
        assert_eq!(cfg.store.path, PathBuf::from("/var/lib/races.json"));
    }

    #[test]
    fn race_limits_are_configurable() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("racetrack.toml");
        fs::write(&path, "[race]\nmax_runners = 8\nmax_distance = 250.0\n").unwrap();

        let cfg = Config::load(&path).unwrap();
        assert_eq!(
            cfg.race.limits(),
            RaceLimits {
                max_runners: 8,
                max_distance: 250.0,
            }
        );
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("racetrack.toml");
        fs::write(&path, "[server\nbind = 3").unwrap();
        assert!(Config::load(&path).is_err());
    }
}
