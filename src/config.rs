//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/mindlayout/mindlayout.toml`
//! 3. Explicit config file passed with `--config`
//! 4. Environment variables: `MINDLAYOUT_*` prefix

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::application::ApplicationError;
use crate::domain::LayoutConfig;

const APP_NAME: &str = "mindlayout";

/// Raw layout section; `None` means "not specified, keep the lower layer".
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawLayoutConfig {
    pub base_radius: Option<f64>,
    pub radius_increment: Option<f64>,
    pub min_node_spacing: Option<f64>,
}

/// Raw settings for intermediate parsing.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub database_path: Option<PathBuf>,
    pub busy_timeout_ms: Option<u64>,
    pub layout: RawLayoutConfig,
}

/// Unified configuration for mindlayout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// SQLite database file
    pub database_path: PathBuf,
    /// How long a writer waits for the database lock
    pub busy_timeout_ms: u64,
    /// Geometry of the radial layout
    pub layout: LayoutConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            busy_timeout_ms: 5_000,
            layout: LayoutConfig::default(),
        }
    }
}

fn default_database_path() -> PathBuf {
    ProjectDirs::from("", "", APP_NAME)
        .map(|dirs| dirs.data_dir().join("mindlayout.sqlite3"))
        .unwrap_or_else(|| PathBuf::from("mindlayout.sqlite3"))
}

/// Get the XDG config directory for mindlayout.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("mindlayout.toml"))
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    shellexpand::full(raw.as_ref())
        .map(|s| PathBuf::from(s.into_owned()))
        .unwrap_or_else(|_| path.to_path_buf())
}

impl Settings {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// Expand `~`, `$VAR` and `${VAR}` in the database path.
    fn expand_paths(&mut self) {
        self.database_path = expand_path(&self.database_path);
    }

    /// Overlay scalar values: a specified field wins, otherwise keep self.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            database_path: overlay
                .database_path
                .clone()
                .unwrap_or_else(|| self.database_path.clone()),
            busy_timeout_ms: overlay.busy_timeout_ms.unwrap_or(self.busy_timeout_ms),
            layout: LayoutConfig {
                base_radius: overlay.layout.base_radius.unwrap_or(self.layout.base_radius),
                radius_increment: overlay
                    .layout
                    .radius_increment
                    .unwrap_or(self.layout.radius_increment),
                min_node_spacing: overlay
                    .layout
                    .min_node_spacing
                    .unwrap_or(self.layout.min_node_spacing),
            },
        }
    }

    /// Load settings with layered precedence.
    ///
    /// `config_file` must exist when given; the global file is optional.
    pub fn load(config_file: Option<&Path>) -> Result<Self, ApplicationError> {
        Self::load_layers(global_config_path().as_deref(), config_file)
    }

    fn load_layers(
        global: Option<&Path>,
        config_file: Option<&Path>,
    ) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global {
            if global_path.exists() {
                debug!("loading global config {}", global_path.display());
                current = current.merge_with(&load_raw_settings(global_path)?);
            }
        }

        if let Some(path) = config_file {
            if !path.exists() {
                return Err(ApplicationError::Config {
                    message: format!("config file not found: {}", path.display()),
                });
            }
            debug!("loading config {}", path.display());
            current = current.merge_with(&load_raw_settings(path)?);
        }

        current = Self::apply_env_overrides(current)?;
        current.expand_paths();
        current.validate()?;
        Ok(current)
    }

    /// Apply MINDLAYOUT_* environment variables as explicit overrides.
    ///
    /// Nested keys use `__`, e.g. `MINDLAYOUT_LAYOUT__BASE_RADIUS=300`.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("MINDLAYOUT")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("database_path") {
            settings.database_path = PathBuf::from(val);
        }
        if let Some(val) = env_value(&config, "busy_timeout_ms", Config::get_int)? {
            settings.busy_timeout_ms = u64::try_from(val).map_err(|_| ApplicationError::Config {
                message: format!("busy_timeout_ms must not be negative: {val}"),
            })?;
        }
        if let Some(val) = env_value(&config, "layout.base_radius", Config::get_float)? {
            settings.layout.base_radius = val;
        }
        if let Some(val) = env_value(&config, "layout.radius_increment", Config::get_float)? {
            settings.layout.radius_increment = val;
        }
        if let Some(val) = env_value(&config, "layout.min_node_spacing", Config::get_float)? {
            settings.layout.min_node_spacing = val;
        }

        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ApplicationError> {
        self.layout.validate().map_err(|e| ApplicationError::Config {
            message: e.to_string(),
        })
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# mindlayout configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/mindlayout/mindlayout.toml
#   File:   mindlayout --config <path>
#   Env:    MINDLAYOUT_* environment variables
#           (nested keys use "__", e.g. MINDLAYOUT_LAYOUT__BASE_RADIUS=300)

# SQLite database file (~ and $VAR are expanded)
# database_path = "~/.local/share/mindlayout/mindlayout.sqlite3"

# Milliseconds a writer waits for the database lock
# busy_timeout_ms = 5000

[layout]
# Radius at which the root places its children
# base_radius = 250.0

# Added to the child radius per level of depth
# radius_increment = 180.0

# Minimum arc length between sibling centres
# min_node_spacing = 80.0
"#
        .to_string()
    }
}

/// Read an env override, distinguishing "absent" from "present but invalid".
fn env_value<T>(
    config: &Config,
    key: &str,
    get: impl Fn(&Config, &str) -> Result<T, ConfigError>,
) -> Result<Option<T>, ApplicationError> {
    match get(config, key) {
        Ok(val) => Ok(Some(val)),
        Err(ConfigError::NotFound(_)) => Ok(None),
        Err(e) => Err(ApplicationError::Config {
            message: format!("{key}: {e}"),
        }),
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn given_no_config_when_loading_then_uses_defaults() {
        let settings = Settings::load_layers(None, None).expect("load defaults");
        assert_eq!(settings.layout, LayoutConfig::default());
        assert!(settings
            .database_path
            .to_string_lossy()
            .ends_with("mindlayout.sqlite3"));
    }

    #[test]
    fn given_global_and_explicit_file_when_loading_then_explicit_file_wins() {
        let dir = TempDir::new().unwrap();
        let global = dir.path().join("global.toml");
        let local = dir.path().join("local.toml");
        fs::write(
            &global,
            "busy_timeout_ms = 100\n[layout]\nbase_radius = 300.0\nradius_increment = 90.0\n",
        )
        .unwrap();
        fs::write(&local, "[layout]\nbase_radius = 400.0\n").unwrap();

        let settings = Settings::load_layers(Some(&global), Some(&local)).expect("load");

        assert_eq!(settings.busy_timeout_ms, 100);
        assert_eq!(settings.layout.base_radius, 400.0);
        assert_eq!(settings.layout.radius_increment, 90.0);
        assert_eq!(settings.layout.min_node_spacing, 80.0);
    }

    #[test]
    fn given_missing_explicit_file_when_loading_then_config_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.toml");

        let result = Settings::load_layers(None, Some(&missing));

        assert!(matches!(result, Err(ApplicationError::Config { .. })));
    }

    #[test]
    fn given_invalid_layout_values_when_loading_then_validation_fails() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("bad.toml");
        fs::write(&file, "[layout]\nbase_radius = -1.0\n").unwrap();

        let err = Settings::load_layers(None, Some(&file)).unwrap_err();

        assert!(err.to_string().contains("base_radius"));
    }

    #[test]
    fn given_tilde_in_database_path_when_expand_paths_then_expands_to_home() {
        let mut settings = Settings {
            database_path: PathBuf::from("~/maps/db.sqlite3"),
            ..Settings::default()
        };

        settings.expand_paths();

        let home = std::env::var("HOME").expect("HOME should be set");
        let path = settings.database_path.to_string_lossy();
        assert!(path.starts_with(&home), "should start with home: {path}");
        assert!(!path.contains('~'));
    }

    #[test]
    fn given_settings_when_serialising_then_toml_roundtrips_through_raw() {
        let settings = Settings::default();
        let text = settings.to_toml().unwrap();
        let raw: RawSettings = toml::from_str(&text).unwrap();
        assert_eq!(raw.layout.base_radius, Some(250.0));
        assert_eq!(raw.busy_timeout_ms, Some(5_000));
    }

    #[test]
    fn given_template_when_parsing_then_it_is_valid_toml() {
        let raw: RawSettings = toml::from_str(&Settings::template()).unwrap();
        assert!(raw.database_path.is_none());
    }
}
