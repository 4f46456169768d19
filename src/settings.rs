//! User settings loaded from `<config dir>/textlayer/config.toml`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::discovery::TextOverlayConfig;
use crate::error::TextLayerError;
use crate::ir::io_alto_xml::AltoOptions;
use crate::ir::units::DEFAULT_FALLBACK_DPI;

/// Top-level settings file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Merge base for a window's first config change. A window that never
    /// received one has no configuration and stays disabled.
    pub overlay: TextOverlayConfig,
    pub fetch: FetchSettings,
    pub alto: AltoSettings,
}

/// HTTP fetch settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: concat!("textlayer/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl FetchSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// ALTO parsing settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AltoSettings {
    /// DPI assumed for physical units when a page declares no extent.
    pub fallback_dpi: f64,
}

impl Default for AltoSettings {
    fn default() -> Self {
        Self {
            fallback_dpi: DEFAULT_FALLBACK_DPI,
        }
    }
}

impl AltoSettings {
    pub fn options(&self) -> AltoOptions {
        let fallback_dpi = if self.fallback_dpi.is_finite() && self.fallback_dpi > 0.0 {
            self.fallback_dpi
        } else {
            DEFAULT_FALLBACK_DPI
        };
        AltoOptions { fallback_dpi }
    }
}

impl Settings {
    /// Loads settings.
    ///
    /// An explicit `path` must exist. Without one the default location is
    /// tried, and a missing file there yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML.
    pub fn load(path: Option<&Path>) -> Result<Self, TextLayerError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match default_path() {
                Some(path) if path.exists() => path,
                _ => return Ok(Self::default()),
            },
        };

        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content, &path)
    }

    /// Parses settings from TOML text; `path` is only used in error messages.
    pub fn from_toml_str(content: &str, path: &Path) -> Result<Self, TextLayerError> {
        toml::from_str(content).map_err(|source| TextLayerError::SettingsParse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// `<config dir>/textlayer/config.toml`, when the platform has a config dir.
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("textlayer").join("config.toml"))
}
