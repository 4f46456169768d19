//! Per-window text overlay configuration.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::ir::WindowId;

/// Overlay settings for one viewer window.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextOverlayConfig {
    /// Master switch; nothing is discovered or fetched when false.
    pub enabled: bool,
    /// Whether the text should be selectable by the user.
    pub selectable: bool,
    /// Whether the text should be rendered visibly.
    pub visible: bool,
    /// Opacity of the rendered text, `0.0..=1.0`.
    pub opacity: f64,
}

impl Default for TextOverlayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            selectable: false,
            visible: false,
            opacity: 0.5,
        }
    }
}

impl TextOverlayConfig {
    /// True when the overlay is enabled and the text is used for anything.
    pub fn wants_text(&self) -> bool {
        self.enabled && (self.selectable || self.visible)
    }

    /// Applies the fields present in `update` on top of `self`.
    pub fn merged(&self, update: &TextOverlayUpdate) -> Self {
        Self {
            enabled: update.enabled.unwrap_or(self.enabled),
            selectable: update.selectable.unwrap_or(self.selectable),
            visible: update.visible.unwrap_or(self.visible),
            opacity: update
                .opacity
                .filter(|opacity| opacity.is_finite())
                .map_or(self.opacity, |opacity| opacity.clamp(0.0, 1.0)),
        }
    }
}

/// A partial overlay configuration as sent by the host viewer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextOverlayUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selectable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
}

impl From<TextOverlayConfig> for TextOverlayUpdate {
    fn from(config: TextOverlayConfig) -> Self {
        Self {
            enabled: Some(config.enabled),
            selectable: Some(config.selectable),
            visible: Some(config.visible),
            opacity: Some(config.opacity),
        }
    }
}

/// Overlay configuration of every known window.
///
/// A window that was never configured has no entry and counts as disabled.
#[derive(Debug, Default)]
pub struct WindowConfigs {
    defaults: TextOverlayConfig,
    windows: RwLock<HashMap<WindowId, TextOverlayConfig>>,
}

impl WindowConfigs {
    pub fn new(defaults: TextOverlayConfig) -> Self {
        Self {
            defaults,
            windows: RwLock::new(HashMap::new()),
        }
    }

    /// The base the first update for a window is merged over.
    pub fn defaults(&self) -> TextOverlayConfig {
        self.defaults
    }

    /// Configuration of `window`, if it has one. The defaults do not count:
    /// only [`WindowConfigs::apply`] gives a window a configuration.
    pub fn get(&self, window: &WindowId) -> Option<TextOverlayConfig> {
        self.windows.read().get(window).copied()
    }

    /// Applies `update` over the window's current configuration (the
    /// defaults for a new window) and returns the result.
    pub fn apply(&self, window: &WindowId, update: &TextOverlayUpdate) -> TextOverlayConfig {
        let mut windows = self.windows.write();
        let current = windows.get(window).copied().unwrap_or(self.defaults);
        let merged = current.merged(update);
        windows.insert(window.clone(), merged);
        merged
    }

    /// Forgets the window's configuration.
    pub fn remove(&self, window: &WindowId) -> Option<TextOverlayConfig> {
        self.windows.write().remove(window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_window_has_no_config() {
        let configs = WindowConfigs::new(TextOverlayConfig::default());
        assert_eq!(configs.get(&WindowId::new("w")), None);
    }

    #[test]
    fn updates_merge_over_defaults_then_current() {
        let configs = WindowConfigs::new(TextOverlayConfig::default());
        let window = WindowId::new("w");

        let first = configs.apply(
            &window,
            &TextOverlayUpdate {
                selectable: Some(true),
                ..Default::default()
            },
        );
        assert!(first.enabled);
        assert!(first.selectable);
        assert_eq!(first.opacity, 0.5);
        assert!(first.wants_text());

        let second = configs.apply(
            &window,
            &TextOverlayUpdate {
                opacity: Some(3.0),
                ..Default::default()
            },
        );
        assert!(second.selectable);
        assert_eq!(second.opacity, 1.0);
    }

    #[test]
    fn deserializes_partial_payload() {
        let update: TextOverlayUpdate =
            serde_json::from_str(r#"{"enabled": true, "visible": true}"#).expect("parse");
        assert_eq!(update.enabled, Some(true));
        assert_eq!(update.selectable, None);

        let config = TextOverlayConfig {
            enabled: false,
            ..Default::default()
        };
        assert!(!config.merged(&TextOverlayUpdate::default()).wants_text());
    }
}
