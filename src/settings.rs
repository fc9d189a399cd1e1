use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::pdf::{DEFAULT_CACHE_PAGES, Zoom};
use crate::tags::DEFAULT_MIN_DRAG_PX;

pub const CURRENT_VERSION: u32 = 1;
const SETTINGS_FILENAME: &str = "config.yaml";
const APP_NAME: &str = "pagetag";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,

    /// Zoom a freshly opened document is shown at
    #[serde(default = "default_initial_scale")]
    pub initial_scale: f32,

    /// Zoom never goes below this
    #[serde(default = "default_min_scale")]
    pub min_scale: f32,

    /// Zoom in/out step
    #[serde(default = "default_zoom_step")]
    pub zoom_step: f32,

    /// Drags smaller than this (layer pixels, either axis) do not create tags
    #[serde(default = "default_min_drag_px")]
    pub min_drag_px: f32,

    /// Rendered pages kept in memory
    #[serde(default = "default_cache_pages")]
    pub cache_pages: usize,

    /// How long error notifications stay visible
    #[serde(default = "default_notification_secs")]
    pub notification_secs: u64,
}

fn default_version() -> u32 {
    CURRENT_VERSION
}

fn default_initial_scale() -> f32 {
    Zoom::DEFAULT_SCALE
}

fn default_min_scale() -> f32 {
    Zoom::DEFAULT_MIN_SCALE
}

fn default_zoom_step() -> f32 {
    Zoom::DEFAULT_STEP
}

fn default_min_drag_px() -> f32 {
    DEFAULT_MIN_DRAG_PX
}

fn default_cache_pages() -> usize {
    DEFAULT_CACHE_PAGES
}

fn default_notification_secs() -> u64 {
    5
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            initial_scale: default_initial_scale(),
            min_scale: default_min_scale(),
            zoom_step: default_zoom_step(),
            min_drag_px: default_min_drag_px(),
            cache_pages: default_cache_pages(),
            notification_secs: default_notification_secs(),
        }
    }
}

impl Settings {
    /// Replace values that would break the viewer with their defaults
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        if !(self.min_scale.is_finite() && self.min_scale > 0.0) {
            warn!("Invalid min_scale {}, using default", self.min_scale);
            self.min_scale = default_min_scale();
        }
        if !self.initial_scale.is_finite() || self.initial_scale < self.min_scale {
            warn!(
                "initial_scale {} is below min_scale {}, clamping",
                self.initial_scale, self.min_scale
            );
            self.initial_scale = if self.initial_scale.is_finite() {
                self.min_scale
            } else {
                default_initial_scale().max(self.min_scale)
            };
        }
        if !(self.zoom_step.is_finite() && self.zoom_step > 0.0) {
            warn!("Invalid zoom_step {}, using default", self.zoom_step);
            self.zoom_step = default_zoom_step();
        }
        if !(self.min_drag_px.is_finite() && self.min_drag_px >= 0.0) {
            warn!("Invalid min_drag_px {}, using default", self.min_drag_px);
            self.min_drag_px = default_min_drag_px();
        }
        self
    }

    #[must_use]
    pub fn zoom(&self) -> Zoom {
        Zoom::new(self.initial_scale, self.min_scale)
    }
}

/// `$XDG_CONFIG_HOME/pagetag/config.yaml` or the platform equivalent
#[must_use]
pub fn preferred_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|config| config.join(APP_NAME).join(SETTINGS_FILENAME))
}

/// Load settings from `path_override` or the default location.
///
/// A missing default file is created with defaults; anything unreadable
/// falls back to defaults after logging why.
#[must_use]
pub fn load_settings(path_override: Option<&Path>) -> Settings {
    let path = match path_override {
        Some(path) => path.to_path_buf(),
        None => match preferred_config_path() {
            Some(path) => path,
            None => {
                warn!("Could not determine config directory, using default settings");
                return Settings::default();
            }
        },
    };

    if !path.exists() {
        let settings = Settings::default();
        if path_override.is_none() {
            info!("Settings file not found, creating with defaults at {path:?}");
            save_settings_to_file(&settings, &path);
        } else {
            warn!("Settings file {path:?} does not exist, using defaults");
        }
        return settings;
    }

    load_settings_from_path(&path).unwrap_or_default()
}

pub fn load_settings_from_path(path: &Path) -> Option<Settings> {
    match fs::read_to_string(path) {
        Ok(content) => match serde_yaml::from_str::<Settings>(&content) {
            Ok(mut settings) => {
                debug!("Loaded settings from {path:?}");

                if settings.version < CURRENT_VERSION {
                    migrate_settings(&mut settings);
                    save_settings_to_file(&settings, path);
                }

                Some(settings.sanitized())
            }
            Err(e) => {
                error!("Failed to parse settings file {path:?}: {e}");
                None
            }
        },
        Err(e) => {
            error!("Failed to read settings file {path:?}: {e}");
            None
        }
    }
}

fn migrate_settings(settings: &mut Settings) {
    info!(
        "Migrating settings from v{} to v{}",
        settings.version, CURRENT_VERSION
    );
    settings.version = CURRENT_VERSION;
}

pub fn save_settings_to_file(settings: &Settings, path: &Path) -> bool {
    if let Some(parent) = path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            error!("Failed to create config directory {parent:?}: {e}");
            return false;
        }
    }

    let yaml = match serde_yaml::to_string(settings) {
        Ok(yaml) => yaml,
        Err(e) => {
            error!("Failed to serialize settings: {e}");
            return false;
        }
    };

    let content = format!(
        "# pagetag settings\n# Missing keys fall back to their defaults.\n\n{yaml}"
    );
    match fs::write(path, content) {
        Ok(()) => {
            debug!("Saved settings to {path:?}");
            true
        }
        Err(e) => {
            error!("Failed to write settings file {path:?}: {e}");
            false
        }
    }
}
