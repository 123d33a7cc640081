use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;
use crate::render::{DEFAULT_CACHE_SIZE, DEFAULT_WORKERS};
use crate::scheduler::RenderQueue;
use crate::view::{ScrollMode, Size, ViewMode, ZoomLevel};
use crate::viewer::ViewerOptions;

pub const CURRENT_VERSION: u32 = 2;
const SETTINGS_FILENAME: &str = "config.yaml";
const APP_NAME: &str = "folio";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,

    /// A factor, or `actual_size` / `page_fit` / `page_width`
    #[serde(default)]
    pub default_zoom: ZoomLevel,

    #[serde(default)]
    pub scroll_mode: ScrollMode,

    #[serde(default)]
    pub view_mode: ViewMode,

    #[serde(default = "default_page_gap")]
    pub page_gap: f32,

    /// Rows rendered ahead on each side of the viewport
    #[serde(default = "default_overscan")]
    pub overscan: usize,

    #[serde(default = "default_render_timeout_ms")]
    pub render_timeout_ms: u64,

    #[serde(default = "default_one")]
    pub max_renders_in_flight: usize,

    #[serde(default = "default_render_workers")]
    pub render_workers: usize,

    /// Rendered pages kept in memory
    #[serde(default = "default_cache_size")]
    pub cache_size: usize,

    #[serde(default = "default_history_size")]
    pub history_size: usize,

    /// JSON dictionary overriding the built-in strings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale_file: Option<PathBuf>,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Version 1 stored a plain scale factor
    #[serde(default, skip_serializing)]
    scale: Option<f32>,
}

fn default_version() -> u32 {
    CURRENT_VERSION
}

fn default_page_gap() -> f32 {
    10.0
}

fn default_overscan() -> usize {
    1
}

fn default_render_timeout_ms() -> u64 {
    RenderQueue::DEFAULT_TIMEOUT.as_millis() as u64
}

fn default_one() -> usize {
    1
}

fn default_render_workers() -> usize {
    DEFAULT_WORKERS
}

fn default_cache_size() -> usize {
    DEFAULT_CACHE_SIZE
}

fn default_history_size() -> usize {
    50
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            default_zoom: ZoomLevel::default(),
            scroll_mode: ScrollMode::default(),
            view_mode: ViewMode::default(),
            page_gap: default_page_gap(),
            overscan: default_overscan(),
            render_timeout_ms: default_render_timeout_ms(),
            max_renders_in_flight: default_one(),
            render_workers: default_render_workers(),
            cache_size: default_cache_size(),
            history_size: default_history_size(),
            locale_file: None,
            log_level: default_log_level(),
            scale: None,
        }
    }
}

impl Settings {
    /// Viewer configuration for a viewport of `container`
    #[must_use]
    pub fn viewer_options(&self, container: Size) -> ViewerOptions {
        ViewerOptions {
            container,
            zoom: self.default_zoom,
            scroll_mode: self.scroll_mode,
            view_mode: self.view_mode,
            gap: self.page_gap,
            overscan: self.overscan,
            render_timeout: Duration::from_millis(self.render_timeout_ms),
            max_renders_in_flight: self.max_renders_in_flight,
            history_size: self.history_size,
        }
    }

    pub fn log_level(&self) -> log::LevelFilter {
        self.log_level.parse().unwrap_or_else(|_| {
            warn!("Unknown log level {:?}, using info", self.log_level);
            log::LevelFilter::Info
        })
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|config| config.join(APP_NAME).join(SETTINGS_FILENAME))
}

/// Load settings from `path`, or the default location. A missing file is
/// created with defaults; an unreadable one falls back to defaults.
pub fn load_settings(path: Option<&Path>) -> Settings {
    let Some(path) = path.map(Path::to_path_buf).or_else(default_config_path) else {
        warn!("Could not determine config directory, using default settings");
        return Settings::default();
    };

    if !path.exists() {
        info!("Settings file not found, creating with defaults at {path:?}");
        let settings = Settings::default();
        if let Err(e) = save_settings(&settings, &path) {
            warn!("Failed to save settings to {path:?}: {e}");
        }
        return settings;
    }

    match load_settings_from_path(&path) {
        Ok(settings) => settings,
        Err(e) => {
            warn!("Failed to load settings from {path:?}: {e}");
            Settings::default()
        }
    }
}

pub fn load_settings_from_path(path: &Path) -> Result<Settings> {
    let content = fs::read_to_string(path)?;
    let mut settings: Settings = serde_yaml::from_str(&content)?;
    debug!("Loaded settings from {path:?}");

    if settings.version < CURRENT_VERSION {
        migrate_settings(&mut settings);
        save_settings(&settings, path)?;
    }
    Ok(settings)
}

fn migrate_settings(settings: &mut Settings) {
    info!(
        "Migrating settings from v{} to v{}",
        settings.version, CURRENT_VERSION
    );

    if settings.version < 2 {
        if let Some(scale) = settings.scale.take() {
            settings.default_zoom = ZoomLevel::Scale(scale);
        }
    }

    settings.version = CURRENT_VERSION;
}

pub fn save_settings(settings: &Settings, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut content = String::from(SETTINGS_HEADER);
    content.push_str(&serde_yaml::to_string(settings)?);
    fs::write(path, content)?;
    debug!("Saved settings to {path:?}");
    Ok(())
}

const SETTINGS_HEADER: &str = r#"# ============================================================================
# folio settings
# ============================================================================
# default_zoom: a factor (1.5) or one of actual_size, page_fit, page_width
# scroll_mode: vertical, horizontal, wrapped, page
# view_mode: single_page, dual_page, dual_page_with_cover
# log_level: off, error, warn, info, debug, trace

"#;
