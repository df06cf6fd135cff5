use log::{LevelFilter, debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, RwLock};

use crate::document::{FitPolicy, OpenOptions, Viewport};

pub const CURRENT_VERSION: u32 = 1;
const SETTINGS_FILENAME: &str = "config.yaml";
const APP_NAME: &str = "folio";
const DEFAULT_LOG_FILENAME: &str = "folio.log";

/// Fit policy as written in the config file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FitMode {
    /// Whole page visible inside the viewport
    #[default]
    Contain,
    /// Page fills the viewport, overflowing one dimension
    Cover,
}

impl FitMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FitMode::Contain => "contain",
            FitMode::Cover => "cover",
        }
    }
}

impl From<FitMode> for FitPolicy {
    fn from(mode: FitMode) -> Self {
        match mode {
            FitMode::Contain => FitPolicy::ContainWithinViewport,
            FitMode::Cover => FitPolicy::CoverViewport,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default = "default_zoom")]
    pub zoom: f32,

    #[serde(default)]
    pub rotation: i32,

    #[serde(default)]
    pub fit: FitMode,

    #[serde(default = "default_viewport_width")]
    pub viewport_width: u32,

    #[serde(default = "default_viewport_height")]
    pub viewport_height: u32,

    /// Log destination; the platform cache directory when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_version() -> u32 {
    CURRENT_VERSION
}

fn default_zoom() -> f32 {
    1.0
}

fn default_viewport_width() -> u32 {
    Viewport::default().width
}

fn default_viewport_height() -> u32 {
    Viewport::default().height
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            zoom: default_zoom(),
            rotation: 0,
            fit: FitMode::default(),
            viewport_width: default_viewport_width(),
            viewport_height: default_viewport_height(),
            log_file: None,
            log_level: default_log_level(),
        }
    }
}

impl Settings {
    pub fn viewport(&self) -> Viewport {
        Viewport::new(self.viewport_width.max(1), self.viewport_height.max(1))
    }

    pub fn fit_policy(&self) -> FitPolicy {
        self.fit.into()
    }

    /// Initial view state for opening a document at `page`
    pub fn open_options(&self, page: i64) -> OpenOptions {
        OpenOptions {
            page,
            zoom: self.zoom,
            rotation: self.rotation,
            viewport: self.viewport(),
        }
    }

    /// Unknown level names fall back to `Info`
    pub fn log_level_filter(&self) -> LevelFilter {
        self.log_level.parse().unwrap_or_else(|_| {
            warn!("Unknown log level {:?}, using info", self.log_level);
            LevelFilter::Info
        })
    }

    pub fn log_file_path(&self) -> PathBuf {
        self.log_file.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .map(|cache| cache.join(APP_NAME).join(DEFAULT_LOG_FILENAME))
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILENAME))
        })
    }
}

static SETTINGS: LazyLock<RwLock<Settings>> = LazyLock::new(|| RwLock::new(Settings::default()));

pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|config| config.join(APP_NAME).join(SETTINGS_FILENAME))
}

/// Load the config file into the process-wide settings, creating it with
/// defaults when missing.
pub fn load_settings() {
    let Some(path) = config_path() else {
        warn!("Could not determine config directory, using default settings");
        return;
    };
    let settings = load_or_create(&path);
    if let Ok(mut global) = SETTINGS.write() {
        *global = settings;
    }
}

/// Read settings from `path`; write defaults there first if it does not exist.
/// Unreadable or unparsable files yield defaults.
pub fn load_or_create(path: &Path) -> Settings {
    if !path.exists() {
        info!("Settings file not found, creating with defaults at {path:?}");
        let settings = Settings::default();
        save_settings_to_file(&settings, path);
        return settings;
    }
    load_settings_from_path(path).unwrap_or_default()
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
                Some(settings)
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

pub fn save_settings_to_file(settings: &Settings, path: &Path) {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            if let Err(e) = fs::create_dir_all(parent) {
                error!("Failed to create config directory {parent:?}: {e}");
                return;
            }
        }
    }

    let content = generate_settings_yaml(settings);

    match fs::write(path, content) {
        Ok(()) => debug!("Saved settings to {path:?}"),
        Err(e) => error!("Failed to save settings to {path:?}: {e}"),
    }
}

fn generate_settings_yaml(settings: &Settings) -> String {
    let mut content = String::new();

    content.push_str(SETTINGS_HEADER);
    content.push_str(&format!("version: {}\n", settings.version));
    content.push_str(&format!("zoom: {}\n", settings.zoom));
    content.push_str(&format!("rotation: {}\n", settings.rotation));
    content.push_str(&format!("fit: {}\n", settings.fit.as_str()));
    content.push_str(&format!("viewport_width: {}\n", settings.viewport_width));
    content.push_str(&format!("viewport_height: {}\n", settings.viewport_height));
    match &settings.log_file {
        Some(log_file) => {
            let quoted = serde_yaml::to_string(log_file).unwrap_or_default();
            content.push_str(&format!("log_file: {}\n", quoted.trim_end()));
        }
        None => content.push_str("# log_file: /tmp/folio.log\n"),
    }
    content.push_str(&format!("log_level: {}\n", settings.log_level));

    content
}

const SETTINGS_HEADER: &str = r#"# ============================================================================
# folio settings
# ============================================================================
# zoom:      fixed zoom factor, 0.1 to 3.0
# rotation:  view rotation in degrees (multiples of 90)
# fit:       contain | cover
# log_level: off | error | warn | info | debug | trace

"#;

// Public API for accessing/modifying settings

pub fn get_settings() -> Settings {
    SETTINGS.read().map(|s| s.clone()).unwrap_or_default()
}
