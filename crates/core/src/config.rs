//! Viewer configuration
//!
//! Every tunable of the viewer lives in [`ViewerConfig`]. Values come from
//! built-in defaults, then an optional TOML file, then environment variables,
//! each layer overriding the previous one.

use pageview_layout::{PageDimensions, ZoomLimits};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration for the viewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Smallest allowed zoom factor
    pub zoom_min: f32,
    /// Largest allowed zoom factor
    pub zoom_max: f32,
    /// Increment used by zoom in/out
    pub zoom_step: f32,
    /// Zoom factor on open and after reset
    pub initial_zoom: f32,

    /// Unscaled gap below each page
    pub page_margin: f32,
    /// Pages kept live beyond each edge of the viewport
    pub overscan: usize,

    /// Delay between a finished render and its snapshot capture
    pub snapshot_delay_ms: u64,
    /// Quiet period before a zoom change is committed
    pub zoom_debounce_ms: u64,
    /// Minimum interval between scroll-driven current-page evaluations
    pub page_tracker_interval_ms: u64,

    /// Fixed render scale of the thumbnail strip
    pub thumbnail_scale: f32,
    /// Gap below each thumbnail
    pub thumbnail_margin: f32,

    /// Snapshots kept per page before the oldest is evicted
    pub max_snapshots_per_page: usize,
    /// JPEG quality of snapshots (1-100)
    pub snapshot_quality: u8,

    /// Page size assumed before a page is measured
    pub default_page_width: f32,
    pub default_page_height: f32,
    /// Pages whose size is probed right after open
    pub preload_dimension_pages: u32,

    /// Thumbnail sidebar width and its drag limits
    pub sidebar_width: f32,
    pub sidebar_min_width: f32,
    pub sidebar_max_width: f32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            zoom_min: 0.1,
            zoom_max: 3.0,
            zoom_step: 0.3,
            initial_zoom: 1.0,
            page_margin: 20.0,
            overscan: 2,
            snapshot_delay_ms: 100,
            zoom_debounce_ms: 150,
            page_tracker_interval_ms: 100,
            thumbnail_scale: 0.16,
            thumbnail_margin: 10.0,
            max_snapshots_per_page: 2,
            snapshot_quality: 80,
            default_page_width: 500.0,
            default_page_height: 1000.0,
            preload_dimension_pages: 3,
            sidebar_width: 220.0,
            sidebar_min_width: 120.0,
            sidebar_max_width: 480.0,
        }
    }
}

impl ViewerConfig {
    /// Sets the zoom bounds.
    pub fn with_zoom_range(mut self, min: f32, max: f32) -> Self {
        self.zoom_min = min;
        self.zoom_max = max;
        self
    }

    /// Sets the zoom step.
    pub fn with_zoom_step(mut self, step: f32) -> Self {
        self.zoom_step = step;
        self
    }

    /// Sets the number of overscan pages.
    pub fn with_overscan(mut self, overscan: usize) -> Self {
        self.overscan = overscan;
        self
    }

    /// Sets the per-page snapshot cap.
    pub fn with_max_snapshots_per_page(mut self, max: usize) -> Self {
        self.max_snapshots_per_page = max;
        self
    }

    /// Sets how many pages are probed on open.
    pub fn with_preload_dimension_pages(mut self, pages: u32) -> Self {
        self.preload_dimension_pages = pages;
        self
    }

    pub fn zoom_limits(&self) -> ZoomLimits {
        ZoomLimits { min: self.zoom_min, max: self.zoom_max, step: self.zoom_step }
    }

    pub fn default_page_size(&self) -> PageDimensions {
        PageDimensions::new(self.default_page_width, self.default_page_height)
    }

    pub fn snapshot_delay(&self) -> Duration {
        Duration::from_millis(self.snapshot_delay_ms)
    }

    pub fn zoom_debounce(&self) -> Duration {
        Duration::from_millis(self.zoom_debounce_ms)
    }

    pub fn page_tracker_interval(&self) -> Duration {
        Duration::from_millis(self.page_tracker_interval_ms)
    }

    /// Checks that the values are usable together.
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn positive(key: &str, value: f32) -> Result<(), ConfigError> {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(ConfigError::invalid(key, value))
            }
        }

        positive("zoom_min", self.zoom_min)?;
        positive("zoom_max", self.zoom_max)?;
        if self.zoom_min >= self.zoom_max {
            return Err(ConfigError::InvalidValue {
                key: "zoom_min".to_string(),
                value: format!("{} (must be below zoom_max {})", self.zoom_min, self.zoom_max),
            });
        }
        positive("zoom_step", self.zoom_step)?;
        positive("initial_zoom", self.initial_zoom)?;
        positive("thumbnail_scale", self.thumbnail_scale)?;
        positive("default_page_width", self.default_page_width)?;
        positive("default_page_height", self.default_page_height)?;
        if !self.page_margin.is_finite() || self.page_margin < 0.0 {
            return Err(ConfigError::invalid("page_margin", self.page_margin));
        }
        if !self.thumbnail_margin.is_finite() || self.thumbnail_margin < 0.0 {
            return Err(ConfigError::invalid("thumbnail_margin", self.thumbnail_margin));
        }
        if self.max_snapshots_per_page == 0 {
            return Err(ConfigError::invalid("max_snapshots_per_page", 0));
        }
        if self.snapshot_quality == 0 || self.snapshot_quality > 100 {
            return Err(ConfigError::invalid("snapshot_quality", self.snapshot_quality));
        }
        if self.sidebar_min_width > self.sidebar_max_width {
            return Err(ConfigError::invalid("sidebar_min_width", self.sidebar_min_width));
        }
        Ok(())
    }

    /// Returns the default config file location for the current platform.
    ///
    /// - macOS: ~/Library/Application Support/pageview/config.toml
    /// - Linux: ~/.config/pageview/config.toml
    /// - Windows: %APPDATA%\pageview\config.toml
    pub fn default_path() -> PathBuf {
        match dirs::config_dir() {
            Some(dir) => dir.join("pageview").join("config.toml"),
            None => PathBuf::from("pageview.toml"),
        }
    }

    /// Loads configuration from environment variables on top of the defaults.
    ///
    /// Environment variables:
    /// - `PAGEVIEW_ZOOM_MIN`, `PAGEVIEW_ZOOM_MAX`, `PAGEVIEW_ZOOM_STEP`
    /// - `PAGEVIEW_THUMBNAIL_SCALE`
    /// - `PAGEVIEW_MAX_SNAPSHOTS_PER_PAGE`
    /// - `PAGEVIEW_SNAPSHOT_QUALITY`
    ///
    /// # Errors
    /// Returns an error if any variable holds an unparsable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Overrides fields from the environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        env_override("PAGEVIEW_ZOOM_MIN", &mut self.zoom_min)?;
        env_override("PAGEVIEW_ZOOM_MAX", &mut self.zoom_max)?;
        env_override("PAGEVIEW_ZOOM_STEP", &mut self.zoom_step)?;
        env_override("PAGEVIEW_THUMBNAIL_SCALE", &mut self.thumbnail_scale)?;
        env_override("PAGEVIEW_MAX_SNAPSHOTS_PER_PAGE", &mut self.max_snapshots_per_page)?;
        env_override("PAGEVIEW_SNAPSHOT_QUALITY", &mut self.snapshot_quality)?;
        Ok(())
    }

    /// Loads configuration from a TOML file. Missing keys keep their defaults.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Saves configuration to a TOML file, creating parent directories.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Resolves the full layering: defaults, then `path` (or the default
    /// location if it exists), then the environment. The result is validated.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default = Self::default_path();
                if default.is_file() {
                    Self::from_file(default)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }
}

fn env_override<T: std::str::FromStr>(key: &str, slot: &mut T) -> Result<(), ConfigError> {
    if let Ok(raw) = std::env::var(key) {
        *slot = raw.trim().parse().map_err(|_| ConfigError::InvalidValue { key: key.to_string(), value: raw })?;
    }
    Ok(())
}

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for configuration key {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

impl ConfigError {
    fn invalid(key: &str, value: impl std::fmt::Display) -> Self {
        ConfigError::InvalidValue { key: key.to_string(), value: value.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    const ENV_KEYS: &[&str] = &[
        "PAGEVIEW_ZOOM_MIN",
        "PAGEVIEW_ZOOM_MAX",
        "PAGEVIEW_ZOOM_STEP",
        "PAGEVIEW_THUMBNAIL_SCALE",
        "PAGEVIEW_MAX_SNAPSHOTS_PER_PAGE",
        "PAGEVIEW_SNAPSHOT_QUALITY",
    ];

    #[test]
    fn test_default_config() {
        let config = ViewerConfig::default();
        assert_eq!(config.zoom_limits(), ZoomLimits { min: 0.1, max: 3.0, step: 0.3 });
        assert_eq!(config.snapshot_delay(), Duration::from_millis(100));
        assert_eq!(config.zoom_debounce(), Duration::from_millis(150));
        assert_eq!(config.default_page_size(), PageDimensions::new(500.0, 1000.0));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_methods() {
        let config = ViewerConfig::default()
            .with_zoom_range(0.5, 4.0)
            .with_zoom_step(0.25)
            .with_overscan(1)
            .with_max_snapshots_per_page(3)
            .with_preload_dimension_pages(0);

        assert_eq!((config.zoom_min, config.zoom_max, config.zoom_step), (0.5, 4.0, 0.25));
        assert_eq!(config.overscan, 1);
        assert_eq!(config.max_snapshots_per_page, 3);
        assert_eq!(config.preload_dimension_pages, 0);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(ViewerConfig::default().with_zoom_range(2.0, 1.0).validate().is_err());
        assert!(ViewerConfig::default().with_max_snapshots_per_page(0).validate().is_err());
        assert!(ViewerConfig { snapshot_quality: 101, ..Default::default() }.validate().is_err());
        assert!(ViewerConfig { thumbnail_scale: 0.0, ..Default::default() }.validate().is_err());
        assert!(ViewerConfig { page_margin: f32::NAN, ..Default::default() }.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_from_env() {
        let _guard = EnvGuard::new(ENV_KEYS);

        env::set_var("PAGEVIEW_ZOOM_MIN", "0.25");
        env::set_var("PAGEVIEW_ZOOM_MAX", "5");
        env::set_var("PAGEVIEW_ZOOM_STEP", "0.5");
        env::set_var("PAGEVIEW_THUMBNAIL_SCALE", "0.2");
        env::set_var("PAGEVIEW_MAX_SNAPSHOTS_PER_PAGE", "4");
        env::set_var("PAGEVIEW_SNAPSHOT_QUALITY", "95");

        let config = ViewerConfig::from_env().unwrap();
        assert_eq!(config.zoom_min, 0.25);
        assert_eq!(config.zoom_max, 5.0);
        assert_eq!(config.zoom_step, 0.5);
        assert_eq!(config.thumbnail_scale, 0.2);
        assert_eq!(config.max_snapshots_per_page, 4);
        assert_eq!(config.snapshot_quality, 95);
    }

    #[test]
    #[serial]
    fn test_from_env_partial() {
        let _guard = EnvGuard::new(ENV_KEYS);
        for key in ENV_KEYS {
            env::remove_var(key);
        }
        env::set_var("PAGEVIEW_ZOOM_MAX", "2.5");

        let config = ViewerConfig::from_env().unwrap();
        assert_eq!(config.zoom_max, 2.5);
        assert_eq!(config.zoom_min, 0.1); // default
    }

    #[test]
    #[serial]
    fn test_from_env_invalid() {
        let _guard = EnvGuard::new(&["PAGEVIEW_SNAPSHOT_QUALITY"]);

        env::set_var("PAGEVIEW_SNAPSHOT_QUALITY", "very high");
        let err = ViewerConfig::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "PAGEVIEW_SNAPSHOT_QUALITY"));
    }

    #[test]
    #[serial]
    fn test_load_layers_file_then_env() {
        let _guard = EnvGuard::new(ENV_KEYS);
        for key in ENV_KEYS {
            env::remove_var(key);
        }
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "zoom_step = 0.5\nzoom_max = 4.0\n").unwrap();
        env::set_var("PAGEVIEW_ZOOM_MAX", "3.5");

        let config = ViewerConfig::load(Some(&path)).unwrap();
        assert_eq!(config.zoom_step, 0.5);
        assert_eq!(config.zoom_max, 3.5);
    }

    // Helper to save and restore environment variables
    struct EnvGuard {
        vars: Vec<(String, Option<String>)>,
    }

    impl EnvGuard {
        fn new(var_names: &[&str]) -> Self {
            let vars = var_names.iter().map(|name| (name.to_string(), env::var(name).ok())).collect();
            Self { vars }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (name, value) in &self.vars {
                match value {
                    Some(v) => env::set_var(name, v),
                    None => env::remove_var(name),
                }
            }
        }
    }

    #[test]
    fn test_from_toml_partial() {
        let config = ViewerConfig::from_toml("overscan = 4\nsnapshot_quality = 60\n").unwrap();
        assert_eq!(config.overscan, 4);
        assert_eq!(config.snapshot_quality, 60);
        assert_eq!(config.zoom_step, 0.3); // default
    }

    #[test]
    fn test_from_toml_rejects_wrong_types() {
        assert!(matches!(ViewerConfig::from_toml("overscan = \"lots\""), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_file_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = ViewerConfig::default().with_zoom_step(0.2).with_overscan(3);
        config.save_to_file(&path).unwrap();

        let loaded = ViewerConfig::from_file(&path).unwrap();
        assert_eq!(config, loaded);
    }
}
