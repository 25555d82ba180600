//! Configuration management module.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration load result.
#[derive(Debug)]
pub enum ConfigLoadResult {
    /// Config loaded successfully.
    Loaded(AppConfig),
    /// Config file missing (first run).
    Missing,
    /// Config file exists but invalid.
    Invalid(ConfigError),
}

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Validation failed: {0}")]
    Validation(String),
}

/// Main application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub backend: BackendConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

/// Hosted backend (auth + REST) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Project URL, e.g. `https://abcd.supabase.co`.
    pub url: String,
    /// Public anonymous API key.
    pub anon_key: String,
    /// Request timeout in seconds (default: 30).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

/// Camera negotiation and snapshot settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    pub preferred_width: u32,
    pub preferred_height: u32,
    pub min_width: u32,
    pub min_height: u32,
    /// Ask for the rear (environment-facing) camera first.
    pub rear_facing: bool,
    /// JPEG quality, 1..=100.
    pub jpeg_quality: u8,
    /// Device index for the native camera backend.
    #[serde(default)]
    pub device_index: u32,
}

/// Report export settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Initial directory for save dialogs.
    pub directory: Option<PathBuf>,
}

/// UI preferences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Keep the session on disk between runs.
    pub remember_session: bool,
    /// Seconds a toast stays visible.
    pub toast_secs: u64,
}

/// Platform data directory for the saved session and log files.
pub fn data_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("br", "PortariaObras", "portaria-obras").map(|dirs| dirs.data_dir().to_path_buf())
}

impl AppConfig {
    /// Get config file path (same directory as executable).
    pub fn default_path() -> PathBuf {
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."))
            .join("config.toml")
    }

    /// Attempt to load config with detailed result.
    pub fn try_load(path: &Path) -> ConfigLoadResult {
        if !path.exists() {
            return ConfigLoadResult::Missing;
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str::<AppConfig>(&content) {
                Ok(mut config) => {
                    config.backend.normalize();
                    match config.validate() {
                        Ok(()) => ConfigLoadResult::Loaded(config),
                        Err(e) => ConfigLoadResult::Invalid(e),
                    }
                }
                Err(e) => ConfigLoadResult::Invalid(ConfigError::Parse(e)),
            },
            Err(e) => ConfigLoadResult::Invalid(ConfigError::Read(e)),
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.backend.validate()?;

        if self.camera.jpeg_quality == 0 || self.camera.jpeg_quality > 100 {
            return Err(ConfigError::Validation(
                "JPEG quality must be between 1 and 100".to_string(),
            ));
        }
        if self.camera.min_width > self.camera.preferred_width || self.camera.min_height > self.camera.preferred_height
        {
            return Err(ConfigError::Validation(
                "Camera minimum resolution cannot exceed the preferred resolution".to_string(),
            ));
        }
        if self.ui.toast_secs == 0 {
            return Err(ConfigError::Validation("Toast duration must be at least 1 second".to_string()));
        }
        Ok(())
    }

    /// Save configuration to file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

impl BackendConfig {
    /// Strip whitespace, stray quotes and the trailing slash pasted along with the values.
    pub fn normalize(&mut self) {
        self.url = self.url.trim().replace(['"', '\''], "").trim_end_matches('/').to_string();
        self.anon_key = self.anon_key.trim().replace(['"', '\''], "");
    }

    /// Validate backend values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.trim().is_empty() {
            return Err(ConfigError::Validation("Backend URL cannot be empty".to_string()));
        }
        if !self.url.starts_with("http") {
            return Err(ConfigError::Validation(
                "Backend URL must start with http:// or https://".to_string(),
            ));
        }
        if self.url.contains("placeholder") {
            return Err(ConfigError::Validation("Backend URL is still a placeholder".to_string()));
        }
        if self.anon_key.trim().is_empty() {
            return Err(ConfigError::Validation("Backend API key cannot be empty".to_string()));
        }
        if self.timeout_secs < 5 {
            return Err(ConfigError::Validation(
                "Backend timeout must be at least 5 seconds".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            anon_key: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            preferred_width: 4096,
            preferred_height: 2160,
            min_width: 1280,
            min_height: 720,
            rear_facing: true,
            jpeg_quality: 100,
            device_index: 0,
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            remember_session: true,
            toast_secs: 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> AppConfig {
        AppConfig {
            backend: BackendConfig {
                url: "https://obra.supabase.co".to_string(),
                anon_key: "anon".to_string(),
                timeout_secs: 30,
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_default_config_needs_backend() {
        let config = AppConfig::default();
        assert!(config.validate().is_err());
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_normalize_strips_quotes_and_slash() {
        let mut backend = BackendConfig {
            url: "  \"https://obra.supabase.co/\" ".to_string(),
            anon_key: " 'key' ".to_string(),
            timeout_secs: 30,
        };
        backend.normalize();
        assert_eq!(backend.url, "https://obra.supabase.co");
        assert_eq!(backend.anon_key, "key");
    }

    #[test]
    fn test_validation_placeholder_url() {
        let mut config = valid_config();
        config.backend.url = "https://placeholder.supabase.co".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_non_http_url() {
        let mut config = valid_config();
        config.backend.url = "ftp://obra".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_camera_bounds() {
        let mut config = valid_config();

        config.camera.jpeg_quality = 0;
        assert!(config.validate().is_err());

        config.camera.jpeg_quality = 90;
        config.camera.min_width = 8000;
        assert!(config.validate().is_err());

        config.camera.min_width = 1280;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_round_trip_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        assert!(matches!(AppConfig::try_load(&path), ConfigLoadResult::Missing));

        valid_config().save(&path).unwrap();
        match AppConfig::try_load(&path) {
            ConfigLoadResult::Loaded(config) => {
                assert_eq!(config.backend.url, "https://obra.supabase.co");
                assert_eq!(config.camera.preferred_width, 4096);
            }
            other => panic!("unexpected load result: {other:?}"),
        }
    }

    #[test]
    fn test_load_with_only_backend_section() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[backend]\nurl = \"https://x.supabase.co/\"\nanon_key = \"k\"\n").unwrap();

        match AppConfig::try_load(&path) {
            ConfigLoadResult::Loaded(config) => {
                assert_eq!(config.backend.url, "https://x.supabase.co");
                assert_eq!(config.backend.timeout_secs, 30);
                assert!(config.ui.remember_session);
            }
            other => panic!("unexpected load result: {other:?}"),
        }
    }
}
