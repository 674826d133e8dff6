/*!
 * Configuration support for the udadash pipeline
 *
 * Provides runtime configuration options for customizing pipeline behavior.
 */

use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};

/// Global configuration for the udadash pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UdaConfig {
    /// Whether to show progress bars while loading larger exports
    #[serde(default = "default_enable_progress_bar")]
    pub enable_progress_bar: bool,

    /// Number of threads for parallel classification (None = use all available)
    #[serde(default)]
    pub parallel_threads: Option<usize>,

    /// Whether to skip invalid records during parsing
    #[serde(default)]
    pub skip_invalid_records: bool,

    /// Directory holding the three practice exports
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// Default export format for pipeline output
    #[serde(default)]
    pub default_export_format: crate::ExportFormat,
}

impl Default for UdaConfig {
    fn default() -> Self {
        Self {
            enable_progress_bar: default_enable_progress_bar(),
            parallel_threads: None,
            skip_invalid_records: false,
            data_dir: None,
            default_export_format: crate::ExportFormat::Json,
        }
    }
}

fn default_enable_progress_bar() -> bool {
    true
}

impl UdaConfig {
    /// Create a new configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables
    ///
    /// Supported environment variables:
    /// - `UDADASH_PROGRESS_BAR`: "true" or "false"
    /// - `UDADASH_PARALLEL_THREADS`: number or "auto"
    /// - `UDADASH_SKIP_INVALID`: "true" or "false"
    /// - `UDADASH_DATA_DIR`: directory path
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("UDADASH_PROGRESS_BAR") {
            config.enable_progress_bar = val.to_lowercase() == "true";
        }

        if let Ok(val) = std::env::var("UDADASH_PARALLEL_THREADS") {
            config.parallel_threads = match val.to_lowercase().as_str() {
                "auto" | "0" => None,
                num => num.parse().ok(),
            };
        }

        if let Ok(val) = std::env::var("UDADASH_SKIP_INVALID") {
            config.skip_invalid_records = val.to_lowercase() == "true";
        }

        if let Ok(val) = std::env::var("UDADASH_DATA_DIR") {
            config.data_dir = Some(PathBuf::from(val));
        }

        config
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&contents)
            .map_err(|e| crate::UdaError::Configuration {
                message: format!("Failed to parse config file: {}", e),
                suggestion: Some("Check that the file is valid TOML format".to_string()),
            })?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> crate::Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| crate::UdaError::Configuration {
                message: format!("Failed to serialize config: {}", e),
                suggestion: None,
            })?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Get the default configuration file path
    ///
    /// Returns `~/.config/udadash/config.toml` on Unix-like systems
    /// or `%APPDATA%\udadash\config.toml` on Windows
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "udadash")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load configuration from the default location, environment, or defaults
    ///
    /// Priority order:
    /// 1. Default config file (if exists)
    /// 2. Environment variables
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Some(config_path) = Self::default_config_path() {
            if config_path.exists() {
                if let Ok(config) = Self::from_file(&config_path) {
                    return config;
                }
            }
        }

        Self::from_env()
    }
}

// Global configuration support
use std::sync::RwLock;

lazy_static::lazy_static! {
    static ref GLOBAL_CONFIG: RwLock<Option<UdaConfig>> = RwLock::new(None);
}

/// Set the global configuration
pub fn set_global_config(config: UdaConfig) {
    *GLOBAL_CONFIG.write().unwrap() = Some(config);
}

/// Get the global configuration (or default if not set)
pub fn global_config() -> UdaConfig {
    GLOBAL_CONFIG.read().unwrap()
        .as_ref()
        .cloned()
        .unwrap_or_else(UdaConfig::load)
}

/// Clear the global configuration
pub fn clear_global_config() {
    *GLOBAL_CONFIG.write().unwrap() = None;
}

/// Builder for customizing configuration
pub struct ConfigBuilder {
    config: UdaConfig,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigBuilder {
    /// Start building a new configuration
    pub fn new() -> Self {
        Self {
            config: UdaConfig::default(),
        }
    }

    /// Set progress bar enabled
    pub fn progress_bar(mut self, enabled: bool) -> Self {
        self.config.enable_progress_bar = enabled;
        self
    }

    /// Set number of parallel threads
    pub fn parallel_threads(mut self, threads: Option<usize>) -> Self {
        self.config.parallel_threads = threads;
        self
    }

    /// Set skip invalid records
    pub fn skip_invalid_records(mut self, skip: bool) -> Self {
        self.config.skip_invalid_records = skip;
        self
    }

    /// Set the practice export directory
    pub fn data_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.config.data_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Build the configuration
    pub fn build(self) -> UdaConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = UdaConfig::default();
        assert!(config.enable_progress_bar);
        assert!(!config.skip_invalid_records);
        assert_eq!(config.data_dir, None);
    }

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::new()
            .progress_bar(false)
            .parallel_threads(Some(4))
            .skip_invalid_records(true)
            .data_dir("/data/practice")
            .build();

        assert!(!config.enable_progress_bar);
        assert_eq!(config.parallel_threads, Some(4));
        assert!(config.skip_invalid_records);
        assert_eq!(config.data_dir, Some(PathBuf::from("/data/practice")));
    }

    #[test]
    fn test_config_toml_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let config = ConfigBuilder::new().progress_bar(false).build();
        config.save(&path).unwrap();

        let loaded = UdaConfig::from_file(&path).unwrap();
        assert!(!loaded.enable_progress_bar);
    }
}
