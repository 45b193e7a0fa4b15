/// Configuration system for repo-sync
///
/// Supports loading from multiple sources with priority:
/// CLI args > Environment variables > Config file > Defaults
use crate::error::{ConfigError, SyncError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Sync/layout configuration
    #[serde(default)]
    pub sync: SyncConfig,

    /// Transport (clone/pull) configuration
    #[serde(default)]
    pub transport: TransportConfig,

    /// Changelog generation configuration
    #[serde(default)]
    pub changelog: ChangelogConfig,
}

/// Sync/layout configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Root directory for cloned working trees
    #[serde(default = "default_repos_root")]
    pub repos_root: PathBuf,
}

/// Transport (clone/pull) configuration
///
/// These replace process-global environment toggles: all transport behavior
/// is carried explicitly into the transport layer constructor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Disable symbolic-link materialization during clone
    #[serde(default = "default_disable_symlinks")]
    pub disable_symlinks: bool,

    /// Enable long-path support during clone
    #[serde(default)]
    pub long_path_support: bool,

    /// Attempts for the raw data-transfer (fetch) step on transient failures
    #[serde(default = "default_fetch_attempts")]
    pub fetch_attempts: u32,

    /// Base delay in milliseconds for exponential fetch backoff
    #[serde(default = "default_fetch_base_delay_ms")]
    pub fetch_base_delay_ms: u64,
}

/// Changelog generation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangelogConfig {
    /// Bounded recency window when no checkpoint commit is known
    #[serde(default = "default_recent_window")]
    pub recent_window: usize,

    /// Maximum characters of model output echoed into logs on parse failure
    #[serde(default = "default_preview_len")]
    pub preview_len: usize,
}

// Default value functions
fn default_repos_root() -> PathBuf {
    crate::paths::AppPaths::default_repos_root()
}

fn default_disable_symlinks() -> bool {
    true
}

fn default_fetch_attempts() -> u32 {
    3
}

fn default_fetch_base_delay_ms() -> u64 {
    1_000
}

fn default_recent_window() -> usize {
    20
}

fn default_preview_len() -> usize {
    500
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            repos_root: default_repos_root(),
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            disable_symlinks: default_disable_symlinks(),
            long_path_support: false,
            fetch_attempts: default_fetch_attempts(),
            fetch_base_delay_ms: default_fetch_base_delay_ms(),
        }
    }
}

impl Default for ChangelogConfig {
    fn default() -> Self {
        Self {
            recent_window: default_recent_window(),
            preview_len: default_preview_len(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn from_file(path: &Path) -> Result<Self, SyncError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()).into());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::LoadFailed(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| ConfigError::ParseFailed(format!("Invalid TOML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default location or create default
    pub fn load_or_default() -> Result<Self, SyncError> {
        let config_path = crate::paths::AppPaths::default_config_path();

        if config_path.exists() {
            tracing::info!("Loading config from: {}", config_path.display());
            Self::from_file(&config_path)
        } else {
            tracing::info!("No config file found, using defaults");
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<(), SyncError> {
        // Create parent directory if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ConfigError::SaveFailed(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SaveFailed(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| ConfigError::SaveFailed(format!("Failed to write config file: {}", e)))?;

        tracing::info!("Saved config to: {}", path.display());
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), SyncError> {
        if self.transport.fetch_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                key: "transport.fetch_attempts".to_string(),
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }

        if self.changelog.recent_window == 0 {
            return Err(ConfigError::InvalidValue {
                key: "changelog.recent_window".to_string(),
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }

        if self.changelog.preview_len == 0 {
            return Err(ConfigError::InvalidValue {
                key: "changelog.preview_len".to_string(),
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }

        Ok(())
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(root) = std::env::var("REPO_SYNC_ROOT") {
            self.sync.repos_root = PathBuf::from(root);
        }

        if let Ok(value) = std::env::var("REPO_SYNC_DISABLE_SYMLINKS")
            && let Ok(flag) = value.parse()
        {
            self.transport.disable_symlinks = flag;
        }

        if let Ok(value) = std::env::var("REPO_SYNC_LONG_PATHS")
            && let Ok(flag) = value.parse()
        {
            self.transport.long_path_support = flag;
        }

        if let Ok(value) = std::env::var("REPO_SYNC_FETCH_ATTEMPTS")
            && let Ok(attempts) = value.parse()
        {
            self.transport.fetch_attempts = attempts;
        }

        if let Ok(value) = std::env::var("REPO_SYNC_RECENT_WINDOW")
            && let Ok(window) = value.parse()
        {
            self.changelog.recent_window = window;
        }
    }

    /// Create a new Config with defaults and environment overrides
    pub fn new() -> Result<Self, SyncError> {
        let mut config = Self::load_or_default()?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.transport.disable_symlinks);
        assert!(!config.transport.long_path_support);
        assert_eq!(config.transport.fetch_attempts, 3);
        assert_eq!(config.changelog.recent_window, 20);
        assert_eq!(config.changelog.preview_len, 500);
    }

    #[test]
    fn test_validate_valid_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_fetch_attempts() {
        let mut config = Config::default();
        config.transport.fetch_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_recent_window() {
        let mut config = Config::default();
        config.changelog.recent_window = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file_missing() {
        let result = Config::from_file(Path::new("/nonexistent/config.toml"));
        assert!(matches!(
            result,
            Err(SyncError::Config(ConfigError::FileNotFound(_)))
        ));
    }

    #[test]
    fn test_save_and_reload() {
        let file = NamedTempFile::new().unwrap();
        let mut config = Config::default();
        config.sync.repos_root = PathBuf::from("/srv/repos");
        config.changelog.recent_window = 50;

        config.save(file.path()).unwrap();
        let reloaded = Config::from_file(file.path()).unwrap();

        assert_eq!(reloaded.sync.repos_root, PathBuf::from("/srv/repos"));
        assert_eq!(reloaded.changelog.recent_window, 50);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "[transport]\nfetch_attempts = 5\n").unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.transport.fetch_attempts, 5);
        assert!(config.transport.disable_symlinks);
        assert_eq!(config.changelog.recent_window, 20);
    }
}
