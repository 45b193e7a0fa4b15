/// Centralized platform-specific path computation
///
/// All working trees and configuration files live under a per-user
/// application directory so repeated syncs of the same repository land on the
/// same local path.
use std::path::PathBuf;

/// Platform-agnostic path utilities
pub struct AppPaths;

impl AppPaths {
    /// Get the application data directory for the current platform
    ///
    /// Returns: {platform data dir}/repo-sync
    pub fn data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("repo-sync")
    }

    /// Get the application config directory for the current platform
    ///
    /// Returns: {platform config dir}/repo-sync
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("repo-sync")
    }

    /// Root directory under which cloned working trees are laid out
    ///
    /// Returns: {data_dir}/repos
    pub fn default_repos_root() -> PathBuf {
        Self::data_dir().join("repos")
    }

    /// Get default config file path
    ///
    /// Returns: {config_dir}/config.toml
    pub fn default_config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_dir_not_empty() {
        let dir = AppPaths::data_dir();
        assert!(!dir.as_os_str().is_empty());
    }

    #[test]
    fn test_dirs_contain_project_name() {
        assert!(AppPaths::data_dir().to_string_lossy().contains("repo-sync"));
        assert!(
            AppPaths::config_dir()
                .to_string_lossy()
                .contains("repo-sync")
        );
    }

    #[test]
    fn test_default_repos_root_under_data_dir() {
        let root = AppPaths::default_repos_root();
        assert!(root.starts_with(AppPaths::data_dir()));
        assert!(root.ends_with("repos"));
    }

    #[test]
    fn test_default_config_path() {
        let path = AppPaths::default_config_path();
        assert!(path.ends_with("config.toml"));
    }
}
