//! Global Configuration (~/.cdr/config.toml)
//!
//! User-level defaults shared by every project, typically the install
//! location of the engine library.

use crate::binding::BindingConfig;
use crate::{ConfigError, ConfigResult};
use std::path::{Path, PathBuf};

/// Global user configuration from ~/.cdr/config.toml
///
/// Uses the same schema as `cdr.toml`; it is simply merged underneath it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GlobalConfig {
    pub binding: BindingConfig,
}

impl GlobalConfig {
    /// Load global configuration from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        Ok(Self {
            binding: BindingConfig::load_from_file(path)?,
        })
    }

    /// Get the global config directory (~/.cdr)
    pub fn global_config_dir() -> ConfigResult<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::HomeNotFound)?;
        Ok(home.join(".cdr"))
    }

    /// Get the global config file path (~/.cdr/config.toml)
    pub fn global_config_path() -> ConfigResult<PathBuf> {
        Ok(Self::global_config_dir()?.join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_global_path_under_home() {
        if let Ok(path) = GlobalConfig::global_config_path() {
            assert!(path.ends_with(".cdr/config.toml"));
        }
    }

    #[test]
    fn test_load_global_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[library]\npath = \"/opt/engine/libengine.so\"\n").unwrap();

        let global = GlobalConfig::load_from_file(&path).unwrap();
        assert_eq!(
            global.binding.library.unwrap().path,
            Some(PathBuf::from("/opt/engine/libengine.so"))
        );
    }

    #[test]
    fn test_missing_global_file() {
        let result = GlobalConfig::load_from_file(Path::new("/nonexistent/cdr/config.toml"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }
}
