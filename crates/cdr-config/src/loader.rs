//! Configuration Loader
//!
//! Handles loading and merging configuration from multiple sources with proper precedence.

use crate::binding::{
    validate_resolve_mode, validate_wide_encoding, BindingConfig, LibraryConfig, MarshalConfig,
    StatusConfig,
};
use crate::global::GlobalConfig;
use crate::{ConfigError, ConfigResult, CONFIG_FILE_NAME};
use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};

/// Success status assumed when no configuration names one
pub const DEFAULT_SUCCESS_STATUS: i32 = 1;

/// Configuration loader
///
/// Loads configuration from multiple sources and merges them with proper precedence:
/// 1. Global config (~/.cdr/config.toml) - lowest priority
/// 2. Binding config (./cdr.toml) - overrides global
/// 3. Environment variables (CDR_*) - overrides file values
pub struct ConfigLoader {
    /// Cached global config path
    global_config_path: Option<PathBuf>,
    /// Skip the global config entirely
    skip_global: bool,
}

/// Merged configuration result
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Merged binding configuration
    pub binding: BindingConfig,

    /// Directory containing the cdr.toml that was used
    pub config_root: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self {
            global_config_path: None,
            skip_global: false,
        }
    }

    /// Read the global config from a specific path instead of ~/.cdr
    pub fn with_global_config_path(mut self, path: PathBuf) -> Self {
        self.global_config_path = Some(path);
        self
    }

    /// Ignore the global config
    pub fn without_global(mut self) -> Self {
        self.skip_global = true;
        self
    }

    /// Load configuration starting from the given directory
    ///
    /// Walks up the directory tree to find cdr.toml, merges it over the
    /// global config and applies environment overrides.
    pub fn load_from_directory(&mut self, start_dir: &Path) -> ConfigResult<Config> {
        let (config_root, local) = self.find_binding_config(start_dir)?;
        self.assemble(local, config_root)
    }

    /// Load configuration from a specific cdr.toml
    pub fn load_from_file(&mut self, config_path: &Path) -> ConfigResult<Config> {
        let local = BindingConfig::load_from_file(config_path)?;
        let config_root = config_path.parent().map(|p| p.to_path_buf());
        self.assemble(local, config_root)
    }

    fn assemble(
        &mut self,
        local: BindingConfig,
        config_root: Option<PathBuf>,
    ) -> ConfigResult<Config> {
        let mut binding = self.load_global_config()?.binding;
        binding.merge(&local);
        let binding = apply_env_overrides(binding)?;

        Ok(Config {
            binding,
            config_root,
        })
    }

    /// Find cdr.toml by walking up directory tree
    fn find_binding_config(
        &self,
        start_dir: &Path,
    ) -> ConfigResult<(Option<PathBuf>, BindingConfig)> {
        let mut current = start_dir.to_path_buf();

        loop {
            let config_path = current.join(CONFIG_FILE_NAME);

            if config_path.exists() {
                let config = BindingConfig::load_from_file(&config_path)?;
                return Ok((Some(current), config));
            }

            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => return Ok((None, BindingConfig::default())),
            }
        }
    }

    /// Load global configuration, defaulting when absent
    fn load_global_config(&mut self) -> ConfigResult<GlobalConfig> {
        if self.skip_global {
            return Ok(GlobalConfig::default());
        }

        let path = match &self.global_config_path {
            Some(path) => path.clone(),
            None => match GlobalConfig::global_config_path() {
                Ok(path) => {
                    self.global_config_path = Some(path.clone());
                    path
                }
                // No home directory means no global config
                Err(ConfigError::HomeNotFound) => return Ok(GlobalConfig::default()),
                Err(e) => return Err(e),
            },
        };

        if !path.exists() {
            return Ok(GlobalConfig::default());
        }

        GlobalConfig::load_from_file(&path)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Apply environment variable overrides
///
/// Recognized variables: CDR_LIBRARY_PATH, CDR_RESOLVE, CDR_WIDE_ENCODING,
/// CDR_SUCCESS_STATUS.
fn apply_env_overrides(mut config: BindingConfig) -> ConfigResult<BindingConfig> {
    if let Ok(path) = env::var("CDR_LIBRARY_PATH") {
        config
            .library
            .get_or_insert_with(LibraryConfig::default)
            .path = Some(PathBuf::from(path));
    }

    if let Ok(resolve) = env::var("CDR_RESOLVE") {
        let resolve = resolve.to_lowercase();
        validate_resolve_mode("CDR_RESOLVE", &resolve)?;
        config
            .library
            .get_or_insert_with(LibraryConfig::default)
            .resolve = Some(resolve);
    }

    if let Ok(encoding) = env::var("CDR_WIDE_ENCODING") {
        let encoding = encoding.to_lowercase();
        validate_wide_encoding("CDR_WIDE_ENCODING", &encoding)?;
        config.marshal = Some(MarshalConfig {
            wide_encoding: Some(encoding),
        });
    }

    if let Ok(success) = env::var("CDR_SUCCESS_STATUS") {
        let value = success
            .trim()
            .parse::<i32>()
            .map_err(|_| ConfigError::InvalidValue {
                field: "CDR_SUCCESS_STATUS".to_string(),
                reason: format!("expected an integer, got '{}'", success),
            })?;
        config.status = Some(StatusConfig {
            success: Some(value),
        });
    }

    Ok(config)
}

impl Config {
    /// Configured engine library path or short name
    ///
    /// A relative path with a directory part is resolved against the
    /// directory holding cdr.toml. Bare short names are left for the
    /// library search.
    pub fn library_path(&self) -> Option<PathBuf> {
        let path = self.binding.library.as_ref()?.path.as_deref()?;
        match &self.config_root {
            Some(root) if path.is_relative() && path.components().count() > 1 => {
                Some(root.join(path))
            }
            _ => Some(path.to_path_buf()),
        }
    }

    /// Extra library search directories, highest priority first
    ///
    /// Relative entries are resolved against the directory holding cdr.toml.
    pub fn search_paths(&self) -> Vec<PathBuf> {
        let Some(library) = self.binding.library.as_ref() else {
            return Vec::new();
        };
        library
            .search_paths
            .iter()
            .map(|p| match (&self.config_root, p.is_relative()) {
                (Some(root), true) => root.join(p),
                _ => p.clone(),
            })
            .collect()
    }

    /// Resolution mode string ("eager" unless configured)
    pub fn resolve_mode(&self) -> &str {
        self.binding
            .library
            .as_ref()
            .and_then(|l| l.resolve.as_deref())
            .unwrap_or("eager")
    }

    /// Configured wide encoding, if any
    pub fn wide_encoding(&self) -> Option<&str> {
        self.binding.marshal.as_ref()?.wide_encoding.as_deref()
    }

    /// The engine's success status value
    pub fn success_status(&self) -> i32 {
        self.binding
            .status
            .as_ref()
            .and_then(|s| s.success)
            .unwrap_or(DEFAULT_SUCCESS_STATUS)
    }

    /// File-type display names keyed by engine code
    pub fn file_type_names(&self) -> BTreeMap<i32, String> {
        self.binding
            .file_types
            .iter()
            .filter_map(|(code, name)| Some((code.trim().parse::<i32>().ok()?, name.clone())))
            .collect()
    }

    /// Directory holding the cdr.toml that was used
    pub fn config_root(&self) -> Option<&Path> {
        self.config_root.as_deref()
    }
}
