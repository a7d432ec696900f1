//! cdr-bind Configuration System
//!
//! Provides configuration for binding a native CDR engine:
//! - Binding configuration (cdr.toml)
//! - Global user configuration (~/.cdr/config.toml)
//! - Environment overrides (CDR_*)
//! - Precedence and merging
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded and merged in the following order (later overrides earlier):
//! 1. Global config (~/.cdr/config.toml)
//! 2. Binding config (./cdr.toml, searched upwards)
//! 3. Environment variables (CDR_*)
//! 4. Values set explicitly by the caller
//!
//! # Example
//!
//! ```no_run
//! use cdr_config::ConfigLoader;
//! use std::path::Path;
//!
//! let mut loader = ConfigLoader::new();
//! let config = loader.load_from_directory(Path::new(".")).unwrap();
//! println!("engine library: {:?}", config.library_path());
//! ```

pub mod binding;
pub mod global;
pub mod loader;

use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Home directory not found")]
    HomeNotFound,
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Name of the per-directory configuration file
pub const CONFIG_FILE_NAME: &str = "cdr.toml";

// Re-export main types
pub use binding::{BindingConfig, LibraryConfig, MarshalConfig, StatusConfig};
pub use global::GlobalConfig;
pub use loader::{Config, ConfigLoader};
