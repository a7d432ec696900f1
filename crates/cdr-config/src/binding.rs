//! Binding Configuration (cdr.toml)
//!
//! Describes where the native engine lives and how its ABI conventions are
//! interpreted by the binding layer.

use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Binding configuration from cdr.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct BindingConfig {
    /// Native library location and symbol resolution
    #[serde(skip_serializing_if = "Option::is_none")]
    pub library: Option<LibraryConfig>,

    /// String marshaling conventions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marshal: Option<MarshalConfig>,

    /// Engine status code conventions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<StatusConfig>,

    /// Display names for engine file-type codes, keyed by the decimal code
    #[serde(default, rename = "file_types")]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub file_types: BTreeMap<String, String>,
}

/// Native library configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct LibraryConfig {
    /// Path or short name of the engine library
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Extra directories searched for short library names
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub search_paths: Vec<PathBuf>,

    /// Entry point resolution ("eager" or "lazy")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolve: Option<String>,
}

/// Marshaling configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct MarshalConfig {
    /// Wide character encoding ("utf16", "ucs2" or "utf32")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wide_encoding: Option<String>,
}

/// Status code configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct StatusConfig {
    /// The engine's success status value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<i32>,
}

impl BindingConfig {
    /// Load binding configuration from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        let config = Self::parse(&content).map_err(|e| match e {
            ConfigError::TomlParseError { error, .. } => ConfigError::TomlParseError {
                file: path.to_path_buf(),
                error,
            },
            other => other,
        })?;

        Ok(config)
    }

    /// Parse and validate configuration text
    pub fn parse(content: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::TomlParseError {
            file: PathBuf::from("<inline>"),
            error: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate enum-like strings and file-type keys
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(resolve) = self.library.as_ref().and_then(|l| l.resolve.as_deref()) {
            validate_resolve_mode("library.resolve", resolve)?;
        }

        if let Some(encoding) = self.marshal.as_ref().and_then(|m| m.wide_encoding.as_deref()) {
            validate_wide_encoding("marshal.wide_encoding", encoding)?;
        }

        for key in self.file_types.keys() {
            if key.trim().parse::<i32>().is_err() {
                return Err(ConfigError::InvalidValue {
                    field: format!("file_types.{}", key),
                    reason: "file type keys must be integer engine codes".to_string(),
                });
            }
        }

        Ok(())
    }

    /// Merge another configuration into this one
    /// Other config takes precedence for non-None values
    pub fn merge(&mut self, other: &BindingConfig) {
        if let Some(other_lib) = &other.library {
            let lib = self.library.get_or_insert_with(LibraryConfig::default);
            if other_lib.path.is_some() {
                lib.path = other_lib.path.clone();
            }
            if other_lib.resolve.is_some() {
                lib.resolve = other_lib.resolve.clone();
            }
            // Higher-precedence search paths are tried first
            let mut paths = other_lib.search_paths.clone();
            paths.extend(lib.search_paths.drain(..));
            lib.search_paths = paths;
        }
        if let Some(other_marshal) = &other.marshal {
            if other_marshal.wide_encoding.is_some() {
                self.marshal = Some(other_marshal.clone());
            }
        }
        if let Some(other_status) = &other.status {
            if other_status.success.is_some() {
                self.status = Some(other_status.clone());
            }
        }
        for (code, name) in &other.file_types {
            self.file_types.insert(code.clone(), name.clone());
        }
    }
}

/// Validate a resolution mode value
pub fn validate_resolve_mode(field: &str, value: &str) -> ConfigResult<()> {
    if !matches!(value, "eager" | "lazy") {
        return Err(ConfigError::InvalidValue {
            field: field.to_string(),
            reason: format!("must be 'eager' or 'lazy', got '{}'", value),
        });
    }
    Ok(())
}

/// Validate a wide encoding value
pub fn validate_wide_encoding(field: &str, value: &str) -> ConfigResult<()> {
    if !matches!(value, "utf16" | "ucs2" | "utf32") {
        return Err(ConfigError::InvalidValue {
            field: field.to_string(),
            reason: format!("must be 'utf16', 'ucs2', or 'utf32', got '{}'", value),
        });
    }
    Ok(())
}
