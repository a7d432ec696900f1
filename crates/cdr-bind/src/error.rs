//! Binding error types
//!
//! Engine status codes are data, never errors; `BindError` covers only
//! contract violations at the binding boundary plus the opt-in
//! `NativeCallFailure` produced by the results' `check` helpers.

use crate::ffi::marshal::MarshalError;
use std::path::PathBuf;
use thiserror::Error;

/// Binding layer errors
#[derive(Error, Debug)]
pub enum BindError {
    /// The native module could not be loaded
    #[error("Failed to load engine library '{}': {reason}", .path.display())]
    Load { path: PathBuf, reason: String },

    /// A short library name did not resolve to any file
    #[error("Engine library '{name}' not found (searched: {})", format_paths(.searched))]
    LibraryNotFound { name: String, searched: Vec<PathBuf> },

    /// A declared entry point is missing from the loaded module
    #[error("Symbol '{symbol}' not found in library '{library}'")]
    SymbolNotFound { library: String, symbol: String },

    /// No signature is declared for the requested entry point
    #[error("Entry point '{0}' has no declared signature")]
    UndeclaredEntryPoint(String),

    /// The Rust function type used at a call site disagrees with the registry
    #[error("Signature mismatch for '{entry_point}': declared {declared}, call site uses {bound}")]
    SignatureMismatch {
        entry_point: String,
        declared: String,
        bound: String,
    },

    /// A value could not be represented in the engine's encoding
    #[error("Encoding error in '{entry_point}' argument {argument}: {source}")]
    Encoding {
        entry_point: String,
        argument: usize,
        #[source]
        source: MarshalError,
    },

    /// The engine returned a non-success status and the caller asked for a check
    #[error("'{entry_point}' returned non-success status {status}")]
    NativeCallFailure { entry_point: String, status: i32 },

    #[error("Configuration error: {0}")]
    Config(#[from] cdr_config::ConfigError),
}

/// Result type for binding operations
pub type BindResult<T> = Result<T, BindError>;

fn format_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "<none>".to_string();
    }
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
