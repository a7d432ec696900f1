//! cdr-bind - typed bindings for native CDR engines
//!
//! This library exposes the C entry points of a content-disarm-and-reconstruction
//! engine as a safe Rust API:
//! - Library loading and entry point resolution against a fixed ABI table
//! - Wide-string and byte-buffer marshaling with explicit encodings
//! - Immediate copy of every engine-owned output into host memory
//! - One typed method per entry point, returning typed result objects
//! - An explicit state machine for the engine's call-scoped status and messages
//!
//! All calls on one `Engine` are serialized through `Session`, which holds
//! the engine lock while it lives.

/// cdr-bind version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod engine;
pub mod error;
pub mod ffi;
pub mod results;
pub mod state;
pub mod status;

// Re-export commonly used types
pub use engine::{Engine, EngineBuilder, Session};
pub use error::{BindError, BindResult};
pub use ffi::{EntryPoint, LibraryHandle, ResolveMode, SymbolSource, SymbolTable, WideEncoding};
pub use results::{
    BufferPlusReportResult, BufferResult, ConfigResult, FileTypeResult, ProcessStatusResult,
    StatusResult, TextResult,
};
pub use state::CallState;
pub use status::{FileTypeCode, FileTypeNames, Status, StatusPolicy};
