//! Native boundary of the engine binding
//!
//! Everything that touches raw pointers lives here:
//! - ABI kinds and call signatures (`types`, `registry`)
//! - Library loading and symbol resolution (`loader`)
//! - Typed function pointer casts (`caller`)
//! - Host ↔ engine string and buffer conversion (`marshal`, `safety`)
//!
//! # Safety
//!
//! Pointer handling lives here: symbol resolution, signature-checked casts,
//! and the copy of engine-owned outputs. The native call sites themselves
//! are in `engine` and `state`, which invoke the cast function pointers and
//! the `safety`/`marshal` copy helpers inside `unsafe` blocks.

pub mod caller;
pub mod loader;
pub mod marshal;
pub mod registry;
pub mod safety;
pub mod types;

pub use caller::{BoundEntryPoint, NativeArg, NativeFn, NativeReturn, RawFn};
pub use loader::{DynamicLibrary, LibraryHandle, LibrarySearch, ResolveMode, SymbolSource, SymbolTable};
pub use marshal::{MarshalContext, MarshalError, WideEncoding, WideString};
pub use registry::{EntryPoint, SignatureRegistry};
pub use safety::{OutputBuffer, OutputInt, OutputWide};
pub use types::{ArgKind, CallSignature, ReturnKind, WidePtr, WideUnit};
