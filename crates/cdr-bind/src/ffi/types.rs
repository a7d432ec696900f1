//! ABI type system - argument and return kinds at the engine boundary
//!
//! Defines:
//! - `ArgKind`: how one native argument is marshaled
//! - `ReturnKind`: how a native return value is interpreted
//! - `CallSignature`: the ordered argument kinds plus return kind of one entry point
//! - `WideUnit`: opaque stand-in for the engine's `wchar_t`
//!
//! Kind mapping to Rust ABI types:
//! - ArgKind::FixedWidthInt(32) → u32 / i32
//! - ArgKind::WideString → *const WideUnit
//! - ArgKind::BytePointer → *const u8
//! - ArgKind::ByteLength → usize (size_t)
//! - ArgKind::OutputBytePointer → *mut *mut u8
//! - ArgKind::OutputByteLength → *mut usize
//! - ArgKind::OutputWidePointer → *mut *mut WideUnit
//! - ArgKind::OutputFixedWidthInt(32) → *mut u32
//! - ReturnKind::FixedWidthInt(32) → i32 (c_int)
//! - ReturnKind::WidePointer → *const WideUnit

use serde::Serialize;
use std::fmt;

/// Opaque wide character unit.
///
/// The engine's `wchar_t` is 2 bytes on Windows and 4 bytes on Unix, so the
/// binding never dereferences this type directly; `marshal` reads it with
/// the configured `WideEncoding`.
#[repr(C)]
pub struct WideUnit {
    _private: [u8; 0],
}

/// Pointer to a null-terminated wide string
pub type WidePtr = *const WideUnit;

/// Marshaling kind of a single native argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ArgKind {
    /// Integer passed by value, width in bits
    FixedWidthInt(u8),
    /// Null-terminated wide string input
    WideString,
    /// Pointer to caller-owned input bytes
    BytePointer,
    /// Length of the preceding input bytes
    ByteLength,
    /// Receives a pointer to engine-owned output bytes
    OutputBytePointer,
    /// Receives the length of an output region
    OutputByteLength,
    /// Receives a pointer to an engine-owned wide string
    OutputWidePointer,
    /// Receives an integer, width in bits
    OutputFixedWidthInt(u8),
}

impl ArgKind {
    /// Get a display name for this argument kind
    pub fn display_name(&self) -> String {
        match self {
            ArgKind::FixedWidthInt(bits) => format!("int{}", bits),
            ArgKind::WideString => "wide_str".to_string(),
            ArgKind::BytePointer => "byte_ptr".to_string(),
            ArgKind::ByteLength => "byte_len".to_string(),
            ArgKind::OutputBytePointer => "out_byte_ptr".to_string(),
            ArgKind::OutputByteLength => "out_byte_len".to_string(),
            ArgKind::OutputWidePointer => "out_wide_ptr".to_string(),
            ArgKind::OutputFixedWidthInt(bits) => format!("out_int{}", bits),
        }
    }

    /// Whether the engine writes through this argument
    pub fn is_output(&self) -> bool {
        matches!(
            self,
            ArgKind::OutputBytePointer
                | ArgKind::OutputByteLength
                | ArgKind::OutputWidePointer
                | ArgKind::OutputFixedWidthInt(_)
        )
    }
}

/// Interpretation of a native return value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ReturnKind {
    /// Integer return (status or type code), width in bits
    FixedWidthInt(u8),
    /// Pointer to an engine-owned null-terminated wide string
    WidePointer,
}

impl ReturnKind {
    /// Get a display name for this return kind
    pub fn display_name(&self) -> String {
        match self {
            ReturnKind::FixedWidthInt(bits) => format!("int{}", bits),
            ReturnKind::WidePointer => "wide_ptr".to_string(),
        }
    }
}

/// Declared shape of one entry point.
///
/// Immutable once created. Two signatures are equal only if every argument
/// kind, their order and the return kind agree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CallSignature {
    args: Vec<ArgKind>,
    ret: ReturnKind,
}

impl CallSignature {
    pub fn new(args: &[ArgKind], ret: ReturnKind) -> Self {
        Self {
            args: args.to_vec(),
            ret,
        }
    }

    /// Argument kinds in native order
    pub fn args(&self) -> &[ArgKind] {
        &self.args
    }

    pub fn return_kind(&self) -> ReturnKind {
        self.ret
    }

    pub fn arity(&self) -> usize {
        self.args.len()
    }
}

impl fmt::Display for CallSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args: Vec<String> = self.args.iter().map(ArgKind::display_name).collect();
        write!(f, "({}) -> {}", args.join(", "), self.ret.display_name())
    }
}
