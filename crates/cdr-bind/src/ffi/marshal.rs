//! Type marshaling - host ↔ engine representations
//!
//! Provides the conversions used at every call site:
//! - `WideString::encode()`: host text → null-terminated wide string
//! - `decode_wide_ptr()`: engine wide string → host text
//! - `decode_narrow()`: engine UTF-8 bytes → host text
//! - `MarshalContext`: per-call owner of encoded arguments
//!
//! # Memory Safety
//!
//! - Encoded wide strings are owned by the `MarshalContext` of the call
//!   and are freed when it drops, after the native call returned
//! - Input byte slices are borrowed for the duration of the call, so they
//!   cannot move or be freed while the engine reads them
//! - Null pointer checks for every engine-provided pointer
//! - No lossy conversions: anything not representable is an error

use crate::error::{BindError, BindResult};
use crate::ffi::registry::EntryPoint;
use crate::ffi::types::{WidePtr, WideUnit};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Marshal error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MarshalError {
    /// NUL inside a string would silently truncate it on the engine side
    #[error("string contains a NUL character at position {position}")]
    InteriorNul { position: usize },

    /// Character cannot be expressed in the configured wide encoding
    #[error("character {ch:?} is not representable in {encoding}")]
    Unrepresentable { ch: char, encoding: WideEncoding },

    #[error("unpaired UTF-16 surrogate 0x{unit:04x} at unit {position}")]
    UnpairedSurrogate { unit: u16, position: usize },

    /// UCS-2 has no surrogate pairs, so any surrogate unit is invalid
    #[error("surrogate 0x{unit:04x} at unit {position} is not valid UCS-2")]
    Ucs2Surrogate { unit: u16, position: usize },

    #[error("invalid Unicode scalar value 0x{value:x} at unit {position}")]
    InvalidScalar { value: u32, position: usize },

    #[error("invalid UTF-8 after {valid_up_to} bytes")]
    InvalidUtf8 { valid_up_to: usize },

    #[error("path is not valid Unicode: {}", .0.display())]
    NonUnicodePath(PathBuf),

    #[error("unknown wide encoding '{0}'")]
    UnknownEncoding(String),
}

/// Width and rules of the engine's `wchar_t` strings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WideEncoding {
    /// 2-byte units, supplementary characters as surrogate pairs
    Utf16,
    /// 2-byte units, Basic Multilingual Plane only
    Ucs2,
    /// 4-byte units, one per character
    Utf32,
}

impl WideEncoding {
    /// The platform's `wchar_t` convention
    pub fn platform_default() -> Self {
        if cfg!(windows) {
            WideEncoding::Utf16
        } else {
            WideEncoding::Utf32
        }
    }

    /// Bytes per code unit
    pub fn unit_width(&self) -> usize {
        match self {
            WideEncoding::Utf16 | WideEncoding::Ucs2 => 2,
            WideEncoding::Utf32 => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WideEncoding::Utf16 => "utf16",
            WideEncoding::Ucs2 => "ucs2",
            WideEncoding::Utf32 => "utf32",
        }
    }
}

impl Default for WideEncoding {
    fn default() -> Self {
        Self::platform_default()
    }
}

impl fmt::Display for WideEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WideEncoding {
    type Err = MarshalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "utf16" | "utf-16" => Ok(WideEncoding::Utf16),
            "ucs2" | "ucs-2" => Ok(WideEncoding::Ucs2),
            "utf32" | "utf-32" => Ok(WideEncoding::Utf32),
            _ => Err(MarshalError::UnknownEncoding(s.to_string())),
        }
    }
}

/// Null-terminated wide string owned by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WideString {
    Narrow(Vec<u16>),
    Wide(Vec<u32>),
}

impl WideString {
    /// Encode host text, appending the terminator
    pub fn encode(text: &str, encoding: WideEncoding) -> Result<Self, MarshalError> {
        if let Some(position) = text.chars().position(|c| c == '\0') {
            return Err(MarshalError::InteriorNul { position });
        }

        match encoding {
            WideEncoding::Utf16 => {
                let mut units: Vec<u16> = text.encode_utf16().collect();
                units.push(0);
                Ok(WideString::Narrow(units))
            }
            WideEncoding::Ucs2 => {
                let mut units = Vec::with_capacity(text.len() + 1);
                for ch in text.chars() {
                    let value = ch as u32;
                    if value > 0xFFFF {
                        return Err(MarshalError::Unrepresentable { ch, encoding });
                    }
                    units.push(value as u16);
                }
                units.push(0);
                Ok(WideString::Narrow(units))
            }
            WideEncoding::Utf32 => {
                let mut units: Vec<u32> = text.chars().map(|c| c as u32).collect();
                units.push(0);
                Ok(WideString::Wide(units))
            }
        }
    }

    /// Pointer to the first unit; valid while `self` is alive and unmodified
    pub fn as_ptr(&self) -> WidePtr {
        match self {
            WideString::Narrow(units) => units.as_ptr() as *const WideUnit,
            WideString::Wide(units) => units.as_ptr() as *const WideUnit,
        }
    }

    /// Number of code units, excluding the terminator
    pub fn len(&self) -> usize {
        match self {
            WideString::Narrow(units) => units.len() - 1,
            WideString::Wide(units) => units.len() - 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Decode 2-byte units (no terminator) into host text
pub fn decode_utf16_units(units: &[u16]) -> Result<String, MarshalError> {
    let mut out = String::with_capacity(units.len());
    let mut position = 0;
    for decoded in char::decode_utf16(units.iter().copied()) {
        match decoded {
            Ok(ch) => {
                position += ch.len_utf16();
                out.push(ch);
            }
            Err(e) => {
                return Err(MarshalError::UnpairedSurrogate {
                    unit: e.unpaired_surrogate(),
                    position,
                })
            }
        }
    }
    Ok(out)
}

/// Decode UCS-2 units (no terminator) into host text
pub fn decode_ucs2_units(units: &[u16]) -> Result<String, MarshalError> {
    units
        .iter()
        .enumerate()
        .map(|(position, &unit)| {
            char::from_u32(u32::from(unit)).ok_or(MarshalError::Ucs2Surrogate { unit, position })
        })
        .collect()
}

/// Decode 4-byte units (no terminator) into host text
pub fn decode_utf32_units(units: &[u32]) -> Result<String, MarshalError> {
    units
        .iter()
        .enumerate()
        .map(|(position, &value)| {
            char::from_u32(value).ok_or(MarshalError::InvalidScalar { value, position })
        })
        .collect()
}

/// Read a null-terminated engine wide string
///
/// Returns `Ok(None)` for a null pointer. When `max_units` is given the scan
/// stops there even without a terminator.
///
/// # Safety
///
/// `ptr` must be null or point to readable units of the given encoding's
/// width, terminated by a zero unit or at least `max_units` long.
pub unsafe fn decode_wide_ptr(
    ptr: WidePtr,
    encoding: WideEncoding,
    max_units: Option<usize>,
) -> Result<Option<String>, MarshalError> {
    if ptr.is_null() {
        return Ok(None);
    }
    let limit = max_units.unwrap_or(usize::MAX);

    let text = match encoding {
        WideEncoding::Utf16 => {
            let base = ptr as *const u16;
            let len = terminated_len(base, limit);
            decode_utf16_units(std::slice::from_raw_parts(base, len))?
        }
        WideEncoding::Ucs2 => {
            let base = ptr as *const u16;
            let len = terminated_len(base, limit);
            decode_ucs2_units(std::slice::from_raw_parts(base, len))?
        }
        WideEncoding::Utf32 => {
            let base = ptr as *const u32;
            let len = terminated_len(base, limit);
            decode_utf32_units(std::slice::from_raw_parts(base, len))?
        }
    };
    Ok(Some(text))
}

/// Count units before the first zero, up to `limit`
unsafe fn terminated_len<T: Copy + Default + PartialEq>(base: *const T, limit: usize) -> usize {
    let zero = T::default();
    let mut len = 0;
    while len < limit && *base.add(len) != zero {
        len += 1;
    }
    len
}

/// Decode engine bytes declared as UTF-8 text
pub fn decode_narrow(bytes: Vec<u8>) -> Result<String, MarshalError> {
    String::from_utf8(bytes).map_err(|e| MarshalError::InvalidUtf8 {
        valid_up_to: e.utf8_error().valid_up_to(),
    })
}

/// Marshal context for one native call
///
/// Owns every encoded argument until it drops, which happens only after the
/// engine has returned. Errors carry the entry point and argument index.
///
/// # Example
///
/// ```
/// # use cdr_bind::ffi::{EntryPoint, MarshalContext, WideEncoding};
/// let mut ctx = MarshalContext::new(EntryPoint::FileConfigXml, WideEncoding::Utf16);
/// let ptr = ctx.wide(0, "<config/>").unwrap();
/// assert!(!ptr.is_null());
/// assert!(ctx.wide(0, "bad\0xml").is_err());
/// ```
pub struct MarshalContext {
    entry_point: EntryPoint,
    encoding: WideEncoding,
    /// Keep encoded strings alive for the call
    allocated: Vec<WideString>,
}

impl MarshalContext {
    pub fn new(entry_point: EntryPoint, encoding: WideEncoding) -> Self {
        Self {
            entry_point,
            encoding,
            allocated: Vec::new(),
        }
    }

    pub fn encoding(&self) -> WideEncoding {
        self.encoding
    }

    /// Encode text for argument `argument`
    pub fn wide(&mut self, argument: usize, text: &str) -> BindResult<WidePtr> {
        let encoded = WideString::encode(text, self.encoding)
            .map_err(|e| self.encoding_error(argument, e))?;

        // The heap block does not move when the Vec is pushed into storage
        let ptr = encoded.as_ptr();
        self.allocated.push(encoded);
        Ok(ptr)
    }

    /// Encode a filesystem path for argument `argument`
    pub fn path(&mut self, argument: usize, path: &Path) -> BindResult<WidePtr> {
        let text = path.to_str().ok_or_else(|| {
            self.encoding_error(argument, MarshalError::NonUnicodePath(path.to_path_buf()))
        })?;
        self.wide(argument, text)
    }

    /// Pointer and length of caller-owned input bytes
    pub fn bytes(&self, data: &[u8]) -> (*const u8, usize) {
        (data.as_ptr(), data.len())
    }

    /// Decode UTF-8 output bytes produced at argument `argument`
    pub fn narrow(&self, argument: usize, bytes: Vec<u8>) -> BindResult<String> {
        decode_narrow(bytes).map_err(|e| self.encoding_error(argument, e))
    }

    /// Decode an engine wide string produced at argument `argument`
    ///
    /// # Safety
    ///
    /// Same contract as `decode_wide_ptr`.
    pub unsafe fn wide_out(
        &self,
        argument: usize,
        ptr: WidePtr,
        max_units: Option<usize>,
    ) -> BindResult<Option<String>> {
        decode_wide_ptr(ptr, self.encoding, max_units).map_err(|e| self.encoding_error(argument, e))
    }

    /// Number of strings held for the current call
    pub fn allocated_count(&self) -> usize {
        self.allocated.len()
    }

    fn encoding_error(&self, argument: usize, source: MarshalError) -> BindError {
        BindError::Encoding {
            entry_point: self.entry_point.name().to_string(),
            argument,
            source,
        }
    }
}
